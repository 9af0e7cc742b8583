use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by configuration validation.
///
/// Validation runs once at simulation startup; any failure is fatal for
/// the whole run, since no round could proceed meaningfully.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("minimum acceptable value must be non-negative, got {0}")]
    NegativeValueFloor(Decimal),
    #[error("cash top-up ceiling must be non-negative, got {0}")]
    NegativeCashCeiling(Decimal),
    #[error("minimum efficiency gate must lie in [0, 1], got {0}")]
    EfficiencyGateOutOfRange(Decimal),
    #[error("loop size bounds must satisfy 2 <= min <= max <= 3, got {min}..={max}")]
    InvalidLoopSizeRange { min: usize, max: usize },
    #[error("simulation must run at least one round")]
    ZeroRounds,
}

/// Trade-level policy: validity bounds, acceptance gates, loop sizes.
///
/// # Examples
///
/// ```
/// use chariot_engine::core::config::TradePolicy;
///
/// let policy = TradePolicy::default();
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradePolicy {
    /// Floor on the value of the item each participant receives.
    pub min_acceptable_value: Decimal,
    /// Ceiling on the cash any single participant pays into a loop.
    pub max_cash_top_up: Decimal,
    /// Acceptance gate on a loop's value efficiency.
    pub min_efficiency: Decimal,
    /// Acceptance gate on a loop's composite acceptance score.
    pub fairness_threshold: Decimal,
    /// Constant the scoring modifiers are added to.
    pub base_score: Decimal,
    /// Smallest loop the enumerator emits.
    pub min_loop_size: usize,
    /// Largest loop the enumerator emits.
    pub max_loop_size: usize,
}

impl Default for TradePolicy {
    fn default() -> Self {
        Self {
            min_acceptable_value: Decimal::ZERO,
            max_cash_top_up: dec!(5000),
            min_efficiency: dec!(0.3),
            fairness_threshold: dec!(0.5),
            base_score: dec!(0.5),
            min_loop_size: 2,
            max_loop_size: 3,
        }
    }
}

impl TradePolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_acceptable_value < Decimal::ZERO {
            return Err(ConfigError::NegativeValueFloor(self.min_acceptable_value));
        }
        if self.max_cash_top_up < Decimal::ZERO {
            return Err(ConfigError::NegativeCashCeiling(self.max_cash_top_up));
        }
        if self.min_efficiency < Decimal::ZERO || self.min_efficiency > Decimal::ONE {
            return Err(ConfigError::EfficiencyGateOutOfRange(self.min_efficiency));
        }
        if self.min_loop_size < 2 || self.max_loop_size > 3 || self.min_loop_size > self.max_loop_size
        {
            return Err(ConfigError::InvalidLoopSizeRange {
                min: self.min_loop_size,
                max: self.max_loop_size,
            });
        }
        Ok(())
    }
}

/// Round-to-round simulation policy, wrapping the trade policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Hard cap on the number of rounds.
    pub max_rounds: u32,
    /// Market-exhaustion floor: two consecutive zero-acceptance rounds
    /// with fewer active users than this terminate the run.
    pub min_trades_per_round: usize,
    /// Active users who stay unmatched this many rounds are declined.
    pub max_unmatched_rounds: u32,
    pub policy: TradePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_rounds: 12,
            min_trades_per_round: 2,
            max_unmatched_rounds: 5,
            policy: TradePolicy::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        self.policy.validate()
    }
}
