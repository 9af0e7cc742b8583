use crate::core::config::TradePolicy;
use crate::optimization::valuation::{LoopMetrics, ValuedLoop};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One step of a scoring table: values at or above `lower_bound` (and
/// below the next band's) earn `modifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBand {
    pub lower_bound: Decimal,
    pub modifier: Decimal,
}

/// Value-efficiency modifier table. Bounds are empirically derived
/// quantiles of observed trades; lower bounds are inclusive, so a value
/// sitting exactly on a boundary earns the higher band.
fn efficiency_bands() -> [ScoreBand; 5] {
    [
        band(dec!(0), dec!(-0.40)),
        band(dec!(0.80), dec!(0.00)),
        band(dec!(0.8338), dec!(0.15)),
        band(dec!(0.86), dec!(0.25)),
        band(dec!(0.898), dec!(0.35)),
    ]
}

/// Relative-fairness modifier table (three-way loops only; the thresholds
/// are right-skewed to reward genuinely even loops).
fn fairness_bands() -> [ScoreBand; 5] {
    [
        band(dec!(0), dec!(0.00)),
        band(dec!(0.7469), dec!(0.03)),
        band(dec!(0.7888), dec!(0.08)),
        band(dec!(0.8509), dec!(0.12)),
        band(dec!(0.90), dec!(0.15)),
    ]
}

fn band(lower_bound: Decimal, modifier: Decimal) -> ScoreBand {
    ScoreBand {
        lower_bound,
        modifier,
    }
}

/// Last band whose inclusive lower bound the value reaches.
fn band_modifier(bands: &[ScoreBand], value: Decimal) -> Decimal {
    bands
        .iter()
        .rev()
        .find(|b| value >= b.lower_bound)
        .map(|b| b.modifier)
        .unwrap_or(Decimal::ZERO)
}

/// An acceptance gate a scored loop failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GateFailure {
    #[error("value efficiency {efficiency} below the {gate} minimum")]
    Efficiency { efficiency: Decimal, gate: Decimal },
    #[error("acceptance score {score} below the {gate} threshold")]
    Score { score: Decimal, gate: Decimal },
}

/// Outcome of scoring one loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Eligible for selection.
    Accepted,
    /// Failed an acceptance gate; metrics retained for reporting.
    Rejected(GateFailure),
    /// Broke a validity bound during valuation; never scored.
    Invalid,
}

/// A loop with its acceptance score and verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLoop {
    pub valued: ValuedLoop,
    /// `None` for invalid loops, which are excluded from scoring.
    pub acceptance_score: Option<Decimal>,
    pub verdict: Verdict,
}

impl ScoredLoop {
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

/// Maps loop metrics to an acceptance score and applies the gates.
///
/// Scoring is pure: the same metrics always produce the same score, and
/// loops can be scored concurrently.
///
/// # Examples
///
/// ```
/// use chariot_engine::core::config::TradePolicy;
/// use chariot_engine::optimization::scoring::LoopScorer;
///
/// let policy = TradePolicy::default();
/// let scorer = LoopScorer::new(&policy);
/// # let _ = scorer;
/// ```
pub struct LoopScorer<'a> {
    policy: &'a TradePolicy,
}

impl<'a> LoopScorer<'a> {
    pub fn new(policy: &'a TradePolicy) -> Self {
        Self { policy }
    }

    /// The composite acceptance score for a set of metrics:
    /// `base_score + efficiency_modifier + fairness_modifier`. Two-way
    /// loops have no fairness dimension and contribute a fixed neutral 0.
    pub fn acceptance_score(&self, metrics: &LoopMetrics) -> Decimal {
        let efficiency_modifier = band_modifier(&efficiency_bands(), metrics.value_efficiency);
        let fairness_modifier = metrics
            .relative_fairness
            .map(|fairness| band_modifier(&fairness_bands(), fairness))
            .unwrap_or(Decimal::ZERO);
        self.policy.base_score + efficiency_modifier + fairness_modifier
    }

    /// Score a valued loop and decide its verdict.
    ///
    /// Invalid loops pass through unscored. Valid loops are accepted iff
    /// they clear both gates: `value_efficiency >= min_efficiency` and
    /// `acceptance_score >= fairness_threshold`.
    pub fn score(&self, valued: ValuedLoop) -> ScoredLoop {
        if !valued.is_valid() {
            return ScoredLoop {
                valued,
                acceptance_score: None,
                verdict: Verdict::Invalid,
            };
        }

        let score = self.acceptance_score(&valued.metrics);
        let efficiency = valued.metrics.value_efficiency;

        let verdict = if efficiency < self.policy.min_efficiency {
            Verdict::Rejected(GateFailure::Efficiency {
                efficiency,
                gate: self.policy.min_efficiency,
            })
        } else if score < self.policy.fairness_threshold {
            Verdict::Rejected(GateFailure::Score {
                score,
                gate: self.policy.fairness_threshold,
            })
        } else {
            Verdict::Accepted
        };

        ScoredLoop {
            valued,
            acceptance_score: Some(score),
            verdict,
        }
    }
}
