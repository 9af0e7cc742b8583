use crate::core::config::{ConfigError, SimulationConfig};
use crate::core::item::Catalog;
use crate::core::user::{UserPool, UserStatus};
use crate::optimization::valuation::ValuationError;
use crate::simulation::market::PopulationSource;
use crate::simulation::report::{RoundRecord, SimulationReport, SimulationSummary};
use crate::simulation::round::RoundController;
use thiserror::Error;

/// Errors that end a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
}

/// Multi-round simulation driver.
///
/// Owns the cross-round state — the user pool, the round counter, the
/// accumulated records — as one explicitly constructed context, so
/// independent simulations can run side by side and tests stay
/// deterministic. Rounds are strictly sequential: round `n + 1` observes
/// the exact post-settlement state of round `n`.
///
/// # Examples
///
/// ```
/// use chariot_engine::core::config::SimulationConfig;
/// use chariot_engine::simulation::market::{GrowthMarket, MarketConfig};
/// use chariot_engine::simulation::runner::Simulation;
///
/// let market = GrowthMarket::new(MarketConfig {
///     seed: Some(42),
///     ..MarketConfig::default()
/// });
/// let catalog = market.catalog().clone();
/// let sim = Simulation::new(SimulationConfig::default(), catalog, market).unwrap();
/// let report = sim.run().unwrap();
/// assert!(report.summary.rounds_run >= 1);
/// ```
pub struct Simulation<S: PopulationSource> {
    config: SimulationConfig,
    catalog: Catalog,
    source: S,
    pool: UserPool,
}

impl<S: PopulationSource> Simulation<S> {
    /// Build a simulation, validating the configuration once up front.
    /// A nonsensical configuration is fatal here — no round could proceed
    /// meaningfully.
    pub fn new(
        config: SimulationConfig,
        catalog: Catalog,
        source: S,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            config,
            catalog,
            source,
            pool: UserPool::new(),
        })
    }

    /// Run rounds until the round cap is reached or the market exhausts.
    ///
    /// Exhaustion — two consecutive rounds that accept zero loops while
    /// the active pool sits below the `min_trades_per_round` floor — is a
    /// normal termination signal, not an error.
    pub fn run(mut self) -> Result<SimulationReport, SimulationError> {
        let mut rounds: Vec<RoundRecord> = Vec::new();
        let mut lean_streak = 0u32;

        for index in 1..=self.config.max_rounds {
            for user in self.source.users_for_round(index, &self.pool) {
                self.pool.admit(user);
            }

            let record = RoundController::new(&self.config, &self.catalog)
                .run(&mut self.pool, index)?;

            let exhausted = record.summary.accepted == 0
                && self.pool.count_by_status(UserStatus::Active) < self.config.min_trades_per_round;
            lean_streak = if exhausted { lean_streak + 1 } else { 0 };
            rounds.push(record);

            if lean_streak >= 2 {
                log::info!("market exhausted after round {index}, stopping early");
                break;
            }
        }

        let summary = SimulationSummary::from_rounds(&rounds, self.pool.len());
        Ok(SimulationReport { rounds, summary })
    }

    /// The residual pool. Mostly useful after `run` in tests; exposed for
    /// callers that want to inspect or carry forward the population.
    pub fn pool(&self) -> &UserPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::ItemId;
    use crate::core::user::{User, UserId};
    use rust_decimal_macros::dec;

    /// Yields a fixed batch in round one, nothing afterwards.
    struct OneShot(Vec<User>);

    impl PopulationSource for OneShot {
        fn users_for_round(&mut self, round: u32, _pool: &UserPool) -> Vec<User> {
            if round == 1 {
                std::mem::take(&mut self.0)
            } else {
                Vec::new()
            }
        }
    }

    fn swap_pair() -> (Catalog, Vec<User>) {
        let mut catalog = Catalog::new();
        catalog.insert(ItemId::new("W-1"), dec!(5_000)).unwrap();
        catalog.insert(ItemId::new("W-2"), dec!(5_200)).unwrap();
        let users = vec![
            User::new(UserId::new("A"), ItemId::new("W-1"), dec!(2_000))
                .with_wishlist(vec![ItemId::new("W-2")]),
            User::new(UserId::new("B"), ItemId::new("W-2"), dec!(2_000))
                .with_wishlist(vec![ItemId::new("W-1")]),
        ];
        (catalog, users)
    }

    #[test]
    fn test_single_round_cap_yields_one_record() {
        let (catalog, users) = swap_pair();
        let config = SimulationConfig {
            max_rounds: 1,
            ..SimulationConfig::default()
        };
        let report = Simulation::new(config, catalog, OneShot(users))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.rounds.len(), 1);
        assert_eq!(report.summary.rounds_run, 1);
        assert_eq!(report.summary.total_two_way, 1);
    }

    #[test]
    fn test_exhaustion_stops_the_run_early() {
        // One unmatched loner: every round accepts zero loops and the
        // active pool is under the floor, so the run stops after two
        // lean rounds despite a generous round cap.
        let mut catalog = Catalog::new();
        catalog.insert(ItemId::new("W-1"), dec!(5_000)).unwrap();
        let loner = vec![User::new(UserId::new("A"), ItemId::new("W-1"), dec!(0))];

        let config = SimulationConfig {
            max_rounds: 50,
            min_trades_per_round: 2,
            ..SimulationConfig::default()
        };
        let report = Simulation::new(config, catalog, OneShot(loner))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.rounds.len(), 2);
    }

    #[test]
    fn test_invalid_config_is_fatal_at_startup() {
        let (catalog, users) = swap_pair();
        let config = SimulationConfig {
            max_rounds: 0,
            ..SimulationConfig::default()
        };
        let result = Simulation::new(config, catalog, OneShot(users));
        assert!(matches!(result, Err(SimulationError::Config(_))));
    }

    #[test]
    fn test_matched_users_leave_the_active_pool() {
        let (catalog, users) = swap_pair();
        let config = SimulationConfig {
            max_rounds: 3,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(config, catalog, OneShot(users)).unwrap();
        let report = sim.run().unwrap();

        // The pair matches in round one; later rounds see an empty
        // active pool and accept nothing.
        assert_eq!(report.summary.total_two_way, 1);
        assert_eq!(report.summary.users_matched, 2);
        for round in &report.rounds[1..] {
            assert_eq!(round.summary.accepted, 0);
        }
    }
}
