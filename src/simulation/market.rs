//! Reference population source for simulations and stress testing.
//!
//! Real deployments feed the engine from an external user service and
//! catalog; this module generates synthetic markets with the same shape —
//! priced watch models, users holding one watch each, ranked wishlists,
//! and round-over-round entrant growth.

use crate::core::item::{Catalog, ItemId};
use crate::core::user::{User, UserId, UserPool};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// Supplies each round's new entrants.
///
/// Implementations see the current pool read-only, so wishlists can be
/// steered toward models that are actually in circulation.
pub trait PopulationSource {
    fn users_for_round(&mut self, round: u32, pool: &UserPool) -> Vec<User>;
}

/// Configuration for generating a random market.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Entrants admitted in round one.
    pub initial_users: usize,
    /// Round-over-round growth of the entrant count.
    pub growth_rate: f64,
    /// Number of distinct watch models in the catalog.
    pub model_count: usize,
    /// Minimum model value.
    pub min_value: Decimal,
    /// Maximum model value.
    pub max_value: Decimal,
    /// Wishlist length per user.
    pub wishlist_len: usize,
    /// Cash balance as a fraction of the held item's value.
    pub cash_factor: Decimal,
    /// Seed for reproducible markets.
    pub seed: Option<u64>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            initial_users: 20,
            growth_rate: 0.10,
            model_count: 12,
            min_value: Decimal::from(500),
            max_value: Decimal::from(25_000),
            wishlist_len: 3,
            cash_factor: Decimal::new(3, 1), // 0.3
            seed: None,
        }
    }
}

/// Random market with compound entrant growth.
///
/// Round `n` admits `initial_users * (1 + growth_rate)^(n-1)` entrants,
/// each holding a random catalogued model with a ranked wishlist of other
/// models.
pub struct GrowthMarket {
    config: MarketConfig,
    catalog: Catalog,
    models: Vec<ItemId>,
    rng: StdRng,
    next_user: usize,
}

impl GrowthMarket {
    pub fn new(config: MarketConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let min: f64 = config.min_value.to_string().parse().unwrap_or(500.0);
        let max: f64 = config.max_value.to_string().parse().unwrap_or(25_000.0);

        let mut catalog = Catalog::new();
        let mut models = Vec::with_capacity(config.model_count);
        for i in 0..config.model_count {
            let model = ItemId::new(format!("WATCH-{:03}", i));
            let value = Decimal::from_f64_retain(rng.gen_range(min..max))
                .unwrap_or(Decimal::from(1_000))
                .round_dp(2);
            // Positive by construction of the range; insert cannot fail.
            let _ = catalog.insert(model.clone(), value);
            models.push(model);
        }

        Self {
            config,
            catalog,
            models,
            rng,
            next_user: 0,
        }
    }

    /// The generated catalog, for wiring into the engine.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn entrants_for(&self, round: u32) -> usize {
        let growth = (1.0 + self.config.growth_rate).powi(round as i32 - 1);
        (self.config.initial_users as f64 * growth) as usize
    }

    fn generate_user(&mut self) -> User {
        let id = UserId::new(format!("U-{:05}", self.next_user));
        self.next_user += 1;

        let held = self.models[self.rng.gen_range(0..self.models.len())].clone();
        let value = self
            .catalog
            .value(&held)
            .unwrap_or_else(|_| Decimal::from(1_000));
        let cash = (value * self.config.cash_factor).round_dp(2);

        let mut wishlist: Vec<ItemId> = self
            .models
            .iter()
            .filter(|m| **m != held)
            .cloned()
            .collect();
        wishlist.shuffle(&mut self.rng);
        wishlist.truncate(self.config.wishlist_len);

        User::new(id, held, cash).with_wishlist(wishlist)
    }
}

impl PopulationSource for GrowthMarket {
    fn users_for_round(&mut self, round: u32, _pool: &UserPool) -> Vec<User> {
        let count = self.entrants_for(round);
        (0..count).map(|_| self.generate_user()).collect()
    }
}
