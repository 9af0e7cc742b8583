//! # chariot-engine
//!
//! Trade-loop discovery and selection engine for peer-to-peer barter
//! markets.
//!
//! Participants each hold one item (a watch) and rank the items they want;
//! the engine finds all feasible 2- and 3-party exchange cycles, scores
//! them for value efficiency and fairness, and executes a conflict-free
//! subset every round — no participant gives their item away twice.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: items and the catalog, users and the
//!   pool, configuration
//! - **graph** — Want graph, connected components, cycle enumeration
//! - **optimization** — Loop valuation, quantile-band scoring, greedy
//!   conflict-free selection
//! - **simulation** — Round controller, multi-round runner, records,
//!   reference market generator

pub mod core;
pub mod graph;
pub mod optimization;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::config::{SimulationConfig, TradePolicy};
    pub use crate::core::item::{Catalog, ItemId};
    pub use crate::core::user::{User, UserId, UserPool, UserStatus};
    pub use crate::graph::cycles::{find_trade_loops, CandidateLoop, LoopKind};
    pub use crate::graph::want_graph::WantGraph;
    pub use crate::optimization::scoring::{LoopScorer, ScoredLoop, Verdict};
    pub use crate::optimization::selection::LoopSelector;
    pub use crate::optimization::valuation::{LoopMetrics, LoopValuator, ValuedLoop};
    pub use crate::simulation::report::{RoundRecord, SimulationReport};
    pub use crate::simulation::runner::Simulation;
}
