use crate::core::config::SimulationConfig;
use crate::core::item::{Catalog, ItemId};
use crate::core::user::{UserId, UserPool, UserStatus};
use crate::graph::cycles::{find_trade_loops, LoopKind};
use crate::graph::want_graph::WantGraph;
use crate::optimization::scoring::{LoopScorer, ScoredLoop};
use crate::optimization::selection::LoopSelector;
use crate::optimization::valuation::{LoopValuator, ValuationError};
use crate::simulation::report::{LoopRecord, RoundRecord, RoundSummary};
use chrono::Utc;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle of a round. Strictly sequential, no re-entrancy: one
/// controller instance drives exactly one round to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Pending,
    Building,
    Scoring,
    Selecting,
    Applying,
    Closed,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundPhase::Pending => "pending",
            RoundPhase::Building => "building",
            RoundPhase::Scoring => "scoring",
            RoundPhase::Selecting => "selecting",
            RoundPhase::Applying => "applying",
            RoundPhase::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// A selected loop that could not settle.
///
/// Settlement pre-validates every participant before mutating anything, so
/// these errors abort the one loop's bookkeeping without touching the rest
/// of the round.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("participant {0} missing from pool at settlement")]
    MissingParticipant(UserId),
    #[error("participant {0} is no longer active at settlement")]
    NotActive(UserId),
    #[error("participant {user} no longer holds {item}")]
    HoldingMoved { user: UserId, item: ItemId },
}

/// Orchestrates one simulation round:
/// build → enumerate → value/score → select → apply → record.
///
/// The controller is the only mutator of user state (status, holdings,
/// cash), and it mutates only in the `Applying` phase. Valuation and
/// scoring fan out over candidates in parallel — both are pure — while
/// selection and settlement run sequentially.
pub struct RoundController<'a> {
    config: &'a SimulationConfig,
    catalog: &'a Catalog,
    phase: RoundPhase,
}

impl<'a> RoundController<'a> {
    pub fn new(config: &'a SimulationConfig, catalog: &'a Catalog) -> Self {
        Self {
            config,
            catalog,
            phase: RoundPhase::Pending,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    fn advance(&mut self, index: u32, phase: RoundPhase) {
        log::debug!("round {index}: {} -> {phase}", self.phase);
        self.phase = phase;
    }

    /// Run one round against the pool.
    ///
    /// Queued users are activated on entry. Returns the complete round
    /// record; every candidate the round saw appears in it.
    pub fn run(mut self, pool: &mut UserPool, index: u32) -> Result<RoundRecord, ValuationError> {
        let opened_at = Utc::now();
        let policy = &self.config.policy;

        pool.activate_queued();
        let matchable_at_start = pool.matchable().count();

        self.advance(index, RoundPhase::Building);
        let graph = WantGraph::build(pool);
        let candidates = find_trade_loops(&graph, policy.min_loop_size, policy.max_loop_size);
        log::debug!(
            "round {index}: {} users, {} edges, {} candidate loops",
            graph.node_count(),
            graph.edge_count(),
            candidates.len()
        );

        self.advance(index, RoundPhase::Scoring);
        let valuator = LoopValuator::new(self.catalog, policy);
        let scorer = LoopScorer::new(policy);
        let snapshot: &UserPool = pool;
        let scored: Result<Vec<ScoredLoop>, ValuationError> = candidates
            .par_iter()
            .map(|candidate| {
                let valued = valuator.valuate(snapshot, candidate)?;
                Ok(scorer.score(valued))
            })
            .collect();
        let scored = scored?;
        let candidates_total = scored.len();

        self.advance(index, RoundPhase::Selecting);
        let (accepted, unaccepted): (Vec<_>, Vec<_>) =
            scored.into_iter().partition(ScoredLoop::is_accepted);
        let accepted_total = accepted.len();
        let selection = LoopSelector::select(accepted);

        self.advance(index, RoundPhase::Applying);
        let mut records: Vec<LoopRecord> = Vec::with_capacity(candidates_total);
        let mut skipped_records: Vec<LoopRecord> = Vec::new();

        for loop_ in selection.executed {
            match self.apply_loop(pool, &loop_) {
                Ok(trade_id) => records.push(LoopRecord::executed(loop_, trade_id)),
                Err(err) => {
                    log::warn!("round {index}: loop could not settle: {err}");
                    skipped_records.push(LoopRecord::unexecuted(loop_));
                }
            }
        }
        for loop_ in selection.skipped {
            skipped_records.push(LoopRecord::unexecuted(loop_));
        }

        // Matched users leave the pool's active set; everyone else who was
        // eligible accrues an unmatched round and may age out entirely.
        let users_matched: usize = records.iter().map(|r| r.participants.len()).sum();
        for user in pool.iter_mut() {
            if user.status() != UserStatus::Active {
                continue;
            }
            user.record_unmatched_round();
            if user.unmatched_rounds() >= self.config.max_unmatched_rounds {
                log::debug!(
                    "round {index}: declining {} after {} unmatched rounds",
                    user.id(),
                    user.unmatched_rounds()
                );
                user.set_status(UserStatus::Declined);
            }
        }

        let summary = build_summary(
            &records,
            &skipped_records,
            &unaccepted,
            candidates_total,
            accepted_total,
            users_matched,
            matchable_at_start,
            pool,
        );
        log::info!(
            "round {index}: executed {} of {} candidates ({} users matched)",
            records.len(),
            candidates_total,
            users_matched
        );

        // Record order: executed, then skipped, rejected, invalid.
        records.extend(skipped_records);
        let (rejected, invalid): (Vec<_>, Vec<_>) =
            unaccepted.into_iter().partition(|l| l.valued.is_valid());
        records.extend(rejected.into_iter().map(LoopRecord::unexecuted));
        records.extend(invalid.into_iter().map(LoopRecord::unexecuted));

        self.advance(index, RoundPhase::Closed);
        Ok(RoundRecord {
            index,
            opened_at,
            closed_at: Utc::now(),
            loops: records,
            summary,
        })
    }

    /// Settle one executed loop: rotate items, move cash, flip statuses.
    ///
    /// All-or-nothing: every participant is validated before the first
    /// mutation, so a failed loop leaves the pool untouched.
    fn apply_loop(&self, pool: &mut UserPool, loop_: &ScoredLoop) -> Result<Uuid, ApplyError> {
        for leg in &loop_.valued.legs {
            let user = pool
                .get(&leg.user)
                .ok_or_else(|| ApplyError::MissingParticipant(leg.user.clone()))?;
            if user.status() != UserStatus::Active {
                return Err(ApplyError::NotActive(leg.user.clone()));
            }
            if !user.holds(&leg.gives_item) {
                return Err(ApplyError::HoldingMoved {
                    user: leg.user.clone(),
                    item: leg.gives_item.clone(),
                });
            }
        }

        for leg in &loop_.valued.legs {
            let user = pool
                .get_mut(&leg.user)
                .expect("participant validated above");
            user.swap_item(leg.receives_item.clone());
            user.settle_cash(leg.cash_delta);
            user.set_status(UserStatus::Matched);
        }

        Ok(Uuid::new_v4())
    }
}

#[allow(clippy::too_many_arguments)]
fn build_summary(
    executed: &[LoopRecord],
    skipped: &[LoopRecord],
    unaccepted: &[ScoredLoop],
    candidates: usize,
    accepted: usize,
    users_matched: usize,
    matchable_at_start: usize,
    pool: &UserPool,
) -> RoundSummary {
    let executed_two_way = executed.iter().filter(|r| r.kind == LoopKind::TwoWay).count();
    let executed_three_way = executed.len() - executed_two_way;

    let rejected = unaccepted.iter().filter(|l| l.valued.is_valid()).count();
    let invalid = unaccepted.len() - rejected;

    let total_item_value_moved: Decimal =
        executed.iter().map(|r| r.metrics.total_item_value).sum();
    let total_cash_moved: Decimal = executed.iter().map(|r| r.metrics.total_cash_flow).sum();

    let avg_value_efficiency = mean(executed.iter().map(|r| r.metrics.value_efficiency));
    let avg_fairness = mean(executed.iter().filter_map(|r| r.metrics.relative_fairness));

    let match_rate = if matchable_at_start == 0 {
        0.0
    } else {
        users_matched as f64 / matchable_at_start as f64
    };

    RoundSummary {
        candidates,
        accepted,
        executed_two_way,
        executed_three_way,
        skipped: skipped.len(),
        rejected,
        invalid,
        users_matched,
        match_rate,
        avg_value_efficiency,
        avg_fairness,
        total_item_value_moved,
        total_cash_moved,
        active_after: pool.count_by_status(UserStatus::Active),
        declined_after: pool.count_by_status(UserStatus::Declined),
    }
}

fn mean(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let collected: Vec<Decimal> = values.collect();
    if collected.is_empty() {
        return None;
    }
    let sum: Decimal = collected.iter().copied().sum();
    Some(sum / Decimal::from(collected.len()))
}
