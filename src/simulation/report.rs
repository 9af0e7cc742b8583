use crate::core::user::UserId;
use crate::graph::cycles::LoopKind;
use crate::optimization::scoring::{GateFailure, ScoredLoop, Verdict};
use crate::optimization::valuation::{CashLeg, LoopMetrics, LoopViolation, ValuedLoop};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a candidate loop this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopOutcome {
    /// Selected and settled.
    Executed,
    /// Accepted but passed over: a participant was already committed.
    Skipped,
    /// Failed an acceptance gate.
    Rejected,
    /// Broke a validity bound during valuation.
    Invalid,
}

/// The per-loop line of a round's record.
///
/// Every candidate the round saw ends up here — executed, skipped,
/// rejected, or invalid — with its metrics, so near-miss trades can be
/// audited. Only executed loops carry a trade id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopRecord {
    pub trade_id: Option<Uuid>,
    pub kind: LoopKind,
    pub participants: Vec<UserId>,
    pub legs: Vec<CashLeg>,
    pub metrics: LoopMetrics,
    pub acceptance_score: Option<Decimal>,
    pub outcome: LoopOutcome,
    /// The gate a rejected loop failed.
    pub rejection: Option<GateFailure>,
    /// The bounds an invalid loop broke.
    pub violations: Vec<LoopViolation>,
}

impl LoopRecord {
    /// Record a loop that did not execute, deriving the outcome from its
    /// scoring verdict (accepted-but-unexecuted means skipped).
    pub fn unexecuted(scored: ScoredLoop) -> Self {
        let (outcome, rejection) = match scored.verdict {
            Verdict::Accepted => (LoopOutcome::Skipped, None),
            Verdict::Rejected(gate) => (LoopOutcome::Rejected, Some(gate)),
            Verdict::Invalid => (LoopOutcome::Invalid, None),
        };
        Self::from_parts(scored.valued, scored.acceptance_score, outcome, rejection, None)
    }

    /// Record an executed loop with its settlement trade id.
    pub fn executed(scored: ScoredLoop, trade_id: Uuid) -> Self {
        Self::from_parts(
            scored.valued,
            scored.acceptance_score,
            LoopOutcome::Executed,
            None,
            Some(trade_id),
        )
    }

    fn from_parts(
        valued: ValuedLoop,
        acceptance_score: Option<Decimal>,
        outcome: LoopOutcome,
        rejection: Option<GateFailure>,
        trade_id: Option<Uuid>,
    ) -> Self {
        Self {
            trade_id,
            kind: valued.candidate.kind(),
            participants: valued.candidate.participants().to_vec(),
            legs: valued.legs,
            metrics: valued.metrics,
            acceptance_score,
            outcome,
            rejection,
            violations: valued.violations,
        }
    }
}

/// Aggregates for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub candidates: usize,
    pub accepted: usize,
    pub executed_two_way: usize,
    pub executed_three_way: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub invalid: usize,
    pub users_matched: usize,
    /// Users matched this round over users matchable at round start.
    pub match_rate: f64,
    /// Mean value efficiency of executed loops.
    pub avg_value_efficiency: Option<Decimal>,
    /// Mean relative fairness of executed three-way loops.
    pub avg_fairness: Option<Decimal>,
    pub total_item_value_moved: Decimal,
    pub total_cash_moved: Decimal,
    pub active_after: usize,
    pub declined_after: usize,
}

/// The complete, ordered record of one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub index: u32,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    /// Every candidate loop the round saw, executed first, then skipped,
    /// rejected, and invalid.
    pub loops: Vec<LoopRecord>,
    pub summary: RoundSummary,
}

impl RoundRecord {
    pub fn executed_loops(&self) -> impl Iterator<Item = &LoopRecord> {
        self.loops
            .iter()
            .filter(|l| l.outcome == LoopOutcome::Executed)
    }

    pub fn executed_count(&self) -> usize {
        self.summary.executed_two_way + self.summary.executed_three_way
    }
}

impl std::fmt::Display for RoundRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Round {} ===", self.index)?;
        writeln!(f, "Candidates:     {}", self.summary.candidates)?;
        writeln!(f, "Accepted:       {}", self.summary.accepted)?;
        writeln!(
            f,
            "Executed:       {} ({} two-way, {} three-way)",
            self.executed_count(),
            self.summary.executed_two_way,
            self.summary.executed_three_way
        )?;
        writeln!(
            f,
            "Skipped/Rej/Inv: {}/{}/{}",
            self.summary.skipped, self.summary.rejected, self.summary.invalid
        )?;
        writeln!(f, "Match rate:     {:.1}%", self.summary.match_rate * 100.0)?;
        if let Some(eff) = self.summary.avg_value_efficiency {
            writeln!(f, "Avg efficiency: {eff:.4}")?;
        }
        if let Some(fairness) = self.summary.avg_fairness {
            writeln!(f, "Avg fairness:   {fairness:.4}")?;
        }
        writeln!(f, "Value moved:    {}", self.summary.total_item_value_moved)?;
        writeln!(f, "Cash moved:     {}", self.summary.total_cash_moved)?;
        writeln!(
            f,
            "Pool after:     {} active, {} declined",
            self.summary.active_after, self.summary.declined_after
        )
    }
}

/// Aggregates for a whole simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub rounds_run: u32,
    pub total_users: usize,
    pub users_matched: usize,
    pub total_two_way: usize,
    pub total_three_way: usize,
    pub percent_users_traded: f64,
    pub avg_users_per_trade: f64,
    pub total_cash_moved: Decimal,
}

impl SimulationSummary {
    pub fn total_trades(&self) -> usize {
        self.total_two_way + self.total_three_way
    }

    /// Fold per-round records into run totals.
    pub fn from_rounds(rounds: &[RoundRecord], total_users: usize) -> Self {
        let total_two_way = rounds.iter().map(|r| r.summary.executed_two_way).sum();
        let total_three_way = rounds.iter().map(|r| r.summary.executed_three_way).sum();
        let users_matched: usize = rounds.iter().map(|r| r.summary.users_matched).sum();
        let total_cash_moved = rounds.iter().map(|r| r.summary.total_cash_moved).sum();

        let trades = total_two_way + total_three_way;
        let percent_users_traded = if total_users == 0 {
            0.0
        } else {
            100.0 * users_matched as f64 / total_users as f64
        };
        let avg_users_per_trade = if trades == 0 {
            0.0
        } else {
            (2 * total_two_way + 3 * total_three_way) as f64 / trades as f64
        };

        Self {
            rounds_run: rounds.len() as u32,
            total_users,
            users_matched,
            total_two_way,
            total_three_way,
            percent_users_traded,
            avg_users_per_trade,
            total_cash_moved,
        }
    }
}

/// Everything a run produced: per-round records plus the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub rounds: Vec<RoundRecord>,
    pub summary: SimulationSummary,
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Simulation Summary ===")?;
        writeln!(f, "Rounds run:       {}", self.summary.rounds_run)?;
        writeln!(f, "Users generated:  {}", self.summary.total_users)?;
        writeln!(f, "Users matched:    {}", self.summary.users_matched)?;
        writeln!(
            f,
            "Trades executed:  {} ({} two-way, {} three-way)",
            self.summary.total_trades(),
            self.summary.total_two_way,
            self.summary.total_three_way
        )?;
        writeln!(
            f,
            "Users traded:     {:.1}%",
            self.summary.percent_users_traded
        )?;
        writeln!(
            f,
            "Users per trade:  {:.2}",
            self.summary.avg_users_per_trade
        )?;
        writeln!(f, "Cash moved:       {}", self.summary.total_cash_moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(index: u32, two_way: usize, three_way: usize) -> RoundRecord {
        RoundRecord {
            index,
            opened_at: Utc::now(),
            closed_at: Utc::now(),
            loops: Vec::new(),
            summary: RoundSummary {
                candidates: 0,
                accepted: 0,
                executed_two_way: two_way,
                executed_three_way: three_way,
                skipped: 0,
                rejected: 0,
                invalid: 0,
                users_matched: 2 * two_way + 3 * three_way,
                match_rate: 0.0,
                avg_value_efficiency: None,
                avg_fairness: None,
                total_item_value_moved: Decimal::ZERO,
                total_cash_moved: Decimal::ZERO,
                active_after: 0,
                declined_after: 0,
            },
        }
    }

    #[test]
    fn test_summary_folds_rounds() {
        use approx::assert_relative_eq;

        let rounds = vec![round(1, 2, 1), round(2, 1, 0)];
        let summary = SimulationSummary::from_rounds(&rounds, 10);

        assert_eq!(summary.rounds_run, 2);
        assert_eq!(summary.total_trades(), 4);
        assert_eq!(summary.users_matched, 9);
        assert_relative_eq!(summary.percent_users_traded, 90.0);
        // 2*3 + 3*1 = 9 users over 4 trades.
        assert_relative_eq!(summary.avg_users_per_trade, 2.25);
    }

    #[test]
    fn test_empty_run_summary() {
        let summary = SimulationSummary::from_rounds(&[], 0);
        assert_eq!(summary.total_trades(), 0);
        assert_eq!(summary.percent_users_traded, 0.0);
        assert_eq!(summary.avg_users_per_trade, 0.0);
    }
}
