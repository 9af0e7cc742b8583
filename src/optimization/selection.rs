use crate::core::user::UserId;
use crate::optimization::scoring::ScoredLoop;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Result of conflict-free loop selection for one round.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    /// Loops chosen for execution; participant sets are pairwise disjoint.
    pub executed: Vec<ScoredLoop>,
    /// Accepted loops passed over because a participant was already
    /// committed. Skipped is not rejected — the loop may come back in a
    /// later round.
    pub skipped: Vec<ScoredLoop>,
}

impl SelectionResult {
    /// Total acceptance score realized by the executed loops.
    pub fn total_score(&self) -> Decimal {
        self.executed
            .iter()
            .filter_map(|l| l.acceptance_score)
            .sum()
    }
}

/// Greedy conflict-free selection over accepted loops.
///
/// Users may sit on several overlapping candidate loops, but a user can
/// only give their item away once per round, so executing overlapping
/// loops is forbidden. Choosing the best disjoint subset is a
/// maximum-weight set-packing problem (NP-hard in general); this selector
/// uses a deterministic greedy approximation that favors many high-quality
/// loops over a single globally optimal packing — throughput and
/// predictability over exact optimality.
pub struct LoopSelector;

impl LoopSelector {
    /// Select a user-disjoint subset of the accepted loops.
    ///
    /// Loops are taken in descending acceptance-score order — ties broken
    /// by fewer participants, then by lowest participant id, so a run is
    /// exactly reproducible — and executed iff no participant has already
    /// been committed this round. The committed-user set makes this pass
    /// inherently sequential; enumeration and scoring parallelism stops
    /// here.
    pub fn select(accepted: Vec<ScoredLoop>) -> SelectionResult {
        let mut ordered = accepted;
        ordered.sort_by(selection_order);

        let mut committed: BTreeSet<UserId> = BTreeSet::new();
        let mut result = SelectionResult::default();

        for loop_ in ordered {
            let participants = loop_.valued.candidate.participants();
            let free = participants.iter().all(|p| !committed.contains(p));
            if free {
                committed.extend(participants.iter().cloned());
                result.executed.push(loop_);
            } else {
                result.skipped.push(loop_);
            }
        }

        result
    }
}

/// Score descending, then fewer participants, then lowest participant id.
fn selection_order(a: &ScoredLoop, b: &ScoredLoop) -> Ordering {
    let score_a = a.acceptance_score.unwrap_or(Decimal::MIN);
    let score_b = b.acceptance_score.unwrap_or(Decimal::MIN);
    score_b
        .cmp(&score_a)
        .then_with(|| a.valued.candidate.len().cmp(&b.valued.candidate.len()))
        .then_with(|| {
            a.valued
                .candidate
                .min_participant()
                .cmp(b.valued.candidate.min_participant())
        })
        .then_with(|| a.valued.candidate.participants().cmp(b.valued.candidate.participants()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::cycles::CandidateLoop;
    use crate::optimization::scoring::Verdict;
    use crate::optimization::valuation::{LoopMetrics, ValuedLoop};
    use rust_decimal_macros::dec;

    fn accepted_loop(users: &[&str], score: Decimal) -> ScoredLoop {
        let candidate = CandidateLoop::new(users.iter().map(|u| UserId::new(*u)).collect());
        let fairness = (users.len() == 3).then(|| dec!(0.8));
        ScoredLoop {
            valued: ValuedLoop {
                candidate,
                legs: Vec::new(),
                metrics: LoopMetrics {
                    total_item_value: dec!(10_000),
                    total_cash_flow: dec!(1_000),
                    value_efficiency: dec!(0.9),
                    relative_fairness: fairness,
                },
                violations: Vec::new(),
            },
            acceptance_score: Some(score),
            verdict: Verdict::Accepted,
        }
    }

    fn executed_users(result: &SelectionResult) -> Vec<Vec<&str>> {
        result
            .executed
            .iter()
            .map(|l| {
                l.valued
                    .candidate
                    .participants()
                    .iter()
                    .map(UserId::as_str)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_disjoint_loops_all_execute() {
        let result = LoopSelector::select(vec![
            accepted_loop(&["A", "B"], dec!(0.9)),
            accepted_loop(&["C", "D"], dec!(0.7)),
        ]);
        assert_eq!(result.executed.len(), 2);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_overlap_skips_the_lower_score() {
        let result = LoopSelector::select(vec![
            accepted_loop(&["A", "B"], dec!(0.7)),
            accepted_loop(&["A", "C"], dec!(0.9)),
        ]);

        assert_eq!(executed_users(&result), vec![vec!["A", "C"]]);
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn test_no_user_committed_twice() {
        let result = LoopSelector::select(vec![
            accepted_loop(&["A", "B"], dec!(0.9)),
            accepted_loop(&["B", "C"], dec!(0.85)),
            accepted_loop(&["C", "D"], dec!(0.8)),
            accepted_loop(&["A", "D"], dec!(0.75)),
        ]);

        let mut seen = BTreeSet::new();
        for loop_ in &result.executed {
            for user in loop_.valued.candidate.participants() {
                assert!(seen.insert(user.clone()), "{user} committed twice");
            }
        }
        // Highest first: [A,B] executes; [B,C] skips; [C,D] executes;
        // [A,D] skips.
        assert_eq!(result.executed.len(), 2);
        assert_eq!(result.skipped.len(), 2);
    }

    #[test]
    fn test_tie_breaks_prefer_smaller_then_lowest_id() {
        let result = LoopSelector::select(vec![
            accepted_loop(&["D", "E", "F"], dec!(0.8)),
            accepted_loop(&["B", "C"], dec!(0.8)),
            accepted_loop(&["A", "B"], dec!(0.8)),
        ]);

        // All tied on score: 2-way loops beat the 3-way; among the
        // 2-ways, the one whose smallest participant sorts first wins.
        assert_eq!(
            executed_users(&result),
            vec![vec!["A", "B"], vec!["D", "E", "F"]]
        );
    }

    #[test]
    fn test_removing_top_loop_cannot_raise_score_against_one_rival() {
        let loops = vec![
            accepted_loop(&["A", "B"], dec!(0.95)),
            accepted_loop(&["A", "C"], dec!(0.6)),
        ];

        let full = LoopSelector::select(loops.clone());
        assert_eq!(full.total_score(), dec!(0.95));

        // The rival that was blocked now executes, at a lower score.
        let without_top = LoopSelector::select(loops[1..].to_vec());
        assert_eq!(without_top.executed.len(), 1);
        assert!(without_top.total_score() <= full.total_score());
    }

    #[test]
    fn test_greedy_is_an_approximation_by_design() {
        // The top swap blocks two cheaper swaps that together outscore
        // it. Greedy still takes the top one: predictable throughput is
        // preferred over exact optimality.
        let result = LoopSelector::select(vec![
            accepted_loop(&["A", "B"], dec!(0.95)),
            accepted_loop(&["A", "C"], dec!(0.6)),
            accepted_loop(&["B", "D"], dec!(0.6)),
        ]);

        assert_eq!(executed_users(&result), vec![vec!["A", "B"]]);
        assert_eq!(result.total_score(), dec!(0.95));
        assert_eq!(result.skipped.len(), 2);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let loops = vec![
            accepted_loop(&["A", "B"], dec!(0.8)),
            accepted_loop(&["B", "C"], dec!(0.8)),
            accepted_loop(&["C", "A"], dec!(0.8)),
        ];
        let first = LoopSelector::select(loops.clone());
        let second = LoopSelector::select(loops);
        assert_eq!(executed_users(&first), executed_users(&second));
    }

    #[test]
    fn test_empty_input() {
        let result = LoopSelector::select(Vec::new());
        assert!(result.executed.is_empty());
        assert!(result.skipped.is_empty());
    }
}
