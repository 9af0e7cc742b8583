use chariot_engine::core::config::{SimulationConfig, TradePolicy};
use chariot_engine::core::item::{Catalog, ItemId};
use chariot_engine::core::user::{User, UserId, UserPool};
use chariot_engine::graph::cycles::CandidateLoop;
use chariot_engine::optimization::scoring::{LoopScorer, ScoredLoop, Verdict};
use chariot_engine::optimization::selection::LoopSelector;
use chariot_engine::optimization::valuation::{LoopMetrics, LoopValuator, ValuedLoop};
use chariot_engine::simulation::market::{GrowthMarket, MarketConfig};
use chariot_engine::simulation::runner::Simulation;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Generate a watch value in the reference catalog range.
fn arb_value() -> impl Strategy<Value = Decimal> {
    (500u64..25_000u64).prop_map(Decimal::from)
}

/// Generate item values for a 2- or 3-way loop.
fn arb_loop_values() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(arb_value(), 2..=3usize)
}

/// Generate a metric ratio in [0, 1] with four decimal places.
fn arb_ratio() -> impl Strategy<Value = Decimal> {
    (0u32..=10_000u32).prop_map(|n| Decimal::new(n as i64, 4))
}

/// Build a single-loop market from item values and valuate it.
fn valuate(values: &[Decimal], policy: &TradePolicy) -> ValuedLoop {
    let mut catalog = Catalog::new();
    let mut pool = UserPool::new();
    let mut participants = Vec::new();
    for (i, value) in values.iter().enumerate() {
        let user = UserId::new(format!("U-{i}"));
        let item = ItemId::new(format!("W-{i}"));
        catalog.insert(item.clone(), *value).unwrap();
        pool.admit(User::new(user.clone(), item, Decimal::ZERO));
        participants.push(user);
    }
    pool.activate_queued();
    let candidate = CandidateLoop::new(participants);
    LoopValuator::new(&catalog, policy)
        .valuate(&pool, &candidate)
        .unwrap()
}

fn accepted_loop(users: &[&str], score: Decimal) -> ScoredLoop {
    ScoredLoop {
        valued: ValuedLoop {
            candidate: CandidateLoop::new(users.iter().map(|u| UserId::new(*u)).collect()),
            legs: Vec::new(),
            metrics: LoopMetrics {
                total_item_value: Decimal::from(10_000),
                total_cash_flow: Decimal::from(1_000),
                value_efficiency: Decimal::new(9, 1),
                relative_fairness: None,
            },
            violations: Vec::new(),
        },
        acceptance_score: Some(score),
        verdict: Verdict::Accepted,
    }
}

proptest! {
    // ===================================================================
    // INVARIANT 1: Value efficiency always lands in [0, 1].
    //
    // Whatever the item values, efficiency is a fraction of total value
    // moved; guarded arithmetic keeps even degenerate loops defined.
    // ===================================================================
    #[test]
    fn efficiency_always_in_unit_range(values in arb_loop_values()) {
        let policy = TradePolicy::default();
        let valued = valuate(&values, &policy);
        let eff = valued.metrics.value_efficiency;
        prop_assert!(
            eff >= Decimal::ZERO && eff <= Decimal::ONE,
            "efficiency {} out of range",
            eff
        );
    }

    // ===================================================================
    // INVARIANT 2: Relative fairness exists exactly for 3-way loops and
    // lands in [0, 1].
    // ===================================================================
    #[test]
    fn fairness_defined_only_for_three_way(values in arb_loop_values()) {
        let policy = TradePolicy::default();
        let valued = valuate(&values, &policy);
        match valued.metrics.relative_fairness {
            Some(fairness) => {
                prop_assert_eq!(values.len(), 3);
                prop_assert!(fairness >= Decimal::ZERO && fairness <= Decimal::ONE);
            }
            None => prop_assert_eq!(values.len(), 2),
        }
    }

    // ===================================================================
    // INVARIANT 3: Cash legs conserve money — deltas sum to zero.
    // ===================================================================
    #[test]
    fn cash_legs_conserve(values in arb_loop_values()) {
        let policy = TradePolicy::default();
        let valued = valuate(&values, &policy);
        let net: Decimal = valued.legs.iter().map(|l| l.cash_delta).sum();
        prop_assert_eq!(net, Decimal::ZERO);
    }

    // ===================================================================
    // INVARIANT 4: Scoring is idempotent. Same metrics, same score —
    // a pure function with no hidden state.
    // ===================================================================
    #[test]
    fn rescoring_is_identical(efficiency in arb_ratio(), fairness in proptest::option::of(arb_ratio())) {
        let policy = TradePolicy::default();
        let scorer = LoopScorer::new(&policy);
        let metrics = LoopMetrics {
            total_item_value: Decimal::from(10_000),
            total_cash_flow: Decimal::from(1_000),
            value_efficiency: efficiency,
            relative_fairness: fairness,
        };
        prop_assert_eq!(
            scorer.acceptance_score(&metrics),
            scorer.acceptance_score(&metrics)
        );
    }

    // ===================================================================
    // INVARIANT 5: A 2-way loop never earns a fairness modifier. Its
    // score equals the score of the same metrics with fairness pinned
    // to the zero band.
    // ===================================================================
    #[test]
    fn two_way_fairness_contribution_is_zero(efficiency in arb_ratio()) {
        let policy = TradePolicy::default();
        let scorer = LoopScorer::new(&policy);
        let two_way = LoopMetrics {
            total_item_value: Decimal::from(10_000),
            total_cash_flow: Decimal::from(1_000),
            value_efficiency: efficiency,
            relative_fairness: None,
        };
        let zero_band = LoopMetrics {
            relative_fairness: Some(Decimal::ZERO),
            ..two_way
        };
        prop_assert_eq!(
            scorer.acceptance_score(&two_way),
            scorer.acceptance_score(&zero_band)
        );
    }

    // ===================================================================
    // INVARIANT 6: Raising the cash top-up ceiling never shrinks the
    // valid set. Relaxing a constraint cannot invalidate a loop that
    // was valid under the tighter one.
    // ===================================================================
    #[test]
    fn higher_ceiling_never_invalidates(
        loops in prop::collection::vec(arb_loop_values(), 1..10),
        ceiling in 0u64..10_000u64,
        slack in 0u64..10_000u64,
    ) {
        let tight = TradePolicy {
            max_cash_top_up: Decimal::from(ceiling),
            ..TradePolicy::default()
        };
        let loose = TradePolicy {
            max_cash_top_up: Decimal::from(ceiling + slack),
            ..TradePolicy::default()
        };

        let valid_tight = loops.iter().filter(|v| valuate(v, &tight).is_valid()).count();
        let valid_loose = loops.iter().filter(|v| valuate(v, &loose).is_valid()).count();
        prop_assert!(
            valid_loose >= valid_tight,
            "loose {} < tight {}",
            valid_loose,
            valid_tight
        );
    }

    // ===================================================================
    // INVARIANT 7: The selector never commits a user to two loops, and
    // executed plus skipped partition the accepted input.
    // ===================================================================
    #[test]
    fn selection_is_conflict_free(
        cases in prop::collection::vec(
            (prop::sample::subsequence(vec!["A", "B", "C", "D", "E", "F", "G", "H"], 2..=3), 0u32..100),
            0..12,
        )
    ) {
        let accepted: Vec<ScoredLoop> = cases
            .iter()
            .map(|(users, score)| accepted_loop(users, Decimal::new(*score as i64, 2)))
            .collect();
        let input_len = accepted.len();

        let result = LoopSelector::select(accepted);

        let mut committed = BTreeSet::new();
        for loop_ in &result.executed {
            for user in loop_.valued.candidate.participants() {
                prop_assert!(committed.insert(user.clone()), "{} committed twice", user);
            }
        }
        prop_assert_eq!(result.executed.len() + result.skipped.len(), input_len);
    }

    // ===================================================================
    // INVARIANT 8: Selection is deterministic — same input, same output.
    // ===================================================================
    #[test]
    fn selection_is_reproducible(
        cases in prop::collection::vec(
            (prop::sample::subsequence(vec!["A", "B", "C", "D", "E", "F"], 2..=3), 0u32..100),
            0..10,
        )
    ) {
        let build = || -> Vec<ScoredLoop> {
            cases
                .iter()
                .map(|(users, score)| accepted_loop(users, Decimal::new(*score as i64, 2)))
                .collect()
        };

        let first = LoopSelector::select(build());
        let second = LoopSelector::select(build());

        let ids = |result: &chariot_engine::optimization::selection::SelectionResult| -> Vec<Vec<UserId>> {
            result
                .executed
                .iter()
                .map(|l| l.valued.candidate.participants().to_vec())
                .collect()
        };
        prop_assert_eq!(ids(&first), ids(&second));
    }

    // ===================================================================
    // INVARIANT 9: A one-round cap produces exactly one round record,
    // however many users stay unmatched.
    // ===================================================================
    #[test]
    fn single_round_cap_is_exact(seed in any::<u64>(), users in 1usize..40) {
        let market = GrowthMarket::new(MarketConfig {
            initial_users: users,
            seed: Some(seed),
            ..MarketConfig::default()
        });
        let catalog = market.catalog().clone();
        let config = SimulationConfig {
            max_rounds: 1,
            ..SimulationConfig::default()
        };

        let report = Simulation::new(config, catalog, market)
            .unwrap()
            .run()
            .unwrap();
        prop_assert_eq!(report.rounds.len(), 1);
    }

    // ===================================================================
    // INVARIANT 10: Executed loops in any simulated round have pairwise
    // disjoint participant sets.
    // ===================================================================
    #[test]
    fn executed_rounds_are_disjoint(seed in any::<u64>()) {
        let market = GrowthMarket::new(MarketConfig {
            initial_users: 30,
            seed: Some(seed),
            ..MarketConfig::default()
        });
        let catalog = market.catalog().clone();
        let config = SimulationConfig {
            max_rounds: 4,
            ..SimulationConfig::default()
        };

        let report = Simulation::new(config, catalog, market)
            .unwrap()
            .run()
            .unwrap();
        for round in &report.rounds {
            let mut seen = BTreeSet::new();
            for loop_ in round.executed_loops() {
                for user in &loop_.participants {
                    prop_assert!(
                        seen.insert(user.clone()),
                        "round {}: {} in two executed loops",
                        round.index,
                        user
                    );
                }
            }
        }
    }
}
