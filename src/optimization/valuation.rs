use crate::core::config::TradePolicy;
use crate::core::item::{Catalog, CatalogError, ItemId};
use crate::core::user::{UserId, UserPool};
use crate::graph::cycles::CandidateLoop;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort valuation of a candidate.
///
/// These indicate inconsistent engine state (a candidate referencing users
/// or items that do not exist), not a policy decision — policy outcomes are
/// recorded as [`LoopViolation`]s on the valued loop instead.
#[derive(Debug, Error)]
pub enum ValuationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("candidate references unknown user {0}")]
    UnknownUser(UserId),
    #[error("candidate participant {0} holds no item")]
    MissingHolding(UserId),
}

/// A policy bound broken by a candidate loop.
///
/// Invalid loops are excluded from scoring but retained in the round
/// record with their metrics, so near-miss trades stay auditable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LoopViolation {
    #[error("{user} would pay {required} cash, over the {ceiling} top-up ceiling")]
    CashTopUpExceeded {
        user: UserId,
        required: Decimal,
        ceiling: Decimal,
    },
    #[error("{user} would receive an item worth {offered}, below the {floor} floor")]
    BelowValueFloor {
        user: UserId,
        offered: Decimal,
        floor: Decimal,
    },
}

/// One participant's side of a loop settlement.
///
/// `cash_delta` is positive when the participant pays cash (the item they
/// receive is worth more than the one they give) and negative when they
/// receive cash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashLeg {
    pub user: UserId,
    pub gives_item: ItemId,
    pub receives_item: ItemId,
    pub cash_delta: Decimal,
}

/// Value metrics for a candidate loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopMetrics {
    /// Sum of all participants' item values.
    pub total_item_value: Decimal,
    /// Sum of absolute cash amounts moved across the loop's edges.
    pub total_cash_flow: Decimal,
    /// item / (item + cash), in [0, 1]; 0 when the loop moves nothing.
    pub value_efficiency: Decimal,
    /// 1 − (max − min) / max over item values, in [0, 1]. Only defined for
    /// three-way loops; a two-party swap is cash-balanced by construction
    /// and has no fairness dimension.
    pub relative_fairness: Option<Decimal>,
}

/// A candidate loop with its settlement legs, metrics, and any policy
/// violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuedLoop {
    pub candidate: CandidateLoop,
    pub legs: Vec<CashLeg>,
    pub metrics: LoopMetrics,
    pub violations: Vec<LoopViolation>,
}

impl ValuedLoop {
    /// Valid loops move on to scoring; invalid ones only to the record.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Computes settlement legs and metrics for candidate loops.
///
/// Valuation is a pure function of the candidate, the pool holdings, and
/// the catalog — candidates can be valued concurrently without
/// synchronization.
pub struct LoopValuator<'a> {
    catalog: &'a Catalog,
    policy: &'a TradePolicy,
}

impl<'a> LoopValuator<'a> {
    pub fn new(catalog: &'a Catalog, policy: &'a TradePolicy) -> Self {
        Self { catalog, policy }
    }

    /// Value one candidate.
    ///
    /// Each participant receives the item held by their predecessor in the
    /// cycle and settles the value difference in cash. Guarded arithmetic
    /// keeps degenerate inputs defined: a loop moving zero total value has
    /// efficiency 0, and a zero maximum item value yields fairness 1.
    pub fn valuate(
        &self,
        pool: &UserPool,
        candidate: &CandidateLoop,
    ) -> Result<ValuedLoop, ValuationError> {
        let participants = candidate.participants();
        let n = participants.len();

        let mut held: Vec<ItemId> = Vec::with_capacity(n);
        let mut values: Vec<Decimal> = Vec::with_capacity(n);
        for id in participants {
            let user = pool
                .get(id)
                .ok_or_else(|| ValuationError::UnknownUser(id.clone()))?;
            let item = user
                .held_item()
                .ok_or_else(|| ValuationError::MissingHolding(id.clone()))?;
            values.push(self.catalog.value(item)?);
            held.push(item.clone());
        }

        let mut legs = Vec::with_capacity(n);
        let mut total_cash_flow = Decimal::ZERO;
        let mut violations = Vec::new();

        for i in 0..n {
            let prev = (i + n - 1) % n;
            let received_value = values[prev];
            let cash_delta = received_value - values[i];
            total_cash_flow += cash_delta.abs();

            if cash_delta > self.policy.max_cash_top_up {
                violations.push(LoopViolation::CashTopUpExceeded {
                    user: participants[i].clone(),
                    required: cash_delta,
                    ceiling: self.policy.max_cash_top_up,
                });
            }
            if received_value < self.policy.min_acceptable_value {
                violations.push(LoopViolation::BelowValueFloor {
                    user: participants[i].clone(),
                    offered: received_value,
                    floor: self.policy.min_acceptable_value,
                });
            }

            legs.push(CashLeg {
                user: participants[i].clone(),
                gives_item: held[i].clone(),
                receives_item: held[prev].clone(),
                cash_delta,
            });
        }

        let total_item_value: Decimal = values.iter().copied().sum();
        let moved = total_item_value + total_cash_flow;
        let value_efficiency = if moved.is_zero() {
            Decimal::ZERO
        } else {
            total_item_value / moved
        };

        let relative_fairness = (n == 3).then(|| {
            let max = values.iter().copied().max().unwrap_or_default();
            let min = values.iter().copied().min().unwrap_or_default();
            if max.is_zero() {
                Decimal::ONE
            } else {
                Decimal::ONE - (max - min) / max
            }
        });

        Ok(ValuedLoop {
            candidate: candidate.clone(),
            legs,
            metrics: LoopMetrics {
                total_item_value,
                total_cash_flow,
                value_efficiency,
                relative_fairness,
            },
            violations,
        })
    }
}
