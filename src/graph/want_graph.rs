use crate::core::item::ItemId;
use crate::core::user::{UserId, UserPool};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A directed want edge: `giver` currently holds `item`, and `item` is the
/// `receiver`'s highest-ranked want that is still obtainable.
///
/// Edges are derived from the pool each round and never persisted; holdings
/// and wishlists change as loops execute, so yesterday's graph is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WantEdge {
    pub giver: UserId,
    pub receiver: UserId,
    pub item: ItemId,
}

/// The want graph for one round.
///
/// Nodes are matchable users (active, holding an item); an edge A → B means
/// A holds an item B is willing to receive in exchange for B's own item.
/// Mutual interest is not required for an edge — reciprocity shows up as a
/// cycle. The adjacency is an explicit map keyed by user id rather than
/// references embedded in `User`, so the graph stays a rebuildable view.
///
/// Only a user's *top unmet want* generates edges, never the lower ranks —
/// but one edge per current holder of that model, so a sought-after model
/// fans in from every holder and users can sit on several overlapping
/// candidate loops at once. Resolving that contention is the selector's
/// job, not the graph's.
///
/// # Examples
///
/// ```
/// use chariot_engine::core::item::ItemId;
/// use chariot_engine::core::user::{User, UserId, UserPool};
/// use chariot_engine::graph::want_graph::WantGraph;
/// use rust_decimal_macros::dec;
///
/// let mut pool: UserPool = [
///     User::new(UserId::new("A"), ItemId::new("SPEEDMASTER"), dec!(0))
///         .with_wishlist(vec![ItemId::new("SUBMARINER")]),
///     User::new(UserId::new("B"), ItemId::new("SUBMARINER"), dec!(0))
///         .with_wishlist(vec![ItemId::new("SPEEDMASTER")]),
/// ]
/// .into_iter()
/// .collect();
/// pool.activate_queued();
///
/// let graph = WantGraph::build(&pool);
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WantGraph {
    /// Outgoing edges keyed by giver. Every matchable user has an entry,
    /// possibly empty.
    adjacency: BTreeMap<UserId, Vec<WantEdge>>,
    edge_count: usize,
}

impl WantGraph {
    /// Build the round's want graph from the current pool.
    ///
    /// For each matchable user R, find R's highest-ranked *unmet* want:
    /// the first wishlist model R does not hold that at least one other
    /// matchable user currently holds. Every holder of that model emits
    /// one edge holder → R; lower-ranked wants emit nothing. Users with no
    /// held item or an empty/fully-stale wishlist contribute no edges; an
    /// empty graph is a valid result meaning zero candidates this round.
    pub fn build(pool: &UserPool) -> Self {
        // Model → holders, for the matchable population only.
        let mut holders: BTreeMap<&ItemId, Vec<&UserId>> = BTreeMap::new();
        for user in pool.matchable() {
            if let Some(item) = user.held_item() {
                holders.entry(item).or_default().push(user.id());
            }
        }

        let mut adjacency: BTreeMap<UserId, Vec<WantEdge>> = BTreeMap::new();
        for user in pool.matchable() {
            adjacency.entry(user.id().clone()).or_default();
        }

        let mut edge_count = 0;
        for receiver in pool.matchable() {
            let top_want = receiver.wishlist().iter().find(|model| {
                if receiver.holds(model) {
                    return false;
                }
                holders
                    .get(model)
                    .is_some_and(|hs| hs.iter().any(|&h| h != receiver.id()))
            });
            let Some(model) = top_want else { continue };

            for &holder in &holders[model] {
                if holder == receiver.id() {
                    continue;
                }
                adjacency
                    .entry(holder.clone())
                    .or_default()
                    .push(WantEdge {
                        giver: holder.clone(),
                        receiver: receiver.id().clone(),
                        item: model.clone(),
                    });
                edge_count += 1;
            }
        }

        // Receiver order within a giver's list is deterministic already
        // (pool iteration is id-ordered), but make it explicit.
        for edges in adjacency.values_mut() {
            edges.sort_by(|a, b| a.receiver.cmp(&b.receiver));
        }

        Self {
            adjacency,
            edge_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// All nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &UserId> {
        self.adjacency.keys()
    }

    /// Outgoing edges from a giver.
    pub fn successors(&self, giver: &UserId) -> &[WantEdge] {
        self.adjacency.get(giver).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the graph has an edge giver → receiver.
    pub fn has_edge(&self, giver: &UserId, receiver: &UserId) -> bool {
        self.successors(giver).iter().any(|e| &e.receiver == receiver)
    }

    /// All edges, giver-major order.
    pub fn edges(&self) -> impl Iterator<Item = &WantEdge> {
        self.adjacency.values().flatten()
    }
}
