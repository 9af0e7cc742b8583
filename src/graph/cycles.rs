use crate::core::user::UserId;
use crate::graph::components::weakly_connected_components;
use crate::graph::want_graph::WantGraph;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Shape of a trade loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopKind {
    /// Direct swap between two users.
    #[serde(rename = "2-way")]
    TwoWay,
    /// Three-way rotation.
    #[serde(rename = "3-way")]
    ThreeWay,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopKind::TwoWay => write!(f, "2-way"),
            LoopKind::ThreeWay => write!(f, "3-way"),
        }
    }
}

/// A candidate trade loop: a simple directed cycle of 2 or 3 users.
///
/// Participants are stored in cycle order — participant `i` gives their
/// item to participant `i + 1` and receives from participant `i - 1`
/// (indices mod length). The order is canonicalized to start at the
/// minimum user id, so rotations of the same cycle compare equal.
///
/// Candidates are ephemeral: produced, valued, and consumed within a
/// single round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateLoop {
    participants: Vec<UserId>,
}

impl CandidateLoop {
    /// Build a candidate from participants in cycle order, canonicalizing
    /// to the minimum-id rotation.
    pub fn new(participants: Vec<UserId>) -> Self {
        Self {
            participants: canonical_rotation(participants),
        }
    }

    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn kind(&self) -> LoopKind {
        match self.participants.len() {
            2 => LoopKind::TwoWay,
            _ => LoopKind::ThreeWay,
        }
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.participants.iter().any(|p| p == user)
    }

    /// The participant that position `i` receives an item from.
    pub fn predecessor(&self, i: usize) -> &UserId {
        let n = self.participants.len();
        &self.participants[(i + n - 1) % n]
    }

    /// Smallest participant id; used for selection tie-breaks.
    pub fn min_participant(&self) -> &UserId {
        // Canonical rotation puts the minimum first.
        &self.participants[0]
    }
}

/// Rotate a cycle so its smallest id comes first.
fn canonical_rotation(participants: Vec<UserId>) -> Vec<UserId> {
    if participants.is_empty() {
        return participants;
    }
    let pivot = participants
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut rotated = Vec::with_capacity(participants.len());
    rotated.extend_from_slice(&participants[pivot..]);
    rotated.extend_from_slice(&participants[..pivot]);
    rotated
}

/// Enumerate all unique simple cycles with length in `[min_len, max_len]`.
///
/// Depth-first search bounded to `max_len` from every vertex, pruning
/// vertices already on the path and only descending into vertices ordered
/// after the start — each cycle is therefore discovered exactly once, from
/// its minimum-id participant. Found cycles are canonicalized and passed
/// through a seen-set anyway, so the output is duplicate-free by
/// construction *and* by check.
///
/// Cycles cannot cross weakly connected components, so components are
/// enumerated in parallel and the merged result is sorted for a
/// deterministic order. The depth bound keeps enumeration polynomial;
/// arbitrary-length loops are out of scope.
pub fn find_trade_loops(graph: &WantGraph, min_len: usize, max_len: usize) -> Vec<CandidateLoop> {
    if graph.is_empty() {
        return Vec::new();
    }

    let components = weakly_connected_components(graph);
    let mut loops: Vec<CandidateLoop> = components
        .par_iter()
        .filter(|component| component.is_tradeable())
        .flat_map_iter(|component| enumerate_component(graph, &component.users, min_len, max_len))
        .collect();

    loops.sort();
    loops.dedup();
    loops
}

fn enumerate_component(
    graph: &WantGraph,
    members: &[UserId],
    min_len: usize,
    max_len: usize,
) -> Vec<CandidateLoop> {
    let mut found = Vec::new();
    let mut seen: HashSet<Vec<UserId>> = HashSet::new();

    for start in members {
        let mut path: Vec<UserId> = Vec::with_capacity(max_len);
        let mut on_path: HashSet<UserId> = HashSet::with_capacity(max_len);
        dfs_cycles(
            graph, start, start, min_len, max_len, &mut path, &mut on_path, &mut seen, &mut found,
        );
    }

    found
}

#[allow(clippy::too_many_arguments)]
fn dfs_cycles(
    graph: &WantGraph,
    current: &UserId,
    start: &UserId,
    min_len: usize,
    max_len: usize,
    path: &mut Vec<UserId>,
    on_path: &mut HashSet<UserId>,
    seen: &mut HashSet<Vec<UserId>>,
    found: &mut Vec<CandidateLoop>,
) {
    path.push(current.clone());
    on_path.insert(current.clone());

    for edge in graph.successors(current) {
        let next = &edge.receiver;
        if next == start {
            if path.len() >= min_len {
                let candidate = CandidateLoop::new(path.clone());
                if seen.insert(candidate.participants().to_vec()) {
                    found.push(candidate);
                }
            }
        } else if path.len() < max_len && next > start && !on_path.contains(next) {
            dfs_cycles(
                graph, next, start, min_len, max_len, path, on_path, seen, found,
            );
        }
    }

    path.pop();
    on_path.remove(current);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::ItemId;
    use crate::core::user::{User, UserPool};
    use rust_decimal_macros::dec;

    fn user(id: &str, item: &str, wants: &[&str]) -> User {
        User::new(UserId::new(id), ItemId::new(item), dec!(1000))
            .with_wishlist(wants.iter().map(|w| ItemId::new(*w)).collect())
    }

    fn graph_of(users: Vec<User>) -> WantGraph {
        let mut pool: UserPool = users.into_iter().collect();
        pool.activate_queued();
        WantGraph::build(&pool)
    }

    fn ids(loop_: &CandidateLoop) -> Vec<&str> {
        loop_.participants().iter().map(UserId::as_str).collect()
    }

    #[test]
    fn test_direct_swap_found_once() {
        let graph = graph_of(vec![
            user("A", "W-1", &["W-2"]),
            user("B", "W-2", &["W-1"]),
        ]);

        let loops = find_trade_loops(&graph, 2, 3);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].kind(), LoopKind::TwoWay);
        assert_eq!(ids(&loops[0]), vec!["A", "B"]);
    }

    #[test]
    fn test_three_way_rotation_found_once() {
        // A wants B's model, B wants C's, C wants A's. With edges pointing
        // giver → receiver that is the single cycle A→C→B→A.
        let graph = graph_of(vec![
            user("A", "W-1", &["W-2"]),
            user("B", "W-2", &["W-3"]),
            user("C", "W-3", &["W-1"]),
        ]);

        let loops = find_trade_loops(&graph, 2, 3);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].kind(), LoopKind::ThreeWay);
        // Canonical form starts at the minimum id.
        assert_eq!(loops[0].min_participant(), &UserId::new("A"));
    }

    #[test]
    fn test_rotations_compare_equal() {
        let rotated = CandidateLoop::new(vec![
            UserId::new("C"),
            UserId::new("A"),
            UserId::new("B"),
        ]);
        let straight = CandidateLoop::new(vec![
            UserId::new("A"),
            UserId::new("B"),
            UserId::new("C"),
        ]);
        assert_eq!(rotated, straight);
    }

    #[test]
    fn test_four_cycles_are_out_of_scope() {
        // A square: each user wants only the next one's model.
        let graph = graph_of(vec![
            user("A", "W-1", &["W-2"]),
            user("B", "W-2", &["W-3"]),
            user("C", "W-3", &["W-4"]),
            user("D", "W-4", &["W-1"]),
        ]);

        let loops = find_trade_loops(&graph, 2, 3);
        assert!(loops.is_empty());
    }

    #[test]
    fn test_pairs_only_bound() {
        // Both a 2-cycle and a 3-cycle exist; a 2..=2 bound keeps only
        // the swap.
        let graph = graph_of(vec![
            user("A", "W-1", &["W-2"]),
            user("B", "W-2", &["W-1"]),
            user("C", "W-3", &["W-4"]),
            user("D", "W-4", &["W-5"]),
            user("E", "W-5", &["W-3"]),
        ]);

        let all = find_trade_loops(&graph, 2, 3);
        assert_eq!(all.len(), 2);

        let pairs_only = find_trade_loops(&graph, 2, 2);
        assert_eq!(pairs_only.len(), 1);
        assert_eq!(pairs_only[0].kind(), LoopKind::TwoWay);
    }

    #[test]
    fn test_overlapping_cycles_all_enumerated() {
        // B and C hold the same model, which is A's top want; both want
        // A's model back. Two swaps share A — enumeration reports both;
        // disjointness is the selector's concern, not ours.
        let graph = graph_of(vec![
            user("A", "W-1", &["W-2"]),
            user("B", "W-2", &["W-1"]),
            user("C", "W-2", &["W-1"]),
        ]);

        let loops = find_trade_loops(&graph, 2, 3);
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.contains(&UserId::new("A"))));
    }

    #[test]
    fn test_empty_graph_yields_no_candidates() {
        let graph = graph_of(vec![user("A", "W-1", &[])]);
        assert!(find_trade_loops(&graph, 2, 3).is_empty());
    }

    #[test]
    fn test_predecessor_order() {
        let loop_ = CandidateLoop::new(vec![
            UserId::new("A"),
            UserId::new("B"),
            UserId::new("C"),
        ]);
        // A receives from C, B from A, C from B.
        assert_eq!(loop_.predecessor(0), &UserId::new("C"));
        assert_eq!(loop_.predecessor(1), &UserId::new("A"));
        assert_eq!(loop_.predecessor(2), &UserId::new("B"));
    }
}
