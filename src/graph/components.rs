use crate::core::user::UserId;
use crate::graph::want_graph::WantGraph;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A weakly connected component of the want graph.
///
/// Cycles never cross component boundaries, so each component can be
/// enumerated independently — this is the unit of parallelism for the
/// cycle search.
#[derive(Debug, Clone)]
pub struct Component {
    pub users: Vec<UserId>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// A component needs at least two users to contain a trade loop.
    pub fn is_tradeable(&self) -> bool {
        self.users.len() > 1
    }
}

/// Partition the graph into weakly connected components.
///
/// BFS over the undirected view of the edges. Components come back with
/// their users sorted and the component list ordered by smallest member,
/// so downstream parallel fan-out still produces deterministic output.
pub fn weakly_connected_components(graph: &WantGraph) -> Vec<Component> {
    let mut undirected: BTreeMap<&UserId, Vec<&UserId>> = BTreeMap::new();
    for node in graph.nodes() {
        undirected.entry(node).or_default();
    }
    for edge in graph.edges() {
        undirected.entry(&edge.giver).or_default().push(&edge.receiver);
        undirected.entry(&edge.receiver).or_default().push(&edge.giver);
    }

    let mut seen: BTreeSet<&UserId> = BTreeSet::new();
    let mut components = Vec::new();

    for start in undirected.keys().copied() {
        if seen.contains(start) {
            continue;
        }
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);

        while let Some(node) = queue.pop_front() {
            members.push(node.clone());
            if let Some(neighbors) = undirected.get(node) {
                for &next in neighbors {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        members.sort();
        components.push(Component { users: members });
    }

    components
}
