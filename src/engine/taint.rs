use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::Engine;
use super::graph::{Edge, Node};

/// Everything reachable from `seeds` by following edges from their `from`
/// identifier to their `to` identifier, seeds included. Revisits are cut by
/// the visited set, so cyclic input terminates.
pub fn taint_closure<'a, I>(edges: &[Edge], seeds: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        if let (Some(from), Some(to)) = (edge.from.as_deref(), edge.to.as_deref()) {
            successors.entry(from).or_default().push(to);
        }
    }

    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    let mut revisits = 0usize;
    for seed in seeds {
        if visited.insert(seed.to_owned()) {
            stack.push(seed.to_owned());
        }

        while let Some(current) = stack.pop() {
            let Some(next) = successors.get(current.as_str()) else {
                continue;
            };
            for &to in next {
                if visited.insert(to.to_owned()) {
                    stack.push(to.to_owned());
                } else {
                    revisits += 1;
                }
            }
        }
    }

    if revisits > 0 {
        debug!(revisits, "taint walk reached already tainted identifiers");
    }

    visited
}

/// Sets the taint flag of every node from scratch.
pub fn mark_tainted(nodes: &mut [Node], tainted: &HashSet<String>) -> usize {
    let mut count = 0;
    for node in nodes {
        node.taint = tainted.contains(&node.id);
        count += usize::from(node.taint);
    }
    count
}

/// The load-time taint split: local taint markers to spread from at once, and
/// other start points whose markings must be asked from the server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaintPlan {
    pub local_seeds: Vec<String>,
    pub remote_checks: Vec<String>,
}

pub fn plan_taint(nodes: &[Node], start_points: &[bool]) -> TaintPlan {
    let mut plan = TaintPlan::default();
    for (node, &is_start) in nodes.iter().zip(start_points) {
        if !is_start {
            continue;
        }
        if node.is_taint_marker() {
            plan.local_seeds.push(node.id.clone());
        } else {
            plan.remote_checks.push(node.id.clone());
        }
    }
    plan
}

impl Engine {
    /// Replaces the current taint with the closure of `seed`.
    pub fn spread_taint(&mut self, seed: &str) -> usize {
        self.taint_seeds = vec![seed.to_owned()];
        self.recompute_taint()
    }

    /// Load-time pass: spreads from local taint markers among the start
    /// points and returns the start points the server has to be asked about.
    pub(super) fn check_and_spread_taint(&mut self) -> Vec<String> {
        let start_points = self.store.start_points();
        let plan = plan_taint(self.store.nodes(), &start_points);
        self.taint_seeds = plan.local_seeds;
        self.recompute_taint();
        plan.remote_checks
    }

    pub(super) fn add_taint_seed(&mut self, seed: &str) -> usize {
        if !self.taint_seeds.iter().any(|existing| existing == seed) {
            self.taint_seeds.push(seed.to_owned());
        }
        self.recompute_taint()
    }

    pub(super) fn recompute_taint(&mut self) -> usize {
        let (nodes, edges) = self.store.split_mut();
        let closure = taint_closure(edges, self.taint_seeds.iter().map(String::as_str));
        let count = mark_tainted(nodes, &closure);
        info!(seeds = self.taint_seeds.len(), tainted = count, "taint recomputed");
        count
    }

    #[cfg(test)]
    pub fn taint_seeds(&self) -> &[String] {
        &self.taint_seeds
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::engine::graph::{EdgeKind, NodeKind};

    fn edge(from: &str, to: &str) -> Edge {
        Edge {
            source: 0,
            target: 0,
            left: false,
            right: false,
            kind: EdgeKind::Provenance,
            from: Some(from.to_owned()),
            to: Some(to.to_owned()),
            label: String::new(),
        }
    }

    fn ids(set: &HashSet<String>) -> Vec<&str> {
        let mut ids = set.iter().map(String::as_str).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn chain_closure_depends_on_seed() {
        let edges = vec![edge("1", "2"), edge("2", "3")];
        assert_eq!(ids(&taint_closure(&edges, ["1"])), vec!["1", "2", "3"]);
        assert_eq!(ids(&taint_closure(&edges, ["2"])), vec!["2", "3"]);
    }

    #[test]
    fn cycles_terminate() {
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        assert_eq!(ids(&taint_closure(&edges, ["b"])), vec!["a", "b", "c"]);
    }

    #[test]
    fn closure_reaches_identifiers_outside_the_node_set() {
        let edges = vec![edge("a", "npid-1")];
        assert!(taint_closure(&edges, ["a"]).contains("npid-1"));
    }

    #[test]
    fn edges_without_endpoints_are_not_followed() {
        let mut broken = edge("a", "b");
        broken.to = None;
        assert_eq!(ids(&taint_closure(&[broken], ["a"])), vec!["a"]);
    }

    #[test]
    fn plan_splits_markers_from_remote_checks() {
        let nodes = vec![
            Node::new("t", NodeKind::Marking, "Taint").with_subtype("taint"),
            Node::new("d", NodeKind::Data, "file"),
            Node::new("x", NodeKind::Data, "derived"),
        ];
        let plan = plan_taint(&nodes, &[true, true, false]);
        assert_eq!(plan.local_seeds, vec!["t".to_owned()]);
        assert_eq!(plan.remote_checks, vec!["d".to_owned()]);
    }

    #[test]
    fn marking_clears_previous_taint() {
        let mut nodes = vec![
            Node::new("a", NodeKind::Data, "a"),
            Node::new("b", NodeKind::Data, "b"),
        ];
        nodes[0].taint = true;
        let tainted = HashSet::from([String::from("b")]);
        assert_eq!(mark_tainted(&mut nodes, &tainted), 1);
        assert!(!nodes[0].taint);
        assert!(nodes[1].taint);
    }

    fn forward_reachable(edges: &[(usize, usize)], seed: usize, count: usize) -> HashSet<String> {
        let mut reached = vec![false; count];
        reached[seed] = true;
        // edges point from lower to higher ids, one ordered sweep suffices
        for node in seed..count {
            if !reached[node] {
                continue;
            }
            for &(from, to) in edges {
                if from == node {
                    reached[to] = true;
                }
            }
        }
        reached
            .iter()
            .enumerate()
            .filter(|(_, reached)| **reached)
            .map(|(index, _)| index.to_string())
            .collect()
    }

    fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (2usize..14).prop_flat_map(|count| {
            let pairs = proptest::collection::vec((0..count, 0..count), 0..30).prop_map(
                |pairs| {
                    pairs
                        .into_iter()
                        .filter(|(a, b)| a != b)
                        .map(|(a, b)| (a.min(b), a.max(b)))
                        .collect::<Vec<_>>()
                },
            );
            (Just(count), pairs)
        })
    }

    proptest! {
        #[test]
        fn closure_is_exactly_forward_reachability((count, pairs) in dag(), seed in 0usize..14) {
            let seed = seed % count;
            let edges = pairs
                .iter()
                .map(|(a, b)| edge(&a.to_string(), &b.to_string()))
                .collect::<Vec<_>>();
            let seed_id = seed.to_string();
            let closure = taint_closure(&edges, [seed_id.as_str()]);
            prop_assert_eq!(closure, forward_reachable(&pairs, seed, count));
        }

        #[test]
        fn spreading_twice_is_idempotent((count, pairs) in dag(), seed in 0usize..14) {
            let seed = (seed % count).to_string();
            let edges = pairs
                .iter()
                .map(|(a, b)| edge(&a.to_string(), &b.to_string()))
                .collect::<Vec<_>>();
            let mut nodes = (0..count)
                .map(|index| Node::new(index.to_string(), NodeKind::Data, "n"))
                .collect::<Vec<_>>();

            mark_tainted(&mut nodes, &taint_closure(&edges, [seed.as_str()]));
            let once = nodes.iter().map(|node| node.taint).collect::<Vec<_>>();
            mark_tainted(&mut nodes, &taint_closure(&edges, [seed.as_str()]));
            let twice = nodes.iter().map(|node| node.taint).collect::<Vec<_>>();
            prop_assert_eq!(once, twice);
        }
    }
}
