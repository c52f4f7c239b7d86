use std::collections::HashMap;

use super::Engine;
use super::graph::{Edge, Node, NodeKind, UNKNOWN_FUNCTION};

/// Derives the function classification of every node. Invocations are their
/// own function; data nodes take the label of the object the last edge into
/// them came from; everything else is unknown.
pub fn assign_node_functions(nodes: &mut [Node], edges: &[Edge]) {
    let mut producer_of: HashMap<&str, &str> = HashMap::new();
    for edge in edges {
        if let (Some(from), Some(to)) = (edge.from.as_deref(), edge.to.as_deref()) {
            producer_of.insert(to, from);
        }
    }

    let labels = nodes
        .iter()
        .map(|node| (node.id.clone(), node.label.clone()))
        .collect::<HashMap<_, _>>();

    for node in nodes.iter_mut() {
        node.function = match node.kind {
            NodeKind::Invocation => node.label.clone(),
            NodeKind::Data => producer_of
                .get(node.id.as_str())
                .and_then(|producer| labels.get(*producer))
                .cloned()
                .unwrap_or_else(|| String::from(UNKNOWN_FUNCTION)),
            _ => String::from(UNKNOWN_FUNCTION),
        };
    }
}

impl Engine {
    pub(super) fn add_node_functions(&mut self) {
        let (nodes, edges) = self.store.split_mut();
        assign_node_functions(nodes, edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::EdgeKind;

    fn edge(from: &str, to: &str) -> Edge {
        Edge {
            source: 0,
            target: 1,
            left: false,
            right: true,
            kind: EdgeKind::Provenance,
            from: Some(from.to_owned()),
            to: Some(to.to_owned()),
            label: String::from("generated"),
        }
    }

    #[test]
    fn functions_follow_node_kind() {
        let mut nodes = vec![
            Node::new("inv", NodeKind::Invocation, "tokenize"),
            Node::new("out", NodeKind::Data, "tokens.txt"),
            Node::new("orphan", NodeKind::Data, "raw.txt"),
            Node::new("wf", NodeKind::Workflow, "pipeline"),
        ];
        let edges = vec![edge("inv", "out"), edge("wf", "inv")];

        assign_node_functions(&mut nodes, &edges);

        assert_eq!(nodes[0].function, "tokenize");
        assert_eq!(nodes[1].function, "tokenize");
        assert_eq!(nodes[2].function, UNKNOWN_FUNCTION);
        assert_eq!(nodes[3].function, UNKNOWN_FUNCTION);
    }

    #[test]
    fn last_incoming_edge_wins() {
        let mut nodes = vec![
            Node::new("a", NodeKind::Invocation, "first"),
            Node::new("b", NodeKind::Invocation, "second"),
            Node::new("d", NodeKind::Data, "out"),
        ];
        let edges = vec![edge("a", "d"), edge("b", "d")];

        assign_node_functions(&mut nodes, &edges);

        assert_eq!(nodes[2].function, "second");
    }

    #[test]
    fn producer_outside_the_snapshot_is_unknown() {
        let mut nodes = vec![Node::new("d", NodeKind::Data, "out")];
        assign_node_functions(&mut nodes, &[edge("ghost", "d")]);
        assert_eq!(nodes[0].function, UNKNOWN_FUNCTION);
    }
}
