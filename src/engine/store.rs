use std::collections::HashMap;

use tracing::{debug, warn};

use super::EngineError;
use super::graph::{Edge, EdgeKind, LinkRecord, Node};

/// Node and edge collections of the current snapshot, indexed by node id.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index_by_id: HashMap<String, usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrow {
    Left,
    Right,
}

/// Outcome of [`GraphStore::add_edge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeInsert {
    Created(usize),
    /// The pair was already joined; only an arrow was set.
    Merged(usize),
}

impl EdgeInsert {
    pub fn index(self) -> usize {
        match self {
            Self::Created(index) | Self::Merged(index) => index,
        }
    }
}

impl GraphStore {
    /// Installs a new snapshot. Links addressing positions outside the node
    /// array are dropped; repeated node ids fold into their first occurrence.
    /// Returns the number of dropped links.
    pub fn replace(&mut self, nodes: Vec<Node>, links: Vec<LinkRecord>) -> usize {
        let incoming = nodes.len();
        let mut remap = Vec::with_capacity(incoming);
        self.nodes = Vec::with_capacity(incoming);
        self.index_by_id = HashMap::with_capacity(incoming);

        for node in nodes {
            if let Some(&existing) = self.index_by_id.get(&node.id) {
                warn!(id = %node.id, "duplicate node id in snapshot");
                remap.push(existing);
                continue;
            }

            let index = self.nodes.len();
            self.index_by_id.insert(node.id.clone(), index);
            self.nodes.push(node);
            remap.push(index);
        }

        let resolve = |position: i64| {
            usize::try_from(position)
                .ok()
                .and_then(|position| remap.get(position).copied())
        };

        let total = links.len();
        self.edges = links
            .into_iter()
            .filter_map(|link| {
                let (Some(source), Some(target)) = (resolve(link.source), resolve(link.target))
                else {
                    debug!(
                        source = link.source,
                        target = link.target,
                        "dropping link with invalid endpoint"
                    );
                    return None;
                };

                Some(Edge {
                    source,
                    target,
                    left: link.left,
                    right: link.right,
                    kind: link.kind,
                    from: link.from,
                    to: link.to,
                    label: link.label,
                })
            })
            .collect();

        total - self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn split_mut(&mut self) -> (&mut [Node], &[Edge]) {
        (&mut self.nodes, &self.edges)
    }

    /// Adds an edge between `tail` and `head`, or sets the arrow on the edge
    /// that already joins the pair. The stored orientation always has the
    /// lexicographically smaller id as source.
    pub fn add_edge(&mut self, tail: &str, head: &str) -> Result<EdgeInsert, EngineError> {
        let tail_index = self
            .index_of(tail)
            .ok_or_else(|| EngineError::UnknownNode(tail.to_owned()))?;
        let head_index = self
            .index_of(head)
            .ok_or_else(|| EngineError::UnknownNode(head.to_owned()))?;
        if tail_index == head_index {
            return Err(EngineError::SelfLoop(tail.to_owned()));
        }

        let (source, target, arrow) = if tail < head {
            (tail_index, head_index, Arrow::Right)
        } else {
            (head_index, tail_index, Arrow::Left)
        };

        if let Some(index) = self.edges.iter().position(|edge| {
            (edge.source == source && edge.target == target)
                || (edge.source == target && edge.target == source)
        }) {
            let edge = &mut self.edges[index];
            // an existing edge stored the other way round sees the arrow mirrored
            let arrow = if edge.source == source {
                arrow
            } else {
                match arrow {
                    Arrow::Left => Arrow::Right,
                    Arrow::Right => Arrow::Left,
                }
            };
            match arrow {
                Arrow::Left => edge.left = true,
                Arrow::Right => edge.right = true,
            }
            return Ok(EdgeInsert::Merged(index));
        }

        self.edges.push(Edge {
            source,
            target,
            left: arrow == Arrow::Left,
            right: arrow == Arrow::Right,
            kind: EdgeKind::Provenance,
            from: Some(tail.to_owned()),
            to: Some(head.to_owned()),
            label: String::from("generated"),
        });
        Ok(EdgeInsert::Created(self.edges.len() - 1))
    }

    pub fn remove_edge(&mut self, index: usize) -> Result<Edge, EngineError> {
        if index >= self.edges.len() {
            return Err(EngineError::UnknownEdge(index));
        }
        Ok(self.edges.remove(index))
    }

    pub fn set_edge_direction(
        &mut self,
        index: usize,
        left: bool,
        right: bool,
    ) -> Result<(), EngineError> {
        let edge = self
            .edges
            .get_mut(index)
            .ok_or(EngineError::UnknownEdge(index))?;
        edge.left = left;
        edge.right = right;
        Ok(())
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<Node, EngineError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| EngineError::UnknownNode(id.to_owned()))?;

        let removed = self.nodes.remove(index);
        self.edges.retain(|edge| !edge.touches(index));
        for edge in &mut self.edges {
            if edge.source > index {
                edge.source -= 1;
            }
            if edge.target > index {
                edge.target -= 1;
            }
        }

        self.index_by_id.remove(id);
        for position in self.index_by_id.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }

        Ok(removed)
    }

    /// Flags the nodes that are never the target of an edge.
    pub fn start_points(&self) -> Vec<bool> {
        let mut start = vec![true; self.nodes.len()];
        for edge in &self.edges {
            start[edge.target] = false;
        }
        start
    }

    /// Directed neighbour lists used by the layout, without self-loops or
    /// repeated pairs.
    pub fn adjacency(&self) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let mut outgoing = vec![Vec::new(); self.nodes.len()];
        let mut incoming = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            let (tail, head) = edge.directed();
            if tail == head || outgoing[tail].contains(&head) {
                continue;
            }
            outgoing[tail].push(head);
            incoming[head].push(tail);
        }
        (outgoing, incoming)
    }
}
