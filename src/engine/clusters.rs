use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use super::graph::Node;
use super::{Engine, Phase};

const CANVAS_WIDTH_PER_NODE: f32 = 150.0;
const CANVAS_HEIGHT_PER_NODE: f32 = 40.0;
const MIN_CANVAS_WIDTH: f32 = 1500.0;
const MIN_CANVAS_HEIGHT: f32 = 400.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClusterDimension {
    #[default]
    Order,
    Label,
    Function,
    Owner,
}

impl ClusterDimension {
    pub const ALL: [Self; 4] = [Self::Order, Self::Label, Self::Function, Self::Owner];

    pub fn name(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Label => "label",
            Self::Function => "function",
            Self::Owner => "ownerid",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Order => "Rank / order",
            Self::Label => "Label",
            Self::Function => "Function",
            Self::Owner => "Owner",
        }
    }
}

impl fmt::Display for ClusterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClusterDimension {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dimension| dimension.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                format!("unknown clustering dimension `{value}` (expected order, label, function or ownerid)")
            })
    }
}

/// Drawing area in canvas units. Grows with the node count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::for_node_count(0)
    }
}

impl Canvas {
    pub fn for_node_count(count: usize) -> Self {
        let count = count as f32;
        Self {
            width: (CANVAS_WIDTH_PER_NODE * count).max(MIN_CANVAS_WIDTH),
            height: (CANVAS_HEIGHT_PER_NODE * count).max(MIN_CANVAS_HEIGHT),
        }
    }

    pub fn size(self) -> Vec2 {
        vec2(self.width, self.height)
    }

    /// Places a unit-square point (components in -1..=1) on the canvas.
    pub fn spread(self, (x, y): (f32, f32)) -> Vec2 {
        vec2((x + 1.0) * 0.5 * self.width, (y + 1.0) * 0.5 * self.height)
    }
}

/// Target coordinates for every value of every clustering dimension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterForces {
    labels: BTreeMap<String, Vec2>,
    functions: BTreeMap<String, Vec2>,
    owners: BTreeMap<String, Vec2>,
    ranks: BTreeMap<usize, usize>,
    orders: BTreeMap<usize, usize>,
    grid: Vec<Vec<Vec2>>,
}

impl ClusterForces {
    pub fn build(nodes: &[Node], canvas: Canvas) -> Self {
        let labels = diagonal(nodes.iter().map(|node| node.label.as_str()), canvas);
        let functions = diagonal(nodes.iter().map(|node| node.function.as_str()), canvas);
        let owners = diagonal(nodes.iter().map(Node::owner_key), canvas);

        let ranks = index_values(nodes.iter().map(|node| node.rank));
        let orders = index_values(nodes.iter().map(|node| node.order));
        let rank_step = canvas.width / (ranks.len() + 1) as f32;
        let order_step = canvas.height / (orders.len() + 1) as f32;
        let grid = (0..ranks.len())
            .map(|rank_index| {
                (0..orders.len())
                    .map(|order_index| {
                        vec2(
                            rank_step * (rank_index + 1) as f32,
                            order_step * (order_index + 1) as f32,
                        )
                    })
                    .collect()
            })
            .collect();

        debug!(
            labels = labels.len(),
            functions = functions.len(),
            owners = owners.len(),
            ranks = ranks.len(),
            orders = orders.len(),
            "cluster forces built"
        );

        Self {
            labels,
            functions,
            owners,
            ranks,
            orders,
            grid,
        }
    }

    pub fn target_for(&self, dimension: ClusterDimension, node: &Node) -> Option<Vec2> {
        match dimension {
            ClusterDimension::Label => self.labels.get(&node.label).copied(),
            ClusterDimension::Function => self.functions.get(&node.function).copied(),
            ClusterDimension::Owner => self.owners.get(node.owner_key()).copied(),
            ClusterDimension::Order => {
                let rank = *self.ranks.get(&node.rank)?;
                let order = *self.orders.get(&node.order)?;
                self.grid.get(rank)?.get(order).copied()
            }
        }
    }

    /// Distinct values of a one-dimensional clustering, in target order.
    pub fn values(&self, dimension: ClusterDimension) -> Vec<&str> {
        let map = match dimension {
            ClusterDimension::Label => &self.labels,
            ClusterDimension::Function => &self.functions,
            ClusterDimension::Owner => &self.owners,
            ClusterDimension::Order => return Vec::new(),
        };
        map.keys().map(String::as_str).collect()
    }
}

/// Evenly spaced targets along the canvas diagonal, one per distinct sorted
/// value; the i-th value sits at `size / (count + 1) * (i + 1)`.
fn diagonal<'a>(values: impl Iterator<Item = &'a str>, canvas: Canvas) -> BTreeMap<String, Vec2> {
    let distinct = values.collect::<BTreeSet<_>>();
    let step = canvas.size() / (distinct.len() + 1) as f32;
    distinct
        .into_iter()
        .enumerate()
        .map(|(index, value)| (value.to_owned(), step * (index + 1) as f32))
        .collect()
}

fn index_values(values: impl Iterator<Item = usize>) -> BTreeMap<usize, usize> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(index, value)| (value, index))
        .collect()
}

impl Engine {
    pub(super) fn create_forces(&mut self) {
        self.forces = ClusterForces::build(self.store.nodes(), self.canvas);
    }

    /// Switches the active clustering dimension and restarts the simulation.
    pub fn change_force(&mut self, dimension: ClusterDimension) {
        self.simulation.stop();
        self.dimension = dimension;
        debug!(dimension = %dimension, "clustering dimension changed");
        if self.store.is_empty() {
            return;
        }
        self.restart_simulation();
        if self.phase == Phase::Idle {
            self.phase = Phase::Rendering;
        }
    }

    pub fn dimension(&self) -> ClusterDimension {
        self.dimension
    }

    pub fn forces(&self) -> &ClusterForces {
        &self.forces
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::engine::graph::NodeKind;

    fn node(id: &str, label: &str, owner: &str, rank: usize, order: usize) -> Node {
        let mut node = Node::new(id, NodeKind::Data, label).with_owner(owner);
        node.rank = rank;
        node.order = order;
        node
    }

    #[test]
    fn canvas_grows_with_node_count() {
        assert_eq!(Canvas::for_node_count(3), Canvas { width: 1500.0, height: 400.0 });
        assert_eq!(Canvas::for_node_count(20), Canvas { width: 3000.0, height: 800.0 });
    }

    #[test]
    fn labels_are_spaced_along_the_diagonal() {
        let nodes = vec![
            node("1", "beta", "o", 0, 0),
            node("2", "alpha", "o", 1, 0),
            node("3", "beta", "o", 1, 1),
        ];
        let canvas = Canvas { width: 300.0, height: 90.0 };
        let forces = ClusterForces::build(&nodes, canvas);

        assert_eq!(forces.values(ClusterDimension::Label), vec!["alpha", "beta"]);
        assert_eq!(
            forces.target_for(ClusterDimension::Label, &nodes[1]),
            Some(vec2(100.0, 30.0))
        );
        assert_eq!(
            forces.target_for(ClusterDimension::Label, &nodes[0]),
            Some(vec2(200.0, 60.0))
        );
    }

    #[test]
    fn order_targets_form_a_rank_by_order_grid() {
        let nodes = vec![
            node("1", "a", "o", 0, 0),
            node("2", "b", "o", 1, 0),
            node("3", "c", "o", 1, 1),
        ];
        let canvas = Canvas { width: 300.0, height: 300.0 };
        let forces = ClusterForces::build(&nodes, canvas);

        assert_eq!(
            forces.target_for(ClusterDimension::Order, &nodes[0]),
            Some(vec2(100.0, 100.0))
        );
        assert_eq!(
            forces.target_for(ClusterDimension::Order, &nodes[2]),
            Some(vec2(200.0, 200.0))
        );
    }

    #[test]
    fn missing_owner_clusters_under_empty_key() {
        let nodes = vec![Node::new("1", NodeKind::Data, "a")];
        let forces = ClusterForces::build(&nodes, Canvas::default());
        assert!(forces.target_for(ClusterDimension::Owner, &nodes[0]).is_some());
    }

    #[test]
    fn dimension_names_parse_back() {
        for dimension in ClusterDimension::ALL {
            assert_eq!(dimension.name().parse::<ClusterDimension>(), Ok(dimension));
        }
        assert!("colour".parse::<ClusterDimension>().is_err());
    }

    proptest! {
        #[test]
        fn building_twice_gives_identical_targets(
            raw in proptest::collection::vec(("[a-d]", "[x-z]", 0usize..4, 0usize..3), 1..20)
        ) {
            let nodes = raw
                .iter()
                .enumerate()
                .map(|(index, (label, owner, rank, order))| {
                    node(&index.to_string(), label, owner, *rank, *order)
                })
                .collect::<Vec<_>>();
            let canvas = Canvas::for_node_count(nodes.len());

            let first = ClusterForces::build(&nodes, canvas);
            let second = ClusterForces::build(&nodes, canvas);
            prop_assert_eq!(&first, &second);
            for dimension in ClusterDimension::ALL {
                for node in &nodes {
                    prop_assert!(first.target_for(dimension, node).is_some());
                }
            }
        }
    }
}
