use eframe::egui::{Vec2, vec2};
use tracing::debug;

use super::Engine;
use super::clusters::{Canvas, ClusterDimension, ClusterForces};
use super::graph::{Edge, EdgeKind, Node};
use crate::util::stable_pair;

/// Node radius in canvas units.
pub const NODE_SIZE: f32 = 50.0;
/// Extra gap left in front of an arrowhead.
pub const ARROW_PADDING: f32 = 5.0;

const START_ALPHA: f32 = 0.1;
const ALPHA_DECAY: f32 = 0.99;
const MIN_ALPHA: f32 = 0.005;
const PULL: f32 = 0.91;

/// Damped pull of every node toward its cluster target. The energy `alpha`
/// decays geometrically each tick and the run ends once it drops below
/// `MIN_ALPHA`.
#[derive(Clone, Debug)]
pub struct Simulation {
    alpha: f32,
    running: bool,
    ticks: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            running: false,
            ticks: 0,
        }
    }
}

impl Simulation {
    pub fn start(&mut self) {
        self.alpha = START_ALPHA;
        self.running = true;
        self.ticks = 0;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.alpha = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances one tick. Returns whether the simulation is still moving.
    pub fn step(
        &mut self,
        nodes: &mut [Node],
        forces: &ClusterForces,
        dimension: ClusterDimension,
        canvas: Canvas,
    ) -> bool {
        if !self.running {
            return false;
        }

        self.alpha *= ALPHA_DECAY;
        if self.alpha < MIN_ALPHA {
            debug!(ticks = self.ticks, "simulation converged");
            self.stop();
            return false;
        }

        let k = PULL * self.alpha;
        for node in nodes {
            let Some(target) = forces.target_for(dimension, node) else {
                continue;
            };
            let moved = node.position + (target - node.position) * k;
            node.position = clamp_to_canvas(moved, canvas);
        }

        self.ticks += 1;
        true
    }
}

pub fn clamp_to_canvas(position: Vec2, canvas: Canvas) -> Vec2 {
    vec2(
        position.x.min(canvas.width - NODE_SIZE).max(NODE_SIZE),
        position.y.min(canvas.height - NODE_SIZE).max(NODE_SIZE),
    )
}

/// Straight edge segment, trimmed so it starts and ends at the node rims.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePath {
    pub edge: usize,
    pub source: usize,
    pub target: usize,
    pub start: Vec2,
    pub end: Vec2,
    pub start_arrow: bool,
    pub end_arrow: bool,
    pub non_provenance: bool,
}

/// Returns `None` when both ends sit on the same point.
pub fn edge_path(index: usize, edge: &Edge, from: Vec2, to: Vec2) -> Option<EdgePath> {
    let delta = to - from;
    let distance = delta.length();
    if distance <= f32::EPSILON {
        return None;
    }
    let direction = delta / distance;

    let start_padding = if edge.left { NODE_SIZE + ARROW_PADDING } else { NODE_SIZE };
    let end_padding = if edge.right { NODE_SIZE + ARROW_PADDING } else { NODE_SIZE };

    Some(EdgePath {
        edge: index,
        source: edge.source,
        target: edge.target,
        start: from + direction * start_padding,
        end: to - direction * end_padding,
        start_arrow: edge.left,
        end_arrow: edge.right,
        non_provenance: edge.kind == EdgeKind::NonProvenance,
    })
}

/// Everything the drawing side needs for one frame.
#[derive(Clone, Debug, Default)]
pub struct RenderFrame {
    pub positions: Vec<Vec2>,
    pub edges: Vec<EdgePath>,
}

impl Engine {
    pub(super) fn restart_simulation(&mut self) {
        self.simulation.start();
    }

    /// Initial position for a node that has none yet: a stable spot derived
    /// from its id.
    pub(super) fn seed_position(&self, id: &str) -> Vec2 {
        clamp_to_canvas(self.canvas.spread(stable_pair(id)), self.canvas)
    }

    pub fn is_simulating(&self) -> bool {
        self.simulation.is_running()
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn frame(&self) -> RenderFrame {
        let nodes = self.store.nodes();
        let positions = nodes.iter().map(|node| node.position).collect::<Vec<_>>();
        let edges = self
            .store
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| {
                edge_path(index, edge, positions[edge.source], positions[edge.target])
            })
            .collect();
        RenderFrame { positions, edges }
    }
}
