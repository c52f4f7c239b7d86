//! Provenance graph engine: snapshot store, taint propagation, layered
//! layout, cluster forces and the tick-driven simulation, coordinated as one
//! explicit context object.

mod clusters;
mod coordinator;
mod edit;
mod functions;
mod graph;
mod layout;
mod simulation;
mod store;
mod taint;

use std::collections::HashMap;

use eframe::egui::Vec2;
use thiserror::Error;
use tracing::{debug, info};

pub use clusters::{Canvas, ClusterDimension, ClusterForces};
pub use coordinator::{EditKind, EditTicket, FetchTicket, Phase, TaintCheckTicket};
pub use graph::{Edge, EdgeKind, LinkRecord, MetadataValue, Node, NodeKind, NodeTags, Snapshot};
pub use simulation::{EdgePath, NODE_SIZE, Simulation};

use simulation::clamp_to_canvas;
use store::GraphStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("response for generation {issued} arrived after generation {current} was issued")]
    StaleResponse { issued: u64, current: u64 },
    #[error("no node with id `{0}` in the current graph")]
    UnknownNode(String),
    #[error("cannot connect `{0}` to itself")]
    SelfLoop(String),
    #[error("no edge at index {0}")]
    UnknownEdge(usize),
    #[error("no graph loaded")]
    NotLoaded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Node(String),
    Edge(usize),
}

pub struct Engine {
    store: GraphStore,
    forces: ClusterForces,
    canvas: Canvas,
    dimension: ClusterDimension,
    simulation: Simulation,
    taint_seeds: Vec<String>,
    selection: Option<Selection>,
    drag: Option<String>,
    phase: Phase,
    generation: u64,
    focus: Option<String>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_dimension(ClusterDimension::default())
    }

    pub fn with_dimension(dimension: ClusterDimension) -> Self {
        Self {
            store: GraphStore::default(),
            forces: ClusterForces::default(),
            canvas: Canvas::default(),
            dimension,
            simulation: Simulation::default(),
            taint_seeds: Vec::new(),
            selection: None,
            drag: None,
            phase: Phase::Idle,
            generation: 0,
            focus: None,
        }
    }

    /// Installs a snapshot and runs the full pipeline: filter invalid links,
    /// node functions, taint, layout, cluster forces, then restarts the
    /// simulation. Returns the start points whose taint must be checked
    /// remotely.
    pub fn apply_new_data(&mut self, snapshot: Snapshot) -> Vec<String> {
        self.simulation.stop();

        let previous = self
            .store
            .nodes()
            .iter()
            .map(|node| (node.id.clone(), node.position))
            .collect::<HashMap<_, _>>();

        let node_count = snapshot.nodes.len();
        let link_count = snapshot.links.len();
        let dropped = self.store.replace(snapshot.nodes, snapshot.links);
        self.canvas = Canvas::for_node_count(self.store.nodes().len());
        self.place_nodes(&previous);

        self.selection = None;
        self.drag = None;
        self.taint_seeds.clear();

        self.add_node_functions();
        let remote_checks = self.check_and_spread_taint();
        self.assign_layout();
        self.create_forces();
        self.restart_simulation();

        info!(
            nodes = node_count,
            links = link_count,
            dropped_links = dropped,
            taint_checks = remote_checks.len(),
            "snapshot applied"
        );
        remote_checks
    }

    /// Recomputes everything derived from the node and edge arrays after an
    /// in-place edit. The simulation is left for the caller to restart.
    fn refresh_derived(&mut self) {
        self.canvas = Canvas::for_node_count(self.store.nodes().len());
        self.add_node_functions();
        self.recompute_taint();
        self.assign_layout();
        self.create_forces();
        let canvas = self.canvas;
        for node in self.store.nodes_mut() {
            node.position = clamp_to_canvas(node.position, canvas);
        }
    }

    /// Nodes seen in the previous snapshot keep their position.
    fn place_nodes(&mut self, previous: &HashMap<String, Vec2>) {
        let canvas = self.canvas;
        let seeded = self
            .store
            .nodes()
            .iter()
            .map(|node| match previous.get(&node.id) {
                Some(&position) => clamp_to_canvas(position, canvas),
                None => self.seed_position(&node.id),
            })
            .collect::<Vec<_>>();

        let mut kept = 0usize;
        for (node, position) in self.store.nodes_mut().iter_mut().zip(seeded) {
            kept += usize::from(previous.contains_key(&node.id));
            node.position = position;
        }
        debug!(kept, "node positions carried over");
    }

    pub fn nodes(&self) -> &[Node] {
        self.store.nodes()
    }

    pub fn edges(&self) -> &[Edge] {
        self.store.edges()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.store.node(id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.store.index_of(id)
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn taint_count(&self) -> usize {
        self.store.nodes().iter().filter(|node| node.taint).count()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn select_node(&mut self, id: &str) {
        self.selection = self
            .store
            .index_of(id)
            .map(|_| Selection::Node(id.to_owned()));
    }

    pub fn select_edge(&mut self, index: usize) {
        self.selection = (index < self.store.edges().len()).then_some(Selection::Edge(index));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selected_node(&self) -> Option<&Node> {
        match &self.selection {
            Some(Selection::Node(id)) => self.store.node(id),
            _ => None,
        }
    }

    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_deref()
    }

    /// Moves a node by hand. The simulation keeps running and pulls it back
    /// toward its cluster once released.
    pub fn drag_node(&mut self, id: &str, position: Vec2) -> Result<(), EngineError> {
        let index = self
            .store
            .index_of(id)
            .ok_or_else(|| EngineError::UnknownNode(id.to_owned()))?;
        self.drag = Some(id.to_owned());
        self.store.nodes_mut()[index].position = clamp_to_canvas(position, self.canvas);
        Ok(())
    }

    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() && !self.simulation.is_running() {
            self.restart_simulation();
        }
    }
}
