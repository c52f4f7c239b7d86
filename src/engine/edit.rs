use tracing::debug;

use super::coordinator::{EditKind, EditTicket};
use super::store::EdgeInsert;
use super::{Engine, EngineError, Selection};

impl Engine {
    /// Joins `tail` to `head`, merging arrows onto an existing edge between
    /// the pair. A taint marker as tail of a new edge becomes an extra taint
    /// seed.
    pub fn add_edge(&mut self, tail: &str, head: &str) -> Result<usize, EngineError> {
        self.ensure_loaded()?;
        self.simulation.stop();

        let result = self.store.add_edge(tail, head);
        match result {
            Ok(EdgeInsert::Created(index)) => {
                debug!(tail, head, edge = index, "edge added");
                self.refresh_derived();
                if self.store.node(tail).is_some_and(|node| node.is_taint_marker()) {
                    self.add_taint_seed(tail);
                }
            }
            Ok(EdgeInsert::Merged(index)) => {
                debug!(tail, head, edge = index, "arrow merged onto existing edge");
                self.refresh_derived();
            }
            Err(_) => {}
        }

        self.restart_simulation();
        result.map(EdgeInsert::index)
    }

    pub fn remove_edge(&mut self, index: usize) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.simulation.stop();

        let result = self.store.remove_edge(index).map(|edge| {
            debug!(source = edge.source, target = edge.target, "edge removed");
            if matches!(self.selection, Some(Selection::Edge(_))) {
                self.selection = None;
            }
            self.refresh_derived();
        });

        self.restart_simulation();
        result
    }

    /// Sets the arrowheads of an edge: `left` points at the source, `right`
    /// at the target.
    pub fn set_edge_direction(
        &mut self,
        index: usize,
        left: bool,
        right: bool,
    ) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.simulation.stop();

        let result = self.store.set_edge_direction(index, left, right);
        if result.is_ok() {
            self.refresh_derived();
        }

        self.restart_simulation();
        result
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.simulation.stop();

        let result = self.store.remove_node(id).map(|node| {
            debug!(id = %node.id, "node removed");
            self.taint_seeds.retain(|seed| seed != id);
            self.selection = None;
            if self.drag.as_deref() == Some(id) {
                self.drag = None;
            }
            self.refresh_derived();
        });

        self.restart_simulation();
        result
    }

    /// Deletes whatever is selected.
    pub fn remove_selection(&mut self) -> Result<(), EngineError> {
        match self.selection.clone() {
            Some(Selection::Node(id)) => self.remove_node(&id),
            Some(Selection::Edge(index)) => self.remove_edge(index),
            None => Ok(()),
        }
    }

    /// Sets the arrowheads of the selected edge, if an edge is selected.
    pub fn direct_selected_edge(&mut self, left: bool, right: bool) -> Result<(), EngineError> {
        match self.selection {
            Some(Selection::Edge(index)) => self.set_edge_direction(index, left, right),
            _ => Ok(()),
        }
    }

    /// Issues the remote taint removal for `oid`. The local graph is left
    /// untouched; once the server confirms, the graph is refetched around the
    /// object `oid` points to, or `oid` itself.
    pub fn remove_taint(&mut self, oid: &str) -> EditTicket {
        let refocus = self
            .store
            .edges()
            .iter()
            .find(|edge| edge.from.as_deref() == Some(oid))
            .and_then(|edge| edge.to.clone())
            .unwrap_or_else(|| oid.to_owned());

        self.begin_edit(EditKind::RemoveTaint, oid, refocus)
    }

    /// Issues a remote taint marking on `oid`; the graph is refetched around
    /// the same object afterwards.
    pub fn add_taint(&mut self, oid: &str) -> EditTicket {
        self.begin_edit(EditKind::AddTaint, oid, oid)
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.store.is_empty() {
            return Err(EngineError::NotLoaded);
        }
        Ok(())
    }
}
