use tracing::{debug, info, warn};

use super::graph::Snapshot;
use super::{Engine, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    AddTaint,
    RemoveTaint,
}

impl EditKind {
    pub fn describe(self) -> &'static str {
        match self {
            Self::AddTaint => "adding taint",
            Self::RemoveTaint => "removing taint",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading { oid: String },
    Rendering,
    Editing(EditKind),
    Error(String),
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading { .. } | Self::Editing(_))
    }
}

/// A graph fetch issued under `generation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub oid: String,
}

/// Start points whose server-side taint markings must be checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaintCheckTicket {
    pub generation: u64,
    pub oids: Vec<String>,
}

/// A remote taint edit on `oid`; on success the graph is refetched around
/// `refocus`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTicket {
    pub generation: u64,
    pub kind: EditKind,
    pub oid: String,
    pub refocus: String,
}

impl Engine {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Object the current (or pending) snapshot is rooted at.
    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    /// Idle -> Loading. Supersedes every ticket issued before.
    pub fn begin_fetch(&mut self, oid: impl Into<String>) -> FetchTicket {
        let oid = oid.into();
        self.simulation.stop();
        self.generation += 1;
        self.focus = Some(oid.clone());
        self.phase = Phase::Loading { oid: oid.clone() };
        info!(generation = self.generation, oid = %oid, "graph fetch issued");
        FetchTicket {
            generation: self.generation,
            oid,
        }
    }

    /// Loading -> Rendering, or Loading -> Error on a failed fetch. The store
    /// is left untouched on failure. Returns the taint checks the new
    /// snapshot needs, if any.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Snapshot, String>,
    ) -> Result<Option<TaintCheckTicket>, EngineError> {
        self.ensure_current(ticket.generation)?;

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(message) => {
                warn!(oid = %ticket.oid, error = %message, "graph fetch failed");
                self.phase = Phase::Error(message);
                if !self.store.is_empty() {
                    self.restart_simulation();
                }
                return Ok(None);
            }
        };

        let remote_checks = self.apply_new_data(snapshot);
        self.phase = Phase::Rendering;
        if remote_checks.is_empty() {
            return Ok(None);
        }

        Ok(Some(TaintCheckTicket {
            generation: self.generation,
            oids: remote_checks,
        }))
    }

    /// Spreads taint from every checked start point the server reported as
    /// tainted. Failed checks never reach here; they count as untainted.
    pub fn complete_taint_check(
        &mut self,
        ticket: &TaintCheckTicket,
        tainted: &[String],
    ) -> Result<usize, EngineError> {
        self.ensure_current(ticket.generation)?;

        let mut count = self.taint_count();
        for oid in tainted {
            if !ticket.oids.contains(oid) {
                debug!(oid = %oid, "ignoring taint result for unchecked object");
                continue;
            }
            count = self.add_taint_seed(oid);
        }
        Ok(count)
    }

    /// Idle -> Editing. The simulation pauses until the edit resolves.
    pub fn begin_edit(
        &mut self,
        kind: EditKind,
        oid: impl Into<String>,
        refocus: impl Into<String>,
    ) -> EditTicket {
        self.simulation.stop();
        self.generation += 1;
        self.phase = Phase::Editing(kind);
        let ticket = EditTicket {
            generation: self.generation,
            kind,
            oid: oid.into(),
            refocus: refocus.into(),
        };
        info!(
            generation = ticket.generation,
            oid = %ticket.oid,
            "{}",
            kind.describe()
        );
        ticket
    }

    /// Editing -> Loading on success; the returned fetch re-reads the graph
    /// around the edit's refocus object.
    pub fn complete_edit(
        &mut self,
        ticket: &EditTicket,
        result: Result<(), String>,
    ) -> Result<Option<FetchTicket>, EngineError> {
        self.ensure_current(ticket.generation)?;

        match result {
            Ok(()) => Ok(Some(self.begin_fetch(ticket.refocus.clone()))),
            Err(message) => {
                warn!(oid = %ticket.oid, error = %message, "{} failed", ticket.kind.describe());
                self.phase = Phase::Error(message);
                if !self.store.is_empty() {
                    self.restart_simulation();
                }
                Ok(None)
            }
        }
    }

    /// One animation frame. Rendering falls back to Idle once the
    /// simulation has converged. Returns whether anything moved.
    pub fn tick(&mut self) -> bool {
        let (nodes, _) = self.store.split_mut();
        let moving = self
            .simulation
            .step(nodes, &self.forces, self.dimension, self.canvas);
        if !moving && self.phase == Phase::Rendering {
            self.phase = Phase::Idle;
        }
        moving
    }

    pub fn dismiss_error(&mut self) {
        if matches!(self.phase, Phase::Error(_)) {
            self.phase = Phase::Idle;
        }
    }

    fn ensure_current(&self, issued: u64) -> Result<(), EngineError> {
        if issued == self.generation {
            return Ok(());
        }
        warn!(issued, current = self.generation, "dropping stale response");
        Err(EngineError::StaleResponse {
            issued,
            current: self.generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::{LinkRecord, Node, NodeKind};

    fn chain() -> Snapshot {
        Snapshot {
            nodes: vec![
                Node::new("1", NodeKind::Data, "A"),
                Node::new("2", NodeKind::Invocation, "B"),
                Node::new("3", NodeKind::Data, "C"),
            ],
            links: vec![
                LinkRecord::new(0, 1).with_endpoints("1", "2"),
                LinkRecord::new(1, 2).with_endpoints("2", "3"),
            ],
        }
    }

    fn other() -> Snapshot {
        Snapshot {
            nodes: vec![Node::new("z", NodeKind::Data, "Z")],
            links: Vec::new(),
        }
    }

    #[test]
    fn fetch_moves_through_loading_and_rendering() {
        let mut engine = Engine::new();
        let ticket = engine.begin_fetch("1");
        assert_eq!(engine.phase(), &Phase::Loading { oid: "1".to_owned() });

        let checks = engine
            .complete_fetch(&ticket, Ok(chain()))
            .expect("current ticket");
        assert_eq!(engine.phase(), &Phase::Rendering);
        assert_eq!(engine.nodes().len(), 3);
        assert!(engine.is_simulating());

        let checks = checks.expect("start point needs a remote check");
        assert_eq!(checks.oids, vec!["1".to_owned()]);
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut engine = Engine::new();
        let old = engine.begin_fetch("1");
        let new = engine.begin_fetch("z");

        let stale = engine.complete_fetch(&old, Ok(chain()));
        assert!(matches!(
            stale,
            Err(EngineError::StaleResponse { issued: 1, current: 2 })
        ));
        assert!(engine.nodes().is_empty());

        engine.complete_fetch(&new, Ok(other())).expect("current ticket");
        assert_eq!(engine.nodes()[0].id, "z");
    }

    #[test]
    fn failed_fetch_keeps_previous_snapshot() {
        let mut engine = Engine::new();
        let first = engine.begin_fetch("1");
        engine.complete_fetch(&first, Ok(chain())).expect("current ticket");

        let second = engine.begin_fetch("2");
        let outcome = engine
            .complete_fetch(&second, Err("connection refused".to_owned()))
            .expect("current ticket");

        assert!(outcome.is_none());
        assert_eq!(engine.phase(), &Phase::Error("connection refused".to_owned()));
        assert_eq!(engine.nodes().len(), 3);

        engine.dismiss_error();
        assert_eq!(engine.phase(), &Phase::Idle);
    }

    #[test]
    fn remote_taint_results_spread_and_stale_ones_are_dropped() {
        let mut engine = Engine::new();
        let ticket = engine.begin_fetch("1");
        let checks = engine
            .complete_fetch(&ticket, Ok(chain()))
            .expect("current ticket")
            .expect("remote checks");

        let count = engine
            .complete_taint_check(&checks, &["1".to_owned()])
            .expect("current ticket");
        assert_eq!(count, 3);
        assert!(engine.nodes().iter().all(|node| node.taint));

        engine.begin_fetch("1");
        assert!(engine.complete_taint_check(&checks, &["1".to_owned()]).is_err());
    }

    #[test]
    fn successful_edit_refetches_around_refocus() {
        let mut engine = Engine::new();
        let ticket = engine.begin_fetch("1");
        engine.complete_fetch(&ticket, Ok(chain())).expect("current ticket");

        let edit = engine.begin_edit(EditKind::AddTaint, "2", "2");
        assert_eq!(engine.phase(), &Phase::Editing(EditKind::AddTaint));
        assert!(!engine.is_simulating());

        let fetch = engine
            .complete_edit(&edit, Ok(()))
            .expect("current ticket")
            .expect("refetch issued");
        assert_eq!(fetch.oid, "2");
        assert_eq!(fetch.generation, edit.generation + 1);
        assert_eq!(engine.focus(), Some("2"));
    }

    #[test]
    fn failed_edit_reports_error() {
        let mut engine = Engine::new();
        let edit = engine.begin_edit(EditKind::RemoveTaint, "2", "3");
        let outcome = engine
            .complete_edit(&edit, Err("500".to_owned()))
            .expect("current ticket");
        assert!(outcome.is_none());
        assert!(matches!(engine.phase(), Phase::Error(_)));
    }

    #[test]
    fn rendering_settles_to_idle() {
        let mut engine = Engine::new();
        let ticket = engine.begin_fetch("z");
        engine.complete_fetch(&ticket, Ok(other())).expect("current ticket");

        let mut frames = 0;
        while engine.tick() {
            frames += 1;
            assert!(frames < 1000);
        }
        assert_eq!(engine.phase(), &Phase::Idle);
    }
}
