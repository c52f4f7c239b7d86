use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use eframe::egui::{Context, Vec2};
use tracing::{debug, warn};

use crate::engine::{
    ClusterDimension, EditKind, EditTicket, Engine, FetchTicket, TaintCheckTicket,
};
use crate::fitness::{AssessmentOutcome, AssessmentTask, Assessor, AssessorSet, run_tasks};
use crate::prov::{
    Custodian, FingerprintRow, ObjectSummary, ProvenanceApi, ProvenanceGraph, RestClient,
    TimeSpan, TraversalSettings, WorkflowEntry,
};

mod graph;
mod render_utils;
mod ui;

/// Start-up options resolved from the command line.
pub struct AppConfig {
    pub server: String,
    pub timeout: Duration,
    pub initial_oid: Option<String>,
    pub settings: TraversalSettings,
    pub dimension: ClusterDimension,
}

pub struct ProvVisApp {
    api: Arc<dyn ProvenanceApi>,
    server: String,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    in_flight: usize,
    model: ViewModel,
}

/// Results handed back from worker threads, each stamped with the ticket it
/// was issued under.
enum WorkerMessage {
    Graph(FetchTicket, Result<ProvenanceGraph, String>),
    TaintCheck(TaintCheckTicket, Vec<String>),
    Edit(EditTicket, Result<(), String>),
    Assessment(AssessmentOutcome),
    AssessmentsFinished,
    Report(ObjectReport),
    Workflows(Result<Vec<WorkflowEntry>, String>),
}

/// Work requested by the panels during a frame.
enum Request {
    Load(String),
    AddTaint { oid: String, reason: String },
    RemoveTaint(String),
    SpreadTaint(String),
    Assess(String),
    Report(String),
    Workflows,
}

/// Per-object lookups shown in the details panel. Each part fails on its
/// own.
struct ObjectReport {
    oid: String,
    summary: Result<ObjectSummary, String>,
    span: Result<TimeSpan, String>,
    custody: Result<Vec<Custodian>, String>,
}

struct ViewModel {
    engine: Engine,
    settings: TraversalSettings,
    oid_input: String,
    fingerprint: Vec<FingerprintRow>,
    actors: BTreeMap<String, String>,
    assessors: AssessorSet,
    new_assessor: AssessorChoice,
    new_term: String,
    term_edits: BTreeMap<u32, String>,
    taint_reason: String,
    search: String,
    pan: Vec2,
    zoom: f32,
    fit_pending: bool,
    link_from: Option<String>,
    edit_error: Option<String>,
    report: Option<ObjectReport>,
    /// Object whose report is being fetched; older replies are dropped.
    report_pending: Option<String>,
    workflows: Option<Result<Vec<WorkflowEntry>, String>>,
    requests: Vec<Request>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum AssessorChoice {
    #[default]
    Taint,
    TermFinder,
    BadTermFinder,
}

impl AssessorChoice {
    const ALL: [Self; 3] = [Self::Taint, Self::TermFinder, Self::BadTermFinder];

    fn build(self, term: &str) -> Assessor {
        match self {
            Self::Taint => Assessor::Taint,
            Self::TermFinder => Assessor::TermFinder {
                term: term.to_owned(),
            },
            Self::BadTermFinder => Assessor::BadTermFinder {
                term: term.to_owned(),
            },
        }
    }

    fn title(self) -> &'static str {
        self.build("").name()
    }
}

impl ProvVisApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let client = RestClient::new(&config.server, config.timeout);
        let (tx, rx) = mpsc::channel();
        let mut app = Self {
            api: Arc::new(client),
            server: config.server,
            tx,
            rx,
            in_flight: 0,
            model: ViewModel::new(config.settings, config.dimension),
        };

        if let Some(oid) = config.initial_oid {
            app.model.oid_input = oid.clone();
            app.model.requests.push(Request::Load(oid));
        }
        app
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let settings = self.model.settings.clamped();
        self.in_flight += 1;

        thread::spawn(move || {
            let result = api
                .fetch_graph(&ticket.oid, &settings)
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(WorkerMessage::Graph(ticket, result));
        });
    }

    /// Failed checks are reported as untainted.
    fn spawn_taint_check(&mut self, ticket: TaintCheckTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;

        thread::spawn(move || {
            let tainted = ticket
                .oids
                .iter()
                .filter(|oid| match api.taint_sources(oid) {
                    Ok(count) => count > 0,
                    Err(error) => {
                        warn!(oid = %oid, error = %format!("{error:#}"), "taint check failed");
                        false
                    }
                })
                .cloned()
                .collect();
            let _ = tx.send(WorkerMessage::TaintCheck(ticket, tainted));
        });
    }

    fn spawn_edit(&mut self, ticket: EditTicket, reason: Option<String>) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;

        thread::spawn(move || {
            let result = match ticket.kind {
                EditKind::AddTaint => api.assert_taint(&ticket.oid, reason.as_deref().unwrap_or("")),
                EditKind::RemoveTaint => api.delete_taint(&ticket.oid),
            }
            .map_err(|error| format!("{error:#}"));
            let _ = tx.send(WorkerMessage::Edit(ticket, result));
        });
    }

    fn spawn_assessments(&mut self, tasks: Vec<AssessmentTask>) {
        if tasks.is_empty() {
            return;
        }
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;

        thread::spawn(move || {
            run_tasks(api.as_ref(), tasks, |outcome| {
                tx.send(WorkerMessage::Assessment(outcome)).is_ok()
            });
            let _ = tx.send(WorkerMessage::AssessmentsFinished);
        });
    }

    fn spawn_report(&mut self, oid: String) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.model.report_pending = Some(oid.clone());
        self.in_flight += 1;

        thread::spawn(move || {
            let report = ObjectReport {
                summary: api.object_summary(&oid).map_err(|error| format!("{error:#}")),
                span: api.time_span(&oid).map_err(|error| format!("{error:#}")),
                custody: api.chain_of_custody(&oid).map_err(|error| format!("{error:#}")),
                oid,
            };
            let _ = tx.send(WorkerMessage::Report(report));
        });
    }

    fn spawn_workflows(&mut self) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;

        thread::spawn(move || {
            let result = api.latest_workflows().map_err(|error| format!("{error:#}"));
            let _ = tx.send(WorkerMessage::Workflows(result));
        });
    }

    fn dispatch_requests(&mut self) {
        for request in std::mem::take(&mut self.model.requests) {
            match request {
                Request::Load(oid) => {
                    let ticket = self.model.engine.begin_fetch(oid);
                    self.spawn_fetch(ticket);
                }
                Request::AddTaint { oid, reason } => {
                    let ticket = self.model.engine.add_taint(&oid);
                    self.spawn_edit(ticket, Some(reason));
                }
                Request::RemoveTaint(oid) => {
                    let ticket = self.model.engine.remove_taint(&oid);
                    self.spawn_edit(ticket, None);
                }
                Request::SpreadTaint(oid) => {
                    let tainted = self.model.engine.spread_taint(&oid);
                    debug!(seed = %oid, tainted, "taint spread from selection");
                }
                Request::Assess(oid) => {
                    let tasks = self.model.assessors.schedule(&oid);
                    self.spawn_assessments(tasks);
                }
                Request::Report(oid) => self.spawn_report(oid),
                Request::Workflows => self.spawn_workflows(),
            }
        }
    }

    fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Graph(ticket, result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.finish_fetch(&ticket, result);
            }
            WorkerMessage::TaintCheck(ticket, tainted) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match self.model.engine.complete_taint_check(&ticket, &tainted) {
                    Ok(count) => debug!(tainted = count, "taint check applied"),
                    Err(error) => debug!(error = %error, "taint check dropped"),
                }
            }
            WorkerMessage::Edit(ticket, result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match self.model.engine.complete_edit(&ticket, result) {
                    Ok(Some(fetch)) => self.spawn_fetch(fetch),
                    Ok(None) => {}
                    Err(error) => debug!(error = %error, "edit result dropped"),
                }
            }
            WorkerMessage::Assessment(outcome) => {
                self.model.assessors.apply(outcome);
            }
            WorkerMessage::AssessmentsFinished => {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            WorkerMessage::Report(report) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if self.model.report_pending.as_deref() == Some(report.oid.as_str()) {
                    self.model.report_pending = None;
                    self.model.report = Some(report);
                } else {
                    debug!(oid = %report.oid, "superseded object report dropped");
                }
            }
            WorkerMessage::Workflows(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if let Err(error) = &result {
                    warn!(error = %error, "workflow listing failed");
                }
                self.model.workflows = Some(result);
            }
        }
    }

    fn finish_fetch(&mut self, ticket: &FetchTicket, result: Result<ProvenanceGraph, String>) {
        let (snapshot, metadata) = match result {
            Ok(graph) => {
                debug!(
                    oid = %ticket.oid,
                    nodes = graph.node_count(),
                    links = graph.link_count(),
                    "graph received"
                );
                (Ok(graph.snapshot), Some((graph.fingerprint, graph.actors)))
            }
            Err(message) => (Err(message), None),
        };

        match self.model.engine.complete_fetch(ticket, snapshot) {
            Ok(check) => {
                let Some((fingerprint, actors)) = metadata else {
                    return;
                };
                self.model.fingerprint = fingerprint;
                self.model.actors = actors;
                self.model.fit_pending = true;
                self.model.link_from = None;
                if let Some(check) = check {
                    self.spawn_taint_check(check);
                }
                self.model.requests.push(Request::Assess(ticket.oid.clone()));
            }
            Err(error) => debug!(error = %error, "graph response dropped"),
        }
    }
}

impl eframe::App for ProvVisApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
        }

        self.model.show(ctx, &self.server);
        self.dispatch_requests();

        if self.in_flight > 0 {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

impl ViewModel {
    fn new(settings: TraversalSettings, dimension: ClusterDimension) -> Self {
        Self {
            engine: Engine::with_dimension(dimension),
            settings,
            oid_input: String::new(),
            fingerprint: Vec::new(),
            actors: BTreeMap::new(),
            assessors: AssessorSet::default(),
            new_assessor: AssessorChoice::default(),
            new_term: String::new(),
            term_edits: BTreeMap::new(),
            taint_reason: String::new(),
            search: String::new(),
            pan: Vec2::ZERO,
            zoom: 0.5,
            fit_pending: true,
            link_from: None,
            edit_error: None,
            report: None,
            report_pending: None,
            workflows: None,
            requests: Vec::new(),
        }
    }

    /// Object the assessors and taint actions apply to: the selected node,
    /// otherwise the object the graph was fetched around.
    fn target_oid(&self) -> Option<String> {
        self.engine
            .selected_node()
            .map(|node| node.id.clone())
            .or_else(|| self.engine.focus().map(str::to_owned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LinkRecord, Node, NodeKind, Phase, Snapshot};
    use crate::prov::FakeApi;

    fn lineage() -> ProvenanceGraph {
        ProvenanceGraph {
            snapshot: Snapshot {
                nodes: vec![
                    Node::new("a", NodeKind::Data, "input"),
                    Node::new("b", NodeKind::Invocation, "train"),
                    Node::new("c", NodeKind::Data, "model"),
                ],
                links: vec![
                    LinkRecord::new(0, 1).with_endpoints("a", "b"),
                    LinkRecord::new(1, 2).with_endpoints("b", "c"),
                ],
            },
            fingerprint: vec![FingerprintRow {
                key: "nodes".into(),
                value: "3.00".into(),
            }],
            actors: BTreeMap::new(),
        }
    }

    fn app_with(api: Arc<dyn ProvenanceApi>) -> ProvVisApp {
        let (tx, rx) = mpsc::channel();
        ProvVisApp {
            api,
            server: "fake".into(),
            tx,
            rx,
            in_flight: 0,
            model: ViewModel::new(TraversalSettings::default(), ClusterDimension::Order),
        }
    }

    fn drain(app: &mut ProvVisApp) {
        while app.in_flight > 0 || !app.model.requests.is_empty() {
            app.dispatch_requests();
            if app.in_flight == 0 {
                break;
            }
            if let Ok(message) = app.rx.recv_timeout(Duration::from_secs(5)) {
                app.handle_message(message);
            } else {
                break;
            }
        }
    }

    #[test]
    fn load_applies_graph_and_runs_assessors() {
        let mut api = FakeApi::default();
        api.graphs.insert("c".into(), lineage());
        let mut app = app_with(Arc::new(api));
        app.model.assessors.add(Assessor::Taint);

        app.model.requests.push(Request::Load("c".into()));
        drain(&mut app);

        assert_eq!(app.model.engine.nodes().len(), 3);
        assert_eq!(app.model.fingerprint.len(), 1);
        assert_eq!(*app.model.engine.phase(), Phase::Rendering);
        assert_eq!(
            app.model.assessors.entries()[0].assessed.as_deref(),
            Some("c")
        );
    }

    #[test]
    fn server_taint_spreads_after_load() {
        let mut api = FakeApi::default();
        api.graphs.insert("c".into(), lineage());
        api.tainted
            .lock()
            .expect("fresh mutex")
            .insert("a".to_owned());
        let mut app = app_with(Arc::new(api));

        app.model.requests.push(Request::Load("c".into()));
        drain(&mut app);

        assert_eq!(app.model.engine.taint_count(), 3);
    }

    #[test]
    fn failed_load_shows_error_phase() {
        let mut app = app_with(Arc::new(FakeApi::default()));

        app.model.requests.push(Request::Load("missing".into()));
        drain(&mut app);

        assert!(matches!(app.model.engine.phase(), Phase::Error(_)));
        assert!(app.model.engine.is_empty());
    }

    #[test]
    fn add_taint_posts_and_refetches() {
        let mut api = FakeApi::default();
        api.graphs.insert("c".into(), lineage());
        let api = Arc::new(api);
        let mut app = app_with(Arc::clone(&api) as Arc<dyn ProvenanceApi>);
        app.model.requests.push(Request::Load("c".into()));
        drain(&mut app);

        app.model.requests.push(Request::AddTaint {
            oid: "c".into(),
            reason: "bad sensor".into(),
        });
        drain(&mut app);

        let calls = api.calls();
        assert!(calls.contains(&"assert c bad sensor".to_owned()));
        assert_eq!(calls.iter().filter(|call| *call == "graph c").count(), 2);
        assert_eq!(app.model.engine.focus(), Some("c"));
        assert_eq!(*app.model.engine.phase(), Phase::Rendering);
    }

    #[test]
    fn refused_taint_removal_leaves_the_graph_as_it_was() {
        let mut api = FakeApi::default();
        api.graphs.insert(
            "d".into(),
            ProvenanceGraph {
                snapshot: Snapshot {
                    nodes: vec![
                        Node::new("t", NodeKind::Marking, "Taint").with_subtype("taint"),
                        Node::new("d", NodeKind::Data, "file"),
                    ],
                    links: vec![LinkRecord::new(0, 1).with_endpoints("t", "d")],
                },
                ..ProvenanceGraph::default()
            },
        );
        let mut app = app_with(Arc::new(api));
        app.model.requests.push(Request::Load("d".into()));
        drain(&mut app);
        assert_eq!(app.model.engine.taint_count(), 2);

        app.api = Arc::new(FakeApi {
            offline: true,
            ..FakeApi::default()
        });
        app.model.requests.push(Request::RemoveTaint("t".into()));
        drain(&mut app);

        assert_eq!(app.model.engine.nodes().len(), 2);
        assert_eq!(app.model.engine.taint_count(), 2);
        assert!(matches!(app.model.engine.phase(), Phase::Error(message) if message.contains("connection refused")));
    }

    #[test]
    fn spreading_from_a_node_replaces_the_taint() {
        let mut api = FakeApi::default();
        api.graphs.insert("c".into(), lineage());
        api.tainted
            .lock()
            .expect("fresh mutex")
            .insert("a".to_owned());
        let mut app = app_with(Arc::new(api));
        app.model.requests.push(Request::Load("c".into()));
        drain(&mut app);
        assert_eq!(app.model.engine.taint_count(), 3);

        app.model.requests.push(Request::SpreadTaint("b".into()));
        drain(&mut app);

        assert_eq!(app.model.engine.taint_count(), 2);
        assert!(!app.model.engine.node("a").expect("a").taint);
        assert!(app.model.engine.node("c").expect("c").taint);
    }

    #[test]
    fn object_report_keeps_each_lookup_separate() {
        let mut api = FakeApi::default();
        api.summaries.insert(
            "c".into(),
            ObjectSummary {
                name: "model".into(),
                summary: "model (data/file)".into(),
                ..ObjectSummary::default()
            },
        );
        api.custody.insert(
            "c".into(),
            vec![Custodian {
                aid: "actor-1".into(),
                name: "analyst".into(),
                kind: "person".into(),
            }],
        );
        let mut app = app_with(Arc::new(api));

        app.model.requests.push(Request::Report("c".into()));
        drain(&mut app);

        let report = app.model.report.as_ref().expect("report arrived");
        assert_eq!(report.oid, "c");
        assert_eq!(report.summary.as_ref().map(|summary| summary.name.as_str()), Ok("model"));
        assert!(report.span.as_ref().is_err_and(|error| error.contains("404")));
        assert_eq!(report.custody.as_ref().map(Vec::len), Ok(1));
        assert!(app.model.report_pending.is_none());
    }

    #[test]
    fn only_the_latest_report_request_is_kept() {
        let mut app = app_with(Arc::new(FakeApi::default()));

        app.model.requests.push(Request::Report("a".into()));
        app.model.requests.push(Request::Report("c".into()));
        drain(&mut app);

        assert_eq!(app.model.report.as_ref().map(|report| report.oid.as_str()), Some("c"));
    }

    #[test]
    fn workflow_listing_is_stored_for_browsing() {
        let mut api = FakeApi::default();
        api.workflows.push(WorkflowEntry {
            oid: "wf-1".into(),
            name: "nightly import".into(),
            created: None,
        });
        let mut app = app_with(Arc::new(api));

        app.model.requests.push(Request::Workflows);
        drain(&mut app);

        let listed = app
            .model
            .workflows
            .as_ref()
            .and_then(|result| result.as_ref().ok())
            .expect("workflows listed");
        assert_eq!(listed[0].oid, "wf-1");
    }
}
