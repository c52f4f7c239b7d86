mod client;
mod model;
mod parse;
mod settings;

pub use client::{ProvenanceApi, RestClient};
pub use model::{Custodian, FingerprintRow, ObjectSummary, ProvenanceGraph, TimeSpan, WorkflowEntry};
pub use settings::{MAX_HOPS, MAX_NODES, MIN_HOPS, MIN_NODES, TraversalDirection, TraversalSettings};

#[cfg(test)]
pub(crate) use client::fake::FakeApi;
