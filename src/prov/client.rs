use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::debug;
use ureq::Agent;

use super::model::{Custodian, ObjectSummary, ProvenanceGraph, TimeSpan, WorkflowEntry};
use super::parse::{
    count_nodes, parse_custody, parse_graph, parse_summary, parse_time_span, parse_workflows,
};
use super::settings::TraversalSettings;

/// Remote operations the viewer needs from a provenance service. All calls
/// block and are only made from worker threads.
pub trait ProvenanceApi: Send + Sync {
    fn fetch_graph(&self, oid: &str, settings: &TraversalSettings) -> Result<ProvenanceGraph>;

    /// Number of taint markings recorded upstream of `oid`.
    fn taint_sources(&self, oid: &str) -> Result<usize>;

    fn assert_taint(&self, oid: &str, reason: &str) -> Result<()>;

    fn delete_taint(&self, oid: &str) -> Result<()>;

    /// Number of lineage objects around `oid` matching `term`.
    fn term_finder(&self, oid: &str, term: &str) -> Result<usize>;

    /// Owners upstream of `oid`, nearest first.
    fn chain_of_custody(&self, oid: &str) -> Result<Vec<Custodian>>;

    fn time_span(&self, oid: &str) -> Result<TimeSpan>;

    fn object_summary(&self, oid: &str) -> Result<ObjectSummary>;

    fn latest_workflows(&self) -> Result<Vec<WorkflowEntry>>;
}

pub struct RestClient {
    base: String,
    agent: Agent,
}

impl RestClient {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            base: base.trim_end_matches('/').to_owned(),
            agent: Agent::new_with_config(config),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base)
    }

    /// Object ids are sent as a single path segment; `#`, `?` and `/` in
    /// an id must not end the path early.
    fn object_url(&self, prefix: &str, oid: &str, suffix: &str) -> String {
        self.url(&format!("{prefix}{}{suffix}", urlencoding::encode(oid)))
    }

    fn taint_url(&self, oid: &str) -> String {
        self.object_url("object/taint/", oid, "")
    }

    fn get_json(&self, url: &str) -> Result<String, ureq::Error> {
        self.agent
            .get(url)
            .header("Accept", "application/json")
            .call()?
            .body_mut()
            .read_to_string()
    }
}

impl ProvenanceApi for RestClient {
    fn fetch_graph(&self, oid: &str, settings: &TraversalSettings) -> Result<ProvenanceGraph> {
        let url = self.object_url("graph/", oid, "");
        debug!(url = %url, "fetching provenance graph");

        let request = settings
            .query_pairs()
            .into_iter()
            .fold(self.agent.get(&url), |request, (key, value)| request.query(key, value));
        let body = request
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("graph request for {oid} failed"))?
            .body_mut()
            .read_to_string()
            .with_context(|| format!("could not read graph response for {oid}"))?;

        parse_graph(&body).with_context(|| format!("failed to parse graph for {oid}"))
    }

    fn taint_sources(&self, oid: &str) -> Result<usize> {
        let body = self
            .agent
            .get(&self.taint_url(oid))
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("taint lookup for {oid} failed"))?
            .body_mut()
            .read_to_string()
            .with_context(|| format!("could not read taint lookup for {oid}"))?;

        count_nodes(&body).with_context(|| format!("failed to parse taint lookup for {oid}"))
    }

    fn assert_taint(&self, oid: &str, reason: &str) -> Result<()> {
        if reason.trim().is_empty() {
            bail!("a reason is required to mark {oid} as tainted");
        }

        self.agent
            .post(&self.taint_url(oid))
            .send_form([("reason", reason)])
            .with_context(|| format!("marking {oid} as tainted failed"))?;
        Ok(())
    }

    fn delete_taint(&self, oid: &str) -> Result<()> {
        self.agent
            .delete(&self.taint_url(oid))
            .call()
            .with_context(|| format!("removing taint from {oid} failed"))?;
        Ok(())
    }

    fn term_finder(&self, oid: &str, term: &str) -> Result<usize> {
        let body = self
            .agent
            .get(&self.object_url("fitness/", oid, "/termFinder"))
            .query("term", term)
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("term search for `{term}` around {oid} failed"))?
            .body_mut()
            .read_to_string()
            .with_context(|| format!("could not read term search for {oid}"))?;

        count_nodes(&body).with_context(|| format!("failed to parse term search for {oid}"))
    }

    fn chain_of_custody(&self, oid: &str) -> Result<Vec<Custodian>> {
        let body = self
            .get_json(&self.object_url("fitness/", oid, "/custody"))
            .with_context(|| format!("custody lookup for {oid} failed"))?;
        parse_custody(&body).with_context(|| format!("failed to parse custody of {oid}"))
    }

    fn time_span(&self, oid: &str) -> Result<TimeSpan> {
        let body = self
            .get_json(&self.object_url("fitness/", oid, "/timelag"))
            .with_context(|| format!("time span lookup for {oid} failed"))?;
        parse_time_span(&body).with_context(|| format!("failed to parse time span of {oid}"))
    }

    fn object_summary(&self, oid: &str) -> Result<ObjectSummary> {
        let body = self
            .get_json(&self.object_url("fitness/", oid, "/summary"))
            .with_context(|| format!("summary lookup for {oid} failed"))?;
        parse_summary(&body).with_context(|| format!("failed to parse summary of {oid}"))
    }

    fn latest_workflows(&self) -> Result<Vec<WorkflowEntry>> {
        let body = self
            .get_json(&self.url("workflow/latest"))
            .context("workflow listing failed")?;
        parse_workflows(&body).context("failed to parse workflow listing")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_under_the_api_root() {
        let client = RestClient::new("http://localhost:8080/plus/", Duration::from_secs(1));
        assert_eq!(
            client.taint_url("urn-uuid-1"),
            "http://localhost:8080/plus/api/object/taint/urn-uuid-1"
        );
        assert_eq!(
            client.url("workflow/latest"),
            "http://localhost:8080/plus/api/workflow/latest"
        );
    }

    #[test]
    fn object_ids_are_encoded_as_one_path_segment() {
        let client = RestClient::new("http://localhost:8080/plus", Duration::from_secs(1));
        assert_eq!(
            client.taint_url("#3"),
            "http://localhost:8080/plus/api/object/taint/%233"
        );
        assert_eq!(
            client.object_url("fitness/", "a b?c/d", "/custody"),
            "http://localhost:8080/plus/api/fitness/a%20b%3Fc%2Fd/custody"
        );
        assert_eq!(
            client.object_url("graph/", "urn:uuid:1", ""),
            "http://localhost:8080/plus/api/graph/urn%3Auuid%3A1"
        );
    }

    #[test]
    fn empty_reason_is_rejected_before_any_request() {
        let client = RestClient::new("http://127.0.0.1:9", Duration::from_millis(50));
        let error = client.assert_taint("x", "  ").expect_err("reason required");
        assert!(error.to_string().contains("reason"));
    }
}
