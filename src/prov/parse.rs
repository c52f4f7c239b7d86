use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

use super::model::{Custodian, ObjectSummary, ProvenanceGraph, RawGraph, TimeSpan, WorkflowEntry};

pub fn parse_graph(raw: &str) -> Result<ProvenanceGraph> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON from provenance service")?;
    if !parsed.is_object() {
        return Err(anyhow!("unexpected JSON type for a provenance graph"));
    }

    let graph = RawGraph::deserialize(parsed).context("malformed provenance graph payload")?;
    Ok(graph.into_graph())
}

/// Node count of a graph-shaped reply. Taint lookups and term searches only
/// report whether anything was found; an empty body counts as nothing.
pub fn count_nodes(raw: &str) -> Result<usize> {
    if raw.trim().is_empty() {
        return Ok(0);
    }

    let parsed: Value = serde_json::from_str(raw).context("invalid JSON from provenance service")?;
    match parsed {
        Value::Null => Ok(0),
        Value::Array(items) => Ok(items.len()),
        Value::Object(object) => Ok(object
            .get("nodes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)),
        _ => Err(anyhow!("unexpected JSON type in provenance reply")),
    }
}

/// Owners upstream of an object. Runs of the same owner fold into one entry.
pub fn parse_custody(raw: &str) -> Result<Vec<Custodian>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let custodians: Option<Vec<Custodian>> =
        serde_json::from_str(raw).context("malformed chain of custody")?;
    let mut custodians = custodians.unwrap_or_default();
    custodians.retain(|custodian| !custodian.aid.is_empty());
    custodians.dedup_by(|next, previous| next.aid == previous.aid);
    Ok(custodians)
}

pub fn parse_time_span(raw: &str) -> Result<TimeSpan> {
    serde_json::from_str(raw).context("malformed time span reply")
}

pub fn parse_summary(raw: &str) -> Result<ObjectSummary> {
    serde_json::from_str(raw).context("malformed object summary")
}

/// Workflows arrive as a node-only graph.
pub fn parse_workflows(raw: &str) -> Result<Vec<WorkflowEntry>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let graph = parse_graph(raw).context("malformed workflow listing")?;
    Ok(graph
        .snapshot
        .nodes
        .into_iter()
        .map(|node| WorkflowEntry {
            oid: node.id,
            name: node.label,
            created: node.created,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EdgeKind, MetadataValue, NodeKind};

    const SAMPLE: &str = r#"{
        "nodes": [
            {
                "id": "urn:uuid:plus:1",
                "oid": "urn:uuid:plus:1",
                "type": "data",
                "subtype": "file",
                "name": "NTUSER.DAT",
                "label": "NTUSER.DAT",
                "ownerid": "",
                "created": 1376453531059,
                "certainty": "100%",
                "privileges": [],
                "metadata": {"plus:reporter": "client 0.5", "plus:reportTime": "1376439131575"}
            },
            {
                "oid": "urn:uuid:plus:2",
                "type": "invocation",
                "name": "copy",
                "ownerid": "actor-7",
                "created": "1376453531999"
            },
            {"id": "hash-3", "type": "npid", "label": null}
        ],
        "links": [
            {"source": 0, "target": 1, "from": "urn:uuid:plus:1", "to": "urn:uuid:plus:2", "left": false, "right": true, "label": "input to"},
            {"source": 0, "target": 2, "from": "urn:uuid:plus:1", "to": "hash-3", "type": "npe", "right": null},
            {"source": -1, "target": 2}
        ],
        "fingerprint": {"startId": "urn:uuid:plus:1", "created": 1, "avgDegree": 1.23456, "ratio": "0.333333", "mode": "bfs"},
        "nodeTags": {"urn:uuid:plus:2": {"head": true, "foot": false, "more": true}},
        "actors": [{"aid": "actor-7", "name": "analyst"}]
    }"#;

    #[test]
    fn parses_nodes_links_and_tags() {
        let graph = parse_graph(SAMPLE).expect("sample parses");
        let nodes = &graph.snapshot.nodes;

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].kind, NodeKind::Data);
        assert_eq!(nodes[0].subtype, "file");
        assert_eq!(nodes[0].owner, None);
        assert_eq!(nodes[0].created, Some(1_376_453_531_059));
        assert_eq!(
            nodes[0].metadata.get("certainty"),
            Some(&MetadataValue::Text("100%".to_owned()))
        );
        assert!(!nodes[0].metadata.contains_key("privileges"));

        assert_eq!(nodes[1].id, "urn:uuid:plus:2");
        assert_eq!(nodes[1].label, "copy");
        assert_eq!(nodes[1].owner.as_deref(), Some("actor-7"));
        assert_eq!(nodes[1].created, Some(1_376_453_531_999));
        assert!(nodes[1].tags.head && nodes[1].tags.more && !nodes[1].tags.foot);

        assert_eq!(nodes[2].kind, NodeKind::NonProvenance);
        assert_eq!(nodes[2].label, "hash-3");

        let links = &graph.snapshot.links;
        assert_eq!(links.len(), 3);
        assert!(links[0].right && !links[0].left);
        assert_eq!(links[1].kind, EdgeKind::NonProvenance);
        assert!(!links[1].right);
        assert_eq!(links[2].source, -1);

        assert_eq!(graph.actors.get("actor-7").map(String::as_str), Some("analyst"));
    }

    #[test]
    fn fingerprint_rows_skip_ids_and_round_numbers() {
        let graph = parse_graph(SAMPLE).expect("sample parses");
        let rows = graph
            .fingerprint
            .iter()
            .map(|row| (row.key.as_str(), row.value.as_str()))
            .collect::<Vec<_>>();

        assert_eq!(rows, vec![("avgDegree", "1.23"), ("mode", "bfs"), ("ratio", "0.33")]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let graph = parse_graph(r#"{"nodes": null}"#).expect("empty graph parses");
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.link_count(), 0);
        assert!(graph.fingerprint.is_empty());
    }

    #[test]
    fn link_without_indices_is_marked_invalid() {
        let graph = parse_graph(r#"{"nodes": [{"id": "a"}], "links": [{"from": "a"}]}"#)
            .expect("graph parses");
        assert_eq!(graph.snapshot.links[0].source, -1);
        assert_eq!(graph.snapshot.links[0].target, -1);
    }

    #[test]
    fn rejects_non_object_graphs() {
        assert!(parse_graph("[1, 2]").is_err());
        assert!(parse_graph("not json").is_err());
    }

    #[test]
    fn custody_folds_repeated_owners_and_skips_anonymous_ones() {
        let custody = parse_custody(
            r#"[
                {"aid": "a1", "name": "alice", "type": "person", "created": 5},
                {"aid": "a1", "name": "alice", "type": "person"},
                {"aid": null, "name": "ghost"},
                {"aid": "b2", "name": "lab", "type": null},
                {"aid": "a1", "name": "alice", "type": "person"}
            ]"#,
        )
        .expect("custody parses");

        let owners = custody
            .iter()
            .map(|custodian| (custodian.aid.as_str(), custodian.kind.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(owners, vec![("a1", "person"), ("b2", ""), ("a1", "person")]);
        assert!(parse_custody("null").expect("null body").is_empty());
        assert!(parse_custody("{}").is_err());
    }

    #[test]
    fn time_span_and_summary_read_their_fields() {
        let span = parse_time_span(r#"{"oldest": "urn:1", "newest": "urn:9", "timespan": "3 days"}"#)
            .expect("span parses");
        assert_eq!(span.oldest, "urn:1");
        assert_eq!(span.description, "3 days");

        let summary = parse_summary(
            r#"{"name": "report.pdf", "type": "data/file", "created": "Tue Aug 13", "summary": "report.pdf (data/file)"}"#,
        )
        .expect("summary parses");
        assert_eq!(summary.kind, "data/file");
        assert_eq!(summary.summary, "report.pdf (data/file)");
    }

    #[test]
    fn workflows_are_listed_from_a_node_collection() {
        let workflows = parse_workflows(
            r#"{"nodes": [{"oid": "wf-1", "name": "nightly import", "created": 10}, {"id": "wf-2"}]}"#,
        )
        .expect("listing parses");

        assert_eq!(workflows.len(), 2);
        assert_eq!(workflows[0].name, "nightly import");
        assert_eq!(workflows[0].created, Some(10));
        assert_eq!(workflows[1].name, "wf-2");
        assert!(parse_workflows("").expect("empty body").is_empty());
    }

    #[test]
    fn counts_nodes_of_graph_shaped_replies() {
        assert_eq!(count_nodes(r#"{"nodes": [{}, {}], "links": []}"#).expect("valid"), 2);
        assert_eq!(count_nodes(r#"{"links": []}"#).expect("valid"), 0);
        assert_eq!(count_nodes("").expect("empty body"), 0);
        assert_eq!(count_nodes("null").expect("null body"), 0);
        assert!(count_nodes("42").is_err());
    }
}
