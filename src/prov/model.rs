use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::engine::{EdgeKind, LinkRecord, MetadataValue, Node, NodeKind, NodeTags, Snapshot};

/// Extra node fields that are never shown; everything else a node carries
/// beyond the named fields ends up in its metadata.
const HIDDEN_FIELDS: [&str; 6] = ["workflow", "activity", "privileges", "x", "y", "index"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawGraph {
    #[serde(deserialize_with = "null_as_default")]
    pub(super) nodes: Vec<RawNode>,
    #[serde(deserialize_with = "null_as_default")]
    pub(super) links: Vec<RawLink>,
    #[serde(deserialize_with = "null_as_default")]
    pub(super) fingerprint: BTreeMap<String, Value>,
    #[serde(rename = "nodeTags", deserialize_with = "null_as_default")]
    pub(super) node_tags: HashMap<String, RawTags>,
    #[serde(deserialize_with = "null_as_default")]
    pub(super) actors: Vec<RawActor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawNode {
    pub(super) id: Option<String>,
    pub(super) oid: Option<String>,
    #[serde(rename = "type")]
    pub(super) kind: Option<String>,
    pub(super) subtype: Option<String>,
    pub(super) label: Option<String>,
    pub(super) name: Option<String>,
    pub(super) ownerid: Option<String>,
    pub(super) created: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub(super) metadata: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub(super) extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawLink {
    #[serde(default = "missing_index")]
    pub(super) source: i64,
    #[serde(default = "missing_index")]
    pub(super) target: i64,
    #[serde(default)]
    pub(super) from: Option<String>,
    #[serde(default)]
    pub(super) to: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(super) left: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(super) right: bool,
    #[serde(default, rename = "type")]
    pub(super) kind: Option<String>,
    #[serde(default)]
    pub(super) label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawTags {
    #[serde(deserialize_with = "null_as_default")]
    pub(super) head: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub(super) foot: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub(super) more: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawActor {
    pub(super) aid: Option<String>,
    pub(super) name: Option<String>,
}

fn missing_index() -> i64 {
    -1
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A fetched lineage graph: the engine snapshot plus what only the panels
/// show.
#[derive(Clone, Debug, Default)]
pub struct ProvenanceGraph {
    pub snapshot: Snapshot,
    pub fingerprint: Vec<FingerprintRow>,
    pub actors: BTreeMap<String, String>,
}

impl ProvenanceGraph {
    pub fn node_count(&self) -> usize {
        self.snapshot.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.snapshot.links.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FingerprintRow {
    pub key: String,
    pub value: String,
}

/// An owner somewhere upstream of an object.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Custodian {
    #[serde(deserialize_with = "null_as_default")]
    pub aid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
}

/// Oldest and newest ancestors of an object and the distance between them.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeSpan {
    #[serde(deserialize_with = "null_as_default")]
    pub oldest: String,
    #[serde(deserialize_with = "null_as_default")]
    pub newest: String,
    #[serde(rename = "timespan", deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
}

/// A recently reported workflow, listed for browsing.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowEntry {
    pub oid: String,
    pub name: String,
    pub created: Option<i64>,
}

impl RawGraph {
    pub(super) fn into_graph(self) -> ProvenanceGraph {
        let RawGraph {
            nodes,
            links,
            fingerprint,
            node_tags,
            actors,
        } = self;

        let nodes = nodes
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.into_node(index, &node_tags))
            .collect();
        let links = links.into_iter().map(RawLink::into_record).collect();
        let actors = actors
            .into_iter()
            .filter_map(|actor| Some((actor.aid?, actor.name.unwrap_or_default())))
            .collect();

        ProvenanceGraph {
            snapshot: Snapshot { nodes, links },
            fingerprint: fingerprint_rows(&fingerprint),
            actors,
        }
    }
}

impl RawNode {
    fn into_node(self, index: usize, tags: &HashMap<String, RawTags>) -> Node {
        // nodes without any identifier still need a unique key within the snapshot
        let id = self
            .id
            .or(self.oid)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("#{index}"));
        let label = self
            .label
            .or(self.name)
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| id.clone());
        let kind = NodeKind::from_wire(self.kind.as_deref().unwrap_or_default());

        let mut node = Node::new(id, kind, label);
        node.subtype = self.subtype.unwrap_or_default();
        node.owner = self.ownerid.filter(|owner| !owner.is_empty());
        node.created = self.created.as_ref().and_then(parse_created);
        node.metadata = self
            .metadata
            .iter()
            .chain(
                self.extra
                    .iter()
                    .filter(|(key, _)| !HIDDEN_FIELDS.contains(&key.as_str())),
            )
            .filter_map(|(key, value)| Some((key.clone(), metadata_value(value)?)))
            .collect();
        if let Some(raw) = tags.get(&node.id) {
            node.tags = NodeTags {
                head: raw.head,
                foot: raw.foot,
                more: raw.more,
            };
        }
        node
    }
}

impl RawLink {
    fn into_record(self) -> LinkRecord {
        let kind = EdgeKind::from_wire(self.kind.as_deref().unwrap_or_default());
        LinkRecord {
            source: self.source,
            target: self.target,
            left: self.left,
            right: self.right,
            kind,
            from: self.from,
            to: self.to,
            label: self.label.unwrap_or_default(),
        }
    }
}

/// Epoch milliseconds, sent either as a number or as a numeric string.
fn parse_created(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn metadata_value(value: &Value) -> Option<MetadataValue> {
    match value {
        Value::Null => None,
        Value::Number(number) => number.as_f64().map(MetadataValue::Number),
        Value::String(text) => Some(MetadataValue::Text(text.clone())),
        Value::Bool(flag) => Some(MetadataValue::Text(flag.to_string())),
        Value::Array(items) => Some(MetadataValue::Text(
            items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        )),
        Value::Object(_) => Some(MetadataValue::Text(value.to_string())),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Rows for the graph statistics table. Identifier-like keys and the
/// creation time are skipped; numeric values are rounded to two decimals.
pub fn fingerprint_rows(fingerprint: &BTreeMap<String, Value>) -> Vec<FingerprintRow> {
    fingerprint
        .iter()
        .filter(|(key, _)| !key.contains("Id") && key.as_str() != "created")
        .map(|(key, value)| FingerprintRow {
            key: key.clone(),
            value: format_stat(value),
        })
        .collect()
}

fn format_stat(value: &Value) -> String {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if !text.trim().is_empty() => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(number) => {
            let rounded = (number * 100.0).round() / 100.0;
            format!("{rounded}")
        }
        None => match value {
            Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
            Value::Null => String::new(),
            other => display_value(other),
        },
    }
}
