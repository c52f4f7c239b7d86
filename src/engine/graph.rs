use std::collections::BTreeMap;
use std::fmt;

use eframe::egui::Vec2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Data,
    Invocation,
    Workflow,
    Activity,
    Marking,
    NonProvenance,
    Other(String),
}

impl NodeKind {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "invocation" => Self::Invocation,
            "workflow" => Self::Workflow,
            "activity" => Self::Activity,
            "heritable" => Self::Marking,
            "npid" => Self::NonProvenance,
            // "data" is also the prefix of the older "dataObject" tag
            other if other.starts_with("data") => Self::Data,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Data => "data",
            Self::Invocation => "invocation",
            Self::Workflow => "workflow",
            Self::Activity => "activity",
            Self::Marking => "heritable",
            Self::NonProvenance => "npid",
            Self::Other(value) => value,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

/// Position hints the server attaches to a node of the fetched lineage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeTags {
    pub head: bool,
    pub foot: bool,
    pub more: bool,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub subtype: String,
    pub label: String,
    pub owner: Option<String>,
    pub created: Option<i64>,
    pub metadata: BTreeMap<String, MetadataValue>,
    pub tags: NodeTags,
    pub taint: bool,
    pub rank: usize,
    pub order: usize,
    pub function: String,
    pub position: Vec2,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            subtype: String::new(),
            label: label.into(),
            owner: None,
            created: None,
            metadata: BTreeMap::new(),
            tags: NodeTags::default(),
            taint: false,
            rank: 0,
            order: 0,
            function: String::from(UNKNOWN_FUNCTION),
            position: Vec2::ZERO,
        }
    }

    #[cfg(test)]
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = subtype.into();
        self
    }

    #[cfg(test)]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn is_taint_marker(&self) -> bool {
        self.subtype == "taint"
    }

    pub fn owner_key(&self) -> &str {
        self.owner.as_deref().unwrap_or_default()
    }
}

pub const UNKNOWN_FUNCTION: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    Provenance,
    NonProvenance,
}

impl EdgeKind {
    pub fn from_wire(value: &str) -> Self {
        if value == "npe" {
            Self::NonProvenance
        } else {
            Self::Provenance
        }
    }
}

/// An edge between two nodes of the store. `source`/`target` are indices into
/// the node array; `left`/`right` carry the arrowheads. `from`/`to` are the raw
/// identifiers taint follows and may name objects that are not nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub left: bool,
    pub right: bool,
    pub kind: EdgeKind,
    pub from: Option<String>,
    pub to: Option<String>,
    pub label: String,
}

impl Edge {
    /// Tail and head of the edge as drawn. A left-only arrow flips it.
    pub fn directed(&self) -> (usize, usize) {
        if self.left && !self.right {
            (self.target, self.source)
        } else {
            (self.source, self.target)
        }
    }

    pub fn touches(&self, index: usize) -> bool {
        self.source == index || self.target == index
    }
}

/// Edge as delivered by the server, still addressed by (possibly invalid)
/// positions in the node array.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkRecord {
    pub source: i64,
    pub target: i64,
    pub left: bool,
    pub right: bool,
    pub kind: EdgeKind,
    pub from: Option<String>,
    pub to: Option<String>,
    pub label: String,
}

#[cfg(test)]
impl LinkRecord {
    pub fn new(source: i64, target: i64) -> Self {
        Self {
            source,
            target,
            left: false,
            right: false,
            kind: EdgeKind::Provenance,
            from: None,
            to: None,
            label: String::new(),
        }
    }

    pub fn with_endpoints(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self.to = Some(to.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub links: Vec<LinkRecord>,
}
