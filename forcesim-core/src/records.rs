//! Input records handed over by the data-loading side
//!
//! These mirror the usual `{ "nodes": [...], "links": [...] }` JSON shape of
//! graph datasets. Nothing here is validated; see [`crate::analyzer`].

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque category tag. Only collaborators (e.g. color policy) look at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupTag {
    Number(i64),
    Label(String),
}

impl fmt::Display for GroupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupTag::Number(n) => write!(f, "{}", n),
            GroupTag::Label(s) => f.write_str(s),
        }
    }
}

/// Node declaration: identity, optional group and optional initial position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: None,
            x: None,
            y: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_group(mut self, group: GroupTag) -> Self {
        self.group = Some(group);
        self
    }
}

/// Link declaration between two node identities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    #[serde(default = "default_link_value")]
    pub value: f64,
}

fn default_link_value() -> f64 {
    1.0
}

impl LinkRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value: default_link_value(),
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }
}

/// A complete dataset: the node list and the link list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl GraphData {
    pub fn new(nodes: Vec<NodeRecord>, links: Vec<LinkRecord>) -> Self {
        Self { nodes, links }
    }

    /// Parse a dataset from its JSON text
    pub fn from_json_str(source: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Read and parse a JSON dataset from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }
}
