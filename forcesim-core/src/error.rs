//! Error types for building and driving a simulation.

use std::fmt;
use thiserror::Error;

/// Which end of a link an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    Source,
    Target,
}

impl fmt::Display for LinkEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkEnd::Source => f.write_str("source"),
            LinkEnd::Target => f.write_str("target"),
        }
    }
}

/// Problems in the input data or configuration. A simulation is never
/// created when one of these is found.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("link {index} references unknown {end} node '{id}'")]
    UnknownNode {
        index: usize,
        end: LinkEnd,
        id: String,
    },

    #[error("link {index} has invalid value {value} (must be finite and non-negative)")]
    InvalidLinkValue { index: usize, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A drag event that the engine refused. The simulation is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("no node with id '{0}'")]
    UnknownNode(String),

    #[error("node '{0}' is not being dragged")]
    NotDragging(String),
}

/// Failure to read a dataset or configuration file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
