//! Static checks on input records
//!
//! This module validates a dataset before a simulation is built, so that
//! broken cross references never reach the physics loop.

use crate::error::{ConstructionError, LinkEnd};
use crate::records::GraphData;
use std::collections::HashSet;

/// Analyze a dataset and return every construction error found, in input order
pub fn analyze_graph(data: &GraphData) -> Vec<ConstructionError> {
    let mut errors = Vec::new();

    // Node identities must be unique
    let mut ids: HashSet<&str> = HashSet::with_capacity(data.nodes.len());
    for node in &data.nodes {
        if !ids.insert(node.id.as_str()) {
            errors.push(ConstructionError::DuplicateNode(node.id.clone()));
        }
    }

    // Links must resolve both ends and carry a usable value
    for (index, link) in data.links.iter().enumerate() {
        if !ids.contains(link.source.as_str()) {
            errors.push(ConstructionError::UnknownNode {
                index,
                end: LinkEnd::Source,
                id: link.source.clone(),
            });
        }
        if !ids.contains(link.target.as_str()) {
            errors.push(ConstructionError::UnknownNode {
                index,
                end: LinkEnd::Target,
                id: link.target.clone(),
            });
        }
        if !link.value.is_finite() || link.value < 0.0 {
            errors.push(ConstructionError::InvalidLinkValue {
                index,
                value: link.value,
            });
        }
    }

    errors
}

/// Returns the first construction error, if any
pub fn check_graph(data: &GraphData) -> Result<(), ConstructionError> {
    match analyze_graph(data).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
