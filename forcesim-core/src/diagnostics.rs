//! Data-quality reporting for running simulations
//!
//! Numerical anomalies found during a step never abort it. They are
//! recovered locally and recorded here so that hosts can inspect them.

use crate::engine::NodeId;
use std::fmt;

/// A recovered numerical anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataQualityWarning {
    /// Node position is NaN or infinite; left out of the spatial index and
    /// the centroid for this step
    NonFinitePosition(NodeId),
    /// Link endpoints produced a non-finite separation; link skipped
    NonFiniteLink { link: usize },
    /// Accumulated force was NaN or infinite; clamped to zero
    NonFiniteForce(NodeId),
}

impl DataQualityWarning {
    /// Node the warning is about, if any
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            DataQualityWarning::NonFinitePosition(id)
            | DataQualityWarning::NonFiniteForce(id) => Some(id),
            DataQualityWarning::NonFiniteLink { .. } => None,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::NonFinitePosition(id) => {
                write!(f, "node #{} has a non-finite position", id.0)
            }
            DataQualityWarning::NonFiniteLink { link } => {
                write!(f, "link #{} has a non-finite separation", link)
            }
            DataQualityWarning::NonFiniteForce(id) => {
                write!(f, "node #{} accumulated a non-finite force", id.0)
            }
        }
    }
}

/// Warnings collected during one step
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<DataQualityWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: DataQualityWarning) {
        self.warnings.push(warning);
    }

    pub fn clear(&mut self) {
        self.warnings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataQualityWarning> {
        self.warnings.iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DataQualityWarning;
    type IntoIter = std::slice::Iter<'a, DataQualityWarning>;

    fn into_iter(self) -> Self::IntoIter {
        self.warnings.iter()
    }
}
