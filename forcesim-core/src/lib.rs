pub mod analyzer;
pub mod config;
pub mod diagnostics;
pub mod drag;
pub mod engine;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod quadtree;
pub mod records;
pub mod runtime;

pub use analyzer::{analyze_graph, check_graph};
pub use config::{
    CenterConfig, ChargeStrength, LinkConfig, LinkDistance, LinkStrength, ManyBodyConfig,
    SimulationConfig,
};
pub use diagnostics::{DataQualityWarning, Diagnostics};
pub use drag::DragController;
pub use engine::{Graph, Link, Node, NodeId};
pub use error::{ConstructionError, InteractionError, LinkEnd, LoadError};
pub use forces::{CenterForce, ForceAccumulator, ForceModel, Jitter, LinkForce, ManyBody};
pub use integrator::SimulationState;
pub use quadtree::SpatialIndex;
pub use records::{GraphData, GroupTag, LinkRecord, NodeRecord};
pub use runtime::{
    invalidation, Frame, Invalidation, InvalidationSignal, LinkSegment, NodeView, Phase,
    Simulation, TickObserver,
};

pub use glam::DVec2;
