//! Pointer drag sessions
//!
//! Each session pins one node to the pointer. While any session is active
//! the simulation is held warm at `drag_alpha_target`, so the rest of the
//! graph keeps reacting to the dragged node.

use crate::engine::NodeId;
use crate::error::InteractionError;
use crate::runtime::Simulation;
use glam::DVec2;
use std::collections::BTreeSet;

/// Translates begin/drag/end events into pins and temperature changes.
///
/// Holds no node data; only the identities of the nodes its sessions pin.
#[derive(Debug, Default)]
pub struct DragController {
    active: BTreeSet<NodeId>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dragging `id` at `pointer`. The first concurrent session
    /// reheats the simulation.
    pub fn begin(
        &mut self,
        sim: &mut Simulation,
        id: &str,
        pointer: DVec2,
    ) -> Result<(), InteractionError> {
        let index = resolve(sim, id)?;

        if self.active.is_empty() {
            let warm = sim.config().drag_alpha_target;
            sim.reheat(warm);
        }
        self.active.insert(index);
        pin(sim, id, Some(pointer));
        tracing::debug!(node = id, x = pointer.x, y = pointer.y, "drag started");
        Ok(())
    }

    /// Move the pin of a dragged node
    pub fn drag(
        &mut self,
        sim: &mut Simulation,
        id: &str,
        pointer: DVec2,
    ) -> Result<(), InteractionError> {
        let index = resolve(sim, id)?;
        if !self.active.contains(&index) {
            return Err(reject(InteractionError::NotDragging(id.to_string())));
        }
        pin(sim, id, Some(pointer));
        Ok(())
    }

    /// Release a dragged node back to physics. The last session to end lets
    /// the simulation cool again.
    pub fn end(&mut self, sim: &mut Simulation, id: &str) -> Result<(), InteractionError> {
        let index = resolve(sim, id)?;
        if !self.active.remove(&index) {
            return Err(reject(InteractionError::NotDragging(id.to_string())));
        }
        pin(sim, id, None);
        if self.active.is_empty() {
            let resting = sim.config().alpha_target;
            sim.set_alpha_target(resting);
        }
        tracing::debug!(node = id, "drag ended");
        Ok(())
    }

    pub fn is_dragging(&self, sim: &Simulation, id: &str) -> bool {
        sim.graph()
            .lookup(id)
            .is_some_and(|index| self.active.contains(&index))
    }

    pub fn active_sessions(&self) -> usize {
        self.active.len()
    }
}

fn resolve(sim: &Simulation, id: &str) -> Result<NodeId, InteractionError> {
    sim.graph()
        .lookup(id)
        .ok_or_else(|| reject(InteractionError::UnknownNode(id.to_string())))
}

fn pin(sim: &mut Simulation, id: &str, pointer: Option<DVec2>) {
    if let Some(node) = sim.node_mut(id) {
        node.pin = pointer;
    }
}

fn reject(err: InteractionError) -> InteractionError {
    tracing::warn!("ignoring drag event: {}", err);
    err
}
