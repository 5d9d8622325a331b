use crate::engine::Node;
use crate::forces::{CenterForce, ForceAccumulator};
use glam::DVec2;

/// Temperature and friction of a running simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationState {
    pub alpha: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub alpha_target: f64,
    pub velocity_decay: f64,
}

impl SimulationState {
    /// Move alpha one step toward `alpha_target`
    pub fn cool(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
    }

    pub fn is_settled(&self) -> bool {
        self.alpha <= self.alpha_min
    }
}

/// Apply one step of accumulated forces to velocities and positions.
///
/// Pinned nodes still update their velocity but their position is forced to
/// the pin.
pub fn integrate(nodes: &mut [Node], forces: &ForceAccumulator, state: &SimulationState) {
    let friction = 1.0 - state.velocity_decay;
    for (i, node) in nodes.iter_mut().enumerate() {
        node.vel = (node.vel + forces.get(i) * state.alpha) * friction;
        match node.pin {
            Some(pin) => node.pos = pin,
            None => node.pos += node.vel,
        }
    }
}

/// Shift every unpinned node with a finite position by `offset`
pub fn translate(nodes: &mut [Node], offset: DVec2) {
    for node in nodes.iter_mut().filter(|n| n.pin.is_none() && n.is_finite()) {
        node.pos += offset;
    }
}

/// Full integration phase of a step: forces, then centering on the new
/// positions, then cooling
pub fn step(
    nodes: &mut [Node],
    forces: &ForceAccumulator,
    center: &CenterForce,
    state: &mut SimulationState,
) {
    integrate(nodes, forces, state);
    if let Some(offset) = center.translation(nodes) {
        translate(nodes, offset);
    }
    state.cool();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SimulationState {
        SimulationState {
            alpha: 0.5,
            alpha_min: 0.001,
            alpha_decay: 0.1,
            alpha_target: 0.0,
            velocity_decay: 0.4,
        }
    }

    #[test]
    fn cooling_moves_alpha_toward_target() {
        let mut s = state();
        s.cool();
        assert!((s.alpha - 0.45).abs() < 1e-12);

        s.alpha_target = 1.0;
        s.cool();
        assert!(s.alpha > 0.45);
    }

    #[test]
    fn settles_at_alpha_min() {
        let mut s = state();
        s.alpha = 0.001;
        assert!(s.is_settled());
        s.alpha = 0.0011;
        assert!(!s.is_settled());
    }
}
