//! Simulation configuration
//!
//! Every field has a default, and the whole structure deserializes from a
//! partial JSON object, so a config file only needs the values it changes.

use crate::error::ConstructionError;
use serde::{Deserialize, Serialize};

const DEFAULT_ALPHA_MIN: f64 = 0.001;
const DEFAULT_ITERATIONS: u32 = 300;

/// Top-level simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Temperature floor; the engine settles once alpha drops to it
    pub alpha_min: f64,
    /// Per-step cooling rate toward `alpha_target`
    pub alpha_decay: f64,
    /// Resting temperature
    pub alpha_target: f64,
    /// Friction applied to velocities each step, in [0, 1)
    pub velocity_decay: f64,
    /// Temperature held while at least one node is dragged
    pub drag_alpha_target: f64,
    pub many_body: ManyBodyConfig,
    pub link: LinkConfig,
    pub center: CenterConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: alpha_decay_for(DEFAULT_ALPHA_MIN, DEFAULT_ITERATIONS),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            many_body: ManyBodyConfig::default(),
            link: LinkConfig::default(),
            center: CenterConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Derive `alpha_decay` so that alpha reaches `alpha_min` after
    /// `iterations` steps
    pub fn with_target_iterations(mut self, iterations: u32) -> Self {
        self.alpha_decay = alpha_decay_for(self.alpha_min, iterations);
        self
    }

    /// Center the layout on the midpoint of a `width` x `height` viewport
    pub fn for_viewport(mut self, width: f64, height: f64) -> Self {
        self.center.x = width / 2.0;
        self.center.y = height / 2.0;
        self
    }

    pub fn validate(&self) -> Result<(), ConstructionError> {
        let invalid = |msg: String| Err(ConstructionError::InvalidConfig(msg));

        if !(self.alpha_min > 0.0 && self.alpha_min <= 1.0) {
            return invalid(format!("alpha_min must be in (0, 1], got {}", self.alpha_min));
        }
        if !(0.0..=1.0).contains(&self.alpha_decay) {
            return invalid(format!("alpha_decay must be in [0, 1], got {}", self.alpha_decay));
        }
        if !(0.0..=1.0).contains(&self.alpha_target) {
            return invalid(format!("alpha_target must be in [0, 1], got {}", self.alpha_target));
        }
        if !(0.0..=1.0).contains(&self.drag_alpha_target) {
            return invalid(format!(
                "drag_alpha_target must be in [0, 1], got {}",
                self.drag_alpha_target
            ));
        }
        if !(0.0..1.0).contains(&self.velocity_decay) {
            return invalid(format!(
                "velocity_decay must be in [0, 1), got {}",
                self.velocity_decay
            ));
        }
        if !(self.many_body.theta >= 0.0 && self.many_body.theta.is_finite()) {
            return invalid(format!("theta must be finite and >= 0, got {}", self.many_body.theta));
        }
        if !(self.many_body.distance_min > 0.0 && self.many_body.distance_min.is_finite()) {
            return invalid(format!(
                "distance_min must be finite and > 0, got {}",
                self.many_body.distance_min
            ));
        }
        if let Some(max) = self.many_body.distance_max {
            if !(max > self.many_body.distance_min) {
                return invalid(format!("distance_max must exceed distance_min, got {}", max));
            }
        }
        if !self.many_body.strength.value().is_finite() {
            return invalid("many-body strength must be finite".to_string());
        }
        if !(self.center.x.is_finite() && self.center.y.is_finite()) {
            return invalid("center target must be finite".to_string());
        }
        if !(self.center.strength > 0.0 && self.center.strength <= 1.0) {
            return invalid(format!(
                "center strength must be in (0, 1], got {}",
                self.center.strength
            ));
        }
        match self.link.distance {
            LinkDistance::Constant(d) if !(d >= 0.0 && d.is_finite()) => {
                return invalid(format!("link distance must be finite and >= 0, got {}", d));
            }
            LinkDistance::DegreeScaled { base, spread }
                if !(base >= 0.0 && spread >= 0.0 && base.is_finite() && spread.is_finite()) =>
            {
                return invalid(
                    "degree-scaled link distance needs finite, non-negative terms".to_string(),
                );
            }
            _ => {}
        }
        if let LinkStrength::Constant(k) = self.link.strength {
            if !(k >= 0.0 && k.is_finite()) {
                return invalid(format!("link strength must be finite and >= 0, got {}", k));
            }
        }
        Ok(())
    }
}

/// `1 - alpha_min^(1/iterations)`
pub fn alpha_decay_for(alpha_min: f64, iterations: u32) -> f64 {
    if iterations == 0 {
        return 1.0;
    }
    1.0 - alpha_min.powf(1.0 / f64::from(iterations))
}

/// Per-node charge policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStrength {
    /// Same strength for every node
    Constant(f64),
    /// Strength multiplied by the node degree (at least 1)
    DegreeWeighted(f64),
}

impl ChargeStrength {
    pub fn value(&self) -> f64 {
        match *self {
            ChargeStrength::Constant(s) | ChargeStrength::DegreeWeighted(s) => s,
        }
    }

    pub fn for_degree(&self, degree: usize) -> f64 {
        match *self {
            ChargeStrength::Constant(s) => s,
            ChargeStrength::DegreeWeighted(s) => s * degree.max(1) as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManyBodyConfig {
    /// Negative repels, positive attracts
    pub strength: ChargeStrength,
    /// Barnes-Hut accuracy; 0 is exact
    pub theta: f64,
    pub distance_min: f64,
    /// `None` means unbounded
    pub distance_max: Option<f64>,
    /// Use the quadtree (true) or exact pairwise summation (false)
    pub approximate: bool,
}

impl Default for ManyBodyConfig {
    fn default() -> Self {
        Self {
            strength: ChargeStrength::Constant(-30.0),
            theta: 0.9,
            distance_min: 1.0,
            distance_max: None,
            approximate: true,
        }
    }
}

/// Target separation policy for links
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDistance {
    Constant(f64),
    /// `base + spread * (sqrt(deg(source) * deg(target)) - 1)`
    DegreeScaled { base: f64, spread: f64 },
}

impl LinkDistance {
    pub fn between(&self, source_degree: usize, target_degree: usize) -> f64 {
        match *self {
            LinkDistance::Constant(d) => d,
            LinkDistance::DegreeScaled { base, spread } => {
                let geometric = ((source_degree.max(1) * target_degree.max(1)) as f64).sqrt();
                base + spread * (geometric - 1.0)
            }
        }
    }
}

/// Spring stiffness policy for links
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrength {
    /// `1 / min(deg(source), deg(target))`
    DegreeNormalized,
    /// `value / min(deg(source), deg(target))`
    ValueScaled,
    Constant(f64),
}

impl LinkStrength {
    pub fn between(&self, source_degree: usize, target_degree: usize, value: f64) -> f64 {
        let min_degree = source_degree.min(target_degree).max(1) as f64;
        match *self {
            LinkStrength::DegreeNormalized => 1.0 / min_degree,
            LinkStrength::ValueScaled => value / min_degree,
            LinkStrength::Constant(k) => k,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub distance: LinkDistance,
    pub strength: LinkStrength,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            distance: LinkDistance::DegreeScaled {
                base: 30.0,
                spread: 5.0,
            },
            strength: LinkStrength::DegreeNormalized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    pub x: f64,
    pub y: f64,
    /// Fraction of the centroid offset removed per step, in (0, 1]
    pub strength: f64,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            strength: 1.0,
        }
    }
}
