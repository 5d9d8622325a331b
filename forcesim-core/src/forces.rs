//! Force contributions: many-body charge, link springs and centering
//!
//! Each contribution reads the current node state and adds into a shared
//! [`ForceAccumulator`]. Contributions never read each other's output, so
//! the order in which they run does not matter.

use crate::config::{CenterConfig, LinkConfig, ManyBodyConfig, SimulationConfig};
use crate::diagnostics::{DataQualityWarning, Diagnostics};
use crate::engine::{centroid, Graph, Node, NodeId};
use crate::quadtree::{CellKind, IndexPoint, SpatialIndex};
use glam::DVec2;

/// Small deterministic noise used to separate coincident points.
///
/// Linear congruential generator with the classic Numerical Recipes
/// constants, scaled to +/- 5e-7.
#[derive(Debug, Clone)]
pub struct Jitter {
    state: u32,
}

impl Jitter {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn sample(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (f64::from(self.state) / 4_294_967_296.0 - 0.5) * 1e-6
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Per-node force totals for one step
#[derive(Debug, Clone, PartialEq)]
pub struct ForceAccumulator {
    forces: Vec<DVec2>,
}

impl ForceAccumulator {
    pub fn zeroed(len: usize) -> Self {
        Self {
            forces: vec![DVec2::ZERO; len],
        }
    }

    pub fn add(&mut self, index: usize, force: DVec2) {
        self.forces[index] += force;
    }

    pub fn get(&self, index: usize) -> DVec2 {
        self.forces[index]
    }

    pub fn as_slice(&self) -> &[DVec2] {
        &self.forces
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// Clamp non-finite totals to zero, recording each one
    pub fn sanitize(&mut self, diagnostics: &mut Diagnostics) {
        for (i, force) in self.forces.iter_mut().enumerate() {
            if !force.is_finite() {
                *force = DVec2::ZERO;
                diagnostics.push(DataQualityWarning::NonFiniteForce(NodeId(i)));
            }
        }
    }
}

/// Pairwise charge between all nodes
#[derive(Debug, Clone)]
pub struct ManyBody {
    strengths: Vec<f64>,
    theta2: f64,
    distance_min2: f64,
    distance_max2: f64,
    approximate: bool,
}

impl ManyBody {
    pub fn new(config: &ManyBodyConfig, graph: &Graph) -> Self {
        let strengths = graph
            .nodes
            .iter()
            .map(|node| config.strength.for_degree(node.degree()))
            .collect();
        let distance_max2 = config.distance_max.map_or(f64::INFINITY, |d| d * d);
        Self {
            strengths,
            theta2: config.theta * config.theta,
            distance_min2: config.distance_min * config.distance_min,
            distance_max2,
            approximate: config.approximate,
        }
    }

    pub fn strength(&self, index: usize) -> f64 {
        self.strengths[index]
    }

    /// Points to feed the spatial index, weighted by charge
    pub fn index_points<'a>(&'a self, graph: &'a Graph) -> impl Iterator<Item = IndexPoint> + 'a {
        graph.nodes.iter().enumerate().map(move |(index, node)| IndexPoint {
            index,
            pos: node.pos,
            weight: self.strengths[index],
        })
    }

    pub fn accumulate(
        &self,
        graph: &Graph,
        index: &SpatialIndex,
        acc: &mut ForceAccumulator,
        jitter: &mut Jitter,
    ) {
        if self.approximate {
            self.accumulate_approximate(graph, index, acc, jitter);
        } else {
            self.accumulate_exact(graph, acc, jitter);
        }
    }

    /// Barnes-Hut traversal of `index`
    pub fn accumulate_approximate(
        &self,
        graph: &Graph,
        index: &SpatialIndex,
        acc: &mut ForceAccumulator,
        jitter: &mut Jitter,
    ) {
        for (i, node) in graph.nodes.iter().enumerate() {
            if !node.is_finite() {
                continue;
            }
            let pos = node.pos;
            let mut force = DVec2::ZERO;
            index.visit(|cell| match &cell.kind {
                CellKind::Leaf(points) => {
                    for point in points.iter().filter(|p| p.index != i && p.weight != 0.0) {
                        force += self.pair(point.pos - pos, point.weight, jitter);
                    }
                    true
                }
                // A cell holding the node itself is never collapsed, or the
                // node would feel its own charge
                CellKind::Branch(_) if cell.contains(pos) => false,
                CellKind::Branch(_) => {
                    let delta = cell.centroid - pos;
                    if cell.width * cell.width < self.theta2 * delta.length_squared() {
                        force += self.pair(delta, cell.mass, jitter);
                        true
                    } else {
                        false
                    }
                }
            });
            acc.add(i, force);
        }
    }

    /// Exhaustive O(n²) summation
    pub fn accumulate_exact(&self, graph: &Graph, acc: &mut ForceAccumulator, jitter: &mut Jitter) {
        for (i, node) in graph.nodes.iter().enumerate() {
            if !node.is_finite() {
                continue;
            }
            let mut force = DVec2::ZERO;
            for (j, other) in graph.nodes.iter().enumerate() {
                if i == j || !other.is_finite() || self.strengths[j] == 0.0 {
                    continue;
                }
                force += self.pair(other.pos - node.pos, self.strengths[j], jitter);
            }
            acc.add(i, force);
        }
    }

    /// Contribution of a charge `strength` located at `delta` from the node
    fn pair(&self, mut delta: DVec2, strength: f64, jitter: &mut Jitter) -> DVec2 {
        if delta.x == 0.0 {
            delta.x = jitter.sample();
        }
        if delta.y == 0.0 {
            delta.y = jitter.sample();
        }
        let mut l = delta.length_squared();
        if l >= self.distance_max2 {
            return DVec2::ZERO;
        }
        if l < self.distance_min2 {
            l = (self.distance_min2 * l).sqrt();
        }
        delta * strength / l
    }
}

/// Spring parameters resolved for one link
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkParams {
    pub distance: f64,
    pub strength: f64,
    /// Share of the correction taken by the target
    pub bias: f64,
}

/// Springs along every link
#[derive(Debug, Clone)]
pub struct LinkForce {
    params: Vec<LinkParams>,
}

impl LinkForce {
    pub fn new(config: &LinkConfig, graph: &Graph) -> Self {
        let params = graph
            .links
            .iter()
            .map(|link| {
                let source = graph.node(link.source).degree();
                let target = graph.node(link.target).degree();
                LinkParams {
                    distance: config.distance.between(source, target),
                    strength: config.strength.between(source, target, link.value),
                    bias: source as f64 / (source + target).max(1) as f64,
                }
            })
            .collect();
        Self { params }
    }

    pub fn params(&self, link: usize) -> LinkParams {
        self.params[link]
    }

    pub fn accumulate(
        &self,
        graph: &Graph,
        acc: &mut ForceAccumulator,
        jitter: &mut Jitter,
        diagnostics: &mut Diagnostics,
    ) {
        for (k, link) in graph.links.iter().enumerate() {
            if link.is_self_link() {
                continue;
            }
            let source = graph.node(link.source);
            let target = graph.node(link.target);
            let mut delta = (target.pos + target.vel) - (source.pos + source.vel);
            if !delta.is_finite() {
                diagnostics.push(DataQualityWarning::NonFiniteLink { link: k });
                continue;
            }
            if delta.x == 0.0 {
                delta.x = jitter.sample();
            }
            if delta.y == 0.0 {
                delta.y = jitter.sample();
            }

            let LinkParams { distance, strength, bias } = self.params[k];
            let l = delta.length();
            let pull = delta * ((l - distance) / l * strength);
            acc.add(link.target.0, -pull * bias);
            acc.add(link.source.0, pull * (1.0 - bias));
        }
    }
}

/// Keeps the layout's centroid on a fixed target point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterForce {
    pub target: DVec2,
    pub strength: f64,
}

impl CenterForce {
    pub fn new(config: &CenterConfig) -> Self {
        Self {
            target: DVec2::new(config.x, config.y),
            strength: config.strength,
        }
    }

    /// Uniform translation moving the centroid of finite nodes toward the
    /// target. `None` when there is nothing to move.
    pub fn translation(&self, nodes: &[Node]) -> Option<DVec2> {
        let centroid = centroid(nodes)?;
        Some((self.target - centroid) * self.strength)
    }
}

/// The three contributions the engine combines each step
#[derive(Debug, Clone)]
pub struct ForceModel {
    pub many_body: ManyBody,
    pub link: LinkForce,
    pub center: CenterForce,
}

impl ForceModel {
    pub fn new(config: &SimulationConfig, graph: &Graph) -> Self {
        Self {
            many_body: ManyBody::new(&config.many_body, graph),
            link: LinkForce::new(&config.link, graph),
            center: CenterForce::new(&config.center),
        }
    }

    /// Sum the charge and link contributions for every node. `index` must
    /// have been rebuilt from the current positions.
    pub fn accumulate(
        &self,
        graph: &Graph,
        index: &SpatialIndex,
        jitter: &mut Jitter,
        diagnostics: &mut Diagnostics,
    ) -> ForceAccumulator {
        let mut acc = ForceAccumulator::zeroed(graph.len());
        self.many_body.accumulate(graph, index, &mut acc, jitter);
        self.link.accumulate(graph, &mut acc, jitter, diagnostics);
        acc.sanitize(diagnostics);
        acc
    }
}
