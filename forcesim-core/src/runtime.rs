use crate::config::SimulationConfig;
use crate::diagnostics::{DataQualityWarning, Diagnostics};
use crate::engine::{Graph, Node, NodeId};
use crate::error::ConstructionError;
use crate::forces::{ForceModel, Jitter};
use crate::integrator::{self, SimulationState};
use crate::quadtree::SpatialIndex;
use crate::records::{GraphData, GroupTag};
use glam::DVec2;
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Lifecycle phase of a [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built, no tick requested yet
    Idle,
    Running,
    /// Alpha reached its floor; ticks are ignored until reheated
    Settled,
    /// Halted for good
    Stopped,
}

/// Host-side half of the one-shot cancellation signal
#[derive(Debug)]
pub struct Invalidation {
    tx: Sender<()>,
}

impl Invalidation {
    /// Ask the subscribed simulation to stop. Consumes the handle.
    pub fn fire(self) {
        // A simulation that was already dropped has nothing left to stop
        let _ = self.tx.send(());
    }
}

/// Simulation-side half of the cancellation signal
#[derive(Debug)]
pub struct InvalidationSignal {
    rx: Receiver<()>,
}

impl InvalidationSignal {
    fn fired(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            // Dropping the handle without firing is not a request to stop
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }
}

/// Create a linked cancellation handle and signal
pub fn invalidation() -> (Invalidation, InvalidationSignal) {
    let (tx, rx) = mpsc::channel();
    (Invalidation { tx }, InvalidationSignal { rx })
}

/// Read-only view of a node inside a [`Frame`]
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub id: &'a str,
    pub group: Option<&'a GroupTag>,
    pub pos: DVec2,
    pub pinned: bool,
}

/// A link with both endpoints resolved to positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSegment {
    pub source: DVec2,
    pub target: DVec2,
    pub value: f64,
}

/// Fully integrated state handed to observers after each applied step
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    graph: &'a Graph,
    pub step: u64,
    pub alpha: f64,
}

impl<'a> Frame<'a> {
    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'a>> + 'a {
        let graph = self.graph;
        graph.nodes.iter().map(|node| NodeView {
            id: node.id(),
            group: node.group.as_ref(),
            pos: node.pos,
            pinned: node.is_pinned(),
        })
    }

    pub fn links(&self) -> impl Iterator<Item = LinkSegment> + 'a {
        let graph = self.graph;
        graph.links.iter().map(move |link| LinkSegment {
            source: graph.node(link.source).pos,
            target: graph.node(link.target).pos,
            value: link.value,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.len()
    }

    pub fn link_count(&self) -> usize {
        self.graph.links.len()
    }
}

/// Receives every applied step. Any `FnMut(&Frame)` closure is an observer.
pub trait TickObserver {
    fn on_tick(&mut self, frame: &Frame<'_>);
}

impl<F> TickObserver for F
where
    F: FnMut(&Frame<'_>),
{
    fn on_tick(&mut self, frame: &Frame<'_>) {
        self(frame)
    }
}

/// The force simulation engine.
///
/// Owns the node/link arena and steps it once per [`Simulation::tick`]:
/// spatial index rebuild, force accumulation, integration, then observer
/// notification.
pub struct Simulation {
    graph: Graph,
    config: SimulationConfig,
    forces: ForceModel,
    state: SimulationState,
    phase: Phase,
    index: SpatialIndex,
    jitter: Jitter,
    diagnostics: Diagnostics,
    flagged: HashSet<NodeId>,
    observer: Option<Box<dyn TickObserver>>,
    invalidation: Option<InvalidationSignal>,
    steps: u64,
}

impl Simulation {
    /// Validate the records and configuration and build an idle simulation
    pub fn new(data: &GraphData, config: SimulationConfig) -> Result<Self, ConstructionError> {
        config.validate()?;
        let graph = Graph::from_data(data)?;
        let forces = ForceModel::new(&config, &graph);
        let state = SimulationState {
            alpha: 1.0,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
            alpha_target: config.alpha_target,
            velocity_decay: config.velocity_decay,
        };

        Ok(Self {
            graph,
            config,
            forces,
            state,
            phase: Phase::Idle,
            index: SpatialIndex::new(),
            jitter: Jitter::default(),
            diagnostics: Diagnostics::new(),
            flagged: HashSet::new(),
            observer: None,
            invalidation: None,
            steps: 0,
        })
    }

    /// Subscribe to a cancellation signal
    pub fn with_invalidation(mut self, signal: InvalidationSignal) -> Self {
        self.invalidation = Some(signal);
        self
    }

    /// Register the observer notified after each applied step
    pub fn on_tick(mut self, observer: impl TickObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn set_observer(&mut self, observer: impl TickObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Apply one step if the engine is active, and return the phase after it.
    ///
    /// Does nothing once stopped or settled.
    pub fn tick(&mut self) -> Phase {
        self.poll_invalidation();
        match self.phase {
            Phase::Stopped | Phase::Settled => return self.phase,
            Phase::Idle => self.set_phase(Phase::Running),
            Phase::Running => {}
        }

        self.step();

        if let Some(observer) = self.observer.as_mut() {
            let frame = Frame {
                graph: &self.graph,
                step: self.steps,
                alpha: self.state.alpha,
            };
            observer.on_tick(&frame);
        }

        if self.state.is_settled() {
            self.set_phase(Phase::Settled);
        }
        self.phase
    }

    fn step(&mut self) {
        self.diagnostics.clear();

        self.index.rebuild(self.forces.many_body.index_points(&self.graph));
        for &i in self.index.excluded() {
            self.diagnostics.push(DataQualityWarning::NonFinitePosition(NodeId(i)));
        }

        let acc = self
            .forces
            .accumulate(&self.graph, &self.index, &mut self.jitter, &mut self.diagnostics);
        integrator::step(&mut self.graph.nodes, &acc, &self.forces.center, &mut self.state);
        self.steps += 1;

        self.report_diagnostics();
        tracing::trace!(step = self.steps, alpha = self.state.alpha, "step applied");
    }

    fn report_diagnostics(&mut self) {
        for warning in self.diagnostics.iter() {
            let first = match warning.node() {
                Some(id) => self.flagged.insert(id),
                None => true,
            };
            if first {
                tracing::warn!(step = self.steps, "data quality: {}", warning);
            } else {
                tracing::trace!(step = self.steps, "data quality: {}", warning);
            }
        }
    }

    fn poll_invalidation(&mut self) {
        let fired = self.invalidation.as_ref().is_some_and(InvalidationSignal::fired);
        if fired {
            tracing::debug!("invalidation received");
            self.invalidation = None;
            self.stop();
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(
                from = ?self.phase,
                to = ?phase,
                alpha = self.state.alpha,
                "phase change"
            );
            self.phase = phase;
        }
    }

    /// Halt for good and release the spatial index
    pub fn stop(&mut self) {
        self.set_phase(Phase::Stopped);
        self.index.release();
        self.observer = None;
    }

    /// Resume stepping after settling. No effect once stopped.
    pub fn restart(&mut self) {
        if self.phase == Phase::Settled {
            self.set_phase(Phase::Running);
        }
    }

    /// Raise (or lower) the resting temperature and resume stepping
    pub fn reheat(&mut self, alpha_target: f64) {
        self.set_alpha_target(alpha_target);
        self.restart();
    }

    pub fn alpha(&self) -> f64 {
        self.state.alpha
    }

    /// Set the current temperature, clamped to [0, 1]. A value above the
    /// floor wakes a settled engine. Non-finite values are ignored.
    pub fn set_alpha(&mut self, alpha: f64) {
        if !alpha.is_finite() {
            tracing::warn!("ignoring non-finite alpha {}", alpha);
            return;
        }
        self.state.alpha = alpha.clamp(0.0, 1.0);
        if !self.state.is_settled() {
            self.restart();
        }
    }

    pub fn alpha_target(&self) -> f64 {
        self.state.alpha_target
    }

    /// Set the resting temperature, clamped to [0, 1]. Non-finite values are
    /// ignored.
    pub fn set_alpha_target(&mut self, alpha_target: f64) {
        if !alpha_target.is_finite() {
            tracing::warn!("ignoring non-finite alpha target {}", alpha_target);
            return;
        }
        self.state.alpha_target = alpha_target.clamp(0.0, 1.0);
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Running)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn forces(&self) -> &ForceModel {
        &self.forces
    }

    /// Spatial index built for the last applied step. Empty once stopped.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.lookup(id).map(|index| self.graph.node(index))
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let index = self.graph.lookup(id)?;
        Some(self.graph.node_mut(index))
    }

    /// Number of applied steps
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Warnings recorded during the last applied step
    pub fn last_diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Current state as a frame, without stepping
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            graph: &self.graph,
            step: self.steps,
            alpha: self.state.alpha,
        }
    }

    /// Closest node to `point` within `radius` (unbounded when `None`)
    pub fn find(&self, point: DVec2, radius: Option<f64>) -> Option<&Node> {
        let mut best = radius.map_or(f64::INFINITY, |r| r * r);
        let mut found = None;
        for node in self.graph.nodes.iter().filter(|n| n.is_finite()) {
            let d2 = node.pos.distance_squared(point);
            if d2 < best {
                best = d2;
                found = Some(node);
            }
        }
        found
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("nodes", &self.graph.len())
            .field("links", &self.graph.links.len())
            .field("steps", &self.steps)
            .finish()
    }
}
