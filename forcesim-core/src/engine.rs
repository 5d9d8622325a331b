use crate::analyzer::check_graph;
use crate::error::ConstructionError;
use crate::records::{GraphData, GroupTag};
use glam::DVec2;
use std::collections::HashMap;
use std::f64::consts::PI;

const INITIAL_RADIUS: f64 = 10.0;

/// Stable handle of a node inside its [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A node of the layout
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    index: NodeId,
    pub group: Option<GroupTag>,
    pub pos: DVec2,
    pub vel: DVec2,
    /// Externally held position; wins over physics while present
    pub pin: Option<DVec2>,
    degree: usize,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> NodeId {
        self.index
    }

    /// Number of links touching this node
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite()
    }
}

/// A resolved link between two nodes
#[derive(Debug, Clone)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub value: f64,
}

impl Link {
    pub fn is_self_link(&self) -> bool {
        self.source == self.target
    }
}

/// The node/link arena owned by a simulation
#[derive(Debug, Clone)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    by_id: HashMap<String, NodeId>,
}

impl Graph {
    /// Build the arena from validated records
    pub fn from_data(data: &GraphData) -> Result<Self, ConstructionError> {
        check_graph(data)?;

        let mut by_id = HashMap::with_capacity(data.nodes.len());
        let mut nodes = Vec::with_capacity(data.nodes.len());
        for (i, record) in data.nodes.iter().enumerate() {
            let index = NodeId(i);
            by_id.insert(record.id.clone(), index);
            let pos = match (record.x, record.y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => DVec2::new(x, y),
                _ => phyllotaxis(i),
            };
            nodes.push(Node {
                id: record.id.clone(),
                index,
                group: record.group.clone(),
                pos,
                vel: DVec2::ZERO,
                pin: None,
                degree: 0,
            });
        }

        let mut links = Vec::with_capacity(data.links.len());
        for record in &data.links {
            // check_graph guarantees both ends resolve
            let (Some(&source), Some(&target)) =
                (by_id.get(&record.source), by_id.get(&record.target))
            else {
                continue;
            };
            nodes[source.0].degree += 1;
            if source != target {
                nodes[target.0].degree += 1;
            }
            links.push(Link {
                source,
                target,
                value: record.value,
            });
        }

        tracing::debug!(nodes = nodes.len(), links = links.len(), "graph built");

        Ok(Self {
            nodes,
            links,
            by_id,
        })
    }

    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn centroid(&self) -> Option<DVec2> {
        centroid(&self.nodes)
    }
}

/// Centroid of all nodes with finite positions
pub fn centroid(nodes: &[Node]) -> Option<DVec2> {
    let mut sum = DVec2::ZERO;
    let mut count = 0usize;
    for node in nodes.iter().filter(|n| n.is_finite()) {
        sum += node.pos;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Initial placement on a sunflower spiral, so that no two nodes start
/// on top of each other
pub fn phyllotaxis(i: usize) -> DVec2 {
    let angle_step = PI * (3.0 - 5f64.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
    let angle = i as f64 * angle_step;
    DVec2::new(radius * angle.cos(), radius * angle.sin())
}
