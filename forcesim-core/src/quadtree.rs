//! Barnes-Hut quadtree for O(n log n) many-body approximation.
//!
//! The tree recursively quarters a square covering every node and stores the
//! centroid and total mass of each cell. Distant cells can then be treated as
//! a single point during force accumulation.

use glam::DVec2;

/// Deepest level a cell is split to; points still sharing a cell there stay
/// together in one leaf
const MAX_DEPTH: usize = 32;

/// A point handed to the index: node index, position and weight
#[derive(Debug, Clone, Copy)]
pub struct IndexPoint {
    pub index: usize,
    pub pos: DVec2,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub enum CellKind {
    /// Child cell ids in NW, NE, SW, SE order
    Branch([Option<u32>; 4]),
    /// Points sharing this cell (coincident, or unseparated at max depth)
    Leaf(Vec<IndexPoint>),
}

/// One quadtree cell with its subtree aggregate
#[derive(Debug, Clone)]
pub struct Cell {
    /// Centroid weighted by absolute point weights
    pub centroid: DVec2,
    /// Signed sum of point weights
    pub mass: f64,
    /// Lower-left corner of the covered square
    pub origin: DVec2,
    pub width: f64,
    pub kind: CellKind,
}

impl Cell {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, CellKind::Leaf(_))
    }

    pub fn contains(&self, pos: DVec2) -> bool {
        let far = self.origin + DVec2::splat(self.width);
        pos.x >= self.origin.x && pos.y >= self.origin.y && pos.x <= far.x && pos.y <= far.y
    }
}

/// Spatial index over the finite node positions of one step
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cells: Vec<Cell>,
    origin: DVec2,
    width: f64,
    excluded: Vec<usize>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from `(index, position, weight)` triples
    pub fn build(points: impl IntoIterator<Item = IndexPoint>) -> Self {
        let mut index = Self::new();
        index.rebuild(points);
        index
    }

    /// Rebuild in place, reusing the cell storage of the previous step.
    ///
    /// Points with a non-finite position are left out and reported by
    /// [`SpatialIndex::excluded`].
    pub fn rebuild(&mut self, points: impl IntoIterator<Item = IndexPoint>) {
        self.cells.clear();
        self.excluded.clear();

        let mut finite = Vec::new();
        for point in points {
            if point.pos.is_finite() && point.weight.is_finite() {
                finite.push(point);
            } else {
                self.excluded.push(point.index);
            }
        }

        if finite.is_empty() {
            self.origin = DVec2::ZERO;
            self.width = 0.0;
            return;
        }

        let mut min = DVec2::splat(f64::MAX);
        let mut max = DVec2::splat(f64::MIN);
        for point in &finite {
            min = min.min(point.pos);
            max = max.max(point.pos);
        }

        // Square cover; a degenerate extent still gets a unit cell
        let extent = max - min;
        let width = extent.x.max(extent.y).max(1.0);
        let center = (min + max) / 2.0;
        self.origin = center - DVec2::splat(width / 2.0);
        self.width = width;

        self.cells.reserve(finite.len() * 2);
        let origin = self.origin;
        self.build_cell(finite, origin, width, 0);
    }

    fn build_cell(
        &mut self,
        points: Vec<IndexPoint>,
        origin: DVec2,
        width: f64,
        depth: usize,
    ) -> u32 {
        let id = self.cells.len() as u32;
        let (centroid, mass) = aggregate(&points);

        let first = points[0].pos;
        let separable =
            points.len() > 1 && depth < MAX_DEPTH && points.iter().any(|p| p.pos != first);
        if !separable {
            self.cells.push(Cell {
                centroid,
                mass,
                origin,
                width,
                kind: CellKind::Leaf(points),
            });
            return id;
        }

        // Reserve the slot before the children so the root stays at 0
        self.cells.push(Cell {
            centroid,
            mass,
            origin,
            width,
            kind: CellKind::Branch([None; 4]),
        });

        let half = width / 2.0;
        let mid = origin + DVec2::splat(half);
        let mut quadrants: [Vec<IndexPoint>; 4] = Default::default();
        for point in points {
            let east = point.pos.x >= mid.x;
            let north = point.pos.y >= mid.y;
            let slot = match (north, east) {
                (true, false) => 0,
                (true, true) => 1,
                (false, false) => 2,
                (false, true) => 3,
            };
            quadrants[slot].push(point);
        }

        let origins = [
            DVec2::new(origin.x, mid.y),
            mid,
            origin,
            DVec2::new(mid.x, origin.y),
        ];

        let mut children = [None; 4];
        for (slot, quadrant) in quadrants.into_iter().enumerate() {
            if !quadrant.is_empty() {
                children[slot] = Some(self.build_cell(quadrant, origins[slot], half, depth + 1));
            }
        }
        self.cells[id as usize].kind = CellKind::Branch(children);

        id
    }

    /// Visit cells pre-order from the root. The callback returns `true` to
    /// skip the children of the cell it was given.
    pub fn visit<F>(&self, mut callback: F)
    where
        F: FnMut(&Cell) -> bool,
    {
        if self.cells.is_empty() {
            return;
        }
        let mut stack = vec![0u32];
        while let Some(id) = stack.pop() {
            let cell = &self.cells[id as usize];
            if callback(cell) {
                continue;
            }
            if let CellKind::Branch(children) = &cell.kind {
                // Reverse push keeps NW..SE visiting order
                stack.extend(children.iter().rev().flatten());
            }
        }
    }

    pub fn root(&self) -> Option<&Cell> {
        self.cells.first()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Indices of points dropped for non-finite coordinates on the last build
    pub fn excluded(&self) -> &[usize] {
        &self.excluded
    }

    /// Covered square as `(min corner, width)`
    pub fn bounds(&self) -> (DVec2, f64) {
        (self.origin, self.width)
    }

    /// Drop all cells and free their storage
    pub fn release(&mut self) {
        self.cells = Vec::new();
        self.excluded = Vec::new();
    }
}

fn aggregate(points: &[IndexPoint]) -> (DVec2, f64) {
    let mut mass = 0.0;
    let mut weight = 0.0;
    let mut weighted = DVec2::ZERO;
    let mut plain = DVec2::ZERO;
    for point in points {
        mass += point.weight;
        weight += point.weight.abs();
        weighted += point.pos * point.weight.abs();
        plain += point.pos;
    }
    let centroid = if weight > 0.0 {
        weighted / weight
    } else {
        plain / points.len() as f64
    };
    (centroid, mass)
}
