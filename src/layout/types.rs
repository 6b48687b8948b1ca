use crate::ir::{ElementId, ElementKind};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Index of a grid inside the stacked layout, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(pub usize);

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: String,
    pub element: ElementId,
    pub kind: ElementKind,
    pub label: String,
    pub bounds: Bounds,
    pub grid: GridId,
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Found on the whole-cell mesh.
    Coarse,
    /// Found on the quarter-cell mesh.
    Fine,
    /// Straight fallback when neither mesh has a path.
    Direct,
    SelfLoop,
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    pub source: ElementId,
    pub target: ElementId,
    pub points: Vec<(f32, f32)>,
    pub route: RouteKind,
    /// The flow was reversed to make the graph acyclic.
    pub backward: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridOwner {
    Process(String),
    Lane(String),
}

#[derive(Debug, Clone)]
pub struct GridLayout {
    pub id: GridId,
    pub owner: GridOwner,
    pub bounds: Bounds,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct LaneLayout {
    pub id: String,
    pub label: String,
    pub pool: String,
    pub grid: GridId,
    pub bounds: Bounds,
}

#[derive(Debug, Clone)]
pub struct PoolLayout {
    pub id: String,
    pub label: String,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub lanes: Vec<LaneLayout>,
    pub pools: Vec<PoolLayout>,
    pub grids: Vec<GridLayout>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeLayout> {
        self.edges
            .iter()
            .find(|edge| edge.from == from && edge.to == to)
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        for node in &mut self.nodes {
            node.bounds.translate(dx, dy);
        }
        for edge in &mut self.edges {
            for point in &mut edge.points {
                point.0 += dx;
                point.1 += dy;
            }
        }
        for grid in &mut self.grids {
            grid.bounds.translate(dx, dy);
        }
        for lane in &mut self.lanes {
            lane.bounds.translate(dx, dy);
        }
        for pool in &mut self.pools {
            pool.bounds.translate(dx, dy);
        }
    }

    /// Layout area grown to cover the pool header strips.
    pub fn extent(&self) -> Bounds {
        let mut extent = Bounds::new(0.0, 0.0, self.width, self.height);
        for pool in &self.pools {
            extent = extent.union(&pool.bounds);
        }
        extent
    }
}
