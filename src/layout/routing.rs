use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, trace, warn};

use crate::config::LayoutConfig;
use crate::ir::{Diagram, ElementId, ProcessId};

use super::super_grid::{Geometry, SuperGrid};
use super::types::{Bounds, RouteKind};

// ── Maze search ─────────────────────────────────────────────────────
/// Distance of a mesh cell the search never reached.
const UNREACHED: usize = usize::MAX;
/// Tolerance when comparing waypoint coordinates.
const POINT_EPS: f32 = 1e-4;

// ── Self-loops ──────────────────────────────────────────────────────
/// Ratio of cell padding used as clearance around a self-loop.
const SELF_LOOP_PAD_RATIO: f32 = 0.8;
const SELF_LOOP_PAD_MIN: f32 = 4.0;

type Pos = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Right,
    Left,
    Up,
    Down,
}

impl Dir {
    /// Neighbour order of the search; earlier wins ties.
    const ORDER: [Dir; 4] = [Dir::Right, Dir::Left, Dir::Up, Dir::Down];

    fn between(from: Pos, to: Pos) -> Dir {
        if from.0 < to.0 {
            Dir::Right
        } else if from.0 > to.0 {
            Dir::Left
        } else if from.1 < to.1 {
            Dir::Down
        } else {
            Dir::Up
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Dir::Right | Dir::Left)
    }
}

/// Slot of an arrival direction in the corner table; slot 0 is "no arrival".
fn arrival_slot(arrival: Option<Dir>) -> usize {
    match arrival {
        None => 0,
        Some(Dir::Right) => 1,
        Some(Dir::Left) => 2,
        Some(Dir::Up) => 3,
        Some(Dir::Down) => 4,
    }
}

const ARRIVALS: [Option<Dir>; 5] = [
    None,
    Some(Dir::Right),
    Some(Dir::Left),
    Some(Dir::Up),
    Some(Dir::Down),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Coarse,
    Fine,
}

/// One routing unit: a whole grid cell, or a quarter of one.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshCell {
    pub element: Option<ElementId>,
    pub hblock: bool,
    pub vblock: bool,
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
}

impl MeshCell {
    fn new(element: Option<ElementId>, cx: f32, cy: f32, width: f32, height: f32) -> Self {
        let occupied = element.is_some();
        Self {
            element,
            hblock: occupied,
            vblock: occupied,
            cx,
            cy,
            width,
            height,
        }
    }

    pub fn blocked(&self) -> bool {
        self.hblock && self.vblock
    }
}

/// Row-major routing table laid over the stacked grids.
#[derive(Debug, Clone)]
pub struct Mesh {
    cols: usize,
    rows: usize,
    cells: Vec<MeshCell>,
}

impl Mesh {
    /// One cell per grid cell, grid rows concatenated top to bottom.
    pub fn coarse(supergrid: &SuperGrid<ElementId>) -> (Mesh, HashMap<ElementId, (usize, usize)>) {
        let geometry = supergrid.geometry();
        let cols = supergrid.width();
        let mut cells = Vec::new();
        let mut positions = HashMap::new();
        let mut rows = 0;
        let mut y = 0.0_f32;
        for (g, grid) in supergrid.grids().iter().enumerate() {
            let heights = geometry.row_heights.get(g);
            for (r, row) in grid.rows().enumerate() {
                let height = heights.and_then(|h| h.get(r)).copied().unwrap_or(0.0);
                let mut x = 0.0_f32;
                for (col, &cell) in grid.row_cells(row).iter().enumerate() {
                    let width = geometry.col_widths.get(col).copied().unwrap_or(0.0);
                    let element = grid.content(cell);
                    if let Some(element) = element {
                        positions.insert(element, (col, rows));
                    }
                    cells.push(MeshCell::new(
                        element,
                        x + width / 2.0,
                        y + height / 2.0,
                        width,
                        height,
                    ));
                    x += width;
                }
                y += height;
                rows += 1;
            }
        }
        (Mesh { cols, rows, cells }, positions)
    }

    /// Splits every cell into its four quadrants.
    pub fn refine(&self) -> Mesh {
        let cols = self.cols * 2;
        let rows = self.rows * 2;
        let mut cells = Vec::with_capacity(cols * rows);
        for y in 0..rows {
            for x in 0..cols {
                let parent = self.cell((x / 2, y / 2));
                let dx = if x % 2 == 0 { -parent.width / 4.0 } else { parent.width / 4.0 };
                let dy = if y % 2 == 0 { -parent.height / 4.0 } else { parent.height / 4.0 };
                cells.push(MeshCell::new(
                    parent.element,
                    parent.cx + dx,
                    parent.cy + dy,
                    parent.width / 2.0,
                    parent.height / 2.0,
                ));
            }
        }
        Mesh { cols, rows, cells }
    }

    fn idx(&self, pos: Pos) -> usize {
        pos.1 * self.cols + pos.0
    }

    fn pos(&self, idx: usize) -> Pos {
        (idx % self.cols, idx / self.cols)
    }

    pub fn cell(&self, pos: (usize, usize)) -> &MeshCell {
        &self.cells[self.idx(pos)]
    }

    fn center(&self, pos: Pos) -> (f32, f32) {
        let cell = self.cell(pos);
        (cell.cx, cell.cy)
    }

    fn step(&self, pos: Pos, dir: Dir) -> Option<Pos> {
        let (x, y) = pos;
        let next = match dir {
            Dir::Right => (x + 1, y),
            Dir::Left => (x.checked_sub(1)?, y),
            Dir::Up => (x, y.checked_sub(1)?),
            Dir::Down => (x, y + 1),
        };
        (next.0 < self.cols && next.1 < self.rows).then_some(next)
    }

    /// Marks every interior cell of `path` as used in the directions it was
    /// entered and left.
    fn block_path(&mut self, path: &[Pos]) {
        for i in 1..path.len().saturating_sub(1) {
            let idx = self.idx(path[i]);
            for dir in [
                Dir::between(path[i - 1], path[i]),
                Dir::between(path[i], path[i + 1]),
            ] {
                if dir.is_horizontal() {
                    self.cells[idx].hblock = true;
                } else {
                    self.cells[idx].vblock = true;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Step {
    corners: usize,
    next: Option<Dir>,
}

#[derive(Debug, Clone)]
struct Found {
    path: Vec<Pos>,
    corners: usize,
}

/// Breadth-first distances from `sources`. Fully blocked cells stop the
/// wave unless they belong to `target`.
fn label_distances(mesh: &Mesh, sources: &[Pos], target: ElementId) -> Vec<usize> {
    let mut dist = vec![UNREACHED; mesh.cells.len()];
    let mut queue = VecDeque::new();
    for &source in sources {
        dist[mesh.idx(source)] = 0;
        queue.push_back(source);
    }
    while let Some(pos) = queue.pop_front() {
        let d = dist[mesh.idx(pos)];
        for dir in Dir::ORDER {
            let Some(next) = mesh.step(pos, dir) else {
                continue;
            };
            let cell = mesh.cell(next);
            if cell.element != Some(target) && cell.blocked() {
                continue;
            }
            let ni = mesh.idx(next);
            if dist[ni] > d + 1 {
                dist[ni] = d + 1;
                queue.push_back(next);
            }
        }
    }
    dist
}

/// Fewest corners from every reached cell back to a source, per arrival
/// direction.
///
/// A step costs a corner when it changes direction. Leaving the target
/// vertically costs one more unless the target branches, and so does
/// arriving at a non-branching source vertically.
fn corner_table<F>(mesh: &Mesh, dist: &[usize], branching: F) -> Vec<[Option<Step>; 5]>
where
    F: Fn(Option<ElementId>) -> bool,
{
    let mut order: Vec<usize> = (0..mesh.cells.len())
        .filter(|&i| dist[i] != UNREACHED)
        .collect();
    order.sort_by_key(|&i| dist[i]);

    let mut table = vec![[None; 5]; mesh.cells.len()];
    for i in order {
        let pos = mesh.pos(i);
        let cell = &mesh.cells[i];
        let branches = branching(cell.element);
        for (slot, arrival) in ARRIVALS.iter().enumerate() {
            let blocked = match arrival {
                Some(dir) if dir.is_horizontal() => cell.hblock,
                Some(_) => cell.vblock,
                None => false,
            };
            table[i][slot] = if dist[i] == 0 {
                let horizontal = arrival.is_some_and(Dir::is_horizontal);
                let corners = if horizontal || branches { 0 } else { 1 };
                Some(Step { corners, next: None })
            } else if blocked {
                None
            } else {
                let mut best: Option<Step> = None;
                for dir in Dir::ORDER {
                    let Some(next) = mesh.step(pos, dir) else {
                        continue;
                    };
                    let ni = mesh.idx(next);
                    if dist[ni] >= dist[i] {
                        continue;
                    }
                    let Some(sub) = table[ni][arrival_slot(Some(dir))] else {
                        continue;
                    };
                    let mut corners = sub.corners;
                    if *arrival != Some(dir) {
                        corners += 1;
                    }
                    if arrival.is_none() && !dir.is_horizontal() && !branches {
                        corners += 1;
                    }
                    if best.is_none_or(|b| corners < b.corners) {
                        best = Some(Step {
                            corners,
                            next: Some(dir),
                        });
                    }
                }
                best
            };
        }
    }
    table
}

fn unwind(mesh: &Mesh, table: &[[Option<Step>; 5]], from: Pos) -> Vec<Pos> {
    let mut path = vec![from];
    let mut pos = from;
    let mut slot = 0;
    while let Some(Step {
        next: Some(dir), ..
    }) = table[mesh.idx(pos)][slot]
    {
        let Some(next) = mesh.step(pos, dir) else {
            break;
        };
        path.push(next);
        pos = next;
        slot = arrival_slot(Some(dir));
    }
    path.reverse();
    path
}

/// Lee search from `sources` to whichever of `targets` yields the fewest
/// corners. Targets are tried closest first; later ones must be strictly better.
fn search<F>(mesh: &Mesh, sources: &[Pos], targets: &[Pos], target: ElementId, branching: F) -> Option<Found>
where
    F: Fn(Option<ElementId>) -> bool,
{
    let dist = label_distances(mesh, sources, target);
    let mut reached: Vec<Pos> = targets
        .iter()
        .copied()
        .filter(|&t| dist[mesh.idx(t)] != UNREACHED)
        .collect();
    if reached.is_empty() {
        return None;
    }
    reached.sort_by_key(|&t| dist[mesh.idx(t)]);

    let table = corner_table(mesh, &dist, branching);
    let mut best: Option<Found> = None;
    for t in reached {
        let Some(step) = table[mesh.idx(t)][0] else {
            continue;
        };
        if best.as_ref().is_some_and(|b| step.corners >= b.corners) {
            continue;
        }
        best = Some(Found {
            path: unwind(mesh, &table, t),
            corners: step.corners,
        });
    }
    best.filter(|found| found.path.len() >= 2)
}

fn quadrants((x, y): Pos) -> [Pos; 4] {
    [
        (x * 2, y * 2),
        (x * 2, y * 2 + 1),
        (x * 2 + 1, y * 2),
        (x * 2 + 1, y * 2 + 1),
    ]
}

fn attach(bounds: &Bounds, dir: Dir) -> (f32, f32) {
    let (cx, cy) = bounds.center();
    match dir {
        Dir::Right => (bounds.right(), cy),
        Dir::Left => (bounds.x, cy),
        Dir::Up => (cx, bounds.y),
        Dir::Down => (cx, bounds.bottom()),
    }
}

/// Leaves `bounds` on the side facing `dir` and lines up with the track
/// through `cell`. The track is kept when it crosses the node; otherwise a
/// jog halfway between the node and the cell's far edge reaches it.
fn attach_to_track(bounds: &Bounds, cell: &MeshCell, dir: Dir) -> Vec<(f32, f32)> {
    let anchor = attach(bounds, dir);
    if dir.is_horizontal() {
        let track = cell.cy;
        if (bounds.y..=bounds.bottom()).contains(&track) {
            return vec![(anchor.0, track)];
        }
        let edge = match dir {
            Dir::Right => cell.cx + cell.width / 2.0,
            _ => cell.cx - cell.width / 2.0,
        };
        let x = (anchor.0 + edge) / 2.0;
        vec![anchor, (x, anchor.1), (x, track)]
    } else {
        let track = cell.cx;
        if (bounds.x..=bounds.right()).contains(&track) {
            return vec![(track, anchor.1)];
        }
        let edge = match dir {
            Dir::Down => cell.cy + cell.height / 2.0,
            _ => cell.cy - cell.height / 2.0,
        };
        let y = (anchor.1 + edge) / 2.0;
        vec![anchor, (anchor.0, y), (track, y)]
    }
}

fn same_point(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.0 - b.0).abs() <= POINT_EPS && (a.1 - b.1).abs() <= POINT_EPS
}

/// Drops repeated points and interior points on a straight run.
pub(super) fn compress_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &point in points {
        if out.last().is_some_and(|&last| same_point(last, point)) {
            continue;
        }
        if let [.., a, b] = out[..] {
            let vertical = (a.0 - b.0).abs() <= POINT_EPS && (b.0 - point.0).abs() <= POINT_EPS;
            let horizontal = (a.1 - b.1).abs() <= POINT_EPS && (b.1 - point.1).abs() <= POINT_EPS;
            if vertical || horizontal {
                out.pop();
            }
        }
        out.push(point);
    }
    if out.len() < 2 {
        return vec![points[0], points[points.len() - 1]];
    }
    out
}

/// Loop leaving the right side and re-entering from the top.
pub(super) fn route_self_loop(bounds: &Bounds, pad: f32) -> Vec<(f32, f32)> {
    let (cx, cy) = bounds.center();
    let right = bounds.right() + pad;
    let top = bounds.y - pad;
    vec![
        (bounds.right(), cy),
        (right, cy),
        (right, top),
        (cx, top),
        (cx, bounds.y),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub points: Vec<(f32, f32)>,
    pub kind: RouteKind,
}

/// Routes every flow of a placed diagram over the coarse and fine meshes.
///
/// Edges are routed in a fixed order because each committed path blocks mesh
/// cells for the edges after it: first the fan of every split and join as a
/// group, then the remaining single flows.
pub struct EdgeRouter<'a> {
    diagram: &'a Diagram,
    geometry: &'a Geometry<ElementId>,
    coarse: Mesh,
    fine: Mesh,
    positions: HashMap<ElementId, Pos>,
    refine: bool,
    self_loop_pad: f32,
    routes: BTreeMap<(ElementId, ElementId), Route>,
}

impl<'a> EdgeRouter<'a> {
    pub fn new(diagram: &'a Diagram, supergrid: &'a SuperGrid<ElementId>, config: &LayoutConfig) -> Self {
        let (coarse, positions) = Mesh::coarse(supergrid);
        let fine = coarse.refine();
        Self {
            diagram,
            geometry: supergrid.geometry(),
            coarse,
            fine,
            positions,
            refine: config.refine_routes,
            self_loop_pad: (config.cell_padding * SELF_LOOP_PAD_RATIO).max(SELF_LOOP_PAD_MIN),
            routes: BTreeMap::new(),
        }
    }

    pub fn route_all(mut self) -> BTreeMap<(ElementId, ElementId), Route> {
        for process in self.diagram.process_ids() {
            self.route_process(process);
        }
        self.routes
    }

    pub fn route_process(&mut self, process: ProcessId) {
        let diagram = self.diagram;
        let elements = &diagram.process(process).elements;
        for &id in elements {
            let element = diagram.element(id);
            if element.is_split() {
                let fan: Vec<_> = element.outset.iter().map(|&t| (id, t)).collect();
                self.route_group(&fan);
            }
            if element.is_join() {
                let fan: Vec<_> = element.inset.iter().map(|&s| (s, id)).collect();
                self.route_group(&fan);
            }
        }
        for &id in elements {
            let element = diagram.element(id);
            if let (false, Some(&target)) = (element.is_split(), element.outset.first()) {
                self.route_single(id, target);
            }
            if let (false, Some(&source)) = (element.is_join(), element.inset.first()) {
                self.route_single(source, id);
            }
        }
        debug!(process = %diagram.process(process).id, routes = self.routes.len(), "routed flows");
    }

    /// Paths of one fan are all found before any of them blocks the mesh.
    fn route_group(&mut self, fan: &[(ElementId, ElementId)]) {
        let mut pending = Vec::new();
        for &(source, target) in fan {
            if self.routes.contains_key(&(source, target)) {
                continue;
            }
            if let Some(committed) = self.route_edge(source, target) {
                pending.push(committed);
            }
        }
        for (resolution, path) in pending {
            self.mesh_mut(resolution).block_path(&path);
        }
    }

    fn route_single(&mut self, source: ElementId, target: ElementId) {
        if self.routes.contains_key(&(source, target)) {
            return;
        }
        if let Some((resolution, path)) = self.route_edge(source, target) {
            self.mesh_mut(resolution).block_path(&path);
        }
    }

    /// Stores a route for the edge and returns the mesh path that still has
    /// to be blocked, if one was used.
    fn route_edge(&mut self, source: ElementId, target: ElementId) -> Option<(Resolution, Vec<Pos>)> {
        if source == target {
            match self.geometry.bounds_of(&source) {
                Some(bounds) => {
                    let points = route_self_loop(&bounds, self.self_loop_pad);
                    self.routes.insert(
                        (source, target),
                        Route {
                            points,
                            kind: RouteKind::SelfLoop,
                        },
                    );
                }
                None => warn!(?source, "self-loop on an element without bounds"),
            }
            return None;
        }

        if let Some((resolution, path)) = self.find_path(source, target) {
            if let Some(points) = self.waypoints(resolution, &path, source, target) {
                let kind = match resolution {
                    Resolution::Coarse => RouteKind::Coarse,
                    Resolution::Fine => RouteKind::Fine,
                };
                self.routes.insert((source, target), Route { points, kind });
                return Some((resolution, path));
            }
        }

        debug!(?source, ?target, "no mesh path, drawing direct edge");
        match self.direct(source, target) {
            Some(route) => {
                self.routes.insert((source, target), route);
            }
            None => warn!(?source, ?target, "edge endpoints were never placed"),
        }
        None
    }

    fn find_path(&self, source: ElementId, target: ElementId) -> Option<(Resolution, Vec<Pos>)> {
        let src = *self.positions.get(&source)?;
        let tgt = *self.positions.get(&target)?;
        let branching = |element: Option<ElementId>| {
            element.is_some_and(|e| {
                let element = self.diagram.element(e);
                element.is_join() || element.is_split()
            })
        };

        let coarse = search(&self.coarse, &[src], &[tgt], target, branching);
        let fine = || search(&self.fine, &quadrants(src), &quadrants(tgt), target, branching);
        match coarse {
            Some(found) if self.refine => match fine() {
                Some(better) if better.corners < found.corners => {
                    trace!(?source, ?target, "fine mesh saves corners");
                    Some((Resolution::Fine, better.path))
                }
                _ => Some((Resolution::Coarse, found.path)),
            },
            Some(found) => Some((Resolution::Coarse, found.path)),
            None => {
                trace!(?source, ?target, "coarse mesh failed, trying quadrants");
                fine().map(|found| (Resolution::Fine, found.path))
            }
        }
    }

    /// Attachment points plus one point per change of direction.
    fn waypoints(
        &self,
        resolution: Resolution,
        path: &[Pos],
        source: ElementId,
        target: ElementId,
    ) -> Option<Vec<(f32, f32)>> {
        let [first, second, ..] = path else {
            return None;
        };
        let [.., before_last, last] = path else {
            return None;
        };
        let mesh = self.mesh(resolution);
        let src = self.geometry.bounds_of(&source)?;
        let tgt = self.geometry.bounds_of(&target)?;
        let mut points = Vec::with_capacity(path.len() + 4);

        let mut heading = Dir::between(*first, *second);
        match resolution {
            Resolution::Coarse => points.push(attach(&src, heading)),
            Resolution::Fine => points.extend(attach_to_track(&src, mesh.cell(*first), heading)),
        }
        for pair in path[1..].windows(2) {
            let dir = Dir::between(pair[0], pair[1]);
            if dir != heading {
                points.push(mesh.center(pair[0]));
                heading = dir;
            }
        }
        let facing = Dir::between(*last, *before_last);
        match resolution {
            Resolution::Coarse => points.push(attach(&tgt, facing)),
            Resolution::Fine => {
                let tail = attach_to_track(&tgt, mesh.cell(*last), facing);
                points.extend(tail.into_iter().rev());
            }
        }
        Some(compress_path(&points))
    }

    /// Straight segment between the facing sides of both elements.
    fn direct(&self, source: ElementId, target: ElementId) -> Option<Route> {
        let src = self.geometry.bounds_of(&source)?;
        let tgt = self.geometry.bounds_of(&target)?;
        let (scx, scy) = src.center();
        let (tcx, tcy) = tgt.center();
        let (start, end) = if scx < tcx {
            ((src.right(), scy), (tgt.x, tcy))
        } else {
            ((src.x, scy), (tgt.right(), tcy))
        };
        Some(Route {
            points: vec![start, end],
            kind: RouteKind::Direct,
        })
    }

    fn mesh(&self, resolution: Resolution) -> &Mesh {
        match resolution {
            Resolution::Coarse => &self.coarse,
            Resolution::Fine => &self.fine,
        }
    }

    fn mesh_mut(&mut self, resolution: Resolution) -> &mut Mesh {
        match resolution {
            Resolution::Coarse => &mut self.coarse,
            Resolution::Fine => &mut self.fine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ElementKind, EventKind, GatewayKind};
    use crate::layout::grid::Grid;
    use crate::ir::Extent;

    /// Places `rows` of element ids (empty string for a free cell) into a
    /// single grid and computes its geometry.
    fn grid_of(diagram: &Diagram, rows: &[&[&str]], config: &LayoutConfig) -> SuperGrid<ElementId> {
        let mut grid = Grid::new();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1);
        for _ in 1..width {
            grid.insert_column_after(0);
        }
        for _ in 1..rows.len() {
            grid.add_last_row();
        }
        for (y, row) in rows.iter().enumerate() {
            for (x, id) in row.iter().enumerate() {
                if !id.is_empty() {
                    let cell = grid.get(x, y).unwrap();
                    grid.set_content(cell, diagram.find(id).unwrap());
                }
            }
        }
        let mut sg = SuperGrid::new();
        sg.add(grid);
        sg.set_geometry(config.cell_padding, |e| diagram.element(*e).extent(config));
        sg
    }

    fn diagram(nodes: &[&str], flows: &[(&str, &str)]) -> Diagram {
        let mut diagram = Diagram::new();
        let p = diagram.add_process("p", None);
        for id in nodes {
            let kind = if id.starts_with('g') {
                ElementKind::Gateway(GatewayKind::Parallel)
            } else if id.starts_with('e') {
                ElementKind::Event(EventKind::Intermediate)
            } else {
                ElementKind::Activity
            };
            diagram.add_element(p, *id, kind).unwrap();
        }
        for (a, b) in flows {
            diagram.connect_ids(a, b).unwrap();
        }
        diagram
    }

    /// Marks a mesh cell as used by an earlier path.
    fn mark(mesh: &mut Mesh, pos: Pos, hblock: bool, vblock: bool) {
        let i = mesh.idx(pos);
        mesh.cells[i].hblock |= hblock;
        mesh.cells[i].vblock |= vblock;
    }

    fn on_boundary(b: &Bounds, (x, y): (f32, f32)) -> bool {
        let within_x = x >= b.x - POINT_EPS && x <= b.right() + POINT_EPS;
        let within_y = y >= b.y - POINT_EPS && y <= b.bottom() + POINT_EPS;
        let on_side = (x - b.x).abs() <= POINT_EPS || (x - b.right()).abs() <= POINT_EPS;
        let on_cap = (y - b.y).abs() <= POINT_EPS || (y - b.bottom()).abs() <= POINT_EPS;
        (on_side && within_y) || (on_cap && within_x)
    }

    fn config() -> LayoutConfig {
        LayoutConfig {
            refine_routes: false,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn adjacent_cells_route_straight() {
        let config = config();
        let d = diagram(&["a", "b"], &[("a", "b")]);
        let sg = grid_of(&d, &[&["a", "b"]], &config);
        let routes = EdgeRouter::new(&d, &sg, &config).route_all();
        let route = &routes[&(d.find("a").unwrap(), d.find("b").unwrap())];
        assert_eq!(route.kind, RouteKind::Coarse);
        assert_eq!(route.points, vec![(110.0, 40.0), (130.0, 40.0)]);
    }

    #[test]
    fn occupied_cell_forces_detour() {
        let config = config();
        let d = diagram(&["a", "x", "b"], &[("a", "b")]);
        let sg = grid_of(&d, &[&["a", "x", "b"], &["", "", ""]], &config);
        let mut router = EdgeRouter::new(&d, &sg, &config);
        router.route_process(ProcessId(0));

        let mesh = &router.coarse;
        assert!(mesh.cell((0, 1)).blocked());
        assert!(mesh.cell((1, 1)).hblock);
        assert!(!mesh.cell((1, 1)).vblock);
        assert!(mesh.cell((2, 1)).blocked());

        let route = &router.routes[&(d.find("a").unwrap(), d.find("b").unwrap())];
        assert_eq!(route.kind, RouteKind::Coarse);
        assert_eq!(
            route.points,
            vec![(60.0, 70.0), (60.0, 80.0), (300.0, 80.0), (300.0, 70.0)]
        );
    }

    #[test]
    fn walled_in_edge_falls_back_to_direct() {
        let config = config();
        let d = diagram(&["a", "x", "b"], &[("a", "b")]);
        let sg = grid_of(&d, &[&["a", "x", "b"]], &config);
        let routes = EdgeRouter::new(&d, &sg, &config).route_all();
        let route = &routes[&(d.find("a").unwrap(), d.find("b").unwrap())];
        assert_eq!(route.kind, RouteKind::Direct);
        assert_eq!(route.points, vec![(110.0, 40.0), (250.0, 40.0)]);
    }

    #[test]
    fn direct_edge_faces_backwards_when_target_is_left() {
        let config = config();
        let d = diagram(&["a", "x", "b"], &[("b", "a")]);
        let sg = grid_of(&d, &[&["a", "x", "b"]], &config);
        let routes = EdgeRouter::new(&d, &sg, &config).route_all();
        let route = &routes[&(d.find("b").unwrap(), d.find("a").unwrap())];
        assert_eq!(route.kind, RouteKind::Direct);
        assert_eq!(route.points, vec![(250.0, 40.0), (110.0, 40.0)]);
    }

    #[test]
    fn split_fan_is_routed_without_direct_edges() {
        let config = config();
        let d = diagram(&["g1", "b", "c"], &[("g1", "b"), ("g1", "c")]);
        let sg = grid_of(&d, &[&["", "b"], &["g1", ""], &["", "c"]], &config);
        let routes = EdgeRouter::new(&d, &sg, &config).route_all();
        assert_eq!(routes.len(), 2);
        for route in routes.values() {
            assert_eq!(route.kind, RouteKind::Coarse);
            assert!(route.points.len() >= 3);
            for pair in route.points.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                assert!(a.0 == b.0 || a.1 == b.1, "segment {a:?} -> {b:?} is not axis aligned");
            }
        }
    }

    #[test]
    fn fine_route_attaches_to_gateway_in_widened_column() {
        let config = config();
        let d = diagram(&["a", "x", "y", "g", "t"], &[("g", "t")]);
        let sg = grid_of(&d, &[&["a", "x", "y"], &["g", "", "t"]], &config);
        let mut router = EdgeRouter::new(&d, &sg, &config);
        // a horizontal run already passes between g and t
        mark(&mut router.coarse, (1, 1), true, false);
        router.route_process(ProcessId(0));

        let (g, t) = (d.find("g").unwrap(), d.find("t").unwrap());
        let route = &router.routes[&(g, t)];
        assert_eq!(route.kind, RouteKind::Fine);
        // g spans x 35..85 inside a 120 wide column
        assert_eq!(route.points, vec![(85.0, 100.0), (250.0, 100.0)]);
        let geometry = sg.geometry();
        assert!(on_boundary(&geometry.bounds_of(&g).unwrap(), route.points[0]));
        assert!(on_boundary(&geometry.bounds_of(&t).unwrap(), route.points[1]));
    }

    #[test]
    fn fine_route_jogs_onto_a_track_that_misses_the_node() {
        let config = config();
        let d = diagram(&["a", "x", "y", "e1", "t"], &[("e1", "t")]);
        let sg = grid_of(&d, &[&["a", "x", "y"], &["e1", "", "t"]], &config);
        let mut router = EdgeRouter::new(&d, &sg, &config);
        mark(&mut router.coarse, (1, 1), true, false);
        router.route_process(ProcessId(0));

        let (e1, t) = (d.find("e1").unwrap(), d.find("t").unwrap());
        let route = &router.routes[&(e1, t)];
        assert_eq!(route.kind, RouteKind::Fine);
        // the event spans y 102..138, the quadrant track runs at y 100
        assert_eq!(
            route.points,
            vec![(78.0, 120.0), (99.0, 120.0), (99.0, 100.0), (250.0, 100.0)]
        );
        assert!(on_boundary(&sg.geometry().bounds_of(&e1).unwrap(), route.points[0]));
    }

    #[test]
    fn fine_mesh_routes_when_coarse_mesh_is_blocked() {
        let config = config();
        let d = diagram(&["a", "b", "c", "f"], &[("a", "b"), ("b", "c"), ("b", "f")]);
        let sg = grid_of(&d, &[&["a", ""], &["", "b"]], &config);
        let (a, b) = (d.find("a").unwrap(), d.find("b").unwrap());
        let mut router = EdgeRouter::new(&d, &sg, &config);
        mark(&mut router.coarse, (1, 0), false, true);
        mark(&mut router.coarse, (0, 1), true, false);
        mark(&mut router.fine, (1, 2), true, true);
        mark(&mut router.fine, (2, 1), true, true);

        assert!(search(&router.coarse, &[(0, 0)], &[(1, 1)], b, |_| false).is_none());

        // both quadrants are four steps out; reaching (2, 3) leaves a
        // vertically, which costs a corner, while b splits and enters free
        let splits = |e: Option<ElementId>| e == Some(b);
        let dist = label_distances(&router.fine, &quadrants((0, 0)), b);
        assert_eq!(dist[router.fine.idx((2, 3))], 4);
        assert_eq!(dist[router.fine.idx((3, 2))], 4);
        let left = search(&router.fine, &quadrants((0, 0)), &[(2, 3)], b, splits).unwrap();
        assert_eq!(left.corners, 3);
        let best = search(&router.fine, &quadrants((0, 0)), &quadrants((1, 1)), b, splits).unwrap();
        assert_eq!(best.corners, 2);
        assert_eq!(best.path, vec![(1, 0), (2, 0), (3, 0), (3, 1), (3, 2)]);

        router.route_single(a, b);
        let route = &router.routes[&(a, b)];
        assert_eq!(route.kind, RouteKind::Fine);
        assert_eq!(route.points, vec![(110.0, 20.0), (210.0, 20.0), (210.0, 90.0)]);
        assert!(router.fine.cell((3, 0)).blocked());
        assert!(router.fine.cell((3, 1)).vblock);
        assert!(!router.fine.cell((3, 1)).hblock);
    }

    #[test]
    fn committed_path_blocks_its_direction_but_can_be_crossed() {
        let config = config();
        let d = diagram(&["l", "r", "u", "d"], &[("l", "r"), ("u", "d")]);
        let sg = grid_of(&d, &[&["", "u", ""], &["l", "", "r"], &["", "d", ""]], &config);
        let [l, r, u, dn] = ["l", "r", "u", "d"].map(|id| d.find(id).unwrap());
        let mut router = EdgeRouter::new(&d, &sg, &config);

        router.route_single(l, r);
        assert_eq!(router.routes[&(l, r)].points, vec![(110.0, 120.0), (250.0, 120.0)]);
        let middle = router.coarse.cell((1, 1));
        assert!(middle.hblock && !middle.vblock);
        // a second left-to-right run through the middle is refused
        assert!(search(&router.coarse, &[(0, 1)], &[(2, 1)], r, |_| false).is_none());

        router.route_single(u, dn);
        let route = &router.routes[&(u, dn)];
        assert_eq!(route.kind, RouteKind::Coarse);
        assert_eq!(route.points, vec![(180.0, 70.0), (180.0, 170.0)]);
        assert!(router.coarse.cell((1, 1)).blocked());
    }

    #[test]
    fn fan_siblings_are_found_before_any_is_blocked() {
        let config = config();
        let d = diagram(&["g1", "x", "b", "y", "c"], &[("g1", "b"), ("g1", "c")]);
        let rows: &[&[&str]] = &[&["", "x", "b"], &["g1", "", ""], &["", "y", "c"]];
        let sg = grid_of(&d, rows, &config);
        let [g1, b, c] = ["g1", "b", "c"].map(|id| d.find(id).unwrap());

        let mut router = EdgeRouter::new(&d, &sg, &config);
        router.route_process(ProcessId(0));
        let up = &router.routes[&(g1, b)];
        let down = &router.routes[&(g1, c)];
        assert_eq!((up.kind, down.kind), (RouteKind::Coarse, RouteKind::Coarse));
        assert_eq!(up.points, vec![(60.0, 115.0), (250.0, 115.0), (250.0, 70.0)]);
        assert_eq!(down.points, vec![(60.0, 115.0), (250.0, 115.0), (250.0, 160.0)]);
        assert!(router.coarse.cell((2, 1)).blocked());

        // one at a time, the first sibling walls off the shared corner
        let mut router = EdgeRouter::new(&d, &sg, &config);
        router.route_single(g1, b);
        router.route_single(g1, c);
        let down = &router.routes[&(g1, c)];
        assert_eq!(down.kind, RouteKind::Fine);
        let geometry = sg.geometry();
        assert!(on_boundary(&geometry.bounds_of(&g1).unwrap(), down.points[0]));
        assert!(on_boundary(&geometry.bounds_of(&c).unwrap(), *down.points.last().unwrap()));
    }

    #[test]
    fn self_loop_wraps_the_element() {
        let config = config();
        let d = diagram(&["a"], &[("a", "a")]);
        let sg = grid_of(&d, &[&["a"]], &config);
        let routes = EdgeRouter::new(&d, &sg, &config).route_all();
        let a = d.find("a").unwrap();
        let route = &routes[&(a, a)];
        assert_eq!(route.kind, RouteKind::SelfLoop);
        assert_eq!(route.points.len(), 5);
        assert_eq!(route.points[0], (110.0, 40.0));
        assert_eq!(route.points[4], (60.0, 10.0));
    }

    #[test]
    fn refine_splits_cells_into_quadrants() {
        let config = config();
        let d = diagram(&["a"], &[]);
        let sg = grid_of(&d, &[&["a", ""]], &config);
        let (mesh, positions) = Mesh::coarse(&sg);
        let fine = mesh.refine();
        assert_eq!((fine.cols, fine.rows), (4, 2));
        assert_eq!(positions[&d.find("a").unwrap()], (0, 0));
        let q = fine.cell((1, 1));
        assert_eq!((q.cx, q.cy), (90.0, 60.0));
        assert!(q.blocked());
        assert!(!fine.cell((2, 0)).blocked());
    }

    #[test]
    fn compress_path_drops_duplicates_and_straight_runs() {
        let points = vec![(0.0, 0.0), (0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 5.0)];
        assert_eq!(
            compress_path(&points),
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 5.0)]
        );
        assert_eq!(compress_path(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]).len(), 2);
    }
}
