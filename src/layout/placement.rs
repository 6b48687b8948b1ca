use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use super::error::{LayoutError, Result};
use super::grid::{CellId, Grid};
use super::super_grid::SuperGrid;
use super::topo::Adjacency;
use super::types::GridId;
use crate::ir::{Diagram, ElementId, Parent, ProcessId};

#[derive(Debug, Clone, Copy)]
struct GridContext {
    grid: GridId,
    /// Next free slot for elements without predecessors.
    start_cell: CellId,
}

/// Closest split found walking backwards, with the folded distance to it.
type SplitHint = (Option<ElementId>, usize);

/// Greedy placement of flow elements into the grids of a [`SuperGrid`].
pub struct Placement<'a> {
    diagram: &'a Diagram,
    supergrid: SuperGrid<ElementId>,
    contexts: HashMap<Parent, GridContext>,
    prev_splits: HashMap<ElementId, SplitHint>,
}

impl<'a> Placement<'a> {
    pub fn new(diagram: &'a Diagram) -> Self {
        Self {
            diagram,
            supergrid: SuperGrid::new(),
            contexts: HashMap::new(),
            prev_splits: HashMap::new(),
        }
    }

    /// One grid for the process itself, then one per lane of each pool.
    pub fn prepare_process(&mut self, process: ProcessId) {
        self.add_context(Parent::Process(process));
        for &pool in &self.diagram.process(process).pools {
            for &lane in &self.diagram.pool(pool).lanes {
                self.add_context(Parent::Lane(lane));
            }
        }
    }

    fn add_context(&mut self, parent: Parent) {
        let grid = Grid::new();
        let start_cell = grid.row_cell(grid.first_row(), 0);
        let grid = self.supergrid.add(grid);
        self.contexts.insert(parent, GridContext { grid, start_cell });
    }

    pub fn grid_of(&self, parent: Parent) -> Option<GridId> {
        self.contexts.get(&parent).map(|ctx| ctx.grid)
    }

    pub fn supergrid(&self) -> &SuperGrid<ElementId> {
        &self.supergrid
    }

    pub fn into_supergrid(self) -> SuperGrid<ElementId> {
        self.supergrid
    }

    /// Places `sorted` (a topological order of `flow`) into the grids of
    /// their parents.
    pub fn layout_elements(&mut self, sorted: &[ElementId], flow: &Adjacency) -> Result<()> {
        self.prev_splits.clear();
        for &element in sorted {
            self.record_prev_split(element, flow);
        }

        for &element in sorted {
            let parent = self.diagram.element(element).parent;
            let ctx = self.context(element)?;
            let cell = self.place_element(element, ctx, flow)?;

            let inset = flow.inset(element);
            let from_other_grid =
                inset.len() == 1 && self.diagram.element(inset[0]).parent != parent;
            let grid = self.supergrid.grid_mut(ctx.grid);
            if !flow.is_join(element) && !from_other_grid {
                // The incoming flow enters from the left.
                if let Some(prev) = grid.prev_cell(cell) {
                    grid.set_packable(prev, false);
                }
            }
            if flow.is_split(element) {
                self.prelayout_successors(element, ctx.grid, cell, flow);
            }
        }
        Ok(())
    }

    fn context(&self, element: ElementId) -> Result<GridContext> {
        let parent = self.diagram.element(element).parent;
        self.contexts
            .get(&parent)
            .copied()
            .ok_or_else(|| LayoutError::UnknownParent {
                element: self.diagram.element(element).id.clone(),
            })
    }

    /// Reserves one row per same-parent successor of a split, centered on the
    /// cell right after it.
    fn prelayout_successors(&mut self, element: ElementId, g: GridId, cell: CellId, flow: &Adjacency) {
        let base = self.supergrid.after(g, cell);
        let mut top = base;

        let mut successors = flow.outset(element).to_vec();
        if let Some(pos) = successors.iter().rposition(|&s| flow.is_join(s)) {
            let join = successors.remove(pos);
            let middle = successors.len() / 2;
            successors.insert(middle, join);
        }

        let parent = self.diagram.element(element).parent;
        successors.retain(|&s| self.diagram.element(s).parent == parent);
        let follow = successors.len();

        let grid = self.supergrid.grid_mut(g);
        for _ in 0..follow / 2 {
            let top_row = grid.row_of(top);
            grid.insert_row_above(top_row);
            let base_row = grid.row_of(base);
            grid.insert_row_beneath(base_row);
            top = grid.above(top);
        }

        for successor in successors {
            match grid.content(top) {
                Some(other) if other != successor => {
                    trace!(?successor, ?other, "prelayout slot taken");
                }
                _ => grid.set_content(top, successor),
            }
            top = grid.beneath(top);
            if top == base && follow % 2 == 0 {
                top = grid.beneath(top);
            }
        }
    }

    fn place_element(&mut self, element: ElementId, ctx: GridContext, flow: &Adjacency) -> Result<CellId> {
        let g = ctx.grid;
        let inset = flow.inset(element);
        if inset.is_empty() {
            let cell = ctx.start_cell;
            let grid = self.supergrid.grid_mut(g);
            grid.set_content(cell, element);
            let next = grid.beneath(cell);
            let parent = self.diagram.element(element).parent;
            if let Some(ctx) = self.contexts.get_mut(&parent) {
                ctx.start_cell = next;
            }
            return Ok(cell);
        }

        let prelayout = self.supergrid.grid(g).cell_of(element);
        let mut cell = if flow.is_join(element) {
            self.place_join(element, g, prelayout, flow)?
        } else if let Some(cell) = prelayout {
            cell
        } else {
            let pred = inset[0];
            let left = match self.supergrid.grid(g).cell_of(pred) {
                Some(left) => left,
                None => {
                    let (pred_grid, pred_cell) = self.locate_pred(pred)?;
                    let col = self.supergrid.grid(pred_grid).column_of(pred_cell);
                    let grid = self.supergrid.grid_mut(g);
                    let row = if pred_grid < g {
                        grid.add_first_row()
                    } else {
                        grid.add_last_row()
                    };
                    grid.row_cell(row, col)
                }
            };
            self.supergrid.after(g, left)
        };

        let grid = self.supergrid.grid_mut(g);
        if let Some(other) = grid.content(cell) {
            if other != element {
                let row = grid.row_of(cell);
                grid.insert_row_beneath(row);
                cell = grid.beneath(cell);
            }
        }
        grid.set_content(cell, element);
        Ok(cell)
    }

    /// Chooses the cell of a join: right after the split most of its
    /// predecessors branch from, or next to the rightmost predecessor.
    fn place_join(
        &mut self,
        element: ElementId,
        g: GridId,
        prelayout: Option<CellId>,
        flow: &Adjacency,
    ) -> Result<CellId> {
        let parent = self.diagram.element(element).parent;
        let inset = flow.inset(element).to_vec();

        let mut splits: Vec<SplitHint> = vec![self.prev_split(element)];
        for &pred in &inset {
            let hint = self.prev_split(pred);
            if hint.0.is_some() && !splits.contains(&hint) {
                splits.push(hint);
            }
        }
        splits.sort_by_key(|hint| hint.1);

        let mut split = None;
        let mut max_con = 0;
        for target in splits.iter().filter_map(|hint| hint.0) {
            if target == element || self.diagram.element(target).parent != parent {
                continue;
            }
            let mut cur_con = 0;
            for &pred in &inset {
                if back_distance(pred, target, flow).is_some() {
                    cur_con += 1;
                }
                if cur_con > max_con {
                    max_con = cur_con;
                    split = Some(target);
                }
            }
        }

        let mut x = 0;
        let mut y_acc = 0;
        let mut y_cnt = 0;
        for &pred in &inset {
            let grid = self.supergrid.grid(g);
            match grid.cell_of(pred).and_then(|cell| grid.find(cell)) {
                Some((col, row)) => {
                    x = x.max(col);
                    y_acc += row;
                    y_cnt += 1;
                }
                None => {
                    let (pred_grid, pred_cell) = self.locate_pred(pred)?;
                    x = x.max(self.supergrid.grid(pred_grid).column_of(pred_cell));
                }
            }
        }

        let grid = self.supergrid.grid_mut(g);
        let left_cell = match split {
            Some(split) => {
                let split_cell = grid.cell_of(split).ok_or_else(|| LayoutError::CellNotFound {
                    element: self.diagram.element(split).id.clone(),
                })?;
                let left = grid.row_cell(grid.row_of(split_cell), x);
                mark_unpackable_until(grid, left, split_cell);
                left
            }
            None if y_cnt == 0 => {
                let row = grid.add_first_row();
                grid.row_cell(row, x)
            }
            None => {
                let row = grid.row_at(y_acc / y_cnt).unwrap_or_else(|| grid.last_row());
                grid.row_cell(row, x)
            }
        };
        debug!(
            join = %self.diagram.element(element).id,
            split = ?split.map(|s| &self.diagram.element(s).id),
            column = x,
            "placing join"
        );

        if let Some(pre) = prelayout {
            if grid.content(pre) == Some(element) {
                grid.remove_content(pre, true);
            }
        }
        let new_cell = self.supergrid.after(g, left_cell);

        // Keep the incoming runs from being packed into other rows.
        let grid = self.supergrid.grid_mut(g);
        for &pred in &inset {
            let Some(target) = grid.cell_of(pred) else {
                continue;
            };
            let start = grid.row_cell(grid.row_of(target), x + 1);
            mark_unpackable_until(grid, start, target);
        }
        Ok(new_cell)
    }

    fn locate_pred(&self, pred: ElementId) -> Result<(GridId, CellId)> {
        let not_found = || LayoutError::CellNotFound {
            element: self.diagram.element(pred).id.clone(),
        };
        let ctx = self
            .contexts
            .get(&self.diagram.element(pred).parent)
            .ok_or_else(not_found)?;
        let cell = self.supergrid.grid(ctx.grid).cell_of(pred).ok_or_else(not_found)?;
        Ok((ctx.grid, cell))
    }

    fn prev_split(&self, element: ElementId) -> SplitHint {
        self.prev_splits
            .get(&element)
            .copied()
            .unwrap_or((None, usize::MAX))
    }

    /// Fills the split memo; predecessors come first in a topological order.
    fn record_prev_split(&mut self, element: ElementId, flow: &Adjacency) {
        let hint = if flow.is_split(element) {
            (Some(element), 0)
        } else {
            flow.inset(element)
                .iter()
                .map(|&pred| self.prev_split(pred))
                .fold((None, usize::MAX), |(n1, d1), (n2, d2)| {
                    if d1 < d2 {
                        (n1, d1.saturating_add(1))
                    } else {
                        (n2, d2.saturating_add(1))
                    }
                })
        };
        self.prev_splits.insert(element, hint);
    }
}

/// Walks left from `from`, marking cells unpackable, until `stop` is reached.
fn mark_unpackable_until(grid: &mut Grid<ElementId>, from: CellId, stop: CellId) {
    let mut cur = Some(from);
    while let Some(cell) = cur {
        if cell == stop {
            break;
        }
        grid.set_packable(cell, false);
        cur = grid.prev_cell(cell);
    }
}

/// Steps from `source` back to `target` along incoming flows, if reachable.
fn back_distance(source: ElementId, target: ElementId, flow: &Adjacency) -> Option<usize> {
    let mut seen = HashSet::from([source]);
    let mut queue = VecDeque::from([(source, 0)]);
    while let Some((element, dist)) = queue.pop_front() {
        if element == target {
            return Some(dist);
        }
        for &pred in flow.inset(element) {
            if seen.insert(pred) {
                queue.push_back((pred, dist + 1));
            }
        }
    }
    None
}
