use std::collections::HashMap;
use std::hash::Hash;

use super::grid::{CellId, Grid};
use super::types::{Bounds, GridId};

/// Pixel geometry derived from a packed [`SuperGrid`].
#[derive(Debug, Clone)]
pub struct Geometry<T> {
    /// Shared by every member grid.
    pub col_widths: Vec<f32>,
    /// Per grid, in row order.
    pub row_heights: Vec<Vec<f32>>,
    pub grid_bounds: Vec<Bounds>,
    pub item_bounds: HashMap<T, Bounds>,
    pub width: f32,
    pub height: f32,
}

impl<T> Default for Geometry<T> {
    fn default() -> Self {
        Self {
            col_widths: Vec::new(),
            row_heights: Vec::new(),
            grid_bounds: Vec::new(),
            item_bounds: HashMap::new(),
            width: 0.0,
            height: 0.0,
        }
    }
}

impl<T: Eq + Hash> Geometry<T> {
    pub fn bounds_of(&self, item: &T) -> Option<Bounds> {
        self.item_bounds.get(item).copied()
    }
}

/// Grids stacked vertically and kept column-aligned: column `x` of every
/// member grid shares one pixel width.
///
/// Column growth must go through the super grid so that all members widen
/// together. Row growth is local to a grid.
#[derive(Debug, Clone)]
pub struct SuperGrid<T> {
    grids: Vec<Grid<T>>,
    width: usize,
    geometry: Geometry<T>,
}

impl<T: Copy + Eq + Hash> Default for SuperGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> SuperGrid<T> {
    pub fn new() -> Self {
        Self {
            grids: Vec::new(),
            width: 1,
            geometry: Geometry::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn grids(&self) -> &[Grid<T>] {
        &self.grids
    }

    pub fn grid(&self, id: GridId) -> &Grid<T> {
        &self.grids[id.0]
    }

    /// Mutable access for content and row edits. Do not add columns through it.
    pub fn grid_mut(&mut self, id: GridId) -> &mut Grid<T> {
        &mut self.grids[id.0]
    }

    /// Appends a grid, padding every member with trailing columns to a common width.
    pub fn add(&mut self, grid: Grid<T>) -> GridId {
        self.grids.push(grid);
        self.width = self.grids.iter().map(Grid::width).fold(self.width, usize::max);
        for grid in &mut self.grids {
            while grid.width() < self.width {
                let last = grid.width() - 1;
                grid.insert_column_after(last);
            }
        }
        GridId(self.grids.len() - 1)
    }

    /// Inserts a column at `col` in grid `id` and in every other member.
    pub fn insert_column_before(&mut self, id: GridId, col: usize) {
        self.grids[id.0].insert_column_before(col);
        if self.grids[id.0].width() > self.width {
            self.width += 1;
            for grid in &mut self.grids {
                while grid.width() < self.width {
                    grid.insert_column_before(col);
                }
            }
        }
    }

    pub fn after(&mut self, id: GridId, cell: CellId) -> CellId {
        if self.grids[id.0].next_cell(cell).is_none() {
            let col = self.grids[id.0].width();
            self.insert_column_before(id, col);
        }
        self.grids[id.0].after(cell)
    }

    pub fn before(&mut self, id: GridId, cell: CellId) -> CellId {
        if self.grids[id.0].prev_cell(cell).is_none() {
            self.insert_column_before(id, 0);
        }
        self.grids[id.0].before(cell)
    }

    pub fn above(&mut self, id: GridId, cell: CellId) -> CellId {
        self.grids[id.0].above(cell)
    }

    pub fn beneath(&mut self, id: GridId, cell: CellId) -> CellId {
        self.grids[id.0].beneath(cell)
    }

    pub fn locate(&self, item: T) -> Option<(GridId, CellId)> {
        self.grids
            .iter()
            .enumerate()
            .find_map(|(idx, grid)| grid.cell_of(item).map(|cell| (GridId(idx), cell)))
    }

    pub fn pack(&mut self) -> usize {
        self.grids.iter_mut().map(Grid::pack).sum()
    }

    /// Computes pixel bounds for every grid and every placed item.
    ///
    /// Column widths are the maximum over all grids; row heights are per grid.
    /// Each item is centered in its slot.
    pub fn set_geometry<F>(&mut self, padding: f32, size_of: F)
    where
        F: Fn(&T) -> (f32, f32),
    {
        let metrics: Vec<_> = self
            .grids
            .iter()
            .map(|grid| grid.measure(padding, &size_of))
            .collect();
        let mut col_widths = vec![0.0_f32; self.width];
        for metric in &metrics {
            for (col, width) in metric.col_widths.iter().enumerate() {
                col_widths[col] = col_widths[col].max(*width);
            }
        }
        let total_width: f32 = col_widths.iter().sum();

        let mut geometry = Geometry {
            col_widths,
            ..Geometry::default()
        };
        let mut y = 0.0_f32;
        for (grid, metric) in self.grids.iter().zip(metrics) {
            let grid_height: f32 = metric.row_heights.iter().sum();
            geometry
                .grid_bounds
                .push(Bounds::new(0.0, y, total_width, grid_height));
            for (row, row_height) in grid.rows().zip(&metric.row_heights) {
                let mut x = 0.0_f32;
                for (&cell, col_width) in grid.row_cells(row).iter().zip(&geometry.col_widths) {
                    if let Some(item) = grid.content(cell) {
                        let (w, h) = size_of(&item);
                        let cx = x + col_width / 2.0;
                        let cy = y + row_height / 2.0;
                        geometry
                            .item_bounds
                            .insert(item, Bounds::new(cx - w / 2.0, cy - h / 2.0, w, h));
                    }
                    x += col_width;
                }
                y += row_height;
            }
            geometry.row_heights.push(metric.row_heights);
        }
        geometry.width = total_width;
        geometry.height = y;
        self.geometry = geometry;
    }

    pub fn geometry(&self) -> &Geometry<T> {
        &self.geometry
    }
}
