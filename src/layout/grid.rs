use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(usize);

#[derive(Debug, Clone)]
struct Cell<T> {
    content: Option<T>,
    /// A row pair may merge only where at least one of the two cells is packable.
    packable: bool,
    row: RowId,
    prev: Option<CellId>,
    next: Option<CellId>,
}

#[derive(Debug, Clone)]
struct Row {
    cells: Vec<CellId>,
    prev: Option<RowId>,
    next: Option<RowId>,
}

/// Column widths and row heights of one grid, padding included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridMetrics {
    pub col_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
}

/// A growable table of slots, each holding at most one item.
///
/// Cells and rows live in arenas and are linked by index. Rows removed by
/// [`Grid::pack`] stay in the arena but drop out of the row order, so a
/// `CellId` handed out earlier never dangles.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    cells: Vec<Cell<T>>,
    rows: Vec<Row>,
    order: Vec<RowId>,
    width: usize,
    item_to_cell: HashMap<T, CellId>,
}

impl<T: Copy + Eq + Hash> Default for Grid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> Grid<T> {
    pub fn new() -> Self {
        let mut grid = Self {
            cells: Vec::new(),
            rows: Vec::new(),
            order: Vec::new(),
            width: 1,
            item_to_cell: HashMap::new(),
        };
        let row = grid.alloc_row(None, None);
        grid.order.push(row);
        grid
    }

    fn alloc_row(&mut self, prev: Option<RowId>, next: Option<RowId>) -> RowId {
        let row = RowId(self.rows.len());
        let mut cells: Vec<CellId> = Vec::with_capacity(self.width);
        for _ in 0..self.width {
            let id = self.alloc_cell(row, cells.last().copied(), None);
            cells.push(id);
        }
        self.rows.push(Row { cells, prev, next });
        if let Some(prev) = prev {
            self.rows[prev.0].next = Some(row);
        }
        if let Some(next) = next {
            self.rows[next.0].prev = Some(row);
        }
        row
    }

    fn alloc_cell(&mut self, row: RowId, prev: Option<CellId>, next: Option<CellId>) -> CellId {
        let id = CellId(self.cells.len());
        self.cells.push(Cell {
            content: None,
            packable: true,
            row,
            prev,
            next,
        });
        if let Some(prev) = prev {
            self.cells[prev.0].next = Some(id);
        }
        if let Some(next) = next {
            self.cells[next.0].prev = Some(id);
        }
        id
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.order.len()
    }

    pub fn get(&self, col: usize, row: usize) -> Option<CellId> {
        let row = self.order.get(row)?;
        self.rows[row.0].cells.get(col).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowId> + '_ {
        self.order.iter().copied()
    }

    pub fn row_at(&self, index: usize) -> Option<RowId> {
        self.order.get(index).copied()
    }

    pub fn first_row(&self) -> RowId {
        self.order[0]
    }

    pub fn last_row(&self) -> RowId {
        self.order[self.order.len() - 1]
    }

    pub fn row_cells(&self, row: RowId) -> &[CellId] {
        &self.rows[row.0].cells
    }

    pub fn row_cell(&self, row: RowId, col: usize) -> CellId {
        self.rows[row.0].cells[col]
    }

    pub fn prev_row(&self, row: RowId) -> Option<RowId> {
        self.rows[row.0].prev
    }

    pub fn next_row(&self, row: RowId) -> Option<RowId> {
        self.rows[row.0].next
    }

    pub fn row_of(&self, cell: CellId) -> RowId {
        self.cells[cell.0].row
    }

    pub fn row_index(&self, row: RowId) -> Option<usize> {
        self.order.iter().position(|&r| r == row)
    }

    pub fn column_of(&self, cell: CellId) -> usize {
        let mut col = 0;
        let mut cur = self.cells[cell.0].prev;
        while let Some(prev) = cur {
            col += 1;
            cur = self.cells[prev.0].prev;
        }
        col
    }

    /// Discrete `(column, row)` of a cell still part of the grid.
    pub fn find(&self, cell: CellId) -> Option<(usize, usize)> {
        let row = self.row_index(self.row_of(cell))?;
        Some((self.column_of(cell), row))
    }

    pub fn prev_cell(&self, cell: CellId) -> Option<CellId> {
        self.cells[cell.0].prev
    }

    pub fn next_cell(&self, cell: CellId) -> Option<CellId> {
        self.cells[cell.0].next
    }

    pub fn content(&self, cell: CellId) -> Option<T> {
        self.cells[cell.0].content
    }

    pub fn is_packable(&self, cell: CellId) -> bool {
        self.cells[cell.0].packable
    }

    pub fn set_packable(&mut self, cell: CellId, packable: bool) {
        self.cells[cell.0].packable = packable;
    }

    pub fn cell_of(&self, item: T) -> Option<CellId> {
        self.item_to_cell.get(&item).copied()
    }

    pub fn item_count(&self) -> usize {
        self.item_to_cell.len()
    }

    /// Records `item` in `cell`, evicting it from wherever it lived before.
    pub fn set_content(&mut self, cell: CellId, item: T) {
        if let Some(previous) = self.item_to_cell.get(&item).copied() {
            self.remove_content(previous, true);
        }
        if let Some(occupant) = self.cells[cell.0].content.take() {
            self.item_to_cell.remove(&occupant);
        }
        self.item_to_cell.insert(item, cell);
        let slot = &mut self.cells[cell.0];
        slot.content = Some(item);
        slot.packable = false;
    }

    pub fn remove_content(&mut self, cell: CellId, pack: bool) {
        if let Some(item) = self.cells[cell.0].content.take() {
            self.item_to_cell.remove(&item);
        }
        if pack {
            self.cells[cell.0].packable = true;
        }
    }

    /// Inserts an empty column so that it ends up at index `col`.
    pub fn insert_column_before(&mut self, col: usize) {
        debug_assert!(col <= self.width);
        let live: Vec<RowId> = self.order.clone();
        for row in live {
            let cells = &self.rows[row.0].cells;
            let prev = if col == 0 { None } else { Some(cells[col - 1]) };
            let next = cells.get(col).copied();
            let id = self.alloc_cell(row, prev, next);
            self.rows[row.0].cells.insert(col, id);
        }
        self.width += 1;
    }

    pub fn insert_column_after(&mut self, col: usize) {
        self.insert_column_before(col + 1);
    }

    /// Inserts an empty row so that it ends up at index `pos`.
    pub fn insert_row_at(&mut self, pos: usize) -> RowId {
        let pos = pos.min(self.order.len());
        let prev = pos.checked_sub(1).map(|p| self.order[p]);
        let next = self.order.get(pos).copied();
        let row = self.alloc_row(prev, next);
        self.order.insert(pos, row);
        row
    }

    pub fn insert_row_above(&mut self, row: RowId) -> RowId {
        let pos = self.position(row);
        self.insert_row_at(pos)
    }

    pub fn insert_row_beneath(&mut self, row: RowId) -> RowId {
        let pos = self.position(row);
        self.insert_row_at(pos + 1)
    }

    pub fn add_first_row(&mut self) -> RowId {
        self.insert_row_at(0)
    }

    pub fn add_last_row(&mut self) -> RowId {
        self.insert_row_at(self.order.len())
    }

    fn position(&self, row: RowId) -> usize {
        debug_assert!(self.row_index(row).is_some(), "row was packed away");
        self.row_index(row).unwrap_or(self.order.len() - 1)
    }

    /// Cell in the next column, growing the grid by one column if needed.
    pub fn after(&mut self, cell: CellId) -> CellId {
        if let Some(next) = self.cells[cell.0].next {
            return next;
        }
        let col = self.width;
        self.insert_column_before(col);
        self.row_cell(self.row_of(cell), col)
    }

    pub fn before(&mut self, cell: CellId) -> CellId {
        if let Some(prev) = self.cells[cell.0].prev {
            return prev;
        }
        self.insert_column_before(0);
        self.row_cell(self.row_of(cell), 0)
    }

    pub fn above(&mut self, cell: CellId) -> CellId {
        let col = self.column_of(cell);
        let row = self.row_of(cell);
        let target = match self.rows[row.0].prev {
            Some(prev) => prev,
            None => self.insert_row_above(row),
        };
        self.row_cell(target, col)
    }

    pub fn beneath(&mut self, cell: CellId) -> CellId {
        let col = self.column_of(cell);
        let row = self.row_of(cell);
        let target = match self.rows[row.0].next {
            Some(next) => next,
            None => self.insert_row_beneath(row),
        };
        self.row_cell(target, col)
    }

    pub fn can_interleave(&self, upper: RowId, lower: RowId) -> bool {
        if upper == lower {
            return false;
        }
        self.rows[upper.0]
            .cells
            .iter()
            .zip(&self.rows[lower.0].cells)
            .all(|(&a, &b)| self.cells[a.0].packable || self.cells[b.0].packable)
    }

    /// Folds `lower` into `upper` and drops it from the grid.
    fn interleave(&mut self, upper: RowId, lower: RowId) {
        for col in 0..self.width {
            let keep = self.rows[upper.0].cells[col];
            let gone = self.rows[lower.0].cells[col];
            if !self.cells[gone.0].packable {
                self.cells[keep.0].packable = false;
            }
            if let Some(item) = self.cells[gone.0].content {
                self.remove_content(gone, false);
                self.set_content(keep, item);
            }
        }
        let after = self.rows[lower.0].next;
        self.rows[upper.0].next = after;
        if let Some(after) = after {
            self.rows[after.0].prev = Some(upper);
        }
        self.order.retain(|&r| r != lower);
    }

    /// Merges the topmost interleavable row pair until none is left.
    /// Returns the number of rows removed.
    pub fn pack(&mut self) -> usize {
        let mut merged = 0;
        loop {
            let pair = self
                .order
                .windows(2)
                .find(|pair| self.can_interleave(pair[0], pair[1]))
                .map(|pair| (pair[0], pair[1]));
            let Some((upper, lower)) = pair else {
                break;
            };
            self.interleave(upper, lower);
            merged += 1;
        }
        merged
    }

    pub fn measure<F>(&self, padding: f32, size_of: F) -> GridMetrics
    where
        F: Fn(&T) -> (f32, f32),
    {
        let mut col_widths = vec![0.0_f32; self.width];
        let mut row_heights = Vec::with_capacity(self.order.len());
        for &row in &self.order {
            let mut height = 0.0_f32;
            for (col, cell) in self.rows[row.0].cells.iter().enumerate() {
                if let Some(item) = &self.cells[cell.0].content {
                    let (w, h) = size_of(item);
                    height = height.max(h + padding * 2.0);
                    col_widths[col] = col_widths[col].max(w + padding * 2.0);
                }
            }
            row_heights.push(height);
        }
        GridMetrics {
            col_widths,
            row_heights,
        }
    }
}
