//! Track rows and the accumulation grid. Row 0 is the top of the tower.

use std::collections::VecDeque;

/// Single cell: empty or part of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled,
}

impl Cell {
    #[inline]
    pub fn is_filled(self) -> bool {
        self == Self::Filled
    }
}

/// One horizontal line of the play field. Length never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    cells: VecDeque<Cell>,
}

impl TrackRow {
    pub fn new(width: usize) -> Self {
        Self {
            cells: std::iter::repeat_n(Cell::Empty, width).collect(),
        }
    }

    /// Row with exactly the given columns filled; out-of-range columns are ignored.
    pub fn from_columns(width: usize, columns: &[usize]) -> Self {
        let mut row = Self::new(width);
        for &x in columns {
            row.set(x, Cell::Filled);
        }
        row
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn get(&self, x: usize) -> Option<Cell> {
        self.cells.get(x).copied()
    }

    #[inline]
    pub fn set(&mut self, x: usize, cell: Cell) {
        if let Some(c) = self.cells.get_mut(x) {
            *c = cell;
        }
    }

    #[inline]
    pub fn is_filled(&self, x: usize) -> bool {
        self.get(x).is_some_and(Cell::is_filled)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_filled()).count()
    }

    pub fn filled_columns(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(x, c)| c.is_filled().then_some(x))
            .collect()
    }

    /// Fill columns `0..count` (clamped to the row width).
    pub fn fill_prefix(&mut self, count: usize) {
        for c in self.cells.iter_mut().take(count) {
            *c = Cell::Filled;
        }
    }

    /// Drop the last cell and push an empty one in at the front.
    pub fn shift_right(&mut self) {
        if self.cells.pop_back().is_some() {
            self.cells.push_front(Cell::Empty);
        }
    }

    /// Drop the first cell and push an empty one in at the back.
    pub fn shift_left(&mut self) {
        if self.cells.pop_front().is_some() {
            self.cells.push_back(Cell::Empty);
        }
    }

    #[inline]
    pub fn is_at_right_edge(&self) -> bool {
        self.cells.back().is_some_and(|c| c.is_filled())
    }

    #[inline]
    pub fn is_at_left_edge(&self) -> bool {
        self.cells.front().is_some_and(|c| c.is_filled())
    }
}

/// Accumulation grid: every placed row plus the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    rows: Vec<TrackRow>,
}

impl Grid {
    /// Empty grid with the bottom row holding a bar of `bar_size` cells from column 0.
    pub fn new(width: usize, height: usize, bar_size: usize) -> Self {
        let mut rows: Vec<TrackRow> = (0..height).map(|_| TrackRow::new(width)).collect();
        if let Some(bottom) = rows.last_mut() {
            bottom.fill_prefix(bar_size);
        }
        Self { width, rows }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn bottom(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    pub fn row_mut(&mut self, y: usize) -> Option<&mut TrackRow> {
        self.rows.get_mut(y)
    }

    /// Mutable row `y` together with the row directly beneath it (None for the bottom row).
    pub fn row_with_support(&mut self, y: usize) -> Option<(&mut TrackRow, Option<&TrackRow>)> {
        if y >= self.rows.len() {
            return None;
        }
        let (upper, lower) = self.rows.split_at_mut(y + 1);
        Some((&mut upper[y], lower.first()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_right_drops_last_and_pads_front() {
        let mut row = TrackRow::from_columns(6, &[0, 1, 2]);
        row.shift_right();
        assert_eq!(row.filled_columns(), vec![1, 2, 3]);
        assert_eq!(row.width(), 6);
    }

    #[test]
    fn test_shift_left_drops_first_and_pads_back() {
        let mut row = TrackRow::from_columns(6, &[0, 3, 4]);
        row.shift_left();
        assert_eq!(row.filled_columns(), vec![2, 3]);
        assert_eq!(row.width(), 6);
    }

    #[test]
    fn test_edges() {
        let row = TrackRow::from_columns(4, &[3]);
        assert!(row.is_at_right_edge());
        assert!(!row.is_at_left_edge());
        let row = TrackRow::from_columns(4, &[0]);
        assert!(row.is_at_left_edge());
        assert!(!row.is_at_right_edge());
    }

    #[test]
    fn test_single_cell_row() {
        let mut row = TrackRow::from_columns(1, &[0]);
        assert!(row.is_at_left_edge() && row.is_at_right_edge());
        row.shift_right();
        assert_eq!(row.filled_count(), 0);
        assert_eq!(row.width(), 1);
    }

    #[test]
    fn test_grid_new_fills_bottom_only() {
        let grid = Grid::new(6, 8, 3);
        assert_eq!(grid.height(), 8);
        assert_eq!(grid.bottom(), 7);
        assert_eq!(grid.rows()[7].filled_columns(), vec![0, 1, 2]);
        assert!(grid.rows()[..7].iter().all(|r| r.filled_count() == 0));
    }

    #[test]
    fn test_row_with_support() {
        let mut grid = Grid::new(6, 3, 2);
        let (active, below) = grid.row_with_support(1).unwrap();
        assert_eq!(active.filled_count(), 0);
        assert_eq!(below.map(TrackRow::filled_count), Some(2));
        let (_, below) = grid.row_with_support(2).unwrap();
        assert!(below.is_none());
        assert!(grid.row_with_support(3).is_none());
    }
}
