use serde::{Deserialize, Serialize};

/// Fixed-size rectangular board of integer cells, row-major, 0 = empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<u32>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    /// Builds a grid from explicit rows. Returns `None` when rows are ragged.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        Some(Self {
            rows: height,
            cols: width,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        self.cells[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[u32] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| (i / self.cols, i % self.cols))
            .collect()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&v| v != 0)
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.row(row).iter().all(|&v| v != 0)
    }

    pub fn max_value(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v != 0).count()
    }

    pub fn sum(&self) -> u64 {
        self.cells.iter().map(|&v| v as u64).sum()
    }

    /// Removes every full row and inserts as many empty rows at the top,
    /// keeping the remaining rows in order. Returns the number removed.
    pub fn clear_full_rows(&mut self) -> usize {
        let kept: Vec<u32> = (0..self.rows)
            .filter(|&r| !self.is_row_full(r))
            .flat_map(|r| self.row(r).to_vec())
            .collect();
        let removed = self.rows - kept.len() / self.cols.max(1);
        if removed == 0 {
            return 0;
        }

        let mut cells = vec![0; removed * self.cols];
        cells.extend(kept);
        self.cells = cells;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::new(3, 4);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.empty_cells().len(), 12);
        assert!(!grid.is_full());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(Grid::from_rows(vec![vec![1, 2], vec![3]]).is_none());
    }

    #[test]
    fn test_clear_full_rows_shifts_down() {
        let mut grid = Grid::from_rows(vec![
            vec![0, 5, 0],
            vec![1, 1, 1],
            vec![2, 0, 2],
            vec![3, 3, 3],
        ])
        .unwrap();

        assert_eq!(grid.clear_full_rows(), 2);
        assert_eq!(
            grid.to_rows(),
            vec![vec![0, 0, 0], vec![0, 0, 0], vec![0, 5, 0], vec![2, 0, 2]]
        );
        assert_eq!(grid.rows(), 4);
    }
}
