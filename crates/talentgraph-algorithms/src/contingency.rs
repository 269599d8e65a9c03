//! Contingency tables
//!
//! Category × outcome count matrices backed by `ndarray`.

use ndarray::{Array1, Array2, Axis};

/// Observed counts with labelled rows (categories) and columns (outcomes)
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub counts: Array2<f64>,
}

impl ContingencyTable {
    /// Empty table with the given labels
    pub fn new(row_labels: Vec<String>, column_labels: Vec<String>) -> Self {
        let counts = Array2::zeros((row_labels.len(), column_labels.len()));
        Self {
            row_labels,
            column_labels,
            counts,
        }
    }

    /// Add one observation
    pub fn increment(&mut self, row: usize, column: usize) {
        self.counts[[row, column]] += 1.0;
    }

    pub fn rows(&self) -> usize {
        self.counts.nrows()
    }

    pub fn columns(&self) -> usize {
        self.counts.ncols()
    }

    pub fn row_totals(&self) -> Array1<f64> {
        self.counts.sum_axis(Axis(1))
    }

    pub fn column_totals(&self) -> Array1<f64> {
        self.counts.sum_axis(Axis(0))
    }

    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    /// Expected counts under independence: row_total * column_total / total
    pub fn expected(&self) -> Array2<f64> {
        let total = self.total();
        let rows = self.row_totals();
        let cols = self.column_totals();
        let mut expected = Array2::zeros(self.counts.raw_dim());
        if total <= 0.0 {
            return expected;
        }
        for ((r, c), e) in expected.indexed_iter_mut() {
            *e = rows[r] * cols[c] / total;
        }
        expected
    }

    /// Copy of the table without all-zero rows and columns.
    ///
    /// Empty margins make expected counts zero and the statistic undefined.
    pub fn pruned(&self) -> ContingencyTable {
        let rows = self.row_totals();
        let cols = self.column_totals();
        let keep_rows: Vec<usize> = (0..self.rows()).filter(|&r| rows[r] > 0.0).collect();
        let keep_cols: Vec<usize> = (0..self.columns()).filter(|&c| cols[c] > 0.0).collect();

        let counts = self
            .counts
            .select(Axis(0), &keep_rows)
            .select(Axis(1), &keep_cols);

        ContingencyTable {
            row_labels: keep_rows.iter().map(|&r| self.row_labels[r].clone()).collect(),
            column_labels: keep_cols.iter().map(|&c| self.column_labels[c].clone()).collect(),
            counts,
        }
    }
}
