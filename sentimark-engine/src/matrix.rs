//! Compressed sparse row storage for count and probability tables.

/// Immutable sparse matrix in CSR layout.
///
/// Column indices inside each row are strictly increasing, so single cells
/// are found with a binary search over the row's slice. Absent cells read as
/// `T::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<u32>,
    values: Vec<T>,
}

impl<T: Copy + Default + PartialEq> CsrMatrix<T> {
    /// Build from per-row `(column, value)` lists.
    ///
    /// Each row must be sorted by column without duplicates. Zero (default)
    /// values are dropped.
    pub fn from_rows<I>(n_cols: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<(u32, T)>>,
    {
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for row in rows {
            debug_assert!(row.windows(2).all(|w| w[0].0 < w[1].0));
            for (col, value) in row {
                debug_assert!((col as usize) < n_cols);
                if value != T::default() {
                    col_idx.push(col);
                    values.push(value);
                }
            }
            row_ptr.push(col_idx.len());
        }
        Self {
            n_rows: row_ptr.len() - 1,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Reassemble a matrix from its raw arrays, checking the CSR invariants.
    pub fn from_raw_parts(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<u32>,
        values: Vec<T>,
    ) -> Result<Self, String> {
        if row_ptr.len() != n_rows + 1 {
            return Err(format!(
                "row pointer length {} does not match {} rows",
                row_ptr.len(),
                n_rows
            ));
        }
        if col_idx.len() != values.len() {
            return Err(format!(
                "{} column indices but {} values",
                col_idx.len(),
                values.len()
            ));
        }
        if row_ptr.first() != Some(&0) || row_ptr.last() != Some(&col_idx.len()) {
            return Err("row pointers do not span the stored cells".to_string());
        }
        for r in 0..n_rows {
            let (start, end) = (row_ptr[r], row_ptr[r + 1]);
            if start > end || end > col_idx.len() {
                return Err(format!("row pointers out of order at row {r}"));
            }
            let cols = &col_idx[start..end];
            if cols.iter().any(|&c| c as usize >= n_cols) {
                return Err(format!("column index out of range in row {r}"));
            }
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("unsorted or duplicate columns in row {r}"));
            }
        }
        Ok(Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of stored (nonzero) cells.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        if row >= self.n_rows {
            return T::default();
        }
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        match self.col_idx[start..end].binary_search(&(col as u32)) {
            Ok(i) => self.values[start + i],
            Err(_) => T::default(),
        }
    }

    /// Stored cells of one row as `(column, value)` pairs.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (u32, T)> + '_ {
        let (start, end) = if row < self.n_rows {
            (self.row_ptr[row], self.row_ptr[row + 1])
        } else {
            (0, 0)
        };
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// All stored cells as `(row, column, value)`, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32, T)> + '_ {
        (0..self.n_rows).flat_map(move |r| self.row(r).map(move |(c, v)| (r, c, v)))
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_indices(&self) -> &[u32] {
        &self.col_idx
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}
