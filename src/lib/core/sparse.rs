//! Sparse matrix utilities shared across scmerge
//!
//! Expression matrices are kept feature-major throughout the merge engine:
//! rows are feature labels, columns are cells of one sample.

use crate::core::error::{Result, ScmergeError};
use itertools::Itertools;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

pub struct SparseOps;

impl SparseOps {
    /// Create a CSR matrix from (row, col, value) triplets.
    ///
    /// Triplets may arrive in any order; duplicate positions are rejected so
    /// that a stored entry always equals the logical entry.
    pub fn from_triplets_f64(
        nrows: usize,
        ncols: usize,
        triplets: Vec<(usize, usize, f64)>,
    ) -> Result<CsrMatrix<f64>> {
        if triplets.is_empty() {
            return Ok(CsrMatrix::zeros(nrows, ncols));
        }

        for &(row, col, _) in &triplets {
            if row >= nrows || col >= ncols {
                return Err(ScmergeError::InvalidInput(format!(
                    "Index ({}, {}) exceeds matrix dimensions ({}, {})",
                    row, col, nrows, ncols
                )));
            }
        }

        let (row_indices, col_indices, values): (Vec<_>, Vec<_>, Vec<_>) =
            triplets.into_iter().multiunzip();

        let coo = CooMatrix::try_from_triplets(nrows, ncols, row_indices, col_indices, values)
            .map_err(|e| ScmergeError::SparseMatrix(format!("COO creation failed: {:?}", e)))?;

        // COO -> CSR conversion sums duplicate positions, so a shrinking nnz
        // reveals a duplicate (row, col) pair in the input.
        let csr = CsrMatrix::from(&coo);
        if csr.nnz() != coo.nnz() {
            return Err(ScmergeError::SparseMatrix(
                "Duplicate (row, col) entries in triplet list".to_string(),
            ));
        }
        Ok(csr)
    }

    /// Transpose, swapping the feature and cell axes.
    pub fn transpose_f64(matrix: &CsrMatrix<f64>) -> CsrMatrix<f64> {
        matrix.transpose()
    }
}
