//! Concatenation of re-indexed sample matrices along the cell axis
//!
//! The concatenator is a fold-left accumulator: each sample's matrix is
//! appended and dropped before the next one is touched, so peak memory is
//! one sample plus the accumulator. Appending columns is cheap in CSC
//! form, so the accumulator keeps raw CSC buffers and converts back to
//! CSR once, when finished.

use crate::container::SampleRange;
use crate::core::error::{Result, ScmergeError};
use nalgebra_sparse::{CscMatrix, CsrMatrix};

/// Combined matrix for one layer plus its column-range provenance.
#[derive(Debug, Clone)]
pub struct ConcatOutput {
    pub matrix: CsrMatrix<f64>,
    pub ranges: Vec<SampleRange>,
}

pub struct ColumnConcatenator {
    nrows: usize,
    col_offsets: Vec<usize>,
    row_indices: Vec<usize>,
    values: Vec<f64>,
    ranges: Vec<SampleRange>,
}

impl ColumnConcatenator {
    pub fn new(nrows: usize) -> Self {
        ColumnConcatenator {
            nrows,
            col_offsets: vec![0],
            row_indices: Vec::new(),
            values: Vec::new(),
            ranges: Vec::new(),
        }
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.col_offsets.len() - 1
    }

    /// Append one sample's re-indexed matrix, consuming it. Column indices
    /// of the input land at `input index + current column count`.
    pub fn push(&mut self, sample_id: &str, matrix: CsrMatrix<f64>) -> Result<()> {
        if matrix.nrows() != self.nrows {
            return Err(ScmergeError::DimensionMismatch {
                expected: format!("{} rows in accumulator", self.nrows),
                actual: format!("{} rows from sample '{}'", matrix.nrows(), sample_id),
            });
        }

        let start = self.ncols();
        let len = matrix.ncols();

        let csc = CscMatrix::from(&matrix);
        drop(matrix);
        let (offsets, rows, vals) = csc.disassemble();

        let base = self.values.len();
        self.col_offsets
            .extend(offsets.into_iter().skip(1).map(|o| o + base));
        self.row_indices.extend(rows);
        self.values.extend(vals);
        self.ranges.push(SampleRange {
            sample_id: sample_id.to_string(),
            start,
            len,
        });
        Ok(())
    }

    /// Convert the accumulated buffers into the combined CSR matrix.
    pub fn finish(self) -> Result<ConcatOutput> {
        let ncols = self.ncols();
        let csc = CscMatrix::try_from_csc_data(
            self.nrows,
            ncols,
            self.col_offsets,
            self.row_indices,
            self.values,
        )?;
        Ok(ConcatOutput {
            matrix: CsrMatrix::from(&csc),
            ranges: self.ranges,
        })
    }
}
