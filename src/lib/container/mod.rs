//! In-memory containers for per-sample and merged single-cell datasets
//!
//! A sample holds one required `counts` matrix, zero or more optional
//! expression layers sharing the same shape, and a per-cell metadata table.
//! Matrices are feature-major: rows are feature labels, columns are cells.

pub mod h5ad;

use crate::core::error::{Result, ScmergeError};
use nalgebra_sparse::CsrMatrix;
use polars::prelude::*;
use std::collections::HashMap;

/// Name of the required primary layer.
pub const LAYER_COUNTS: &str = "counts";
/// Optional log-normalized expression layer.
pub const LAYER_DATA: &str = "data";
/// Optional scaled expression layer.
pub const LAYER_SCALE_DATA: &str = "scale.data";

/// One input unit: a matrix stack plus cell-level metadata.
#[derive(Debug, Clone)]
pub struct SampleContainer {
    /// Sample identity, derived from the input's origin (file name).
    pub id: String,
    /// Feature labels naming the matrix rows.
    pub labels: Vec<String>,
    /// Cell names for the matrix columns, aligned 1:1 with metadata rows.
    pub cell_names: Vec<String>,
    /// Primary counts matrix, `labels.len()` x `cell_names.len()`.
    pub counts: CsrMatrix<f64>,
    /// Optional layers keyed by name, each shaped like `counts`.
    pub layers: HashMap<String, CsrMatrix<f64>>,
    /// Per-cell annotations, one row per matrix column.
    pub metadata: DataFrame,
}

impl SampleContainer {
    #[inline]
    pub fn n_features(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cell_names.len()
    }

    /// Check internal consistency between labels, cells, layers, and metadata.
    pub fn validate(&self) -> Result<()> {
        if self.counts.nrows() != self.n_features() || self.counts.ncols() != self.n_cells() {
            return Err(ScmergeError::DimensionMismatch {
                expected: format!(
                    "sample '{}' counts {}x{}",
                    self.id,
                    self.n_features(),
                    self.n_cells()
                ),
                actual: format!("counts {}x{}", self.counts.nrows(), self.counts.ncols()),
            });
        }

        for (name, matrix) in &self.layers {
            if matrix.nrows() != self.n_features() || matrix.ncols() != self.n_cells() {
                return Err(ScmergeError::DimensionMismatch {
                    expected: format!(
                        "sample '{}' layer '{}' {}x{}",
                        self.id,
                        name,
                        self.n_features(),
                        self.n_cells()
                    ),
                    actual: format!("layer {}x{}", matrix.nrows(), matrix.ncols()),
                });
            }
        }

        if self.metadata.height() != self.n_cells() {
            return Err(ScmergeError::DimensionMismatch {
                expected: format!("sample '{}' metadata rows = {}", self.id, self.n_cells()),
                actual: format!("metadata rows = {}", self.metadata.height()),
            });
        }

        Ok(())
    }
}

/// Half-open column range of the merged matrix owned by one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRange {
    pub sample_id: String,
    pub start: usize,
    pub len: usize,
}

/// Output of a merge invocation: one combined matrix per layer plus the
/// combined metadata table, with rows of `metadata` aligned 1:1 and in
/// order with the columns of every layer.
#[derive(Debug, Clone)]
pub struct MergedContainer {
    /// Ordered union of feature labels across all inputs.
    pub labels: Vec<String>,
    /// Cell names across all inputs, disambiguated where they collided.
    pub cell_names: Vec<String>,
    /// Combined primary layer.
    pub counts: CsrMatrix<f64>,
    /// Combined optional layers.
    pub layers: HashMap<String, CsrMatrix<f64>>,
    /// Combined per-cell metadata, including the provenance column.
    pub metadata: DataFrame,
    /// Column-range provenance, in input order.
    pub ranges: Vec<SampleRange>,
}

impl MergedContainer {
    #[inline]
    pub fn n_features(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cell_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sparse::SparseOps;

    fn sample(labels: &[&str], cells: &[&str], triplets: Vec<(usize, usize, f64)>) -> SampleContainer {
        let counts =
            SparseOps::from_triplets_f64(labels.len(), cells.len(), triplets).unwrap();
        let metadata = DataFrame::new(vec![Series::new(
            "tissue".into(),
            vec!["t"; cells.len()],
        )
        .into()])
        .unwrap();
        SampleContainer {
            id: "s1.h5ad".to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            cell_names: cells.iter().map(|s| s.to_string()).collect(),
            counts,
            layers: HashMap::new(),
            metadata,
        }
    }

    #[test]
    fn valid_sample_passes_validation() {
        let s = sample(&["A", "B"], &["c1", "c2"], vec![(0, 0, 1.0), (1, 1, 2.0)]);
        s.validate().unwrap();
    }

    #[test]
    fn metadata_height_mismatch_is_rejected() {
        let mut s = sample(&["A"], &["c1", "c2"], vec![]);
        s.metadata = DataFrame::new(vec![Series::new("tissue".into(), vec!["t"]).into()]).unwrap();
        assert!(matches!(
            s.validate(),
            Err(ScmergeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn layer_shape_mismatch_is_rejected() {
        let mut s = sample(&["A", "B"], &["c1"], vec![]);
        s.layers.insert(
            LAYER_DATA.to_string(),
            SparseOps::from_triplets_f64(1, 1, vec![]).unwrap(),
        );
        assert!(matches!(
            s.validate(),
            Err(ScmergeError::DimensionMismatch { .. })
        ));
    }
}
