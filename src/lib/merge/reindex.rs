//! Re-indexing of one sample's matrix into the global feature space
//!
//! Each stored entry is relocated to the row position its label occupies in
//! the global space; labels absent from the sample contribute no stored
//! entries. The result is built directly from CSR arrays, so cost is
//! O(nnz + union size) with no dense intermediate.

use crate::core::error::{Result, ScmergeError};
use crate::merge::label_union::LabelUnion;
use nalgebra_sparse::CsrMatrix;

/// Scatter `matrix` (rows keyed by `sample_labels`) onto the rows of
/// `union`, keeping columns unchanged. Consumes the input matrix.
pub fn reindex_rows(
    matrix: CsrMatrix<f64>,
    sample_labels: &[String],
    union: &LabelUnion,
) -> Result<CsrMatrix<f64>> {
    if matrix.nrows() != sample_labels.len() {
        return Err(ScmergeError::DimensionMismatch {
            expected: format!("{} labelled rows", sample_labels.len()),
            actual: format!("{} matrix rows", matrix.nrows()),
        });
    }

    // Global row -> sample row. Unlabelled global rows stay implicit zeros.
    let mut source: Vec<Option<usize>> = vec![None; union.len()];
    for (sample_row, label) in sample_labels.iter().enumerate() {
        let global_row = union.position(label).ok_or_else(|| {
            ScmergeError::InvalidInput(format!(
                "Label '{}' is not part of the global feature space",
                label
            ))
        })?;
        if source[global_row].replace(sample_row).is_some() {
            return Err(ScmergeError::InvalidInput(format!(
                "Duplicate label '{}' within one sample",
                label
            )));
        }
    }

    let ncols = matrix.ncols();
    let (row_offsets, col_indices, values) = matrix.csr_data();

    let mut new_offsets = Vec::with_capacity(union.len() + 1);
    new_offsets.push(0);
    let mut new_cols = Vec::with_capacity(values.len());
    let mut new_vals = Vec::with_capacity(values.len());

    for slot in &source {
        if let Some(sample_row) = slot {
            let start = row_offsets[*sample_row];
            let end = row_offsets[sample_row + 1];
            new_cols.extend_from_slice(&col_indices[start..end]);
            new_vals.extend_from_slice(&values[start..end]);
        }
        new_offsets.push(new_cols.len());
    }

    CsrMatrix::try_from_csr_data(union.len(), ncols, new_offsets, new_cols, new_vals)
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sparse::SparseOps;

    fn owned(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn relocates_entries_to_global_rows() {
        let labels = owned(&["B", "C"]);
        let union_src = owned(&["A", "B", "C"]);
        let union = LabelUnion::from_samples([union_src.as_slice()]);
        let m = SparseOps::from_triplets_f64(2, 1, vec![(0, 0, 3.0), (1, 0, 4.0)]).unwrap();

        let r = reindex_rows(m, &labels, &union).unwrap();
        assert_eq!((r.nrows(), r.ncols()), (3, 1));
        assert_eq!(r.get_entry(0, 0).unwrap().into_value(), 0.0);
        assert_eq!(r.get_entry(1, 0).unwrap().into_value(), 3.0);
        assert_eq!(r.get_entry(2, 0).unwrap().into_value(), 4.0);
    }

    #[test]
    fn missing_labels_stay_implicit_zeros() {
        let labels = owned(&["B"]);
        let union_src = owned(&["A", "B", "C", "D"]);
        let union = LabelUnion::from_samples([union_src.as_slice()]);
        let m = SparseOps::from_triplets_f64(1, 2, vec![(0, 1, 2.0)]).unwrap();

        let r = reindex_rows(m, &labels, &union).unwrap();
        assert_eq!(r.nrows(), 4);
        // Only the relocated entry is stored; zero rows cost nothing.
        assert_eq!(r.nnz(), 1);
        assert_eq!(r.get_entry(1, 1).unwrap().into_value(), 2.0);
    }

    #[test]
    fn reorders_interleaved_labels() {
        // Sample rows appear in an order unrelated to the global order.
        let labels = owned(&["C", "A"]);
        let union_src = owned(&["A", "B", "C"]);
        let union = LabelUnion::from_samples([union_src.as_slice()]);
        let m = SparseOps::from_triplets_f64(2, 2, vec![(0, 0, 9.0), (1, 1, 8.0)]).unwrap();

        let r = reindex_rows(m, &labels, &union).unwrap();
        assert_eq!(r.get_entry(2, 0).unwrap().into_value(), 9.0);
        assert_eq!(r.get_entry(0, 1).unwrap().into_value(), 8.0);
        assert_eq!(r.nnz(), 2);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let labels = owned(&["Z"]);
        let union_src = owned(&["A"]);
        let union = LabelUnion::from_samples([union_src.as_slice()]);
        let m = SparseOps::from_triplets_f64(1, 1, vec![]).unwrap();
        assert!(matches!(
            reindex_rows(m, &labels, &union),
            Err(ScmergeError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_feature_sample_against_empty_union() {
        let labels: Vec<String> = Vec::new();
        let union = LabelUnion::from_samples([labels.as_slice()]);
        let m = SparseOps::from_triplets_f64(0, 3, vec![]).unwrap();
        let r = reindex_rows(m, &labels, &union).unwrap();
        assert_eq!((r.nrows(), r.ncols()), (0, 3));
        assert_eq!(r.nnz(), 0);
    }
}
