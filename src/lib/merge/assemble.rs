//! Final binding and cross-checking of merged layers and metadata
//!
//! A violation here means the merge itself broke an invariant, so nothing
//! is ever emitted from a container that fails these checks.

use crate::container::{MergedContainer, SampleRange, LAYER_COUNTS};
use crate::core::error::{Result, ScmergeError};
use crate::merge::concat::ConcatOutput;
use polars::prelude::DataFrame;
use std::collections::HashMap;

/// Validate cardinalities across every merged layer, the metadata table,
/// and the cell names, then bind them into one output container.
pub fn assemble(
    labels: Vec<String>,
    merged_layers: Vec<(String, ConcatOutput)>,
    metadata: DataFrame,
    cell_names: Vec<String>,
) -> Result<MergedContainer> {
    let n_features = labels.len();
    let n_cells = cell_names.len();

    let mut counts = None;
    let mut layers = HashMap::new();
    let mut reference_ranges: Option<Vec<SampleRange>> = None;

    for (name, out) in merged_layers {
        if out.matrix.nrows() != n_features {
            return Err(ScmergeError::Cardinality {
                expected: format!("{} rows in layer '{}'", n_features, name),
                actual: format!("{} rows", out.matrix.nrows()),
            });
        }
        if out.matrix.ncols() != n_cells {
            return Err(ScmergeError::Cardinality {
                expected: format!("{} columns in layer '{}'", n_cells, name),
                actual: format!("{} columns", out.matrix.ncols()),
            });
        }
        match reference_ranges.as_ref() {
            None => reference_ranges = Some(out.ranges.clone()),
            Some(reference) => {
                if *reference != out.ranges {
                    return Err(ScmergeError::Cardinality {
                        expected: "identical sample column ranges across layers".to_string(),
                        actual: format!("layer '{}' diverges", name),
                    });
                }
            }
        }
        if name == LAYER_COUNTS {
            counts = Some(out.matrix);
        } else {
            layers.insert(name, out.matrix);
        }
    }

    let counts = counts.ok_or_else(|| ScmergeError::Cardinality {
        expected: format!("a merged '{}' layer", LAYER_COUNTS),
        actual: "none produced".to_string(),
    })?;
    let ranges = reference_ranges.unwrap_or_default();

    let spanned: usize = ranges.iter().map(|r| r.len).sum();
    if spanned != n_cells {
        return Err(ScmergeError::Cardinality {
            expected: format!("{} cells covered by sample ranges", n_cells),
            actual: format!("{} cells", spanned),
        });
    }

    if metadata.height() != n_cells {
        return Err(ScmergeError::Cardinality {
            expected: format!("{} metadata rows", n_cells),
            actual: format!("{} metadata rows", metadata.height()),
        });
    }

    Ok(MergedContainer {
        labels,
        cell_names,
        counts,
        layers,
        metadata,
        ranges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sparse::SparseOps;
    use polars::prelude::*;

    fn concat_out(nrows: usize, ncols: usize, ranges: Vec<SampleRange>) -> ConcatOutput {
        ConcatOutput {
            matrix: SparseOps::from_triplets_f64(nrows, ncols, vec![]).unwrap(),
            ranges,
        }
    }

    fn meta(height: usize) -> DataFrame {
        DataFrame::new(vec![Series::new("x".into(), vec!["v"; height]).into()]).unwrap()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    fn range(id: &str, start: usize, len: usize) -> SampleRange {
        SampleRange {
            sample_id: id.to_string(),
            start,
            len,
        }
    }

    #[test]
    fn binds_consistent_layers() {
        let labels = vec!["A".to_string(), "B".to_string()];
        let ranges = vec![range("s1", 0, 3)];
        let merged = assemble(
            labels,
            vec![
                (LAYER_COUNTS.to_string(), concat_out(2, 3, ranges.clone())),
                ("data".to_string(), concat_out(2, 3, ranges)),
            ],
            meta(3),
            names(3),
        )
        .unwrap();
        assert_eq!(merged.n_features(), 2);
        assert_eq!(merged.n_cells(), 3);
        assert!(merged.layers.contains_key("data"));
    }

    #[test]
    fn rejects_row_cardinality_violation() {
        let err = assemble(
            vec!["A".to_string()],
            vec![(LAYER_COUNTS.to_string(), concat_out(2, 1, vec![range("s", 0, 1)]))],
            meta(1),
            names(1),
        )
        .unwrap_err();
        assert!(matches!(err, ScmergeError::Cardinality { .. }));
    }

    #[test]
    fn rejects_metadata_height_violation() {
        let err = assemble(
            vec!["A".to_string()],
            vec![(LAYER_COUNTS.to_string(), concat_out(1, 2, vec![range("s", 0, 2)]))],
            meta(1),
            names(2),
        )
        .unwrap_err();
        assert!(matches!(err, ScmergeError::Cardinality { .. }));
    }

    #[test]
    fn rejects_diverging_ranges_between_layers() {
        let err = assemble(
            vec!["A".to_string()],
            vec![
                (LAYER_COUNTS.to_string(), concat_out(1, 2, vec![range("s", 0, 2)])),
                ("data".to_string(), concat_out(1, 2, vec![range("t", 0, 2)])),
            ],
            meta(2),
            names(2),
        )
        .unwrap_err();
        assert!(matches!(err, ScmergeError::Cardinality { .. }));
    }

    #[test]
    fn missing_counts_layer_is_fatal() {
        let err = assemble(
            vec!["A".to_string()],
            vec![("data".to_string(), concat_out(1, 1, vec![range("s", 0, 1)]))],
            meta(1),
            names(1),
        )
        .unwrap_err();
        assert!(matches!(err, ScmergeError::Cardinality { .. }));
    }
}
