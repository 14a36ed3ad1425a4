//! Schema-union merge of per-sample cell metadata tables
//!
//! Column names are unioned in first-seen order; columns a sample lacks
//! are padded with nulls; every value is carried as a string so that
//! heterogeneous inputs stack cleanly. A provenance column records which
//! sample each row came from, and tables are row-concatenated in the same
//! sample order the matrix concatenation uses, keeping metadata row `i`
//! aligned with matrix column `i`.

use crate::core::error::Result;
use log::warn;
use polars::prelude::*;
use rustc_hash::FxHashSet;

/// Fixed name of the provenance column stamped on every merged row.
pub const PROVENANCE_COLUMN: &str = "batch_h5ad";

/// Merge metadata tables in sample order, consuming them one at a time.
pub fn merge_annotations(inputs: Vec<(String, DataFrame)>) -> Result<DataFrame> {
    let union = column_union(&inputs);

    let mut merged: Option<DataFrame> = None;
    for (sample_id, table) in inputs {
        let aligned = align_table(&sample_id, table, &union)?;
        match merged.as_mut() {
            None => merged = Some(aligned),
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
        }
    }

    Ok(merged.unwrap_or_else(DataFrame::empty))
}

/// First-seen union of metadata column names across all tables, with the
/// provenance column appended last.
fn column_union(inputs: &[(String, DataFrame)]) -> Vec<String> {
    let mut union: Vec<String> = Vec::new();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for (sample_id, table) in inputs {
        for name in table.get_column_names() {
            let name = name.as_str();
            if name == PROVENANCE_COLUMN {
                warn!(
                    "Sample '{}' already carries a '{}' column; it will be replaced",
                    sample_id, PROVENANCE_COLUMN
                );
                continue;
            }
            if seen.insert(name) {
                union.push(name.to_string());
            }
        }
    }
    union.push(PROVENANCE_COLUMN.to_string());
    union
}

/// Produce a table with exactly the union columns, in union order, every
/// value a string, missing columns null-filled, provenance stamped.
fn align_table(sample_id: &str, table: DataFrame, union: &[String]) -> Result<DataFrame> {
    let height = table.height();
    let mut columns: Vec<Column> = Vec::with_capacity(union.len());

    for name in &union[..union.len() - 1] {
        match table.column(name.as_str()) {
            Ok(col) => columns.push(col.cast(&DataType::String)?),
            Err(_) => columns.push(Column::full_null(
                name.as_str().into(),
                height,
                &DataType::String,
            )),
        }
    }
    columns.push(
        Series::new(
            PROVENANCE_COLUMN.into(),
            vec![sample_id.to_string(); height],
        )
        .into(),
    );
    drop(table);

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: Vec<(&str, Vec<&str>)>) -> DataFrame {
        DataFrame::new(
            cols.into_iter()
                .map(|(name, values)| Series::new(name.into(), values).into())
                .collect(),
        )
        .unwrap()
    }

    fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn unions_columns_and_pads_missing_with_nulls() {
        let s1 = table(vec![("tissue", vec!["lung", "lung"])]);
        let s2 = table(vec![
            ("tissue", vec!["liver"]),
            ("condition", vec!["tumor"]),
        ]);

        let merged =
            merge_annotations(vec![("s1".to_string(), s1), ("s2".to_string(), s2)]).unwrap();

        assert_eq!(merged.height(), 3);
        let names: Vec<&str> = merged
            .get_column_names()
            .iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(names, vec!["tissue", "condition", PROVENANCE_COLUMN]);

        assert_eq!(
            str_values(&merged, "condition"),
            vec![None, None, Some("tumor".to_string())]
        );
        assert_eq!(
            str_values(&merged, PROVENANCE_COLUMN),
            vec![
                Some("s1".to_string()),
                Some("s1".to_string()),
                Some("s2".to_string())
            ]
        );
    }

    #[test]
    fn row_count_matches_sum_of_inputs() {
        let s1 = table(vec![("a", vec!["1", "2", "3"])]);
        let s2 = table(vec![("a", vec!["4"])]);
        let merged =
            merge_annotations(vec![("x".to_string(), s1), ("y".to_string(), s2)]).unwrap();
        assert_eq!(merged.height(), 4);
    }

    #[test]
    fn column_order_is_first_seen() {
        let s1 = table(vec![("b", vec!["1"]), ("a", vec!["2"])]);
        let s2 = table(vec![("c", vec!["3"]), ("a", vec!["4"])]);
        let merged =
            merge_annotations(vec![("x".to_string(), s1), ("y".to_string(), s2)]).unwrap();
        let names: Vec<&str> = merged
            .get_column_names()
            .iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c", PROVENANCE_COLUMN]);
    }

    #[test]
    fn pre_existing_provenance_column_is_replaced() {
        let s1 = table(vec![(PROVENANCE_COLUMN, vec!["stale"]), ("a", vec!["1"])]);
        let merged = merge_annotations(vec![("fresh".to_string(), s1)]).unwrap();
        assert_eq!(
            str_values(&merged, PROVENANCE_COLUMN),
            vec![Some("fresh".to_string())]
        );
    }

    #[test]
    fn no_samples_yield_empty_table() {
        let merged = merge_annotations(Vec::new()).unwrap();
        assert_eq!(merged.height(), 0);
    }
}
