//! Application of relabeling rules to cell metadata tables

use crate::core::error::{Result, ScmergeError};
use crate::relabel::mapping::ColumnMapping;
use log::{info, warn};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::str::FromStr;

/// Canonical form used by mapping-table relabels: lowercase, spaces
/// replaced with underscores.
pub fn normalize_value(value: &str) -> String {
    value.to_lowercase().replace(' ', "_")
}

/// Apply one mapping-table entry, writing the destination column with
/// normalized values. A mapping without a source column is skipped, as a
/// mapping file may declare destinations it cannot fill for this input.
pub fn apply_column_mapping(
    metadata: &mut DataFrame,
    dest: &str,
    mapping: &ColumnMapping,
) -> Result<()> {
    if mapping.src.is_empty() {
        warn!("No source column specified for '{}'; skipping", dest);
        return Ok(());
    }
    let mapped = map_source_column(metadata, mapping, true)?;
    metadata.with_column(Series::new(dest.into(), mapped))?;
    info!("Applied mapping for '{}'", dest);
    Ok(())
}

/// Apply an inline mapping verbatim (no normalization), the behavior of
/// the quick one-column relabel.
pub fn add_mapped_column(
    metadata: &mut DataFrame,
    dest: &str,
    mapping: &ColumnMapping,
) -> Result<()> {
    let mapped = map_source_column(metadata, mapping, false)?;
    metadata.with_column(Series::new(dest.into(), mapped))?;
    Ok(())
}

fn map_source_column(
    metadata: &DataFrame,
    mapping: &ColumnMapping,
    normalize: bool,
) -> Result<Vec<Option<String>>> {
    let values = string_values(metadata, &mapping.src)?;
    let table: FxHashMap<&str, &str> = mapping
        .from
        .iter()
        .map(String::as_str)
        .zip(mapping.to.iter().map(String::as_str))
        .collect();

    Ok(values
        .into_iter()
        .map(|opt| {
            let replaced = match opt {
                None => mapping.default.clone(),
                Some(v) => match table.get(v.as_str()) {
                    Some(&t) => Some(t.to_string()),
                    None => Some(mapping.default.clone().unwrap_or(v)),
                },
            };
            if normalize {
                replaced.map(|v| normalize_value(&v))
            } else {
                replaced
            }
        })
        .collect())
}

/// Parse an inline `old:new,old:new,...` mapping; the pseudo-key
/// `_rest_` supplies the default for unlisted values.
pub fn parse_inline_mapping(src: &str, rules: &str) -> Result<ColumnMapping> {
    let mut from = Vec::new();
    let mut to = Vec::new();
    let mut default = None;
    for item in rules.split(',') {
        let (old, new) = item.split_once(':').ok_or_else(|| {
            ScmergeError::InvalidInput(format!(
                "Mapping entry '{}' is not of the form old:new",
                item
            ))
        })?;
        if old == "_rest_" {
            default = Some(new.to_string());
        } else {
            from.push(old.to_string());
            to.push(new.to_string());
        }
    }
    Ok(ColumnMapping {
        src: src.to_string(),
        from,
        to,
        default,
    })
}

/// Logical operator combining the two column conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    And,
    Or,
}

impl FromStr for ConditionOp {
    type Err = ScmergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(ConditionOp::And),
            "OR" => Ok(ConditionOp::Or),
            other => Err(ScmergeError::InvalidInput(format!(
                "Operator must be AND or OR, got '{}'",
                other
            ))),
        }
    }
}

/// Set `dest` to `new_value` on rows matching the two-column condition,
/// leaving other rows untouched. The destination column is created
/// (null-initialized) when absent. Returns the number of updated rows.
/// Null cells never match a condition.
pub fn apply_condition_update(
    metadata: &mut DataFrame,
    first: (&str, &str),
    second: (&str, &str),
    op: ConditionOp,
    dest: &str,
    new_value: &str,
) -> Result<usize> {
    let a = string_values(metadata, first.0)?;
    let b = string_values(metadata, second.0)?;
    let existing = if metadata
        .get_column_names()
        .iter()
        .any(|n| n.as_str() == dest)
    {
        string_values(metadata, dest)?
    } else {
        vec![None; metadata.height()]
    };

    let mut updated = 0usize;
    let merged: Vec<Option<String>> = a
        .iter()
        .zip(&b)
        .zip(existing)
        .map(|((av, bv), old)| {
            let first_hit = av.as_deref() == Some(first.1);
            let second_hit = bv.as_deref() == Some(second.1);
            let hit = match op {
                ConditionOp::And => first_hit && second_hit,
                ConditionOp::Or => first_hit || second_hit,
            };
            if hit {
                updated += 1;
                Some(new_value.to_string())
            } else {
                old
            }
        })
        .collect();

    metadata.with_column(Series::new(dest.into(), merged))?;
    Ok(updated)
}

fn string_values(metadata: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = metadata.column(name).map_err(|_| {
        ScmergeError::InvalidInput(format!("Column '{}' not present in metadata", name))
    })?;
    let as_strings = column.cast(&DataType::String)?;
    Ok(as_strings
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}
