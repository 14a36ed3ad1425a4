//! Mapping-table files for metadata relabeling
//!
//! A mapping table is a flat text file of `key.attribute=value` lines,
//! grouped by destination-column key. Recognized attributes:
//!
//! - `src`: source metadata column to read values from
//! - `from` / `to`: comma-separated parallel lists forming the
//!   value-substitution table
//! - `default`: applied when a source value matches no `from` entry;
//!   empty means the original value passes through unchanged
//!
//! A `from`/`to` length mismatch is a hard error: silently skipping the
//! destination column would drop a relabel the caller asked for.

use crate::core::error::{Result, ScmergeError};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// Substitution rules for one destination column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub src: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub default: Option<String>,
}

impl ColumnMapping {
    /// True when the mapping copies values instead of substituting them.
    #[inline]
    pub fn is_copy(&self) -> bool {
        self.from.is_empty() && self.to.is_empty()
    }
}

/// Parsed mapping table, keeping destination columns in file order.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<(String, ColumnMapping)>,
}

impl MappingTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScmergeError::FileNotFound(format!(
                "Mapping file not found: {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut entries: Vec<(String, ColumnMapping)> = Vec::new();
        let mut index: FxHashMap<String, usize> = FxHashMap::default();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                ScmergeError::Parse(format!(
                    "Line {} is not a key=value pair: '{}'",
                    lineno + 1,
                    line
                ))
            })?;
            let (dest, attr) = key.split_once('.').ok_or_else(|| {
                ScmergeError::Parse(format!(
                    "Key '{}' on line {} is not of the form column.attribute",
                    key,
                    lineno + 1
                ))
            })?;

            let slot = match index.get(dest) {
                Some(&slot) => slot,
                None => {
                    entries.push((dest.to_string(), ColumnMapping::default()));
                    index.insert(dest.to_string(), entries.len() - 1);
                    entries.len() - 1
                }
            };
            let mapping = &mut entries[slot].1;
            match attr {
                "src" => mapping.src = value.to_string(),
                "from" => mapping.from = split_list(value),
                "to" => mapping.to = split_list(value),
                "default" => {
                    mapping.default = if value.is_empty() {
                        None
                    } else {
                        Some(value.to_string())
                    }
                }
                other => {
                    return Err(ScmergeError::Parse(format!(
                        "Unknown attribute '{}' for column '{}' on line {}",
                        other,
                        dest,
                        lineno + 1
                    )))
                }
            }
        }

        for (dest, mapping) in &entries {
            if mapping.from.len() != mapping.to.len() {
                return Err(ScmergeError::SchemaMismatch(format!(
                    "'from' and 'to' lists for '{}' have different lengths ({} vs {})",
                    dest,
                    mapping.from.len(),
                    mapping.to.len()
                )));
            }
        }

        Ok(MappingTable { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnMapping)> {
        self.entries.iter().map(|(name, m)| (name.as_str(), m))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(',').map(str::to_string).collect()
    }
}
