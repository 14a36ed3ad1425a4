//! Metadata relabeling utilities
//!
//! Companion tools to the merge engine: value substitution over cell
//! metadata columns, driven either by a mapping-table file
//! ([`mapping`]) or by inline rules ([`apply`]).

pub mod apply;
pub mod mapping;

pub use apply::{
    add_mapped_column, apply_column_mapping, apply_condition_update, normalize_value,
    parse_inline_mapping, ConditionOp,
};
pub use mapping::{ColumnMapping, MappingTable};
