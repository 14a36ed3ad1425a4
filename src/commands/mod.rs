pub mod add_meta;
pub mod add_meta_cond;
pub mod apply_mappings;
pub mod common;
pub mod merge;

pub use add_meta::{run_add_meta, AddMetaArgs};
pub use add_meta_cond::{run_add_meta_cond, AddMetaCondArgs};
pub use apply_mappings::{run_apply_mappings, ApplyMappingsArgs};
pub use merge::{run_merge, MergeArgs};
