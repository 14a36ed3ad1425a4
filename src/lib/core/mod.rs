pub mod concurrency;
pub mod error;
pub mod fs;
pub mod sparse;

pub mod prelude {
    pub use super::concurrency::determine_allowed_cpus;
    pub use super::error::{Result, ScmergeError};
    pub use super::fs::make_parent_dirs;
    pub use super::sparse::SparseOps;
}
