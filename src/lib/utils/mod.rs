//! Shared helpers used by the CLI layer

use anyhow::Error;
use std::io;

pub use crate::core::concurrency::determine_allowed_cpus;
pub use crate::core::fs::make_parent_dirs;

/// Returns `true` if the error originated from a broken pipe.
#[inline]
pub fn is_broken_pipe(err: &Error) -> bool {
    err.root_cause()
        .downcast_ref::<io::Error>()
        .map(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
        .unwrap_or(false)
}
