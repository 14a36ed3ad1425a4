//! Apply a mapping-table file to a container's cell metadata
//!
//! Each entry of the mapping table produces one destination column from a
//! source column, substituting values through the entry's from/to lists
//! and normalizing the result.

use anyhow::Result;
use log::info;
use scmerge_lib::container::h5ad::{read_sample_h5ad, write_sample_h5ad};
use scmerge_lib::core::error::ScmergeError;
use scmerge_lib::relabel::{apply_column_mapping, MappingTable};
use std::path::PathBuf;
use structopt::StructOpt;

/// Arguments for the `apply-mappings` command.
#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "apply-mappings",
    about = "Apply a mapping-table file to cell metadata and save the updated container"
)]
pub struct ApplyMappingsArgs {
    /// Input .h5ad file.
    #[structopt(short = "r", long, parse(from_os_str))]
    pub file: PathBuf,

    /// Mapping-table file (column.attribute=value lines).
    #[structopt(short = "m", long, parse(from_os_str))]
    pub mapping: PathBuf,

    /// Output .h5ad file.
    #[structopt(short = "o", long, parse(from_os_str))]
    pub output: PathBuf,
}

pub fn run_apply_mappings(args: ApplyMappingsArgs) -> Result<()> {
    match execute(&args) {
        Ok(applied) => {
            info!(
                "Applied {} mapping(s); container saved to {}",
                applied,
                args.output.display()
            );
            Ok(())
        }
        Err(err) => {
            log::error!("apply-mappings failed: {}", err);
            Err(err.into())
        }
    }
}

fn execute(args: &ApplyMappingsArgs) -> Result<usize, ScmergeError> {
    let table = MappingTable::from_path(&args.mapping)?;
    if table.is_empty() {
        return Err(ScmergeError::EmptyData(format!(
            "Mapping file {} declares no columns",
            args.mapping.display()
        )));
    }
    info!(
        "Parsed {} mapping(s) from {}",
        table.len(),
        args.mapping.display()
    );

    let sample_id = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.to_string_lossy().into_owned());

    info!("Reading {} ...", args.file.display());
    let mut sample = read_sample_h5ad(&args.file, sample_id)?;

    let mut applied = 0usize;
    for (dest, mapping) in table.iter() {
        apply_column_mapping(&mut sample.metadata, dest, mapping)?;
        applied += 1;
    }

    write_sample_h5ad(&sample, &args.output)?;
    Ok(applied)
}
