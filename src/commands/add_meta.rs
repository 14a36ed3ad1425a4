//! Add a metadata column from an inline value mapping
//!
//! Reads one container, derives a new cell metadata column from an
//! existing one through an `old:new,...` substitution list (with
//! `_rest_` catching unlisted values), and writes the updated container
//! next to the input under a new suffix.

use anyhow::Result;
use itertools::Itertools;
use log::info;
use scmerge_lib::container::h5ad::{read_sample_h5ad, write_sample_h5ad};
use scmerge_lib::core::error::ScmergeError;
use scmerge_lib::relabel::{add_mapped_column, parse_inline_mapping};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// Arguments for the `add-meta` command.
#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "add-meta",
    about = "Add a metadata column based on inline value mappings"
)]
pub struct AddMetaArgs {
    /// Input .h5ad file.
    #[structopt(short = "r", long, parse(from_os_str))]
    pub file: PathBuf,

    /// The original column name in the cell metadata.
    #[structopt(short = "o", long)]
    pub col_orig: String,

    /// The new column name to create.
    #[structopt(short = "n", long)]
    pub col_new: String,

    /// Value mappings as old:new pairs separated by commas; use _rest_ for
    /// all unlisted values.
    #[structopt(short = "m", long)]
    pub value_mapping: String,

    /// Suffix appended to the input file name for the output.
    #[structopt(short = "s", long)]
    pub suffix: String,
}

pub fn run_add_meta(args: AddMetaArgs) -> Result<()> {
    match execute(&args) {
        Ok(output) => {
            info!("Updated container saved to {}", output.display());
            Ok(())
        }
        Err(err) => {
            log::error!("add-meta failed: {}", err);
            Err(err.into())
        }
    }
}

fn execute(args: &AddMetaArgs) -> Result<PathBuf, ScmergeError> {
    let sample_id = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.to_string_lossy().into_owned());

    info!("Reading {} ...", args.file.display());
    let mut sample = read_sample_h5ad(&args.file, sample_id)?;

    let mapping = parse_inline_mapping(&args.col_orig, &args.value_mapping)?;
    add_mapped_column(&mut sample.metadata, &args.col_new, &mapping)?;

    report_value_change(&sample.metadata, &args.col_orig, &args.col_new)?;

    let output = derive_output_path(&args.file, &args.suffix);
    write_sample_h5ad(&sample, &output)?;
    Ok(output)
}

/// Echo the distinct values before and after the relabel, so a typo in
/// the mapping shows up immediately in the log.
fn report_value_change(
    metadata: &polars::prelude::DataFrame,
    col_orig: &str,
    col_new: &str,
) -> Result<(), ScmergeError> {
    for name in [col_orig, col_new] {
        let column = metadata.column(name).map_err(|_| {
            ScmergeError::InvalidInput(format!("Column '{}' not present in metadata", name))
        })?;
        let distinct = column
            .cast(&polars::prelude::DataType::String)?
            .as_materialized_series()
            .str()?
            .into_iter()
            .flatten()
            .unique()
            .map(str::to_string)
            .collect::<Vec<_>>();
        info!("Values in '{}': {}", name, distinct.join(", "));
    }
    Ok(())
}

fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let name = input.to_string_lossy();
    let stem = name.strip_suffix(".h5ad").unwrap_or(&name);
    PathBuf::from(format!("{}_{}.h5ad", stem, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_arguments() {
        let args = AddMetaArgs::from_iter_safe(&[
            "add-meta",
            "--file",
            "sample.h5ad",
            "--col-orig",
            "Tissue",
            "--col-new",
            "Tissue_std",
            "--value-mapping",
            "Tumor:colon_tumor,_rest_:other",
            "--suffix",
            "v2",
        ])
        .unwrap();
        assert_eq!(args.file, PathBuf::from("sample.h5ad"));
        assert_eq!(args.col_orig, "Tissue");
        assert_eq!(args.value_mapping, "Tumor:colon_tumor,_rest_:other");
    }

    #[test]
    fn output_path_inserts_suffix_before_extension() {
        assert_eq!(
            derive_output_path(Path::new("runs/sample.h5ad"), "v2"),
            PathBuf::from("runs/sample_v2.h5ad")
        );
        assert_eq!(
            derive_output_path(Path::new("noext"), "v1"),
            PathBuf::from("noext_v1.h5ad")
        );
    }
}
