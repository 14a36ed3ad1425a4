//! scmerge - single-cell container merging toolkit
//!
//! scmerge combines multiple independently produced single-cell `.h5ad`
//! containers into one dataset. Inputs may cover different, partially
//! overlapping feature sets and carry different metadata columns; the
//! merged output aligns all matrices on the union of features and stacks
//! cell metadata with per-sample provenance.
//!
//! # Tools
//!
//! - `merge`: merge containers into one, optionally including the
//!   normalized and scaled expression layers
//! - `add-meta`: derive a metadata column from inline value mappings
//! - `add-meta-cond`: update a metadata column for rows matching a
//!   two-column condition
//! - `apply-mappings`: apply a mapping-table file to cell metadata
//!
//! # Usage
//!
//! ```bash
//! # Merge counts from three samples
//! scmerge merge -f a.h5ad b.h5ad c.h5ad -o merged.h5ad
//!
//! # Merge counts plus data/scale.data layers
//! scmerge merge -f a.h5ad b.h5ad -o merged.h5ad --include-data
//!
//! # Relabel a tissue column inline
//! scmerge add-meta -r sample.h5ad -o Tissue -n tissue_std \
//!     -m Tumor:colon_tumor,Normal:colon,_rest_:other -s v2
//!
//! # Apply a mapping-table file
//! scmerge apply-mappings -r sample.h5ad -m mapping_list.txt -o updated.h5ad
//! ```
//!
//! For more detailed usage information, see the documentation for each subcommand.

extern crate scmerge_lib;
pub mod commands;
use anyhow::Result;
use env_logger::Env;
use log::*;
use scmerge_lib::utils;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case", author, about)]
/// Commands for merging and annotating single-cell containers
struct Args {
    #[structopt(subcommand)]
    subcommand: Subcommand,
}

#[derive(StructOpt)]
enum Subcommand {
    /// Merge multiple .h5ad containers into a single dataset
    Merge(commands::MergeArgs),
    /// Add a metadata column based on inline value mappings
    AddMeta(commands::AddMetaArgs),
    /// Update a metadata column for rows matching a two-column condition
    AddMetaCond(commands::AddMetaCondArgs),
    /// Apply a mapping-table file to cell metadata
    ApplyMappings(commands::ApplyMappingsArgs),
}

impl Subcommand {
    fn run(self) -> Result<()> {
        match self {
            Subcommand::Merge(args) => commands::run_merge(args)?,
            Subcommand::AddMeta(args) => commands::run_add_meta(args)?,
            Subcommand::AddMetaCond(args) => commands::run_add_meta_cond(args)?,
            Subcommand::ApplyMappings(args) => commands::run_apply_mappings(args)?,
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = Args::from_args().subcommand.run() {
        if utils::is_broken_pipe(&err) {
            std::process::exit(0);
        }
        error!("{}", err);
        std::process::exit(1);
    }
    Ok(())
}
