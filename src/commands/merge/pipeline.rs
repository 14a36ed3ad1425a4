use anyhow::Result;
use log::{error, info};

use crate::commands::common;
use scmerge_lib::container::h5ad::{read_sample_h5ad, write_merged_h5ad};
use scmerge_lib::core::error::ScmergeError;
use scmerge_lib::merge::{merge_samples, MergeOptions};

use super::args::MergeArgs;

pub fn run_merge(args: MergeArgs) -> Result<()> {
    info!("Starting merge of {} containers", args.files.len());

    args.validate()?;

    if args.dry_run {
        info!("Dry run completed successfully - all validations passed");
        return Ok(());
    }

    let requested_threads = args.effective_threads();
    let active_threads = common::configure_global_thread_pool(requested_threads)?;
    info!(
        "Rayon thread pool configured with {} threads",
        active_threads
    );

    match execute_pipeline(&args) {
        Ok(()) => {
            info!("Merge completed successfully");
            info!("Output written to: {}", args.output.display());
            Ok(())
        }
        Err(err) => {
            error!("Merge failed: {}", err);
            Err(err.into())
        }
    }
}

fn execute_pipeline(args: &MergeArgs) -> Result<(), ScmergeError> {
    let identities = args.sample_identities();

    let mut samples = Vec::with_capacity(args.files.len());
    for (path, id) in args.files.iter().zip(identities) {
        info!("Reading {} ...", path.display());
        let sample = read_sample_h5ad(path, id)?;
        info!(
            "Loaded sample '{}': {} features x {} cells, {} optional layer(s)",
            sample.id,
            sample.n_features(),
            sample.n_cells(),
            sample.layers.len()
        );
        samples.push(sample);
    }

    let options = if args.include_data {
        MergeOptions::with_expression_layers()
    } else {
        MergeOptions::counts_only()
    };

    let merged = merge_samples(samples, &options)?;
    write_merged_h5ad(&merged, &args.output)?;
    Ok(())
}
