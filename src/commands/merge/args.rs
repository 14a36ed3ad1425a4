use log::info;
use rustc_hash::FxHashMap;
use scmerge_lib::core::error::ScmergeError;
use scmerge_lib::utils::make_parent_dirs;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// Arguments for the `merge` command.
#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "merge",
    about = "Merge multiple .h5ad containers into a single dataset"
)]
pub struct MergeArgs {
    /// Input .h5ad files, merged in the order given.
    #[structopt(short, long, parse(from_os_str), required = true, min_values = 1)]
    pub files: Vec<PathBuf>,

    /// Output .h5ad file name.
    #[structopt(
        short,
        long,
        parse(from_os_str),
        default_value = "merged_counts.h5ad"
    )]
    pub output: PathBuf,

    /// Also merge the data and scale.data expression layers.
    #[structopt(short = "d", long)]
    pub include_data: bool,

    /// Number of threads to use (default: 2).
    #[structopt(short, long)]
    pub threads: Option<usize>,

    /// Validate inputs without merging.
    #[structopt(long)]
    pub dry_run: bool,
}

impl MergeArgs {
    pub fn validate(&self) -> Result<(), ScmergeError> {
        if self.files.is_empty() {
            return Err(ScmergeError::InvalidInput(
                "At least one input file is required".to_string(),
            ));
        }

        for file in &self.files {
            if !file.exists() {
                return Err(ScmergeError::FileNotFound(format!(
                    "Input file not found: {}",
                    file.display()
                )));
            }
            if !has_h5ad_extension(file) {
                return Err(ScmergeError::InvalidInput(format!(
                    "Input file must have .h5ad extension: {}",
                    file.display()
                )));
            }
        }

        if !has_h5ad_extension(&self.output) {
            return Err(ScmergeError::InvalidInput(
                "Output file must have .h5ad extension".to_string(),
            ));
        }
        make_parent_dirs(&self.output).map_err(|e| {
            ScmergeError::InvalidInput(format!("Failed to create output directory: {}", e))
        })?;
        // A stale output would otherwise survive an aborted run.
        if self.output.exists() {
            std::fs::remove_file(&self.output).map_err(|e| {
                ScmergeError::InvalidInput(format!(
                    "Failed to remove existing output file '{}': {}",
                    self.output.display(),
                    e
                ))
            })?;
        }

        info!("File validation passed");
        Ok(())
    }

    #[inline]
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or(2)
    }

    /// Sample identities derived from file names, in input order. A name
    /// that repeats gets an ordinal suffix so provenance values stay
    /// unambiguous.
    pub fn sample_identities(&self) -> Vec<String> {
        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        self.files
            .iter()
            .map(|file| {
                let base = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.to_string_lossy().into_owned());
                let seen = counts.entry(base.clone()).or_insert(0);
                *seen += 1;
                if *seen == 1 {
                    base
                } else {
                    format!("{}-{}", base, *seen)
                }
            })
            .collect()
    }
}

fn has_h5ad_extension(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".h5ad")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_arguments() {
        let args = MergeArgs::from_iter_safe(&[
            "merge",
            "--files",
            "a.h5ad",
            "b.h5ad",
            "--output",
            "out.h5ad",
        ])
        .unwrap();

        assert_eq!(
            args.files,
            vec![PathBuf::from("a.h5ad"), PathBuf::from("b.h5ad")]
        );
        assert_eq!(args.output, PathBuf::from("out.h5ad"));
        assert!(!args.include_data);
        assert!(!args.dry_run);
        assert_eq!(args.effective_threads(), 2);
    }

    #[test]
    fn include_data_flag_is_recognized() {
        let args =
            MergeArgs::from_iter_safe(&["merge", "--files", "a.h5ad", "--include-data"]).unwrap();
        assert!(args.include_data);
        assert_eq!(args.output, PathBuf::from("merged_counts.h5ad"));
    }

    #[test]
    fn sample_identities_use_file_names() {
        let args = MergeArgs::from_iter_safe(&[
            "merge",
            "--files",
            "runs/first.h5ad",
            "other/second.h5ad",
        ])
        .unwrap();
        assert_eq!(
            args.sample_identities(),
            vec!["first.h5ad".to_string(), "second.h5ad".to_string()]
        );
    }

    #[test]
    fn colliding_sample_names_get_ordinal_suffixes() {
        let args = MergeArgs::from_iter_safe(&[
            "merge",
            "--files",
            "a/sample.h5ad",
            "b/sample.h5ad",
            "c/sample.h5ad",
        ])
        .unwrap();
        assert_eq!(
            args.sample_identities(),
            vec![
                "sample.h5ad".to_string(),
                "sample.h5ad-2".to_string(),
                "sample.h5ad-3".to_string()
            ]
        );
    }

    #[test]
    fn missing_files_are_rejected() {
        let args = MergeArgs::from_iter_safe(&[
            "merge",
            "--files",
            "definitely/not/present.h5ad",
        ])
        .unwrap();
        assert!(matches!(
            args.validate(),
            Err(ScmergeError::FileNotFound(_))
        ));
    }
}
