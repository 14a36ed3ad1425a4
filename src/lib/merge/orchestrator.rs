//! Driving logic for a multi-sample merge
//!
//! One invocation computes the global feature space once, then re-indexes
//! and concatenates every requested layer with the same feature space and
//! the same sample order, so row `i` of every merged layer names the same
//! feature and column `j` the same original cell. Layers are independent
//! of each other and merge on parallel workers; within a layer the fold
//! runs sequentially in input order and drops each sample matrix as soon
//! as it has been folded in.

use crate::container::{
    MergedContainer, SampleContainer, LAYER_COUNTS, LAYER_DATA, LAYER_SCALE_DATA,
};
use crate::core::error::{Result, ScmergeError};
use crate::merge::annotations::merge_annotations;
use crate::merge::assemble::assemble;
use crate::merge::concat::{ColumnConcatenator, ConcatOutput};
use crate::merge::label_union::LabelUnion;
use crate::merge::reindex::reindex_rows;
use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

/// Caller-selected scope of one merge invocation.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Optional layers to merge besides the required counts layer. Layers
    /// not listed here are skipped entirely.
    pub optional_layers: Vec<String>,
}

impl MergeOptions {
    /// Merge only the counts layer.
    pub fn counts_only() -> Self {
        MergeOptions::default()
    }

    /// Merge counts plus the normalized and scaled expression layers.
    pub fn with_expression_layers() -> Self {
        MergeOptions {
            optional_layers: vec![LAYER_DATA.to_string(), LAYER_SCALE_DATA.to_string()],
        }
    }
}

struct LayerJob {
    name: String,
    matrices: Vec<CsrMatrix<f64>>,
}

/// Merge samples into one combined container, consuming the inputs.
pub fn merge_samples(
    samples: Vec<SampleContainer>,
    options: &MergeOptions,
) -> Result<MergedContainer> {
    if samples.is_empty() {
        return Err(ScmergeError::EmptyData(
            "No samples supplied to merge".to_string(),
        ));
    }
    preflight(&samples, options)?;

    let union = LabelUnion::from_samples(samples.iter().map(|s| s.labels.as_slice()));
    info!(
        "Global feature space: {} labels across {} samples",
        union.len(),
        samples.len()
    );
    if !options.optional_layers.is_empty() {
        info!(
            "Merging optional layers: {}",
            options.optional_layers.iter().join(", ")
        );
    }

    // Decompose the samples so every layer owns its own queue of matrices
    // and can fold (and free) them independently of the other layers.
    let n = samples.len();
    let mut sample_ids: Vec<String> = Vec::with_capacity(n);
    let mut sample_labels: Vec<Vec<String>> = Vec::with_capacity(n);
    let mut cell_name_sets: Vec<Vec<String>> = Vec::with_capacity(n);
    let mut annotation_inputs = Vec::with_capacity(n);
    let mut jobs: Vec<LayerJob> = std::iter::once(LAYER_COUNTS.to_string())
        .chain(options.optional_layers.iter().cloned())
        .map(|name| LayerJob {
            name,
            matrices: Vec::with_capacity(n),
        })
        .collect();

    for mut sample in samples {
        jobs[0].matrices.push(sample.counts);
        for (slot, layer_name) in options.optional_layers.iter().enumerate() {
            let matrix = sample.layers.remove(layer_name).ok_or_else(|| {
                ScmergeError::MissingLayer {
                    sample: sample.id.clone(),
                    layer: layer_name.clone(),
                }
            })?;
            jobs[slot + 1].matrices.push(matrix);
        }
        sample_ids.push(sample.id.clone());
        sample_labels.push(sample.labels);
        cell_name_sets.push(sample.cell_names);
        annotation_inputs.push((sample.id, sample.metadata));
    }

    // Re-indexing is independent per layer; results come back in job order
    // and each fold inside keeps the input sample order.
    let merged_layers: Vec<(String, ConcatOutput)> = jobs
        .into_par_iter()
        .map(|job| merge_layer(job, &sample_ids, &sample_labels, &union))
        .collect::<Result<Vec<_>>>()?;

    let metadata = merge_annotations(annotation_inputs)?;
    let cell_names = disambiguate_cell_names(&sample_ids, cell_name_sets);

    info!(
        "Merged dataset: {} labels x {} cells",
        union.len(),
        cell_names.len()
    );
    assemble(union.into_labels(), merged_layers, metadata, cell_names)
}

/// All requested layers must exist on all samples before any merge work
/// starts; a hole here is a configuration error, not a padding case.
fn preflight(samples: &[SampleContainer], options: &MergeOptions) -> Result<()> {
    for sample in samples {
        sample.validate()?;
        for layer in &options.optional_layers {
            if !sample.layers.contains_key(layer) {
                return Err(ScmergeError::MissingLayer {
                    sample: sample.id.clone(),
                    layer: layer.clone(),
                });
            }
        }
    }
    Ok(())
}

fn merge_layer(
    job: LayerJob,
    sample_ids: &[String],
    sample_labels: &[Vec<String>],
    union: &LabelUnion,
) -> Result<(String, ConcatOutput)> {
    let LayerJob { name, matrices } = job;
    let mut acc = ColumnConcatenator::new(union.len());
    for ((matrix, id), labels) in matrices.into_iter().zip(sample_ids).zip(sample_labels) {
        debug!(
            "Re-indexing layer '{}' for sample '{}' ({} x {})",
            name,
            id,
            matrix.nrows(),
            matrix.ncols()
        );
        let reindexed = reindex_rows(matrix, labels, union)?;
        acc.push(id, reindexed)?;
    }
    let out = acc.finish()?;
    info!(
        "Layer '{}' merged: {} x {} with {} non-zeros",
        name,
        out.matrix.nrows(),
        out.matrix.ncols(),
        out.matrix.nnz()
    );
    Ok((name, out))
}

/// Keep cell names unique across samples. The first occurrence keeps its
/// name; later collisions get the owning sample's identity appended, and
/// an ordinal on top when even that repeats.
fn disambiguate_cell_names(sample_ids: &[String], cell_name_sets: Vec<Vec<String>>) -> Vec<String> {
    let total = cell_name_sets.iter().map(Vec::len).sum();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut merged = Vec::with_capacity(total);
    let mut renamed = 0usize;

    for (id, names) in sample_ids.iter().zip(cell_name_sets) {
        for name in names {
            let mut candidate = name;
            if seen.contains(&candidate) {
                renamed += 1;
                let base = format!("{}_{}", candidate, id);
                candidate = base.clone();
                let mut ordinal = 1usize;
                while seen.contains(&candidate) {
                    candidate = format!("{}_{}", base, ordinal);
                    ordinal += 1;
                }
            }
            seen.insert(candidate.clone());
            merged.push(candidate);
        }
    }

    if renamed > 0 {
        warn!(
            "{} duplicated cell names were suffixed with their sample identity",
            renamed
        );
    }
    merged
}
