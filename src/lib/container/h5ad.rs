//! AnnData (.h5ad) load/save collaborator
//!
//! On disk the container is cell-major (`n_obs` cells x `n_vars`
//! features, AnnData convention); the merge engine is feature-major, so
//! matrices are transposed at this boundary. `X` carries the counts
//! layer; optional expression layers live under `layers/`.
//!
//! A failed save never leaves a partially-written file behind.

use crate::container::{
    MergedContainer, SampleContainer, LAYER_DATA, LAYER_SCALE_DATA,
};
use crate::core::error::{Result, ScmergeError};
use crate::core::sparse::SparseOps;
use anndata::data::array::dataframe::DataFrameIndex;
use anndata::{
    data::*,
    traits::{AnnDataOp, AxisArraysOp},
    AnnData, Backend,
};
use anndata_hdf5::H5;
use anyhow::{anyhow, bail, Context};
use log::{debug, info, warn};
use nalgebra_sparse::{CscMatrix, CsrMatrix};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Optional layer names the reader looks for.
const OPTIONAL_LAYERS: &[&str] = &[LAYER_DATA, LAYER_SCALE_DATA];

/// Read one sample's container from an `.h5ad` file.
pub fn read_sample_h5ad<P: AsRef<Path>>(path: P, sample_id: String) -> Result<SampleContainer> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScmergeError::FileNotFound(format!(
            "Input file not found: {}",
            path.display()
        )));
    }

    read_sample_impl(path, sample_id).map_err(|err| {
        ScmergeError::Load(format!("Failed to read {}: {:#}", path.display(), err))
    })
}

fn read_sample_impl(path: &Path, sample_id: String) -> anyhow::Result<SampleContainer> {
    let adata = AnnData::<H5>::open(H5::open(path)?)?;

    let n_cells = adata.n_obs();
    let n_features = adata.n_vars();
    debug!(
        "Sample '{}': {} cells x {} features on disk",
        sample_id, n_cells, n_features
    );

    let cell_names = adata.obs_names().into_vec();
    let labels = adata.var_names().into_vec();
    if cell_names.len() != n_cells {
        bail!(
            "obs_names length {} does not match n_obs {}",
            cell_names.len(),
            n_cells
        );
    }
    if labels.len() != n_features {
        bail!(
            "var_names length {} does not match n_vars {}",
            labels.len(),
            n_features
        );
    }

    let counts = read_x_matrix(&adata, n_cells, n_features)?;
    let layers = read_optional_layers(&adata, n_cells, n_features)?;
    let metadata = read_cell_metadata(&adata, &cell_names)?;

    let sample = SampleContainer {
        id: sample_id,
        labels,
        cell_names,
        counts,
        layers,
        metadata,
    };
    sample
        .validate()
        .map_err(|err| anyhow!("inconsistent container: {}", err))?;
    Ok(sample)
}

/// The required counts matrix, transposed to feature-major.
fn read_x_matrix(
    adata: &AnnData<H5>,
    n_cells: usize,
    n_features: usize,
) -> anyhow::Result<CsrMatrix<f64>> {
    let mut x_elem = adata
        .x()
        .extract()
        .ok_or_else(|| anyhow!("no counts matrix (X) present"))?;
    let array_data = x_elem
        .data()
        .map_err(|e| anyhow!("failed to extract counts matrix: {:?}", e))?;
    let cell_major = coerce_to_csr_f64(array_data).context("counts matrix (X)")?;
    if cell_major.nrows() != n_cells || cell_major.ncols() != n_features {
        bail!(
            "counts matrix is {}x{}, expected {}x{}",
            cell_major.nrows(),
            cell_major.ncols(),
            n_cells,
            n_features
        );
    }
    Ok(SparseOps::transpose_f64(&cell_major))
}

/// Known optional layers, transposed to feature-major. Absent layers are
/// simply not loaded; whether that is fatal is the merge planner's call.
fn read_optional_layers(
    adata: &AnnData<H5>,
    n_cells: usize,
    n_features: usize,
) -> anyhow::Result<HashMap<String, CsrMatrix<f64>>> {
    let mut layers = HashMap::new();
    let layers_ref = adata.layers();

    for &name in OPTIONAL_LAYERS {
        match layers_ref.get_item::<ArrayData>(name) {
            Ok(Some(array_data)) => {
                let cell_major = coerce_to_csr_f64(array_data)
                    .with_context(|| format!("layer '{}'", name))?;
                if cell_major.nrows() != n_cells || cell_major.ncols() != n_features {
                    bail!(
                        "layer '{}' is {}x{}, expected {}x{}",
                        name,
                        cell_major.nrows(),
                        cell_major.ncols(),
                        n_cells,
                        n_features
                    );
                }
                debug!("Loaded layer '{}' with {} non-zeros", name, cell_major.nnz());
                layers.insert(name.to_string(), SparseOps::transpose_f64(&cell_major));
            }
            Ok(None) => {}
            Err(_) => {
                debug!("Layer '{}' is not accessible; skipping", name);
            }
        }
    }
    Ok(layers)
}

/// Per-cell metadata table. An unreadable or misaligned table falls back
/// to a bare table of cell names so one malformed obs block does not sink
/// an otherwise usable sample.
fn read_cell_metadata(adata: &AnnData<H5>, cell_names: &[String]) -> anyhow::Result<DataFrame> {
    match adata.read_obs() {
        Ok(obs) if obs.height() == cell_names.len() => Ok(obs),
        Ok(obs) => {
            warn!(
                "Cell metadata has {} rows for {} cells; falling back to cell names",
                obs.height(),
                cell_names.len()
            );
            metadata_from_names(cell_names)
        }
        Err(err) => {
            warn!(
                "Cell metadata unreadable ({:?}); falling back to cell names",
                err
            );
            metadata_from_names(cell_names)
        }
    }
}

fn metadata_from_names(cell_names: &[String]) -> anyhow::Result<DataFrame> {
    Ok(DataFrame::new(vec![Series::new(
        "obs_names".into(),
        cell_names.to_vec(),
    )
    .into()])?)
}

/// Persist a merged dataset. On failure the destination file is removed.
pub fn write_merged_h5ad<P: AsRef<Path>>(merged: &MergedContainer, path: P) -> Result<()> {
    let path = path.as_ref();
    info!(
        "Writing merged dataset ({} labels x {} cells) to {}",
        merged.n_features(),
        merged.n_cells(),
        path.display()
    );

    let mut layer_order: Vec<&String> = merged.layers.keys().collect();
    layer_order.sort();
    let layers: Vec<(&str, &CsrMatrix<f64>)> = layer_order
        .into_iter()
        .map(|name| (name.as_str(), &merged.layers[name]))
        .collect();

    write_container(
        path,
        &merged.labels,
        &merged.cell_names,
        &merged.counts,
        &layers,
        &merged.metadata,
    )
    .map_err(|err| {
        let _ = std::fs::remove_file(path);
        ScmergeError::Save(format!("Failed to write {}: {:#}", path.display(), err))
    })
}

/// Persist a single-sample container (used by the metadata utilities).
pub fn write_sample_h5ad<P: AsRef<Path>>(sample: &SampleContainer, path: P) -> Result<()> {
    let path = path.as_ref();
    sample.validate()?;
    info!(
        "Writing sample '{}' ({} labels x {} cells) to {}",
        sample.id,
        sample.n_features(),
        sample.n_cells(),
        path.display()
    );

    let mut layer_order: Vec<&String> = sample.layers.keys().collect();
    layer_order.sort();
    let layers: Vec<(&str, &CsrMatrix<f64>)> = layer_order
        .into_iter()
        .map(|name| (name.as_str(), &sample.layers[name]))
        .collect();

    write_container(
        path,
        &sample.labels,
        &sample.cell_names,
        &sample.counts,
        &layers,
        &sample.metadata,
    )
    .map_err(|err| {
        let _ = std::fs::remove_file(path);
        ScmergeError::Save(format!("Failed to write {}: {:#}", path.display(), err))
    })
}

fn write_container(
    path: &Path,
    labels: &[String],
    cell_names: &[String],
    counts: &CsrMatrix<f64>,
    layers: &[(&str, &CsrMatrix<f64>)],
    metadata: &DataFrame,
) -> anyhow::Result<()> {
    let n_cells = cell_names.len();
    let n_features = labels.len();
    if counts.nrows() != n_features || counts.ncols() != n_cells {
        bail!(
            "counts matrix is {}x{}, expected {}x{}",
            counts.nrows(),
            counts.ncols(),
            n_features,
            n_cells
        );
    }
    if metadata.height() != n_cells {
        bail!(
            "metadata has {} rows for {} cells",
            metadata.height(),
            n_cells
        );
    }

    let adata = AnnData::<H5>::new(path)?;

    let cell_index: DataFrameIndex = cell_names.iter().cloned().collect();
    let label_index: DataFrameIndex = labels.iter().cloned().collect();
    adata.set_obs_names(cell_index)?;
    adata.set_var_names(label_index)?;

    adata.set_x(to_cell_major_f32(counts)?)?;
    debug!(
        "Wrote counts matrix {}x{} with {} non-zeros",
        n_cells,
        n_features,
        counts.nnz()
    );

    for (name, matrix) in layers {
        if matrix.nrows() != n_features || matrix.ncols() != n_cells {
            bail!(
                "layer '{}' is {}x{}, expected {}x{}",
                name,
                matrix.nrows(),
                matrix.ncols(),
                n_features,
                n_cells
            );
        }
        adata.layers().add(name, to_cell_major_f32(matrix)?)?;
        debug!("Wrote layer '{}' with {} non-zeros", name, matrix.nnz());
    }

    if !metadata.is_empty() {
        adata.set_obs(metadata.clone())?;
    }
    adata.set_n_obs(n_cells)?;
    adata.set_n_vars(n_features)?;

    Ok(())
}

// Disk dtype coercion. Counts and expression values travel as f32 on
// disk; in memory everything is f64.

fn to_cell_major_f32(matrix: &CsrMatrix<f64>) -> anyhow::Result<CsrMatrix<f32>> {
    let transposed = SparseOps::transpose_f64(matrix);
    let (row_offsets, col_indices, values) = transposed.csr_data();
    let values_f32: Vec<f32> = values.iter().map(|&x| x as f32).collect();
    CsrMatrix::try_from_csr_data(
        transposed.nrows(),
        transposed.ncols(),
        row_offsets.to_vec(),
        col_indices.to_vec(),
        values_f32,
    )
    .map_err(|e| anyhow!("failed to convert matrix to f32: {:?}", e))
}

fn coerce_to_csr_f64(array_data: ArrayData) -> anyhow::Result<CsrMatrix<f64>> {
    if let Ok(matrix) = CsrMatrix::<f64>::try_from(array_data.clone()) {
        return Ok(matrix);
    }
    if let Ok(matrix) = CscMatrix::<f64>::try_from(array_data.clone()) {
        return Ok(CsrMatrix::from(&matrix));
    }
    if let Ok(matrix) = CsrMatrix::<f32>::try_from(array_data.clone()) {
        return convert_csr_values(&matrix, |x| x as f64);
    }
    if let Ok(matrix) = CsrMatrix::<i32>::try_from(array_data.clone()) {
        return convert_csr_values(&matrix, |x| x as f64);
    }
    if let Ok(matrix) = CsrMatrix::<u32>::try_from(array_data.clone()) {
        return convert_csr_values(&matrix, |x| x as f64);
    }

    bail!(
        "unsupported array data type: {:?}",
        array_data.data_type()
    )
}

fn convert_csr_values<T, F>(matrix: &CsrMatrix<T>, convert: F) -> anyhow::Result<CsrMatrix<f64>>
where
    T: Copy,
    F: Fn(T) -> f64,
{
    let (row_offsets, col_indices, values) = matrix.csr_data();
    let values_f64: Vec<f64> = values.iter().map(|&x| convert(x)).collect();
    CsrMatrix::try_from_csr_data(
        matrix.nrows(),
        matrix.ncols(),
        row_offsets.to_vec(),
        col_indices.to_vec(),
        values_f64,
    )
    .map_err(|e| anyhow!("failed to convert matrix values: {:?}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sparse::SparseOps;

    #[test]
    fn f32_round_trip_preserves_layout() {
        let m = SparseOps::from_triplets_f64(2, 3, vec![(0, 1, 1.5), (1, 2, 2.0)]).unwrap();
        let on_disk = to_cell_major_f32(&m).unwrap();
        // Disk layout is cell-major, so the axes swap.
        assert_eq!((on_disk.nrows(), on_disk.ncols()), (3, 2));
        assert_eq!(on_disk.nnz(), 2);
        assert_eq!(on_disk.get_entry(1, 0).unwrap().into_value(), 1.5_f32);
        assert_eq!(on_disk.get_entry(2, 1).unwrap().into_value(), 2.0_f32);
    }

    #[test]
    fn value_conversion_keeps_sparsity_pattern() {
        let m = SparseOps::from_triplets_f64(2, 2, vec![(0, 0, 3.0)]).unwrap();
        let as_f32 = to_cell_major_f32(&m).unwrap();
        let back = convert_csr_values(&as_f32, |x| x as f64).unwrap();
        assert_eq!(back.nnz(), 1);
        assert_eq!(back.get_entry(0, 0).unwrap().into_value(), 3.0);
    }
}
