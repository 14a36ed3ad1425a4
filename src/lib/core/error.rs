//! Error types shared across the scmerge library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScmergeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Save error: {0}")]
    Save(String),

    #[error("Schema mismatch: sample '{sample}' is missing requested layer '{layer}'")]
    MissingLayer { sample: String, layer: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Cardinality error: expected {expected}, got {actual}")]
    Cardinality { expected: String, actual: String },

    #[error("Sparse matrix error: {0}")]
    SparseMatrix(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Empty data: {0}")]
    EmptyData(String),
}

pub type Result<T> = std::result::Result<T, ScmergeError>;

impl From<nalgebra_sparse::SparseFormatError> for ScmergeError {
    fn from(err: nalgebra_sparse::SparseFormatError) -> Self {
        ScmergeError::SparseMatrix(format!("Sparse format error: {:?}", err))
    }
}
