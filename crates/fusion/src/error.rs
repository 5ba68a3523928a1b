use fvi_scoring::ScoringError;
use fvi_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FusionError>;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    /// The caller's deadline passed; no partial bundle is returned.
    #[error("Context fusion timed out after {ms} ms")]
    Timeout { ms: u64 },

    #[error("Empty query")]
    EmptyQuery,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
