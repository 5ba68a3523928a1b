use fvi_text_chunker::ChunkerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// The embedding collaborator failed; the previous index stays active.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Stored vectors and a query disagree on dimension. The index instance
    /// refuses further searches until it is rebuilt.
    #[error("Index corruption: stored dimension {expected}, got {actual}")]
    IndexCorruption { expected: usize, actual: usize },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Persisted index was built with model '{stored}', current embedder is '{current}'")]
    ModelMismatch { stored: String, current: String },

    #[error("Unsupported index schema_version {found} (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Chunking error: {0}")]
    Chunker(#[from] ChunkerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VectorStoreError {
    pub fn embedding_unavailable(msg: impl ToString) -> Self {
        Self::EmbeddingUnavailable(msg.to_string())
    }

    /// Collaborator failures the caller may retry with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_))
    }
}
