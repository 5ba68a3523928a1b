use thiserror::Error;

use crate::dimension::{Dimension, Persona};

/// Result type for scoring operations
pub type Result<T> = std::result::Result<T, ScoringError>;

/// Errors surfaced by the score store and the aggregator
#[derive(Error, Debug)]
pub enum ScoringError {
    /// Entity is not present in the current score table
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Persona name outside the declared set
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    /// Dimension tag outside the declared set
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// No value for the pair and the dimension's policy does not impute one
    #[error("No score for entity '{entity}' on dimension '{dimension}'")]
    NotFound { entity: String, dimension: Dimension },

    /// Persona weight vector violates the non-negative, sum-to-one invariant
    #[error("Invalid weights for persona '{persona}': {reason}")]
    InvalidWeights { persona: Persona, reason: String },

    /// Invalid configuration outside the weight vectors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Composite escaped [0, 100] even though every input was validated
    #[error("Composite {value} for entity '{entity}' is outside [0, 100]")]
    CompositeOutOfRange { entity: String, value: f64 },

    /// Score source could not be read at all; the previous table stays active
    #[error("Failed to read score source {path}: {reason}")]
    SourceUnreadable { path: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ScoringError {
    /// Errors caused by the caller naming something that does not exist.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownEntity(_)
                | Self::UnknownPersona(_)
                | Self::UnknownDimension(_)
                | Self::NotFound { .. }
        )
    }

    pub fn source_unreadable(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
