use fvi_fusion::FusionError;
use fvi_protocol::{ErrorClass, ErrorEnvelope};
use fvi_scoring::{Persona, ScoringError};
use fvi_vector_store::VectorStoreError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("No generative backend configured")]
    NoGenerator,

    #[error("Failed to compile entity patterns: {0}")]
    Pattern(#[from] regex::Error),
}

impl RouterError {
    pub fn generation(msg: impl ToString) -> Self {
        Self::Generation(msg.to_string())
    }

    /// Classify for the wire.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        let message = self.to_string();
        match self {
            Self::Scoring(e) => scoring_envelope(e, message),
            Self::Fusion(FusionError::Scoring(e)) => scoring_envelope(e, message),
            Self::Fusion(FusionError::VectorStore(e)) => vector_store_envelope(e, message),
            Self::Fusion(FusionError::Timeout { ms }) => {
                ErrorEnvelope::new("timeout", ErrorClass::Timeout, message)
                    .with_details(json!({ "timeout_ms": ms }))
                    .with_hint("Retry with a larger timeout_ms")
            }
            Self::Fusion(FusionError::EmptyQuery) => {
                ErrorEnvelope::new("empty_query", ErrorClass::InvalidRequest, message)
            }
            Self::Fusion(FusionError::InvalidConfig(_)) => {
                ErrorEnvelope::new("invalid_config", ErrorClass::Internal, message)
            }
            Self::InvalidRequest(_) => {
                ErrorEnvelope::new("invalid_request", ErrorClass::InvalidRequest, message)
            }
            Self::Generation(_) => {
                ErrorEnvelope::new("generation_failed", ErrorClass::Unavailable, message)
                    .with_hint("Retry with backoff")
            }
            Self::NoGenerator => ErrorEnvelope::new("no_generator", ErrorClass::Unavailable, message)
                .with_hint("Request context only, or configure a generative backend"),
            Self::Pattern(_) => ErrorEnvelope::new("internal", ErrorClass::Internal, message),
        }
    }
}

fn scoring_envelope(error: &ScoringError, message: String) -> ErrorEnvelope {
    match error {
        ScoringError::UnknownEntity(entity) => {
            ErrorEnvelope::new("unknown_entity", ErrorClass::NotFound, message)
                .with_details(json!({ "entity_id": entity }))
        }
        ScoringError::UnknownPersona(_) => {
            let names: Vec<&str> = Persona::ALL.iter().map(|p| p.as_str()).collect();
            ErrorEnvelope::new("unknown_persona", ErrorClass::NotFound, message)
                .with_hint(format!("Use one of: {}", names.join(", ")))
        }
        ScoringError::UnknownDimension(_) => {
            ErrorEnvelope::new("unknown_dimension", ErrorClass::NotFound, message)
        }
        ScoringError::NotFound { entity, dimension } => {
            ErrorEnvelope::new("score_not_found", ErrorClass::NotFound, message)
                .with_details(json!({ "entity_id": entity, "dimension": dimension.as_str() }))
        }
        ScoringError::SourceUnreadable { .. } => {
            ErrorEnvelope::new("source_unreadable", ErrorClass::Unavailable, message)
        }
        ScoringError::InvalidWeights { .. }
        | ScoringError::InvalidConfig(_)
        | ScoringError::CompositeOutOfRange { .. }
        | ScoringError::IoError(_)
        | ScoringError::SerializationError(_) => {
            ErrorEnvelope::new("scoring_failed", ErrorClass::Internal, message)
        }
    }
}

fn vector_store_envelope(error: &VectorStoreError, message: String) -> ErrorEnvelope {
    match error {
        VectorStoreError::EmbeddingUnavailable(_) => {
            ErrorEnvelope::new("embedding_unavailable", ErrorClass::Unavailable, message)
                .with_hint("Retry with backoff")
        }
        VectorStoreError::IndexCorruption { expected, actual } => {
            ErrorEnvelope::new("index_corruption", ErrorClass::Corruption, message)
                .with_details(json!({ "expected": expected, "actual": actual }))
                .with_hint("Rebuild the knowledge index")
        }
        _ => ErrorEnvelope::new("index_failed", ErrorClass::Internal, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn caller_errors_are_not_found() {
        let envelope = RouterError::from(ScoringError::UnknownPersona("regulator".into())).envelope();
        assert_eq!(envelope.code, "unknown_persona");
        assert_eq!(envelope.status, 404);
        assert_eq!(
            envelope.hint.as_deref(),
            Some("Use one of: investor, policy_maker, ngo, analyst, citizen")
        );
    }

    #[test]
    fn nested_fusion_errors_keep_their_class() {
        let corrupt = RouterError::from(FusionError::VectorStore(VectorStoreError::IndexCorruption {
            expected: 384,
            actual: 7,
        }));
        let envelope = corrupt.envelope();
        assert_eq!(envelope.class, ErrorClass::Corruption);
        assert_eq!(envelope.details, Some(json!({ "expected": 384, "actual": 7 })));

        let unknown = RouterError::from(FusionError::Scoring(ScoringError::UnknownEntity(
            "Atlantis".into(),
        )));
        assert_eq!(unknown.envelope().code, "unknown_entity");

        let timeout = RouterError::from(FusionError::Timeout { ms: 50 });
        assert_eq!(timeout.envelope().status, 504);
    }
}
