//! Wire types of the FVI query interface.
//!
//! Everything here is plain data: names travel as strings and are validated
//! by the router, so callers in any language can produce them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROTOCOL_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTruncation {
    MaxChars,
    MaxItems,
    Timeout,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ScoreRequest {
    pub entity_id: String,
    pub persona_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct ContextRequest {
    pub query: String,
    /// Detected from the query when absent
    #[serde(default)]
    pub persona_id: Option<String>,
    /// Detected from the query when absent; `None` after detection means unrestricted
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ContributionView {
    pub raw_score: f64,
    pub weight: f64,
    pub weighted_score: f64,
    pub contribution_pct: f64,
    pub imputed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ScoreResponse {
    pub entity_id: String,
    pub persona_id: String,
    pub composite: f64,
    pub recommendation: String,
    pub viability: String,
    pub contributions: BTreeMap<String, ContributionView>,
    /// Store generation the score was computed from
    pub generation: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct PassageView {
    pub chunk_id: String,
    pub category: String,
    pub source_document: String,
    pub relevance: f32,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ContextResponse {
    pub query: String,
    pub persona_id: String,
    pub entity_id: Option<String>,
    /// Ordered by descending relevance
    pub passages: Vec<PassageView>,
    /// Category -> chunk ids, each list in relevance order
    pub categories: BTreeMap<String, Vec<String>>,
    pub score: Option<ScoreResponse>,
    pub data_sources: Vec<String>,
    pub used_chars: usize,
    pub max_chars: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<BudgetTruncation>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct AnswerResponse {
    pub answer: String,
    pub context: ContextResponse,
}

/// Coarse error family; decides the status a transport should report.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed or invalid request
    InvalidRequest,
    /// Request names an entity, persona or dimension that does not exist
    NotFound,
    /// Embedding or generation collaborator failed; retry with backoff
    Unavailable,
    Timeout,
    /// Index must be rebuilt before further searches
    Corruption,
    Internal,
}

impl ErrorClass {
    /// HTTP-equivalent status code
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::NotFound => 404,
            Self::Unavailable => 503,
            Self::Timeout => 504,
            Self::Corruption | Self::Internal => 500,
        }
    }

    #[must_use]
    pub const fn is_caller_error(self) -> bool {
        matches!(self, Self::InvalidRequest | Self::NotFound)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub class: ErrorClass,
    pub status: u16,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            class,
            status: class.status(),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_classes_map_to_statuses() {
        assert_eq!(ErrorClass::InvalidRequest.status(), 400);
        assert_eq!(ErrorClass::NotFound.status(), 404);
        assert_eq!(ErrorClass::Unavailable.status(), 503);
        assert_eq!(ErrorClass::Timeout.status(), 504);
        assert_eq!(ErrorClass::Corruption.status(), 500);
        assert!(ErrorClass::NotFound.is_caller_error());
        assert!(!ErrorClass::Timeout.is_caller_error());
    }

    #[test]
    fn envelope_serializes_snake_case_class() {
        let envelope = ErrorEnvelope::new("unknown_persona", ErrorClass::NotFound, "Unknown persona: regulator")
            .with_hint("Use one of: investor, policy_maker, ngo, analyst, citizen");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["class"], "not_found");
        assert_eq!(value["status"], 404);
    }

    #[test]
    fn context_request_optional_fields_default() {
        let request: ContextRequest = serde_json::from_str(r#"{"query": "coal subsidy risk"}"#).unwrap();
        assert_eq!(
            request,
            ContextRequest {
                query: "coal subsidy risk".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn truncation_marker_is_omitted_when_absent() {
        let response = ContextResponse {
            query: "q".to_string(),
            persona_id: "analyst".to_string(),
            entity_id: None,
            passages: Vec::new(),
            categories: BTreeMap::new(),
            score: None,
            data_sources: Vec::new(),
            used_chars: 0,
            max_chars: 12_000,
            truncated: false,
            truncation: None,
        };
        let raw = serde_json::to_string(&response).unwrap();
        assert!(!raw.contains("truncation\""));
    }

    #[test]
    fn request_schema_lists_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(ContextRequest)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("query").is_some());
        assert!(properties.get("entity_id").is_some());
    }
}
