//! # FVI Context Fusion
//!
//! Turns a natural-language query into a bounded [`ContextBundle`]: the most
//! relevant knowledge passages, grouped by category, with a live composite
//! score attached when the query is about one entity.
//!
//! ```text
//! query ──> embed ──> search (entity-tagged + general chunks, top K)
//!                        │
//!                        ├─> relevance threshold (never padded)
//!                        ├─> near-duplicate collapse
//!                        ├─> ScoringAggregator snapshot (entity given)
//!                        └─> character budget, lowest relevance cut first
//! ```
//!
//! Assessment documents for every scored entity are kept in the index by
//! [`sync_assessments`].

mod assessment;
mod bundle;
mod config;
mod engine;
mod error;

pub use assessment::{
    assessment_documents, assessment_source, refresh_stale_assessments, render_assessment,
    sync_assessments, ASSESSMENT_SOURCE_PREFIX,
};
pub use bundle::{ContextBundle, RankedPassage, ScoreSnapshot};
pub use config::{
    FusionConfig, DEFAULT_DUPLICATE_SIMILARITY, DEFAULT_MAX_CHARS, DEFAULT_MIN_RELEVANCE,
    DEFAULT_TIMEOUT_MS, DEFAULT_TOP_K, MIN_TRUNCATED_PASSAGE_CHARS,
};
pub use engine::ContextFusionEngine;
pub use error::{FusionError, Result};
