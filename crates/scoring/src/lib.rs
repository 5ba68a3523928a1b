//! # FVI Scoring
//!
//! Dimension score store and persona-weighted composite scoring for the
//! Future Viability Index.
//!
//! ## Architecture
//!
//! ```text
//! ScoreSource (records / JSON file / data directory)
//!     │
//!     ├──> Validation (range, dimension tag, alias resolution, duplicates)
//!     │      └─> LoadReport (batch summary, coverage)
//!     │
//!     ├──> DimensionScoreStore
//!     │      └─> Arc<ScoreTable> swapped atomically on reload
//!     │
//!     └──> ScoringAggregator
//!            ├─> score / contributions / compare_personas
//!            ├─> compare / top (persona ranking direction)
//!            └─> recommend / viability (configured thresholds)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fvi_scoring::{
//!     DimensionScoreStore, EntityAliases, Persona, RawScoreRecord, ScoreSource,
//!     ScoringAggregator, ScoringConfig,
//! };
//!
//! let records = vec![
//!     RawScoreRecord::new("India", "economic", 55.0, 2023),
//!     RawScoreRecord::new("IND", "emissions", 50.0, 2023),
//! ];
//! let (store, report) =
//!     DimensionScoreStore::load(&ScoreSource::Records(records), EntityAliases::countries())
//!         .unwrap();
//! assert_eq!(report.accepted, 2);
//!
//! let aggregator = ScoringAggregator::new(Arc::new(store), ScoringConfig::default()).unwrap();
//! let composite = aggregator.score(&"India".into(), Persona::Investor).unwrap();
//! println!("{} -> {:.2} ({})", composite.entity_id, composite.value,
//!          aggregator.recommend(composite.value));
//! ```

mod aggregator;
mod aliases;
mod config;
mod dimension;
mod error;
mod source;
mod store;
mod types;

pub use aggregator::ScoringAggregator;
pub use aliases::EntityAliases;
pub use config::{
    MissingValuePolicy, PersonaProfile, RankDirection, RecommendationThresholds, ScoringConfig,
    ViabilityBands, DEFAULT_CACHE_CAPACITY, DEFAULT_MISSING_POLICY, NEUTRAL_MIDPOINT,
    WEIGHT_SUM_TOLERANCE,
};
pub use dimension::{normalize_tag, Dimension, Persona};
pub use error::{Result, ScoringError};
pub use source::{RawScoreRecord, ScoreSource};
pub use store::{DimensionScoreStore, LoadReport, ScoreTable, ValidationIssue, MIN_DIMENSION_COVERAGE};
pub use types::{
    CompositeScore, DimensionContribution, DimensionScore, EntityId, RankedEntity,
    Recommendation, Viability,
};
