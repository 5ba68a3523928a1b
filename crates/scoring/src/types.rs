use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::dimension::{Dimension, Persona};

/// Canonical identifier of an assessed entity (a country name after alias resolution)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A validated indicator value on the 0-100 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub entity_id: EntityId,
    pub dimension: Dimension,
    pub value: f64,
    pub year: i32,
    pub source_provenance: String,
}

/// How one dimension feeds into a composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionContribution {
    pub raw_score: f64,
    pub weight: f64,
    pub weighted_score: f64,
    /// Share of the composite in percent (0 when the composite is 0)
    pub contribution_pct: f64,
    /// True when the raw score came from the missing-value policy
    pub imputed: bool,
}

/// Weighted aggregate for one entity under one persona.
///
/// Derived on demand; the store stays the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub entity_id: EntityId,
    pub persona: Persona,
    pub value: f64,
    pub contributions: BTreeMap<Dimension, DimensionContribution>,
}

impl CompositeScore {
    /// Dimensions whose value was imputed rather than observed.
    pub fn imputed_dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.contributions
            .iter()
            .filter(|(_, c)| c.imputed)
            .map(|(dim, _)| *dim)
    }
}

/// Investment guidance derived from a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Buy,
    Hold,
    Avoid,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "Buy",
            Self::Hold => "Hold",
            Self::Avoid => "Avoid",
        })
    }
}

/// Dashboard viability band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viability {
    High,
    Medium,
    Low,
}

impl fmt::Display for Viability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// One row of a persona ranking (rank is 1-based)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub rank: usize,
    pub entity_id: EntityId,
    pub composite: f64,
}
