use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dimension::{Dimension, Persona};
use crate::error::{Result, ScoringError};
use crate::types::{Recommendation, Viability};

/// Allowed distance of a persona's weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Value imputed for a missing (entity, dimension) pair under
/// [`MissingValuePolicy::NeutralMidpoint`]
pub const NEUTRAL_MIDPOINT: f64 = 50.0;

/// Policy applied to every dimension the configuration does not override
pub const DEFAULT_MISSING_POLICY: MissingValuePolicy = MissingValuePolicy::NeutralMidpoint;

/// Default composite cache capacity (entries across all personas)
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// What the aggregator does when the store has no value for a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Substitute [`NEUTRAL_MIDPOINT`] and flag the contribution as imputed
    NeutralMidpoint,
    /// Fail the score with `NotFound`
    Propagate,
}

/// Which end of the composite scale ranks first for a persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankDirection {
    /// Lower composite ranks first (lower = more viable coal industry)
    #[default]
    Ascending,
    /// Higher composite ranks first
    Descending,
}

/// Weight vector and ranking convention of one persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub weights: BTreeMap<Dimension, f64>,
    #[serde(default)]
    pub ranking: RankDirection,
}

impl PersonaProfile {
    /// Build a profile and check the weight invariant immediately.
    pub fn new(
        persona: Persona,
        weights: impl IntoIterator<Item = (Dimension, f64)>,
        ranking: RankDirection,
    ) -> Result<Self> {
        let profile = Self {
            weights: weights.into_iter().collect(),
            ranking,
        };
        profile.validate(persona)?;
        Ok(profile)
    }

    #[must_use]
    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.weights.get(&dimension).copied().unwrap_or(0.0)
    }

    /// Non-negative, finite, every dimension present, sum within tolerance of 1.
    pub fn validate(&self, persona: Persona) -> Result<()> {
        let invalid = |reason: String| ScoringError::InvalidWeights { persona, reason };

        for dim in Dimension::ALL {
            let Some(weight) = self.weights.get(&dim) else {
                return Err(invalid(format!("missing weight for dimension '{dim}'")));
            };
            if !weight.is_finite() || *weight < 0.0 {
                return Err(invalid(format!(
                    "weight for '{dim}' must be a non-negative number (got {weight})"
                )));
            }
        }

        let sum: f64 = self.weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(format!("weights sum to {sum}, expected 1.0")));
        }
        Ok(())
    }
}

/// Composite thresholds for the Buy / Hold / Avoid label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    /// Composites strictly below this are `Buy`
    pub buy_below: f64,
    /// Composites strictly above this are `Avoid`
    pub avoid_above: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            buy_below: 40.0,
            avoid_above: 70.0,
        }
    }
}

impl RecommendationThresholds {
    #[must_use]
    pub fn classify(&self, composite: f64) -> Recommendation {
        if composite < self.buy_below {
            Recommendation::Buy
        } else if composite > self.avoid_above {
            Recommendation::Avoid
        } else {
            Recommendation::Hold
        }
    }
}

/// Composite bands for the dashboard viability label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViabilityBands {
    pub high_below: f64,
    pub medium_below: f64,
}

impl Default for ViabilityBands {
    fn default() -> Self {
        Self {
            high_below: 40.0,
            medium_below: 60.0,
        }
    }
}

impl ViabilityBands {
    #[must_use]
    pub fn classify(&self, composite: f64) -> Viability {
        if composite < self.high_below {
            Viability::High
        } else if composite < self.medium_below {
            Viability::Medium
        } else {
            Viability::Low
        }
    }
}

/// Everything the aggregator needs, passed in explicitly at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub personas: BTreeMap<Persona, PersonaProfile>,
    pub recommendation: RecommendationThresholds,
    pub viability: ViabilityBands,
    /// Per-dimension overrides of [`DEFAULT_MISSING_POLICY`]
    pub missing_values: BTreeMap<Dimension, MissingValuePolicy>,
    /// Composite cache capacity; 0 disables caching
    pub cache_capacity: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            personas: default_personas(),
            recommendation: RecommendationThresholds::default(),
            viability: ViabilityBands::default(),
            missing_values: BTreeMap::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ScoringConfig {
    /// Validate every persona vector and the threshold ordering.
    pub fn validate(&self) -> Result<()> {
        if self.personas.is_empty() {
            return Err(ScoringError::InvalidConfig(
                "at least one persona must be configured".to_string(),
            ));
        }
        for (persona, profile) in &self.personas {
            profile.validate(*persona)?;
        }

        let RecommendationThresholds {
            buy_below,
            avoid_above,
        } = self.recommendation;
        if !(0.0..=100.0).contains(&buy_below)
            || !(0.0..=100.0).contains(&avoid_above)
            || buy_below > avoid_above
        {
            return Err(ScoringError::InvalidConfig(format!(
                "recommendation thresholds must satisfy 0 <= buy_below ({buy_below}) <= avoid_above ({avoid_above}) <= 100"
            )));
        }

        if self.viability.high_below > self.viability.medium_below {
            return Err(ScoringError::InvalidConfig(format!(
                "viability.high_below ({}) cannot exceed viability.medium_below ({})",
                self.viability.high_below, self.viability.medium_below
            )));
        }

        Ok(())
    }

    pub fn profile(&self, persona: Persona) -> Result<&PersonaProfile> {
        self.personas
            .get(&persona)
            .ok_or_else(|| ScoringError::UnknownPersona(persona.to_string()))
    }

    #[must_use]
    pub fn missing_policy(&self, dimension: Dimension) -> MissingValuePolicy {
        self.missing_values
            .get(&dimension)
            .copied()
            .unwrap_or(DEFAULT_MISSING_POLICY)
    }
}

fn default_personas() -> BTreeMap<Persona, PersonaProfile> {
    use Dimension::{
        ArtificialSupport, Ecological, Economic, Emissions, Infrastructure, Necessity, Resource,
    };

    let profile = |weights: [(Dimension, f64); 7]| PersonaProfile {
        weights: weights.into_iter().collect(),
        ranking: RankDirection::Ascending,
    };
    let equal = 1.0 / Dimension::ALL.len() as f64;

    BTreeMap::from([
        (
            Persona::Investor,
            profile([
                (Economic, 0.25),
                (ArtificialSupport, 0.20),
                (Emissions, 0.20),
                (Infrastructure, 0.15),
                (Resource, 0.10),
                (Ecological, 0.05),
                (Necessity, 0.05),
            ]),
        ),
        (
            Persona::PolicyMaker,
            profile([
                (Necessity, 0.20),
                (Economic, 0.20),
                (Emissions, 0.20),
                (Infrastructure, 0.15),
                (Ecological, 0.15),
                (ArtificialSupport, 0.05),
                (Resource, 0.05),
            ]),
        ),
        (
            Persona::Ngo,
            profile([
                (Emissions, 0.25),
                (Ecological, 0.25),
                (Necessity, 0.20),
                (Infrastructure, 0.10),
                (Resource, 0.10),
                (ArtificialSupport, 0.05),
                (Economic, 0.05),
            ]),
        ),
        (
            Persona::Analyst,
            profile(Dimension::ALL.map(|dim| (dim, equal))),
        ),
        (
            Persona::Citizen,
            profile([
                (Necessity, 0.25),
                (Ecological, 0.20),
                (Infrastructure, 0.20),
                (Economic, 0.15),
                (Emissions, 0.10),
                (ArtificialSupport, 0.05),
                (Resource, 0.05),
            ]),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.personas.len(), Persona::ALL.len());
    }

    #[test]
    fn every_default_persona_sums_to_one() {
        let config = ScoringConfig::default();
        for (persona, profile) in &config.personas {
            let sum: f64 = profile.weights.values().sum();
            assert!(
                (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
                "{persona} sums to {sum}"
            );
        }
    }

    #[test]
    fn weights_not_summing_to_one_are_rejected() {
        // The 0.143-per-dimension vector sums to 1.001.
        let result = PersonaProfile::new(
            Persona::Analyst,
            Dimension::ALL.map(|d| (d, 0.143)),
            RankDirection::Ascending,
        );
        assert!(matches!(
            result,
            Err(ScoringError::InvalidWeights {
                persona: Persona::Analyst,
                ..
            })
        ));
    }

    #[test]
    fn missing_dimension_weight_is_rejected() {
        let weights = Dimension::ALL
            .into_iter()
            .filter(|d| *d != Dimension::Resource)
            .map(|d| (d, 1.0 / 6.0));
        let err = PersonaProfile::new(Persona::Ngo, weights, RankDirection::Ascending)
            .unwrap_err()
            .to_string();
        assert!(err.contains("resource"), "unexpected error: {err}");
    }

    #[test]
    fn negative_weight_is_rejected_even_when_sum_is_one() {
        let mut weights: BTreeMap<Dimension, f64> =
            Dimension::ALL.map(|d| (d, 0.0)).into_iter().collect();
        weights.insert(Dimension::Economic, 1.2);
        weights.insert(Dimension::Emissions, -0.2);
        let profile = PersonaProfile {
            weights,
            ranking: RankDirection::Ascending,
        };
        assert!(profile.validate(Persona::Investor).is_err());
    }

    #[test]
    fn zero_weights_are_allowed() {
        let weights = Dimension::ALL.map(|d| (d, if d == Dimension::Economic { 1.0 } else { 0.0 }));
        assert!(PersonaProfile::new(Persona::Investor, weights, RankDirection::Descending).is_ok());
    }

    #[test]
    fn recommendation_thresholds_classify() {
        let thresholds = RecommendationThresholds::default();
        assert_eq!(thresholds.classify(39.99), Recommendation::Buy);
        assert_eq!(thresholds.classify(40.0), Recommendation::Hold);
        assert_eq!(thresholds.classify(70.0), Recommendation::Hold);
        assert_eq!(thresholds.classify(70.01), Recommendation::Avoid);
    }

    #[test]
    fn viability_bands_classify() {
        let bands = ViabilityBands::default();
        assert_eq!(bands.classify(10.0), Viability::High);
        assert_eq!(bands.classify(40.0), Viability::Medium);
        assert_eq!(bands.classify(60.0), Viability::Low);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let config = ScoringConfig {
            recommendation: RecommendationThresholds {
                buy_below: 80.0,
                avoid_above: 20.0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_policy_defaults_and_overrides() {
        let mut config = ScoringConfig::default();
        assert_eq!(
            config.missing_policy(Dimension::Emissions),
            MissingValuePolicy::NeutralMidpoint
        );
        config
            .missing_values
            .insert(Dimension::Emissions, MissingValuePolicy::Propagate);
        assert_eq!(
            config.missing_policy(Dimension::Emissions),
            MissingValuePolicy::Propagate
        );
    }

    #[test]
    fn config_deserializes_from_json_with_defaults() {
        let raw = r#"{
            "personas": {
                "investor": {
                    "weights": {
                        "economic": 0.25, "artificial_support": 0.20, "emissions": 0.20,
                        "infrastructure": 0.15, "resource": 0.10, "ecological": 0.05,
                        "necessity": 0.05
                    },
                    "ranking": "descending"
                }
            }
        }"#;
        let config: ScoringConfig = serde_json::from_str(raw).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.personas.len(), 1);
        assert_eq!(
            config.profile(Persona::Investor).unwrap().ranking,
            RankDirection::Descending
        );
        assert!(config.profile(Persona::Ngo).is_err());
        assert_eq!(config.recommendation, RecommendationThresholds::default());
    }

    #[test]
    fn unknown_persona_key_fails_to_deserialize() {
        let raw = r#"{ "personas": { "regulator": { "weights": {} } } }"#;
        assert!(serde_json::from_str::<ScoringConfig>(raw).is_err());
    }
}
