use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScoringError;

/// One named axis of the viability assessment.
///
/// The set is closed: source records and configuration naming any other
/// dimension are rejected rather than carried along silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Coal dependency of the power system and transition readiness
    Infrastructure,
    /// Energy security and essential-needs reliance
    Necessity,
    /// Reserves and production capacity
    Resource,
    /// Subsidies and policy support
    ArtificialSupport,
    /// Environmental impact
    Ecological,
    /// Market viability and financial risk
    Economic,
    /// Carbon footprint and climate compliance
    Emissions,
}

impl Dimension {
    pub const ALL: [Self; 7] = [
        Self::Infrastructure,
        Self::Necessity,
        Self::Resource,
        Self::ArtificialSupport,
        Self::Ecological,
        Self::Economic,
        Self::Emissions,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Necessity => "necessity",
            Self::Resource => "resource",
            Self::ArtificialSupport => "artificial_support",
            Self::Ecological => "ecological",
            Self::Economic => "economic",
            Self::Emissions => "emissions",
        }
    }

    /// Human-facing label used when rendering assessment documents.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Infrastructure => "Infrastructure",
            Self::Necessity => "Necessity",
            Self::Resource => "Resource",
            Self::ArtificialSupport => "Artificial Support",
            Self::Ecological => "Ecological",
            Self::Economic => "Economic",
            Self::Emissions => "Emissions",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Infrastructure => "coal dependency and transition readiness",
            Self::Necessity => "energy security and essential needs",
            Self::Resource => "coal reserves and production capacity",
            Self::ArtificialSupport => "government subsidies and policy support",
            Self::Ecological => "environmental impact and sustainability",
            Self::Economic => "market viability and financial risks",
            Self::Emissions => "carbon footprint and climate compliance",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ScoringError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = normalize_tag(raw);
        Self::ALL
            .into_iter()
            .find(|dim| dim.as_str() == key)
            .ok_or_else(|| ScoringError::UnknownDimension(raw.trim().to_string()))
    }
}

/// A named stakeholder viewpoint with its own weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Investor,
    PolicyMaker,
    Ngo,
    Analyst,
    Citizen,
}

impl Persona {
    pub const ALL: [Self; 5] = [
        Self::Investor,
        Self::PolicyMaker,
        Self::Ngo,
        Self::Analyst,
        Self::Citizen,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Investor => "investor",
            Self::PolicyMaker => "policy_maker",
            Self::Ngo => "ngo",
            Self::Analyst => "analyst",
            Self::Citizen => "citizen",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = ScoringError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = normalize_tag(raw);
        Self::ALL
            .into_iter()
            .find(|persona| persona.as_str() == key)
            .ok_or_else(|| ScoringError::UnknownPersona(raw.trim().to_string()))
    }
}

/// Lowercase, trim, and fold spaces/hyphens into underscores.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| match ch {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
