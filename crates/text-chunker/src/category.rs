use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChunkerError;

/// Topic family a knowledge chunk is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    IndustryOverview,
    TechnicalData,
    EconomicFactors,
    EnvironmentalImpact,
    PolicyRegulatory,
    MarketTrends,
    CountrySpecific,
    /// Synthesized per-entity score assessment
    Assessment,
    General,
}

/// Keyword families checked in order; the first family with a hit wins.
const KEYWORD_FAMILIES: &[(Category, &[&str])] = &[
    (
        Category::IndustryOverview,
        &["coal industry", "mining", "production capacity", "global", "overview"],
    ),
    (
        Category::TechnicalData,
        &["energy content", "btu", "quality", "grade", "reserves", "specifications"],
    ),
    (
        Category::EconomicFactors,
        &["price", "cost", "economic", "market", "revenue", "investment", "financial"],
    ),
    (
        Category::EnvironmentalImpact,
        &["emissions", "carbon", "co2", "environmental", "climate", "pollution"],
    ),
    (
        Category::PolicyRegulatory,
        &["policy", "regulation", "government", "subsidy", "tax", "legal", "compliance"],
    ),
    (
        Category::MarketTrends,
        &["trend", "future", "outlook", "forecast", "growth", "decline", "transition"],
    ),
];

impl Category {
    pub const ALL: [Self; 9] = [
        Self::IndustryOverview,
        Self::TechnicalData,
        Self::EconomicFactors,
        Self::EnvironmentalImpact,
        Self::PolicyRegulatory,
        Self::MarketTrends,
        Self::CountrySpecific,
        Self::Assessment,
        Self::General,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IndustryOverview => "industry_overview",
            Self::TechnicalData => "technical_data",
            Self::EconomicFactors => "economic_factors",
            Self::EnvironmentalImpact => "environmental_impact",
            Self::PolicyRegulatory => "policy_regulatory",
            Self::MarketTrends => "market_trends",
            Self::CountrySpecific => "country_specific",
            Self::Assessment => "assessment",
            Self::General => "general",
        }
    }

    /// Section heading used when rendering grouped passages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IndustryOverview => "Industry Overview",
            Self::TechnicalData => "Technical Data",
            Self::EconomicFactors => "Economic Factors",
            Self::EnvironmentalImpact => "Environmental Impact",
            Self::PolicyRegulatory => "Policy & Regulatory",
            Self::MarketTrends => "Market Trends",
            Self::CountrySpecific => "Country Specific",
            Self::Assessment => "FVI Assessment",
            Self::General => "General",
        }
    }

    /// Tag `text` by keyword family, then by mention of one of `entities`.
    #[must_use]
    pub fn classify(text: &str, entities: &[String]) -> Self {
        let lower = text.to_lowercase();
        for (category, keywords) in KEYWORD_FAMILIES {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                return *category;
            }
        }
        if entities
            .iter()
            .any(|entity| !entity.is_empty() && lower.contains(&entity.to_lowercase()))
        {
            return Self::CountrySpecific;
        }
        Self::General
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == folded)
            .ok_or_else(|| ChunkerError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_family_wins() {
        // "mining" (industry) beats "price" (economic)
        assert_eq!(
            Category::classify("Mining output rose while the price fell", &[]),
            Category::IndustryOverview
        );
        assert_eq!(
            Category::classify("CO2 intensity of the fleet", &[]),
            Category::EnvironmentalImpact
        );
        assert_eq!(
            Category::classify("The new subsidy scheme", &[]),
            Category::PolicyRegulatory
        );
    }

    #[test]
    fn entity_mention_is_the_fallback_family() {
        let entities = vec!["India".to_string()];
        assert_eq!(
            Category::classify("India operates large thermal plants", &entities),
            Category::CountrySpecific
        );
        assert_eq!(Category::classify("Plants operate", &entities), Category::General);
    }

    #[test]
    fn parses_tags_and_labels() {
        assert_eq!("Market Trends".parse::<Category>().unwrap(), Category::MarketTrends);
        assert_eq!("assessment".parse::<Category>().unwrap(), Category::Assessment);
        assert!("gossip".parse::<Category>().is_err());
    }
}
