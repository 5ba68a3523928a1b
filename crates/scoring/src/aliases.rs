use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::EntityId;

/// ISO-3 codes and spelling variants seen across the coal datasets.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("USA", "United States"),
    ("US", "United States"),
    ("United States of America", "United States"),
    ("CHN", "China"),
    ("IND", "India"),
    ("DEU", "Germany"),
    ("RUS", "Russia"),
    ("Russian Federation", "Russia"),
    ("KOR", "South Korea"),
    ("S. Korea", "South Korea"),
    ("GBR", "United Kingdom"),
    ("UK", "United Kingdom"),
    ("FRA", "France"),
    ("JPN", "Japan"),
    ("BRA", "Brazil"),
    ("CAN", "Canada"),
    ("AUS", "Australia"),
    ("SAU", "Saudi Arabia"),
    ("ZAF", "South Africa"),
    ("ITA", "Italy"),
    ("ESP", "Spain"),
    ("NLD", "Netherlands"),
    ("POL", "Poland"),
    ("IDN", "Indonesia"),
    ("TUR", "Turkey"),
    ("MEX", "Mexico"),
    ("IRN", "Iran"),
    ("Iran, Islamic Rep.", "Iran"),
    ("THA", "Thailand"),
    ("ARE", "United Arab Emirates"),
    ("EGY", "Egypt"),
    ("Egypt, Arab Rep.", "Egypt"),
    ("VNM", "Vietnam"),
    ("Viet Nam", "Vietnam"),
    ("MYS", "Malaysia"),
    ("BGD", "Bangladesh"),
    ("PHL", "Philippines"),
    ("CHL", "Chile"),
    ("KAZ", "Kazakhstan"),
    ("MNG", "Mongolia"),
    ("COL", "Colombia"),
];

/// Maps entity name variants onto canonical identifiers.
///
/// Lookups are case-insensitive and whitespace-trimmed. Canonical names always
/// resolve to themselves; anything else must be registered explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct EntityAliases {
    lookup: HashMap<String, EntityId>,
    aliases: BTreeMap<String, EntityId>,
}

impl EntityAliases {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in country table.
    #[must_use]
    pub fn countries() -> Self {
        let mut table = Self::new();
        for (alias, canonical) in DEFAULT_ALIASES {
            table.insert(alias, canonical);
        }
        table
    }

    /// Register a canonical name so it resolves to itself.
    pub fn add_canonical(&mut self, canonical: &str) {
        let id = EntityId::new(canonical.trim());
        self.lookup.insert(fold(canonical), id);
    }

    /// Register `alias` as a variant of `canonical` (and `canonical` itself).
    pub fn insert(&mut self, alias: &str, canonical: &str) {
        let id = EntityId::new(canonical.trim());
        self.add_canonical(canonical);
        self.lookup.insert(fold(alias), id.clone());
        self.aliases.insert(alias.trim().to_string(), id);
    }

    /// Merge another table over this one; entries in `other` win.
    pub fn extend(&mut self, other: &Self) {
        self.lookup
            .extend(other.lookup.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.aliases
            .extend(other.aliases.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<EntityId> {
        self.lookup.get(&fold(raw)).cloned()
    }

    /// Every distinct canonical identifier the table knows.
    #[must_use]
    pub fn canonical_entities(&self) -> BTreeSet<EntityId> {
        self.lookup.values().cloned().collect()
    }

    /// Explicit aliases in their registered spelling (canonical names excluded).
    pub fn registered_aliases(&self) -> impl Iterator<Item = (&str, &EntityId)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

impl From<BTreeMap<String, String>> for EntityAliases {
    fn from(pairs: BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (alias, canonical) in &pairs {
            table.insert(alias, canonical);
        }
        table
    }
}

impl From<EntityAliases> for BTreeMap<String, String> {
    fn from(table: EntityAliases) -> Self {
        table
            .aliases
            .into_iter()
            .map(|(alias, id)| (alias, id.as_str().to_string()))
            .collect()
    }
}

fn fold(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_codes_variants_and_canonical_names() {
        let table = EntityAliases::countries();
        assert_eq!(table.resolve("IND"), Some(EntityId::from("India")));
        assert_eq!(table.resolve("india"), Some(EntityId::from("India")));
        assert_eq!(table.resolve(" usa "), Some(EntityId::from("United States")));
        assert_eq!(
            table.resolve("United States of America"),
            Some(EntityId::from("United States"))
        );
        assert_eq!(table.resolve("Atlantis"), None);
    }

    #[test]
    fn user_entries_override_defaults() {
        let mut table = EntityAliases::countries();
        let mut custom = EntityAliases::new();
        custom.insert("US", "USA (federal)");
        table.extend(&custom);
        assert_eq!(table.resolve("us"), Some(EntityId::from("USA (federal)")));
    }

    #[test]
    fn deserializes_from_plain_map() {
        let table: EntityAliases =
            serde_json::from_str(r#"{"PRC": "China", "Bharat": "India"}"#).unwrap();
        assert_eq!(table.resolve("prc"), Some(EntityId::from("China")));
        assert_eq!(table.resolve("China"), Some(EntityId::from("China")));
        assert_eq!(table.canonical_entities().len(), 2);
    }
}
