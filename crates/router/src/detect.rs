//! Persona and entity signals extracted from free-text queries.

use fvi_scoring::{EntityAliases, EntityId, Persona};
use regex::{Regex, RegexBuilder};

/// Keyword stems per persona, scored by substring hits on the lowercased
/// query. Ties go to the earlier bucket.
const PERSONA_KEYWORDS: &[(Persona, &[&str])] = &[
    (
        Persona::Investor,
        &["invest", "roi", "risk", "return", "valuation", "profit", "market"],
    ),
    (
        Persona::PolicyMaker,
        &["policy", "regulation", "government", "subsidy", "taxonomy", "legislation"],
    ),
    (
        Persona::Ngo,
        &["climate", "emission", "pollution", "environment", "sustainab", "carbon"],
    ),
    (
        Persona::Citizen,
        &["job", "cost", "bills", "household", "community", "local", "price"],
    ),
];

/// Persona whose keyword bucket the query hits most; analyst when none hit.
#[must_use]
pub fn detect_persona(query: &str) -> Persona {
    let query = query.to_lowercase();
    let mut best = (Persona::Analyst, 0usize);
    for (persona, keywords) in PERSONA_KEYWORDS {
        let hits = keywords.iter().filter(|kw| query.contains(*kw)).count();
        if hits > best.1 {
            best = (*persona, hits);
        }
    }
    best.0
}

/// Finds entity mentions by whole-word match against canonical names and
/// registered aliases.
///
/// Short upper-case codes (`US`, `IND`) only match in upper case so that
/// ordinary words such as "us" are not read as entities.
#[derive(Debug, Clone)]
pub struct EntityDetector {
    aliases: EntityAliases,
    folded: Option<Regex>,
    exact: Option<Regex>,
}

impl EntityDetector {
    pub fn new(aliases: &EntityAliases) -> Result<Self, regex::Error> {
        let mut folded: Vec<String> = aliases
            .canonical_entities()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        let mut exact = Vec::new();
        for (alias, _) in aliases.registered_aliases() {
            if is_code(alias) {
                exact.push(alias.to_string());
            } else {
                folded.push(alias.to_string());
            }
        }

        Ok(Self {
            aliases: aliases.clone(),
            folded: compile(folded, true)?,
            exact: compile(exact, false)?,
        })
    }

    /// Distinct entities in order of first mention.
    #[must_use]
    pub fn mentions(&self, query: &str) -> Vec<EntityId> {
        let mut hits: Vec<(usize, usize, &str)> = self
            .folded
            .iter()
            .chain(&self.exact)
            .flat_map(|re| re.find_iter(query))
            .map(|m| (m.start(), m.len(), m.as_str()))
            .collect();
        // earliest first, longer spelling first at the same offset
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut entities: Vec<EntityId> = Vec::new();
        let mut covered = 0;
        for (start, len, text) in hits {
            if start < covered {
                continue;
            }
            covered = start + len;
            if let Some(id) = self.aliases.resolve(text) {
                if !entities.contains(&id) {
                    entities.push(id);
                }
            }
        }
        entities
    }

    /// First entity mentioned in the query, if any.
    #[must_use]
    pub fn detect_entity(&self, query: &str) -> Option<EntityId> {
        self.mentions(query).into_iter().next()
    }
}

fn is_code(alias: &str) -> bool {
    alias.chars().count() <= 3 && alias.chars().all(|c| c.is_ascii_uppercase())
}

fn compile(mut spellings: Vec<String>, case_insensitive: bool) -> Result<Option<Regex>, regex::Error> {
    spellings.retain(|s| !s.trim().is_empty());
    if spellings.is_empty() {
        return Ok(None);
    }
    // longest first so alternation prefers "United States of America" over "United States"
    spellings.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    spellings.dedup();

    let alternatives: Vec<String> = spellings
        .iter()
        .map(|s| {
            let s = s.trim();
            let lead = if s.starts_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            let tail = if s.ends_with(|c: char| c.is_alphanumeric()) { r"\b" } else { "" };
            format!("{lead}{}{tail}", regex::escape(s))
        })
        .collect();

    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(case_insensitive)
        .build()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn persona_from_keyword_buckets() {
        assert_eq!(detect_persona("What is the ROI and market risk?"), Persona::Investor);
        assert_eq!(detect_persona("How does subsidy legislation work?"), Persona::PolicyMaker);
        assert_eq!(detect_persona("Carbon emission trends"), Persona::Ngo);
        assert_eq!(detect_persona("Will household bills go up?"), Persona::Citizen);
        assert_eq!(detect_persona("Summarize the coal sector"), Persona::Analyst);
    }

    #[test]
    fn persona_ties_go_to_the_earlier_bucket() {
        // one investor hit ("risk"), one policy hit ("policy")
        assert_eq!(detect_persona("policy risk"), Persona::Investor);
    }

    #[test]
    fn entity_by_name_alias_or_code() {
        let detector = EntityDetector::new(&EntityAliases::countries()).unwrap();
        assert_eq!(detector.detect_entity("coal outlook for india"), Some("India".into()));
        assert_eq!(detector.detect_entity("What about IND?"), Some("India".into()));
        assert_eq!(
            detector.detect_entity("Is the Russian Federation still expanding?"),
            Some("Russia".into())
        );
        assert_eq!(
            detector.detect_entity("United States of America coal exports"),
            Some("United States".into())
        );
    }

    #[test]
    fn short_codes_need_upper_case_and_word_boundaries() {
        let detector = EntityDetector::new(&EntityAliases::countries()).unwrap();
        assert_eq!(detector.detect_entity("tell us about coal"), None);
        assert_eq!(detector.detect_entity("Indiana coal mines"), None);
        assert_eq!(detector.detect_entity("coal in the US"), Some("United States".into()));
    }

    #[test]
    fn mentions_in_order_without_repeats() {
        let detector = EntityDetector::new(&EntityAliases::countries()).unwrap();
        assert_eq!(
            detector.mentions("Compare China, India and CHN"),
            vec![EntityId::from("China"), EntityId::from("India")]
        );
    }
}
