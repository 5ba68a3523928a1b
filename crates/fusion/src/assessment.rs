//! Per-entity assessment documents synthesized from live composites.
//!
//! The knowledge index carries one such document per scored entity so that
//! retrieval can surface numeric standing next to narrative passages. They
//! are regenerated from the aggregator and swapped in through
//! [`KnowledgeIndex::refresh_assessments`], which leaves the static corpus
//! vectors untouched.

use fvi_scoring::{CompositeScore, Persona, Recommendation, ScoringAggregator, ScoringError, Viability};
use fvi_vector_store::{Category, IndexStats, KnowledgeIndex, RawDocument};
use std::fmt::Write as _;

use crate::error::Result;

/// Source-document prefix of synthesized assessments
pub const ASSESSMENT_SOURCE_PREFIX: &str = "assessment/";

#[must_use]
pub fn assessment_source(entity: &str) -> String {
    format!("{ASSESSMENT_SOURCE_PREFIX}{entity}")
}

/// Render one composite as an indexable assessment document.
#[must_use]
pub fn render_assessment(
    composite: &CompositeScore,
    recommendation: Recommendation,
    viability: Viability,
) -> RawDocument {
    let entity = composite.entity_id.as_str();
    let mut text = String::new();
    let _ = writeln!(text, "Country Assessment: {entity}");
    let _ = writeln!(text, "Persona: {}", composite.persona);
    let _ = writeln!(text, "Overall FVI Score: {:.2}", composite.value);
    let _ = writeln!(text, "Recommendation: {recommendation}");
    let _ = writeln!(text, "Viability: {viability}");
    let _ = writeln!(text, "Dimension Scores:");
    for (dimension, contribution) in &composite.contributions {
        let _ = write!(
            text,
            "- {}: {:.2} ({})",
            dimension.label(),
            contribution.raw_score,
            dimension.description()
        );
        if contribution.imputed {
            text.push_str(" [imputed]");
        }
        text.push('\n');
    }
    let _ = write!(
        text,
        "This assessment provides insights into {entity}'s coal industry viability across \
         multiple dimensions. Lower FVI scores indicate a more viable coal sector; {entity} \
         currently sits in the {viability} viability band."
    );

    RawDocument::new(assessment_source(entity), text)
        .with_category(Category::Assessment)
        .with_entity(entity)
}

/// Assessment documents for every entity in the store, in entity order.
///
/// Entities whose composite cannot be formed (a missing dimension under a
/// propagating policy) are skipped with a warning.
pub fn assessment_documents(
    aggregator: &ScoringAggregator,
    persona: Persona,
) -> Result<Vec<RawDocument>> {
    let mut docs = Vec::new();
    for entity in aggregator.store().list_entities() {
        let composite = match aggregator.score(&entity, persona) {
            Ok(composite) => composite,
            Err(ScoringError::NotFound { dimension, .. }) => {
                log::warn!("No assessment for {entity}: {dimension} has no score");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        docs.push(render_assessment(
            &composite,
            aggregator.recommend(composite.value),
            aggregator.viability(composite.value),
        ));
    }
    Ok(docs)
}

/// Regenerate the index's assessment documents from current scores.
pub async fn sync_assessments(
    aggregator: &ScoringAggregator,
    index: &KnowledgeIndex,
    persona: Persona,
) -> Result<IndexStats> {
    let docs = assessment_documents(aggregator, persona)?;
    log::info!(
        "Synchronizing {} assessment documents (persona {persona}, score generation {})",
        docs.len(),
        aggregator.store().generation()
    );
    Ok(index.refresh_assessments(docs).await?)
}

/// Re-embed the assessment documents only when current scores render
/// differently from what the index holds. `None` means the index was current.
pub async fn refresh_stale_assessments(
    aggregator: &ScoringAggregator,
    index: &KnowledgeIndex,
    persona: Persona,
) -> Result<Option<IndexStats>> {
    let docs = assessment_documents(aggregator, persona)?;
    if index.snapshot().assessment_documents() == docs.as_slice() {
        log::debug!("Assessment documents match score generation {}", aggregator.store().generation());
        return Ok(None);
    }
    log::info!(
        "Scores changed since the index was built; re-embedding {} assessment documents",
        docs.len()
    );
    Ok(Some(index.refresh_assessments(docs).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fvi_scoring::{DimensionScoreStore, EntityAliases, RawScoreRecord, ScoreSource, ScoringConfig};
    use fvi_vector_store::{ChunkerConfig, HashingEmbedder};
    use std::sync::Arc;

    fn aggregator() -> ScoringAggregator {
        let records = vec![
            RawScoreRecord::new("India", "infrastructure", 62.0, 2023),
            RawScoreRecord::new("India", "emissions", 30.0, 2023),
            RawScoreRecord::new("Germany", "infrastructure", 20.0, 2023),
        ];
        let (store, _) =
            DimensionScoreStore::load(&ScoreSource::Records(records), EntityAliases::countries())
                .unwrap();
        ScoringAggregator::new(Arc::new(store), ScoringConfig::default()).unwrap()
    }

    #[test]
    fn rendered_assessment_lists_every_dimension() {
        let aggregator = aggregator();
        let composite = aggregator.score(&"India".into(), Persona::Analyst).unwrap();
        let doc = render_assessment(&composite, Recommendation::Hold, Viability::Medium);

        assert_eq!(doc.source_document, "assessment/India");
        assert_eq!(doc.category, Some(Category::Assessment));
        assert_eq!(doc.entity_tags, vec!["India".to_string()]);
        assert!(doc.text.starts_with("Country Assessment: India\n"));
        assert!(doc.text.contains("- Infrastructure: 62.00 (coal dependency and transition readiness)"));
        assert!(doc.text.contains("- Emissions: 30.00"));
        assert_eq!(doc.text.matches(" [imputed]").count(), 5);
    }

    #[test]
    fn one_document_per_entity() {
        let docs = assessment_documents(&aggregator(), Persona::Investor).unwrap();
        let sources: Vec<&str> = docs.iter().map(|d| d.source_document.as_str()).collect();
        assert_eq!(sources, vec!["assessment/Germany", "assessment/India"]);
    }

    #[tokio::test]
    async fn sync_replaces_assessment_chunks() {
        let aggregator = aggregator();
        let index = KnowledgeIndex::build(
            Arc::new(HashingEmbedder::new(64)),
            ChunkerConfig::default(),
            vec![RawDocument::new(
                "kb/overview.txt",
                "Global coal demand plateaued while renewables captured new capacity additions.",
            )],
        )
        .await
        .unwrap();

        let stats = sync_assessments(&aggregator, &index, Persona::Analyst).await.unwrap();
        assert_eq!(stats.knowledge_chunks, 1);
        assert_eq!(stats.assessment_chunks, 2);
        assert_eq!(stats.assessment_documents, 2);
    }

    #[tokio::test]
    async fn stale_assessments_follow_a_score_reload() {
        let aggregator = aggregator();
        let index = KnowledgeIndex::new(Arc::new(HashingEmbedder::new(64)), ChunkerConfig::default())
            .unwrap();
        sync_assessments(&aggregator, &index, Persona::Analyst).await.unwrap();
        assert!(refresh_stale_assessments(&aggregator, &index, Persona::Analyst)
            .await
            .unwrap()
            .is_none());

        aggregator
            .store()
            .reload(&ScoreSource::Records(vec![RawScoreRecord::new(
                "India",
                "infrastructure",
                90.0,
                2024,
            )]))
            .unwrap();
        let stats = refresh_stale_assessments(&aggregator, &index, Persona::Analyst)
            .await
            .unwrap()
            .expect("scores changed");
        assert_eq!(stats.assessment_documents, 1);

        let snapshot = index.snapshot();
        let docs = snapshot.assessment_documents();
        assert_eq!(docs[0].source_document, "assessment/India");
        assert!(docs[0].text.contains("- Infrastructure: 90.00"));
    }
}
