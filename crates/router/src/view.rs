use fvi_fusion::{ContextBundle, ScoreSnapshot};
use fvi_protocol::{ContextResponse, ContributionView, PassageView, ScoreResponse};

pub(crate) fn score_view(snapshot: &ScoreSnapshot) -> ScoreResponse {
    let composite = &snapshot.composite;
    ScoreResponse {
        entity_id: composite.entity_id.to_string(),
        persona_id: composite.persona.to_string(),
        composite: composite.value,
        recommendation: snapshot.recommendation.to_string(),
        viability: snapshot.viability.to_string(),
        contributions: composite
            .contributions
            .iter()
            .map(|(dimension, c)| {
                (
                    dimension.to_string(),
                    ContributionView {
                        raw_score: c.raw_score,
                        weight: c.weight,
                        weighted_score: c.weighted_score,
                        contribution_pct: c.contribution_pct,
                        imputed: c.imputed,
                    },
                )
            })
            .collect(),
        generation: snapshot.generation,
    }
}

pub(crate) fn context_view(bundle: &ContextBundle) -> ContextResponse {
    ContextResponse {
        query: bundle.query.clone(),
        persona_id: bundle.persona.to_string(),
        entity_id: bundle.entity.as_ref().map(ToString::to_string),
        passages: bundle
            .ranked_passages
            .iter()
            .map(|p| PassageView {
                chunk_id: p.chunk.chunk_id.clone(),
                category: p.chunk.category.to_string(),
                source_document: p.chunk.source_document.clone(),
                relevance: p.relevance,
                text: p.chunk.text.clone(),
            })
            .collect(),
        categories: bundle
            .categories
            .iter()
            .map(|(category, indices)| {
                let ids = indices
                    .iter()
                    .filter_map(|i| bundle.ranked_passages.get(*i))
                    .map(|p| p.chunk.chunk_id.clone())
                    .collect();
                (category.to_string(), ids)
            })
            .collect(),
        score: bundle.live_score_snapshot.as_ref().map(score_view),
        data_sources: bundle.data_sources.clone(),
        used_chars: bundle.used_chars,
        max_chars: bundle.max_chars,
        truncated: bundle.is_truncated(),
        truncation: bundle.truncation.clone(),
    }
}
