use fvi_protocol::BudgetTruncation;
use fvi_scoring::{EntityId, Persona, ScoringAggregator};
use fvi_vector_store::{dot, Category, KnowledgeIndex, SearchResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::bundle::{ContextBundle, RankedPassage, ScoreSnapshot};
use crate::config::{FusionConfig, MIN_TRUNCATED_PASSAGE_CHARS};
use crate::error::{FusionError, Result};

/// Builds bounded context bundles from the knowledge index and live scores.
///
/// Stateless between calls: each `fuse` reads the index snapshot and score
/// table current at call start.
pub struct ContextFusionEngine {
    index: Arc<KnowledgeIndex>,
    aggregator: Arc<ScoringAggregator>,
    config: FusionConfig,
}

impl ContextFusionEngine {
    pub fn new(
        index: Arc<KnowledgeIndex>,
        aggregator: Arc<ScoringAggregator>,
        config: FusionConfig,
    ) -> Result<Self> {
        config.validate().map_err(FusionError::InvalidConfig)?;
        Ok(Self {
            index,
            aggregator,
            config,
        })
    }

    #[must_use]
    pub fn index(&self) -> &Arc<KnowledgeIndex> {
        &self.index
    }

    #[must_use]
    pub fn aggregator(&self) -> &Arc<ScoringAggregator> {
        &self.aggregator
    }

    #[must_use]
    pub const fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Retrieve, filter, group, score and budget context for one query.
    ///
    /// A query with no qualifying passages still yields a bundle; absence of
    /// knowledge is not an error.
    pub async fn fuse(
        &self,
        query: &str,
        persona: Persona,
        entity: Option<&EntityId>,
    ) -> Result<ContextBundle> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FusionError::EmptyQuery);
        }

        // 1. embed
        let query_vector = self.index.embed_query(query).await?;

        // 2. search, restricted to the entity's chunks plus general knowledge
        let hits = self.index.search_filtered(
            &query_vector,
            self.config.top_k,
            entity.map(EntityId::as_str),
        )?;
        let retrieved = hits.len();

        // 3-4. relevance threshold; never padded
        let qualifying: Vec<SearchResult> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.config.min_relevance)
            .collect();

        // 5. collapse near-duplicates, then group
        let (passages, duplicates_removed) =
            dedup_passages(qualifying, self.config.duplicate_similarity);

        // 6. live score snapshot
        let live_score_snapshot = match entity {
            Some(entity) => Some(self.score_snapshot(entity, persona)?),
            None => None,
        };

        // 7. budget, lowest relevance goes first
        let (ranked_passages, used_chars, truncation) =
            apply_budget(passages, self.config.max_chars);
        let categories = group_by_category(&ranked_passages);
        let data_sources = data_sources(&ranked_passages);

        log::debug!(
            "Fused '{query}' ({persona}, entity {}): {retrieved} retrieved, {} kept, {duplicates_removed} duplicates, {used_chars}/{} chars",
            entity.map_or("-", EntityId::as_str),
            ranked_passages.len(),
            self.config.max_chars
        );

        Ok(ContextBundle {
            query: query.to_string(),
            persona,
            entity: entity.cloned(),
            ranked_passages,
            categories,
            live_score_snapshot,
            data_sources,
            duplicates_removed,
            used_chars,
            max_chars: self.config.max_chars,
            truncation,
        })
    }

    /// `fuse` under a deadline (the configured one when `timeout` is `None`).
    /// On expiry the caller gets `Timeout` and no partial bundle.
    pub async fn fuse_with_timeout(
        &self,
        query: &str,
        persona: Persona,
        entity: Option<&EntityId>,
        timeout: Option<Duration>,
    ) -> Result<ContextBundle> {
        let deadline = timeout.unwrap_or_else(|| self.config.timeout());
        match tokio::time::timeout(deadline, self.fuse(query, persona, entity)).await {
            Ok(result) => result,
            Err(_) => {
                let ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                log::warn!("Context fusion for '{query}' exceeded {ms} ms");
                Err(FusionError::Timeout { ms })
            }
        }
    }

    /// Live composite with its labels, stamped with the generation it was read from.
    pub fn score_snapshot(&self, entity: &EntityId, persona: Persona) -> Result<ScoreSnapshot> {
        let (composite, generation) = self.aggregator.score_versioned(entity, persona)?;
        Ok(ScoreSnapshot {
            recommendation: self.aggregator.recommend(composite.value),
            viability: self.aggregator.viability(composite.value),
            generation,
            composite,
        })
    }
}

/// Drop hits whose vector is at least `threshold` similar to a better hit
/// already kept. Input is in descending relevance, so the survivor of each
/// duplicate group is its highest-scoring member.
fn dedup_passages(hits: Vec<SearchResult>, threshold: f32) -> (Vec<RankedPassage>, usize) {
    let mut kept: Vec<SearchResult> = Vec::with_capacity(hits.len());
    let mut removed = 0;
    for hit in hits {
        let duplicate = kept
            .iter()
            .any(|other| dot(&other.vector, &hit.vector) >= threshold);
        if duplicate {
            log::debug!("Collapsed near-duplicate passage {}", hit.chunk.chunk_id);
            removed += 1;
        } else {
            kept.push(hit);
        }
    }
    let passages = kept
        .into_iter()
        .map(|hit| RankedPassage {
            chunk: hit.chunk,
            relevance: hit.score,
        })
        .collect();
    (passages, removed)
}

/// Keep passages in relevance order while they fit in `max_chars`. The first
/// passage that overflows is cut to the remaining room, or dropped when that
/// room is too small to be useful; everything after it is dropped.
fn apply_budget(
    passages: Vec<RankedPassage>,
    max_chars: usize,
) -> (Vec<RankedPassage>, usize, Option<BudgetTruncation>) {
    let mut kept = Vec::with_capacity(passages.len());
    let mut used = 0;
    let mut truncation = None;

    for mut passage in passages {
        if truncation.is_some() {
            break;
        }
        let len = passage.char_len();
        let room = max_chars - used;
        if len <= room {
            used += len;
            kept.push(passage);
            continue;
        }

        truncation = Some(BudgetTruncation::MaxChars);
        if room >= MIN_TRUNCATED_PASSAGE_CHARS {
            passage.chunk.text = passage.chunk.text.chars().take(room).collect();
            used += room;
            kept.push(passage);
        }
    }

    (kept, used, truncation)
}

fn group_by_category(passages: &[RankedPassage]) -> BTreeMap<Category, Vec<usize>> {
    let mut groups: BTreeMap<Category, Vec<usize>> = BTreeMap::new();
    for (i, passage) in passages.iter().enumerate() {
        groups.entry(passage.chunk.category).or_default().push(i);
    }
    groups
}

fn data_sources(passages: &[RankedPassage]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for passage in passages {
        if !sources.contains(&passage.chunk.source_document) {
            sources.push(passage.chunk.source_document.clone());
        }
    }
    sources
}
