use lru::LruCache;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{
    MissingValuePolicy, RankDirection, ScoringConfig, NEUTRAL_MIDPOINT, WEIGHT_SUM_TOLERANCE,
};
use crate::dimension::{Dimension, Persona};
use crate::error::{Result, ScoringError};
use crate::store::{DimensionScoreStore, ScoreTable};
use crate::types::{
    CompositeScore, DimensionContribution, EntityId, RankedEntity, Recommendation, Viability,
};

/// Composites are kept per store generation; the first lookup after a reload
/// sees a newer generation and drops every entry before answering.
struct CompositeCache {
    generation: u64,
    entries: LruCache<(EntityId, Persona), CompositeScore>,
}

impl CompositeCache {
    fn sync(&mut self, generation: u64) {
        if self.generation != generation {
            if !self.entries.is_empty() {
                log::debug!(
                    "Dropping {} cached composites (generation {} -> {})",
                    self.entries.len(),
                    self.generation,
                    generation
                );
            }
            self.entries.clear();
            self.generation = generation;
        }
    }
}

/// Persona-weighted composite scoring over a [`DimensionScoreStore`].
pub struct ScoringAggregator {
    store: Arc<DimensionScoreStore>,
    config: ScoringConfig,
    cache: Option<Mutex<CompositeCache>>,
}

impl ScoringAggregator {
    /// Validates the configuration (weights included) before accepting it.
    pub fn new(store: Arc<DimensionScoreStore>, config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        let cache = NonZeroUsize::new(config.cache_capacity).map(|capacity| {
            Mutex::new(CompositeCache {
                generation: 0,
                entries: LruCache::new(capacity),
            })
        });
        Ok(Self {
            store,
            config,
            cache,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<DimensionScoreStore> {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// `composite = Σ w_d * v_d` over every dimension.
    pub fn score(&self, entity: &EntityId, persona: Persona) -> Result<CompositeScore> {
        let table = self.store.snapshot();
        self.score_in(&table, entity, persona)
    }

    /// [`score`](Self::score) together with the store generation of the table
    /// the composite was computed on.
    pub fn score_versioned(
        &self,
        entity: &EntityId,
        persona: Persona,
    ) -> Result<(CompositeScore, u64)> {
        let table = self.store.snapshot();
        let composite = self.score_in(&table, entity, persona)?;
        Ok((composite, table.generation()))
    }

    /// Per-dimension breakdown of [`score`](Self::score).
    pub fn contributions(
        &self,
        entity: &EntityId,
        persona: Persona,
    ) -> Result<BTreeMap<Dimension, DimensionContribution>> {
        Ok(self.score(entity, persona)?.contributions)
    }

    /// Composite of `entity` under every configured persona.
    pub fn compare_personas(&self, entity: &EntityId) -> Result<BTreeMap<Persona, CompositeScore>> {
        let table = self.store.snapshot();
        self.config
            .personas
            .keys()
            .map(|persona| Ok((*persona, self.score_in(&table, entity, *persona)?)))
            .collect()
    }

    /// Rank `entities` by the persona's declared direction.
    ///
    /// Equal composites are ordered by entity id so the result is a total order.
    /// Duplicate entries in `entities` are ranked once.
    pub fn compare(&self, entities: &[EntityId], persona: Persona) -> Result<Vec<RankedEntity>> {
        let direction = self.config.profile(persona)?.ranking;
        let table = self.store.snapshot();

        let mut scored = entities
            .iter()
            .map(|entity| Ok((entity.clone(), self.score_in(&table, entity, persona)?.value)))
            .collect::<Result<Vec<_>>>()?;
        scored.sort_by(|a, b| a.0.cmp(&b.0));
        scored.dedup_by(|a, b| a.0 == b.0);

        scored.sort_by(|(ea, va), (eb, vb)| {
            let by_value = match direction {
                RankDirection::Ascending => va.total_cmp(vb),
                RankDirection::Descending => vb.total_cmp(va),
            };
            by_value.then_with(|| ea.cmp(eb))
        });

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (entity_id, composite))| RankedEntity {
                rank: i + 1,
                entity_id,
                composite,
            })
            .collect())
    }

    /// First `n` rows of [`compare`](Self::compare).
    pub fn top(&self, entities: &[EntityId], persona: Persona, n: usize) -> Result<Vec<RankedEntity>> {
        let mut ranked = self.compare(entities, persona)?;
        ranked.truncate(n);
        Ok(ranked)
    }

    /// Rank every entity currently in the store.
    pub fn rank_all(&self, persona: Persona) -> Result<Vec<RankedEntity>> {
        let entities: Vec<EntityId> = self.store.list_entities().into_iter().collect();
        self.compare(&entities, persona)
    }

    #[must_use]
    pub fn recommend(&self, composite: f64) -> Recommendation {
        self.config.recommendation.classify(composite)
    }

    #[must_use]
    pub fn viability(&self, composite: f64) -> Viability {
        self.config.viability.classify(composite)
    }

    fn score_in(&self, table: &ScoreTable, entity: &EntityId, persona: Persona) -> Result<CompositeScore> {
        let profile = self.config.profile(persona)?;
        if !table.contains_entity(entity) {
            return Err(ScoringError::UnknownEntity(entity.to_string()));
        }

        let key = (entity.clone(), persona);
        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.sync(table.generation());
            if let Some(hit) = cache.entries.get(&key) {
                return Ok(hit.clone());
            }
        }

        let mut raw = BTreeMap::new();
        for dim in Dimension::ALL {
            let value = match table.latest(entity, dim) {
                Some(score) => (score.value, false),
                None => match self.config.missing_policy(dim) {
                    MissingValuePolicy::NeutralMidpoint => (NEUTRAL_MIDPOINT, true),
                    MissingValuePolicy::Propagate => {
                        return Err(ScoringError::NotFound {
                            entity: entity.to_string(),
                            dimension: dim,
                        })
                    }
                },
            };
            raw.insert(dim, value);
        }

        let composite: f64 = raw
            .iter()
            .map(|(dim, (value, _))| profile.weight(*dim) * value)
            .sum();

        // Inputs are validated to [0, 100] and weights sum to 1 within
        // WEIGHT_SUM_TOLERANCE, so the sum can overshoot by at most that much.
        let slack = 100.0 * WEIGHT_SUM_TOLERANCE + 1e-9;
        debug_assert!(
            (-slack..=100.0 + slack).contains(&composite),
            "composite {composite} out of range for {entity}"
        );
        if !(-slack..=100.0 + slack).contains(&composite) {
            return Err(ScoringError::CompositeOutOfRange {
                entity: entity.to_string(),
                value: composite,
            });
        }
        let composite = composite.clamp(0.0, 100.0);

        let contributions = raw
            .into_iter()
            .map(|(dim, (raw_score, imputed))| {
                let weight = profile.weight(dim);
                let weighted_score = weight * raw_score;
                let contribution_pct = if composite > 0.0 {
                    weighted_score / composite * 100.0
                } else {
                    0.0
                };
                (
                    dim,
                    DimensionContribution {
                        raw_score,
                        weight,
                        weighted_score,
                        contribution_pct,
                        imputed,
                    },
                )
            })
            .collect();

        let score = CompositeScore {
            entity_id: entity.clone(),
            persona,
            value: composite,
            contributions,
        };

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            // A reload may have landed while computing; never cache under a newer generation.
            if cache.generation == table.generation() {
                cache.entries.put(key, score.clone());
            }
        }
        Ok(score)
    }
}
