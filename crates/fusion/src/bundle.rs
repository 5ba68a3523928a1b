use fvi_protocol::BudgetTruncation;
use fvi_scoring::{CompositeScore, EntityId, Persona, Recommendation, Viability};
use fvi_vector_store::{Category, KnowledgeChunk};
use std::collections::BTreeMap;

/// A retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPassage {
    pub chunk: KnowledgeChunk,
    pub relevance: f32,
}

impl RankedPassage {
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.chunk.char_len()
    }
}

/// Live aggregator output attached to an entity-scoped bundle
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSnapshot {
    pub composite: CompositeScore,
    pub recommendation: Recommendation,
    pub viability: Viability,
    /// Store generation the composite was read from
    pub generation: u64,
}

/// Per-request context handed to a generative backend. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBundle {
    pub query: String,
    pub persona: Persona,
    pub entity: Option<EntityId>,
    /// Descending relevance
    pub ranked_passages: Vec<RankedPassage>,
    /// Indices into `ranked_passages`, in relevance order per category
    pub categories: BTreeMap<Category, Vec<usize>>,
    pub live_score_snapshot: Option<ScoreSnapshot>,
    /// Distinct source documents in passage order
    pub data_sources: Vec<String>,
    /// Passages collapsed as near-duplicates of better ones
    pub duplicates_removed: usize,
    /// Total passage text in `char`s
    pub used_chars: usize,
    pub max_chars: usize,
    pub truncation: Option<BudgetTruncation>,
}

impl ContextBundle {
    pub fn passages_in(&self, category: Category) -> impl Iterator<Item = &RankedPassage> {
        self.categories
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(|i| self.ranked_passages.get(*i))
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    #[must_use]
    pub fn has_knowledge(&self) -> bool {
        !self.ranked_passages.is_empty()
    }
}
