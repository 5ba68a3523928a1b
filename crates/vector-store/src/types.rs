use fvi_text_chunker::KnowledgeChunk;
use serde::{Deserialize, Serialize};

/// A chunk together with its unit-norm embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk: KnowledgeChunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: KnowledgeChunk,
    pub vector: Vec<f32>,
    /// Cosine similarity to the query
    pub score: f32,
    /// Insertion position in the index
    pub position: usize,
}

/// Snapshot counters of a knowledge index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub generation: u64,
    pub total_chunks: usize,
    pub knowledge_chunks: usize,
    pub assessment_chunks: usize,
    pub documents: usize,
    pub assessment_documents: usize,
    pub dimension: usize,
    pub model_id: String,
    pub fingerprint: String,
    pub corrupted: bool,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Generation: {} | Chunks: {} (knowledge {}, assessment {}) | Docs: {} | Dim: {} | Model: {}",
            self.generation,
            self.total_chunks,
            self.knowledge_chunks,
            self.assessment_chunks,
            self.documents,
            self.dimension,
            self.model_id
        )
    }
}
