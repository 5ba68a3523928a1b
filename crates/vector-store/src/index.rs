use fvi_text_chunker::{Chunker, ChunkerConfig, KnowledgeChunk, RawDocument};
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::embeddings::{normalize, Embedder};
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::types::{IndexStats, SearchResult, StoredChunk};

/// Texts sent to the embedder per call
const EMBED_BATCH_SIZE: usize = 64;

/// One immutable, fully-built version of the index.
///
/// Positions `0..knowledge.len()` are static corpus chunks, the rest are
/// synthesized assessment chunks; both in insertion order.
#[derive(Debug)]
pub struct IndexSnapshot {
    pub(crate) generation: u64,
    pub(crate) model_id: String,
    pub(crate) corpus: Vec<RawDocument>,
    pub(crate) assessment_docs: Vec<RawDocument>,
    pub(crate) knowledge: Vec<StoredChunk>,
    pub(crate) assessments: Vec<StoredChunk>,
    pub(crate) fingerprint: String,
    index: FlatIndex,
    /// Query dimension that exposed a mismatch; set once, never cleared.
    corruption: OnceLock<usize>,
}

impl IndexSnapshot {
    pub(crate) fn assemble(
        generation: u64,
        model_id: String,
        dimension: usize,
        corpus: Vec<RawDocument>,
        assessment_docs: Vec<RawDocument>,
        knowledge: Vec<StoredChunk>,
        assessments: Vec<StoredChunk>,
    ) -> Result<Self> {
        let mut index = FlatIndex::new(dimension);
        for stored in knowledge.iter().chain(&assessments) {
            index
                .add(&stored.vector)
                .map_err(|_| VectorStoreError::IndexCorruption {
                    expected: dimension,
                    actual: stored.vector.len(),
                })?;
        }
        let fingerprint = corpus_fingerprint(&model_id, dimension, &corpus, &assessment_docs);
        Ok(Self {
            generation,
            model_id,
            corpus,
            assessment_docs,
            knowledge,
            assessments,
            fingerprint,
            index,
            corruption: OnceLock::new(),
        })
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn assessment_documents(&self) -> &[RawDocument] {
        &self.assessment_docs
    }

    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        self.corruption.get().is_some()
    }

    /// Every stored chunk in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &StoredChunk> {
        self.knowledge.iter().chain(&self.assessments)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn chunk_at(&self, position: usize) -> Option<&StoredChunk> {
        match position.checked_sub(self.knowledge.len()) {
            None => self.knowledge.get(position),
            Some(offset) => self.assessments.get(offset),
        }
    }

    /// Top `top_k` chunks by descending similarity. With `entity`, only chunks
    /// tagged with it or carrying no entity tag are considered.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        entity: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let expected = self.dimension();
        if let Some(actual) = self.corruption.get() {
            return Err(VectorStoreError::IndexCorruption {
                expected,
                actual: *actual,
            });
        }
        if query.len() != expected {
            let actual = *self.corruption.get_or_init(|| query.len());
            log::error!(
                "Index generation {} refuses searches until rebuilt: dimension {expected} vs query {actual}",
                self.generation
            );
            return Err(VectorStoreError::IndexCorruption { expected, actual });
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let keep = |position: usize| match (entity, self.chunk_at(position)) {
            (None, _) => true,
            (Some(entity), Some(stored)) => {
                stored.chunk.is_general() || stored.chunk.is_tagged(entity)
            }
            (Some(_), None) => false,
        };
        let hits = self.index.search_where(&query, top_k, keep)?;

        Ok(hits
            .into_iter()
            .filter_map(|(position, score)| {
                self.chunk_at(position).map(|stored| SearchResult {
                    chunk: stored.chunk.clone(),
                    vector: stored.vector.clone(),
                    score,
                    position,
                })
            })
            .collect())
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            generation: self.generation,
            total_chunks: self.len(),
            knowledge_chunks: self.knowledge.len(),
            assessment_chunks: self.assessments.len(),
            documents: self.corpus.len(),
            assessment_documents: self.assessment_docs.len(),
            dimension: self.dimension(),
            model_id: self.model_id.clone(),
            fingerprint: self.fingerprint.clone(),
            corrupted: self.is_corrupted(),
        }
    }
}

/// Embedding-based nearest-neighbour index over chunked knowledge text and
/// synthesized per-entity assessment documents.
///
/// Searches read an `Arc` snapshot and never wait on a rebuild. Rebuilds are
/// serialized, build the replacement off to the side, and publish it in a
/// single swap; a failed rebuild leaves the previous snapshot untouched.
pub struct KnowledgeIndex {
    pub(crate) embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    current: RwLock<Arc<IndexSnapshot>>,
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl KnowledgeIndex {
    /// Empty index (generation 0).
    pub fn new(embedder: Arc<dyn Embedder>, config: ChunkerConfig) -> Result<Self> {
        let chunker = Chunker::new(config)?;
        let empty = IndexSnapshot::assemble(
            0,
            embedder.model_id().to_string(),
            embedder.dimension(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )?;
        Ok(Self::from_snapshot(embedder, chunker, empty))
    }

    pub(crate) fn from_snapshot(
        embedder: Arc<dyn Embedder>,
        chunker: Chunker,
        snapshot: IndexSnapshot,
    ) -> Self {
        Self {
            embedder,
            chunker,
            current: RwLock::new(Arc::new(snapshot)),
            rebuild_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Chunk and embed `corpus` into a fresh index.
    pub async fn build(
        embedder: Arc<dyn Embedder>,
        config: ChunkerConfig,
        corpus: Vec<RawDocument>,
    ) -> Result<Self> {
        let index = Self::new(embedder, config)?;
        index.rebuild_with(corpus).await?;
        Ok(index)
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }

    /// Re-embed the current corpus and assessment documents. Running it
    /// twice yields identical chunk sets and ordering.
    pub async fn rebuild(&self) -> Result<IndexStats> {
        let _guard = self.rebuild_lock.lock().await;
        let current = self.snapshot();
        let knowledge = self.embed_documents(&current.corpus).await?;
        let assessments = self.embed_documents(&current.assessment_docs).await?;
        self.publish(
            &current,
            current.corpus.clone(),
            current.assessment_docs.clone(),
            knowledge,
            assessments,
        )
    }

    /// Replace the static corpus, keeping the current assessment documents.
    pub async fn rebuild_with(&self, corpus: Vec<RawDocument>) -> Result<IndexStats> {
        let _guard = self.rebuild_lock.lock().await;
        let current = self.snapshot();
        let knowledge = self.embed_documents(&corpus).await?;
        let assessments = self.embed_documents(&current.assessment_docs).await?;
        self.publish(
            &current,
            corpus,
            current.assessment_docs.clone(),
            knowledge,
            assessments,
        )
    }

    /// Replace only the synthesized assessment documents; static corpus
    /// vectors are carried over without re-embedding.
    pub async fn refresh_assessments(&self, docs: Vec<RawDocument>) -> Result<IndexStats> {
        let _guard = self.rebuild_lock.lock().await;
        let current = self.snapshot();
        if current.is_corrupted() {
            // carried-over vectors cannot be trusted
            let knowledge = self.embed_documents(&current.corpus).await?;
            let assessments = self.embed_documents(&docs).await?;
            return self.publish(&current, current.corpus.clone(), docs, knowledge, assessments);
        }
        let assessments = self.embed_documents(&docs).await?;
        self.publish(
            &current,
            current.corpus.clone(),
            docs,
            current.knowledge.clone(),
            assessments,
        )
    }

    /// Embed and normalize a query with the index's embedder.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = self.embedder.embed(text).await?;
        normalize(&mut vector);
        Ok(vector)
    }

    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.snapshot().search(query, top_k, None)
    }

    pub fn search_filtered(
        &self,
        query: &[f32],
        top_k: usize,
        entity: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        self.snapshot().search(query, top_k, entity)
    }

    fn publish(
        &self,
        previous: &IndexSnapshot,
        corpus: Vec<RawDocument>,
        assessment_docs: Vec<RawDocument>,
        knowledge: Vec<StoredChunk>,
        assessments: Vec<StoredChunk>,
    ) -> Result<IndexStats> {
        let next = IndexSnapshot::assemble(
            previous.generation + 1,
            self.embedder.model_id().to_string(),
            self.embedder.dimension(),
            corpus,
            assessment_docs,
            knowledge,
            assessments,
        )?;
        let stats = next.stats();
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Arc::new(next);
        }
        log::info!("Knowledge index published: {stats}");
        Ok(stats)
    }

    async fn embed_documents(&self, docs: &[RawDocument]) -> Result<Vec<StoredChunk>> {
        let chunks = self.chunker.chunk_corpus(docs);
        self.embed_chunks(chunks).await
    }

    async fn embed_chunks(&self, chunks: Vec<KnowledgeChunk>) -> Result<Vec<StoredChunk>> {
        let dimension = self.embedder.dimension();
        let mut out = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedder.embed_batch(&texts).await.map_err(|e| {
                log::warn!("Embedding batch of {} chunks failed: {e}", batch.len());
                match e {
                    VectorStoreError::EmbeddingUnavailable(_) => e,
                    other => VectorStoreError::embedding_unavailable(other),
                }
            })?;
            if vectors.len() != batch.len() {
                return Err(VectorStoreError::embedding_unavailable(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, mut vector) in batch.iter().zip(vectors) {
                if vector.len() != dimension {
                    return Err(VectorStoreError::InvalidDimension {
                        expected: dimension,
                        actual: vector.len(),
                    });
                }
                normalize(&mut vector);
                out.push(StoredChunk {
                    chunk: chunk.clone(),
                    vector,
                });
            }
        }

        Ok(out)
    }
}

/// sha256 over the embedding identity and every indexed document, hex encoded.
pub(crate) fn corpus_fingerprint(
    model_id: &str,
    dimension: usize,
    corpus: &[RawDocument],
    assessment_docs: &[RawDocument],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model_id.as_bytes());
    hasher.update(dimension.to_le_bytes());
    for (section, docs) in [(b"corpus", corpus), (b"assess", assessment_docs)] {
        hasher.update(section);
        for doc in docs {
            hasher.update(doc.source_document.as_bytes());
            hasher.update([0]);
            hasher.update(doc.text.as_bytes());
            hasher.update([0]);
            hasher.update(doc.category.map(|c| c.as_str()).unwrap_or("").as_bytes());
            for tag in &doc.entity_tags {
                hasher.update([0]);
                hasher.update(tag.as_bytes());
            }
            hasher.update([0xff]);
        }
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{HashingEmbedder, StaticEmbedder};
    use fvi_text_chunker::Category;
    use pretty_assertions::assert_eq;

    fn doc(name: &str, text: &str) -> RawDocument {
        RawDocument::new(name, text)
    }

    fn corpus() -> Vec<RawDocument> {
        vec![
            doc("subsidies.txt", "Coal subsidy reform is progressing slowly across major economies."),
            doc("plants.txt", "Thermal power plants retire early when financing dries up for operators."),
            doc("mines.txt", "Open-pit mining expands where reserves remain cheap to extract for decades."),
        ]
    }

    fn hashing() -> Arc<dyn Embedder> {
        Arc::new(HashingEmbedder::new(128))
    }

    #[tokio::test]
    async fn build_indexes_every_chunk_in_order() {
        let index = KnowledgeIndex::build(hashing(), ChunkerConfig::default(), corpus())
            .await
            .unwrap();
        let snapshot = index.snapshot();
        let ids: Vec<&str> = snapshot.chunks().map(|c| c.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["subsidies.txt#0", "plants.txt#0", "mines.txt#0"]);
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(index.stats().knowledge_chunks, 3);
    }

    #[tokio::test]
    async fn search_is_ordered_and_bounded() {
        let index = KnowledgeIndex::build(hashing(), ChunkerConfig::default(), corpus())
            .await
            .unwrap();
        let query = index.embed_query("coal subsidy reform").await.unwrap();
        let results = index.search(&query, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source_document, "subsidies.txt");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let index = KnowledgeIndex::build(hashing(), ChunkerConfig::default(), corpus())
            .await
            .unwrap();
        let before = index.snapshot();
        index.rebuild().await.unwrap();
        let after = index.snapshot();

        assert_eq!(after.generation(), before.generation() + 1);
        assert_eq!(after.fingerprint(), before.fingerprint());
        let a: Vec<_> = before.chunks().cloned().collect();
        let b: Vec<_> = after.chunks().cloned().collect();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn embedding_failure_keeps_previous_index() {
        let embedder = Arc::new(StaticEmbedder::new(2).with_fallback(vec![1.0, 0.0]));
        let index = KnowledgeIndex::build(embedder.clone(), ChunkerConfig::default(), corpus())
            .await
            .unwrap();

        embedder.set_available(false);
        let err = index
            .rebuild_with(vec![doc("new.txt", "An entirely different corpus that must never be half-applied.")])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::EmbeddingUnavailable(_)));
        assert!(err.is_retryable());

        let snapshot = index.snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.len(), 3);
    }

    #[tokio::test]
    async fn dimension_mismatch_poisons_until_rebuild() {
        let index = KnowledgeIndex::build(hashing(), ChunkerConfig::default(), corpus())
            .await
            .unwrap();
        let bad = vec![1.0; 7];
        assert!(matches!(
            index.search(&bad, 3),
            Err(VectorStoreError::IndexCorruption { expected: 128, actual: 7 })
        ));

        // A well-formed query is refused too.
        let good = index.embed_query("coal").await.unwrap();
        assert!(matches!(
            index.search(&good, 3),
            Err(VectorStoreError::IndexCorruption { .. })
        ));
        assert!(index.stats().corrupted);

        index.rebuild().await.unwrap();
        assert!(index.search(&good, 3).is_ok());
    }

    #[tokio::test]
    async fn entity_filter_keeps_tagged_and_general_chunks() {
        let mut docs = corpus();
        docs.push(
            doc("india.txt", "India relies on coal for most of its electricity generation today.")
                .with_entity("India"),
        );
        docs.push(
            doc("china.txt", "China relies on coal for most of its electricity generation today.")
                .with_entity("China"),
        );
        let index = KnowledgeIndex::build(hashing(), ChunkerConfig::default(), docs)
            .await
            .unwrap();
        let query = index.embed_query("relies on coal electricity").await.unwrap();

        let results = index.search_filtered(&query, 10, Some("india")).unwrap();
        assert!(results.iter().all(|r| r.chunk.is_general() || r.chunk.is_tagged("India")));
        assert!(results.iter().any(|r| r.chunk.source_document == "india.txt"));
        assert!(!results.iter().any(|r| r.chunk.source_document == "china.txt"));
        assert_eq!(index.search(&query, 10).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn refresh_assessments_keeps_static_vectors() {
        let index = KnowledgeIndex::build(hashing(), ChunkerConfig::default(), corpus())
            .await
            .unwrap();
        let before = index.snapshot();

        let assessment = doc(
            "assessment/India",
            "FVI assessment for India: composite 60.45 under the investor persona, recommendation Hold.",
        )
        .with_category(Category::Assessment)
        .with_entity("India");
        let stats = index.refresh_assessments(vec![assessment]).await.unwrap();

        assert_eq!(stats.assessment_chunks, 1);
        assert_eq!(stats.knowledge_chunks, 3);
        let after = index.snapshot();
        assert_eq!(before.knowledge, after.knowledge);
        assert_ne!(before.fingerprint(), after.fingerprint());
        let last = after.chunks().last().unwrap();
        assert_eq!(last.chunk.category, Category::Assessment);
    }

    #[tokio::test]
    async fn readers_keep_their_snapshot_across_rebuild() {
        let index = KnowledgeIndex::build(hashing(), ChunkerConfig::default(), corpus())
            .await
            .unwrap();
        let held = index.snapshot();
        index.rebuild_with(Vec::new()).await.unwrap();
        assert_eq!(held.len(), 3);
        assert!(index.snapshot().is_empty());
    }
}
