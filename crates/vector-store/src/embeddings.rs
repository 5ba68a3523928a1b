use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Result, VectorStoreError};

/// Default dimension of [`HashingEmbedder`]
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Capability that turns text into fixed-dimension vectors.
///
/// Implementations need not normalize; the index L2-normalizes everything it stores.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in persisted indexes
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VectorStoreError::embedding_unavailable("embedder returned no vector"))
    }
}

/// Offline embedder: lowercased word and bigram features, SHA-256 hashed
/// into signed buckets.
///
/// Texts sharing vocabulary land close together, which is enough for
/// keyword-heavy corpora and keeps the binary usable without a model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    /// Buckets written per feature
    const PROJECTIONS: usize = 2;

    #[must_use]
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("hashing-{dimension}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();

        let unigrams = words.iter().map(|w| (feature_digest(&[w.as_str()]), 1.0f32));
        let bigrams = words
            .windows(2)
            .map(|pair| (feature_digest(&[pair[0].as_str(), pair[1].as_str()]), 0.5f32));
        for (digest, weight) in unigrams.chain(bigrams) {
            for lane in digest.chunks_exact(8).take(Self::PROJECTIONS) {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(lane);
                let bits = u64::from_le_bytes(bytes);
                let bucket = (bits % self.dimension as u64) as usize;
                let sign = if bits >> 63 == 0 { 1.0 } else { -1.0 };
                vec[bucket] += sign * weight;
            }
        }

        normalize(&mut vec);
        vec
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Embedder backed by a fixed text-to-vector table.
///
/// Unknown text maps to a configurable fallback vector (zero by default).
/// Availability can be switched off to simulate a failing collaborator.
#[derive(Debug)]
pub struct StaticEmbedder {
    dimension: usize,
    table: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    available: AtomicBool,
}

impl StaticEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            table: HashMap::new(),
            fallback: vec![0.0; dimension],
            available: AtomicBool::new(true),
        }
    }

    /// Builder: map `text` to `vector`
    #[must_use]
    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.table.insert(text.into(), vector);
        self
    }

    /// Builder: vector returned for text missing from the table
    #[must_use]
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = vector;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    fn model_id(&self) -> &str {
        "static"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(VectorStoreError::embedding_unavailable(
                "static embedder switched off",
            ));
        }
        Ok(texts
            .iter()
            .map(|t| self.table.get(*t).unwrap_or(&self.fallback).clone())
            .collect())
    }
}

/// Scale `vec` to unit L2 norm in place; zero vectors stay zero.
pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// SHA-256 of a word feature; unit separators keep `["ab", "c"]` apart from `["a", "bc"]`.
fn feature_digest(words: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(word.as_bytes());
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic_and_unit_norm() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("Coal subsidy risk in India").await.unwrap();
        let b = embedder.embed("Coal subsidy risk in India").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("coal subsidy phase out").await.unwrap();
        let related = embedder
            .embed("Governments plan to phase out the coal subsidy")
            .await
            .unwrap();
        let unrelated = embedder
            .embed("Tidal patterns of the northern sea shelf")
            .await
            .unwrap();
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(16).embed("  ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn static_embedder_can_be_switched_off() {
        let embedder = StaticEmbedder::new(2).with("a", vec![1.0, 0.0]);
        assert_eq!(embedder.embed("a").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(embedder.embed("b").await.unwrap(), vec![0.0, 0.0]);
        embedder.set_available(false);
        assert!(matches!(
            embedder.embed("a").await,
            Err(VectorStoreError::EmbeddingUnavailable(_))
        ));
    }
}
