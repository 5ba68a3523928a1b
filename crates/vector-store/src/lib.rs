//! # FVI Vector Store
//!
//! Knowledge index for the FVI retrieval layer: chunked knowledge-base text
//! plus synthesized per-entity assessment documents, embedded through a
//! pluggable [`Embedder`] and searched exactly by cosine similarity.
//!
//! The `onnx` feature adds `OnnxEmbedder`, a sentence-embedding model run
//! through ONNX Runtime; [`HashingEmbedder`] is the offline default.
//!
//! ## Architecture
//!
//! ```text
//! RawDocument[] (corpus)        RawDocument[] (assessments)
//!     │                               │
//!     ├──> Chunker (sliding window) <─┘
//!     │
//!     ├──> Embedder::embed_batch ──> L2 normalize
//!     │
//!     ├──> IndexSnapshot (immutable, Arc-swapped)
//!     │      ├─> FlatIndex (exact, stable ties)
//!     │      └─> entity-tag filtered search
//!     │
//!     └──> Persistent storage
//!            └─> deterministic JSON (schema, model id, sha256 fingerprint)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fvi_text_chunker::{ChunkerConfig, RawDocument};
//! use fvi_vector_store::{HashingEmbedder, KnowledgeIndex};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let corpus = vec![RawDocument::new(
//!         "kb/subsidies.txt",
//!         "Coal subsidies keep marginal mines open well past their economic life.",
//!     )];
//!     let index =
//!         KnowledgeIndex::build(Arc::new(HashingEmbedder::default()), ChunkerConfig::default(), corpus)
//!             .await?;
//!
//!     let query = index.embed_query("coal subsidy risk").await?;
//!     for hit in index.search(&query, 5)? {
//!         println!("{}: {:.3}", hit.chunk.chunk_id, hit.score);
//!     }
//!     index.save("kb_index.json").await?;
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod index;
#[cfg(feature = "onnx")]
mod onnx;
mod persist;
mod types;

pub use embeddings::{
    dot, normalize, Embedder, HashingEmbedder, StaticEmbedder,
    DEFAULT_HASHING_DIMENSION,
};
pub use error::{Result, VectorStoreError};
pub use index::{IndexSnapshot, KnowledgeIndex};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxEmbedder, OnnxModelConfig, ONNX_MODEL_FILE, TOKENIZER_FILE};
pub use persist::INDEX_SCHEMA_VERSION;
pub use types::{IndexStats, SearchResult, StoredChunk};

// Re-export chunker types for convenience
pub use fvi_text_chunker::{Category, ChunkerConfig, KnowledgeChunk, RawDocument};
