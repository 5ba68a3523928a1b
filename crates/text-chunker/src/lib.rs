//! # FVI Text Chunker
//!
//! Splits knowledge-base documents into overlapping fixed-size windows and
//! files each window under a topic category.
//!
//! ## Architecture
//!
//! ```text
//! RawDocument
//!     │
//!     ├──> Grapheme segmentation
//!     │
//!     ├──> Sliding window (window_chars, overlap_chars)
//!     │    └─> optional break on trailing whitespace
//!     │
//!     └──> KnowledgeChunk[]
//!          ├─> chunk_id = "{source_document}#{ordinal}"
//!          ├─> category (document override or keyword families)
//!          └─> entity_tags inherited from the document
//! ```
//!
//! ## Example
//!
//! ```rust
//! use fvi_text_chunker::{Chunker, ChunkerConfig, RawDocument};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//! let doc = RawDocument::new(
//!     "kb/overview.txt",
//!     "Global coal production capacity has plateaued while mining costs keep rising.",
//! );
//! for chunk in chunker.chunk_document(&doc).unwrap() {
//!     println!("{} [{}] {}", chunk.chunk_id, chunk.category, chunk.text);
//! }
//! ```

mod category;
mod chunker;
mod config;
mod error;
mod types;

pub use category::Category;
pub use chunker::Chunker;
pub use config::{
    ChunkerConfig, DEFAULT_MIN_CHUNK_CHARS, DEFAULT_OVERLAP_CHARS, DEFAULT_WINDOW_CHARS,
};
pub use error::{ChunkerError, Result};
pub use types::{KnowledgeChunk, RawDocument};
