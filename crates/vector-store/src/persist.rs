use fvi_text_chunker::{Chunker, ChunkerConfig, RawDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::embeddings::Embedder;
use crate::error::{Result, VectorStoreError};
use crate::index::{corpus_fingerprint, IndexSnapshot, KnowledgeIndex};
use crate::types::StoredChunk;

pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// On-disk form. Field order and contents are fixed so that two builds of
/// the same corpus with the same embedder serialize to identical bytes.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    schema_version: u32,
    model_id: String,
    dimension: usize,
    fingerprint: String,
    knowledge_chunks: usize,
    assessment_chunks: usize,
    corpus: Vec<RawDocument>,
    assessment_documents: Vec<RawDocument>,
    knowledge: Vec<StoredChunk>,
    assessments: Vec<StoredChunk>,
}

impl KnowledgeIndex {
    /// Serialize the current snapshot (temp file, then rename).
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let snapshot = self.snapshot();
        log::info!(
            "Saving knowledge index generation {} to {}",
            snapshot.generation(),
            path.display()
        );

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedIndex {
            schema_version: INDEX_SCHEMA_VERSION,
            model_id: snapshot.model_id.clone(),
            dimension: snapshot.dimension(),
            fingerprint: snapshot.fingerprint.clone(),
            knowledge_chunks: snapshot.knowledge.len(),
            assessment_chunks: snapshot.assessments.len(),
            corpus: snapshot.corpus.clone(),
            assessment_documents: snapshot.assessment_docs.clone(),
            knowledge: snapshot.knowledge.clone(),
            assessments: snapshot.assessments.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Load a saved index for use with `embedder`.
    ///
    /// The embedder must match the one the index was built with; stored
    /// vectors of the wrong length are reported as corruption.
    pub async fn load(
        path: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
        config: ChunkerConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedIndex = serde_json::from_slice(&bytes)?;

        if persisted.schema_version != INDEX_SCHEMA_VERSION {
            return Err(VectorStoreError::SchemaMismatch {
                found: persisted.schema_version,
                expected: INDEX_SCHEMA_VERSION,
            });
        }
        if persisted.model_id != embedder.model_id() {
            return Err(VectorStoreError::ModelMismatch {
                stored: persisted.model_id,
                current: embedder.model_id().to_string(),
            });
        }
        if persisted.dimension != embedder.dimension() {
            return Err(VectorStoreError::IndexCorruption {
                expected: persisted.dimension,
                actual: embedder.dimension(),
            });
        }
        if persisted.knowledge.len() != persisted.knowledge_chunks
            || persisted.assessments.len() != persisted.assessment_chunks
        {
            log::warn!(
                "Chunk counts in {} disagree with its header; trusting the stored chunks",
                path.display()
            );
        }

        let fingerprint = corpus_fingerprint(
            &persisted.model_id,
            persisted.dimension,
            &persisted.corpus,
            &persisted.assessment_documents,
        );
        if fingerprint != persisted.fingerprint {
            log::warn!(
                "Corpus fingerprint mismatch in {}; the file was edited after it was saved",
                path.display()
            );
        }

        let chunker = Chunker::new(config)?;
        let snapshot = IndexSnapshot::assemble(
            1,
            persisted.model_id,
            persisted.dimension,
            persisted.corpus,
            persisted.assessment_documents,
            persisted.knowledge,
            persisted.assessments,
        )?;
        log::info!(
            "Loaded knowledge index from {} ({} chunks)",
            path.display(),
            snapshot.len()
        );
        Ok(Self::from_snapshot(embedder, chunker, snapshot))
    }
}
