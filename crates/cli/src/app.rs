use anyhow::{Context, Result};
use fvi_fusion::{refresh_stale_assessments, sync_assessments, ContextFusionEngine};
use fvi_router::{ExtractiveGenerator, QueryRouter};
use fvi_scoring::{DimensionScoreStore, LoadReport, ScoringAggregator};
use fvi_vector_store::{Embedder, HashingEmbedder, IndexStats, KnowledgeIndex};
use std::sync::Arc;

use crate::config::{EmbeddingModel, FviConfig};
use crate::corpus::load_corpus;

/// Load the score table and wrap it in an aggregator.
pub fn load_scores(config: &FviConfig) -> Result<(Arc<ScoringAggregator>, LoadReport)> {
    let source = config.score_source();
    let (store, report) = DimensionScoreStore::load(&source, config.entity_aliases())
        .with_context(|| format!("Failed to load scores from {}", source.describe()))?;
    if !report.is_clean() {
        for issue in report.issues.iter().take(10) {
            log::warn!("{issue}");
        }
    }
    let aggregator = ScoringAggregator::new(Arc::new(store), config.scoring.clone())
        .context("Invalid scoring configuration")?;
    Ok((Arc::new(aggregator), report))
}

/// The configured embedder. Selecting `onnx` in a build without the
/// `onnx` feature is an error rather than a silent fallback.
pub fn embedder(config: &FviConfig) -> Result<Arc<dyn Embedder>> {
    let section = &config.embedding;
    match section.model {
        EmbeddingModel::Hashing => Ok(Arc::new(HashingEmbedder::new(section.dimension))),
        #[cfg(feature = "onnx")]
        EmbeddingModel::Onnx => {
            let model = fvi_vector_store::OnnxModelConfig {
                model_dir: section.model_dir.clone(),
                name: section.model_name.clone(),
                dimension: section.dimension,
                max_length: section.max_length,
                ..fvi_vector_store::OnnxModelConfig::minilm(&section.model_dir)
            };
            let embedder = fvi_vector_store::OnnxEmbedder::load(&model)
                .with_context(|| format!("Failed to load embedding model from {}", section.model_dir.display()))?;
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "onnx"))]
        EmbeddingModel::Onnx => anyhow::bail!(
            "[embedding] model = \"onnx\" requires fvi built with `--features onnx`"
        ),
    }
}

/// Chunk and embed the corpus, add assessment documents, and save.
pub async fn build_index(config: &FviConfig, aggregator: &ScoringAggregator) -> Result<IndexStats> {
    let corpus = load_corpus(&config.paths.corpus, aggregator.store().aliases())?;
    let index = KnowledgeIndex::build(embedder(config)?, config.chunking.clone(), corpus)
        .await
        .context("Failed to build knowledge index")?;
    let stats = sync_assessments(aggregator, &index, config.retrieval.assessment_persona)
        .await
        .context("Failed to add assessment documents")?;
    index
        .save(&config.paths.index)
        .await
        .with_context(|| format!("Failed to save index to {}", config.paths.index.display()))?;
    Ok(stats)
}

pub async fn open_index(config: &FviConfig) -> Result<KnowledgeIndex> {
    let path = &config.paths.index;
    if !path.exists() {
        anyhow::bail!(
            "Knowledge index not found at {}; run `fvi build-index` first",
            path.display()
        );
    }
    KnowledgeIndex::load(path, embedder(config)?, config.chunking.clone())
        .await
        .with_context(|| format!("Failed to load index from {}", path.display()))
}

/// Scores, saved index and router, wired for query commands. Assessment
/// documents are brought in line with the current scores first.
pub async fn open_router(config: &FviConfig) -> Result<QueryRouter> {
    let (aggregator, _) = load_scores(config)?;
    let index = open_index(config).await?;
    refresh_stale_assessments(&aggregator, &index, config.retrieval.assessment_persona)
        .await
        .context("Failed to refresh assessment documents")?;
    let engine = ContextFusionEngine::new(Arc::new(index), aggregator, config.retrieval.fusion.clone())
        .context("Invalid retrieval configuration")?;
    let router = QueryRouter::new(Arc::new(engine)).context("Failed to prepare entity detection")?;
    Ok(router.with_generator(Arc::new(ExtractiveGenerator)))
}
