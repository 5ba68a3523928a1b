use anyhow::{Context, Result};
use fvi_fusion::FusionConfig;
use fvi_scoring::{EntityAliases, Persona, ScoreSource, ScoringConfig};
use fvi_vector_store::{ChunkerConfig, DEFAULT_HASHING_DIMENSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "fvi.toml";

/// Contents of `fvi.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FviConfig {
    pub scoring: ScoringConfig,
    pub chunking: ChunkerConfig,
    pub retrieval: RetrievalSection,
    pub embedding: EmbeddingSection,
    pub paths: PathsSection,
    /// Extra spellings merged over the built-in country table
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    #[serde(flatten)]
    pub fusion: FusionConfig,
    /// Persona the indexed assessment documents are rendered for
    pub assessment_persona: Persona,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            assessment_persona: Persona::Analyst,
        }
    }
}

/// Which embedder vectors come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingModel {
    /// Offline feature hashing, no model files needed
    #[default]
    Hashing,
    /// Sentence model from `model_dir` (needs the `onnx` build feature)
    Onnx,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub model: EmbeddingModel,
    /// Vector dimension; for `onnx` it must match the model's output width
    pub dimension: usize,
    /// Directory holding `model.onnx` and `tokenizer.json`
    pub model_dir: PathBuf,
    /// Name recorded in the saved index
    pub model_name: String,
    /// Tokens kept per text
    pub max_length: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::Hashing,
            dimension: DEFAULT_HASHING_DIMENSION,
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
            model_name: "all-MiniLM-L6-v2".to_string(),
            max_length: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// A JSON file of score rows, or a `<dir>/<dimension>/*.json` tree
    pub scores: PathBuf,
    /// Knowledge-base directory of `.txt` / `.md` files
    pub corpus: PathBuf,
    pub index: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            scores: PathBuf::from("data/scores"),
            corpus: PathBuf::from("data/knowledge"),
            index: PathBuf::from(".fvi/index.json"),
        }
    }
}

impl FviConfig {
    /// Load `path`, or `fvi.toml` in the working directory when present.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            log::debug!("No {} found; using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Refuses persona weights that do not sum to one, among other things.
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate().context("[scoring]")?;
        self.chunking
            .validate()
            .map_err(anyhow::Error::msg)
            .context("[chunking]")?;
        self.retrieval
            .fusion
            .validate()
            .map_err(anyhow::Error::msg)
            .context("[retrieval]")?;
        if self.embedding.dimension == 0 {
            anyhow::bail!("[embedding] dimension must be > 0");
        }
        if self.embedding.model == EmbeddingModel::Onnx && self.embedding.max_length == 0 {
            anyhow::bail!("[embedding] max_length must be > 0");
        }
        Ok(())
    }

    #[must_use]
    pub fn entity_aliases(&self) -> EntityAliases {
        let mut table = EntityAliases::countries();
        table.extend(&EntityAliases::from(self.aliases.clone()));
        table
    }

    #[must_use]
    pub fn score_source(&self) -> ScoreSource {
        if self.paths.scores.is_dir() {
            ScoreSource::Directory(self.paths.scores.clone())
        } else {
            ScoreSource::JsonFile(self.paths.scores.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fvi_scoring::{Dimension, EntityId};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(FviConfig::parse("").unwrap(), FviConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = FviConfig::parse(
            r#"
            [chunking]
            window_chars = 800
            overlap_chars = 100

            [retrieval]
            top_k = 8
            min_relevance = 0.4
            assessment_persona = "investor"

            [paths]
            scores = "scores.json"

            [aliases]
            PRC = "China"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.window_chars, 800);
        assert_eq!(config.retrieval.fusion.top_k, 8);
        assert_eq!(config.retrieval.fusion.max_chars, 12_000);
        assert_eq!(config.retrieval.assessment_persona, Persona::Investor);
        assert_eq!(config.paths.scores, PathBuf::from("scores.json"));
        assert_eq!(config.paths.index, PathBuf::from(".fvi/index.json"));
        assert_eq!(config.entity_aliases().resolve("prc"), Some(EntityId::from("China")));
        assert_eq!(config.entity_aliases().resolve("IND"), Some(EntityId::from("India")));
    }

    #[test]
    fn bad_persona_weights_are_refused() {
        let err = FviConfig::parse(
            r#"
            [scoring.personas.investor]
            ranking = "ascending"
            [scoring.personas.investor.weights]
            infrastructure = 0.5
            emissions = 0.2
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("investor"));
    }

    #[test]
    fn unknown_dimension_in_weights_is_a_parse_error() {
        let result = FviConfig::parse(
            r#"
            [scoring.personas.analyst.weights]
            coal_love = 1.0
            "#,
        );
        assert!(result.is_err());
        assert_eq!(Dimension::ALL.len(), 7);
    }

    #[test]
    fn embedding_model_is_selectable() {
        let config = FviConfig::parse(
            r#"
            [embedding]
            model = "onnx"
            model_dir = "models/minilm"
            "#,
        )
        .unwrap();
        assert_eq!(config.embedding.model, EmbeddingModel::Onnx);
        assert_eq!(config.embedding.model_dir, PathBuf::from("models/minilm"));
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(FviConfig::default().embedding.model, EmbeddingModel::Hashing);
        assert!(FviConfig::parse("[embedding]\nmodel = \"word2vec\"").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(FviConfig::load(Some(Path::new("/nonexistent/fvi.toml"))).is_err());
    }
}
