use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Passages requested from the index per query
pub const DEFAULT_TOP_K: usize = 5;

/// Minimum cosine similarity for a passage to qualify
pub const DEFAULT_MIN_RELEVANCE: f32 = 0.35;

/// Passages at or above this similarity to a better one are duplicates
pub const DEFAULT_DUPLICATE_SIMILARITY: f32 = 0.95;

/// Cap on the total passage text of one bundle
pub const DEFAULT_MAX_CHARS: usize = 12_000;

/// A truncated tail passage shorter than this is dropped instead
pub const MIN_TRUNCATED_PASSAGE_CHARS: usize = 50;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Retrieval and bundling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub top_k: usize,
    pub min_relevance: f32,
    pub duplicate_similarity: f32,
    pub max_chars: usize,
    /// Deadline applied by callers that use the timeout wrapper
    pub timeout_ms: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_relevance: DEFAULT_MIN_RELEVANCE,
            duplicate_similarity: DEFAULT_DUPLICATE_SIMILARITY,
            max_chars: DEFAULT_MAX_CHARS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }
        if !(-1.0..=1.0).contains(&self.min_relevance) {
            return Err(format!(
                "min_relevance ({}) must be a cosine similarity in [-1, 1]",
                self.min_relevance
            ));
        }
        if !(self.min_relevance..=1.0).contains(&self.duplicate_similarity) {
            return Err(format!(
                "duplicate_similarity ({}) must lie between min_relevance ({}) and 1",
                self.duplicate_similarity, self.min_relevance
            ));
        }
        if self.max_chars == 0 {
            return Err("max_chars must be > 0".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(FusionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = FusionConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.top_k = 5;
        config.duplicate_similarity = 0.2;
        assert!(config.validate().is_err());

        config.duplicate_similarity = 0.95;
        config.max_chars = 0;
        assert!(config.validate().is_err());
    }
}
