use serde::{Deserialize, Serialize};

/// Default sliding-window length in grapheme clusters
pub const DEFAULT_WINDOW_CHARS: usize = 1000;

/// Default overlap between consecutive windows
pub const DEFAULT_OVERLAP_CHARS: usize = 200;

/// Chunks shorter than this after trimming are dropped
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 50;

/// Configuration for sliding-window chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Window length (hard limit per chunk)
    pub window_chars: usize,

    /// Characters shared by consecutive windows
    pub overlap_chars: usize,

    /// Minimum chunk length kept after trimming
    pub min_chunk_chars: usize,

    /// Prefer ending a window on whitespace when one falls in its last quarter
    pub break_on_whitespace: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_chars: DEFAULT_WINDOW_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
            break_on_whitespace: true,
        }
    }
}

impl ChunkerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.window_chars == 0 {
            return Err("window_chars must be > 0".to_string());
        }

        if self.overlap_chars >= self.window_chars {
            return Err(format!(
                "overlap_chars ({}) must be smaller than window_chars ({})",
                self.overlap_chars, self.window_chars
            ));
        }

        if self.min_chunk_chars > self.window_chars {
            return Err(format!(
                "min_chunk_chars ({}) cannot exceed window_chars ({})",
                self.min_chunk_chars, self.window_chars
            ));
        }

        Ok(())
    }
}
