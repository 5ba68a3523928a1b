use unicode_segmentation::UnicodeSegmentation;

use crate::category::Category;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::types::{KnowledgeChunk, RawDocument};

/// Sliding-window chunker for knowledge-base documents
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self { config })
    }

    /// Chunk a single document.
    ///
    /// Windows are measured in grapheme clusters so no cluster is ever split.
    /// Output is a pure function of the document and the configuration.
    pub fn chunk_document(&self, doc: &RawDocument) -> Result<Vec<KnowledgeChunk>> {
        if doc.text.trim().is_empty() {
            return Err(ChunkerError::EmptyContent(doc.source_document.clone()));
        }

        let graphemes: Vec<&str> = doc.text.graphemes(true).collect();
        let total = graphemes.len();
        let window = self.config.window_chars;
        let overlap = self.config.overlap_chars;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < total {
            let mut end = (start + window).min(total);
            if end < total && self.config.break_on_whitespace {
                end = Self::whitespace_break(&graphemes, start, end, window);
            }

            let text = graphemes[start..end].concat();
            let trimmed = text.trim();
            if trimmed.chars().count() >= self.config.min_chunk_chars {
                let ordinal = chunks.len();
                chunks.push(KnowledgeChunk {
                    chunk_id: KnowledgeChunk::chunk_id_for(&doc.source_document, ordinal),
                    text: trimmed.to_string(),
                    category: doc
                        .category
                        .unwrap_or_else(|| Category::classify(trimmed, &doc.entity_tags)),
                    source_document: doc.source_document.clone(),
                    entity_tags: doc.entity_tags.clone(),
                    ordinal,
                    start_char: start,
                });
            }

            if end == total {
                break;
            }
            let mut next = end.saturating_sub(overlap).max(start + 1);
            if self.config.break_on_whitespace {
                next = Self::align_to_word(&graphemes, next, end);
            }
            start = next;
        }

        log::debug!(
            "Chunked {} ({} graphemes) into {} chunks",
            doc.source_document,
            total,
            chunks.len()
        );
        Ok(chunks)
    }

    /// Chunk every document in order. Empty documents are skipped.
    pub fn chunk_corpus(&self, docs: &[RawDocument]) -> Vec<KnowledgeChunk> {
        let mut out = Vec::new();
        for doc in docs {
            match self.chunk_document(doc) {
                Ok(chunks) => out.extend(chunks),
                Err(e) => log::warn!("Skipping document: {e}"),
            }
        }
        out
    }

    /// Pull `end` back to just after the last whitespace in the window's
    /// final quarter, if there is one.
    fn whitespace_break(graphemes: &[&str], start: usize, end: usize, window: usize) -> usize {
        let floor = start + window - window / 4;
        (floor.max(start + 1)..end)
            .rev()
            .find(|&i| graphemes[i].chars().all(char::is_whitespace))
            .map_or(end, |i| i + 1)
    }

    /// Move a window start forward past a partial word, staying before `end`.
    fn align_to_word(graphemes: &[&str], start: usize, end: usize) -> usize {
        let is_ws = |g: &str| g.chars().all(char::is_whitespace);
        if start == 0 || is_ws(graphemes[start - 1]) {
            return start;
        }
        (start..end)
            .find(|&i| is_ws(graphemes[i]))
            .map_or(start, |i| i + 1)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{i:04}")).collect::<Vec<_>>().join(" ")
    }

    fn small_config() -> ChunkerConfig {
        ChunkerConfig {
            window_chars: 100,
            overlap_chars: 20,
            min_chunk_chars: 10,
            break_on_whitespace: false,
        }
    }

    #[test]
    fn test_chunk_short_document_is_single_chunk() {
        let doc = RawDocument::new("notes.txt", "Coal mining employs many people in the region today.");
        let chunks = Chunker::default().chunk_document(&doc).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "notes.txt#0");
        assert_eq!(chunks[0].category, Category::IndustryOverview);
    }

    #[test]
    fn test_chunk_empty_content() {
        let doc = RawDocument::new("empty.txt", "   \n ");
        assert!(matches!(
            Chunker::default().chunk_document(&doc),
            Err(ChunkerError::EmptyContent(_))
        ));
    }

    #[test]
    fn test_windows_overlap_by_configured_amount() {
        let chunker = Chunker::new(small_config()).unwrap();
        let text: String = "abcdefghij".repeat(25);
        let chunks = chunker
            .chunk_document(&RawDocument::new("letters", text.clone()))
            .unwrap();

        let starts: Vec<usize> = chunks.iter().map(|c| c.start_char).collect();
        assert_eq!(starts, vec![0, 80, 160]);
        assert_eq!(chunks[0].text.len(), 100);
        // last 20 of window 0 open window 1
        assert_eq!(&chunks[0].text[80..], &chunks[1].text[..20]);
        assert_eq!(chunks[2].text, text[160..]);
    }

    #[test]
    fn test_short_tail_chunks_are_dropped() {
        let chunker = Chunker::new(small_config()).unwrap();
        // windows start at 0, 80 and 160; the last one holds 25 chars
        let text: String = "x".repeat(185);
        let chunks = chunker.chunk_document(&RawDocument::new("xs", text)).unwrap();
        assert_eq!(chunks.len(), 3);

        let config = ChunkerConfig {
            min_chunk_chars: 100,
            ..small_config()
        };
        let chunks = Chunker::new(config)
            .unwrap()
            .chunk_document(&RawDocument::new("xs", "x".repeat(185)))
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].start_char, 80);
    }

    #[test]
    fn test_whitespace_break_keeps_words_whole() {
        let config = ChunkerConfig {
            break_on_whitespace: true,
            ..small_config()
        };
        let chunker = Chunker::new(config).unwrap();
        let chunks = chunker
            .chunk_document(&RawDocument::new("words", words(60)))
            .unwrap();
        for chunk in &chunks {
            for token in chunk.text.split_whitespace() {
                assert_eq!(token.len(), 8, "split word {token:?} in {}", chunk.chunk_id);
            }
        }
    }

    #[test]
    fn test_multibyte_text_is_never_split_mid_cluster() {
        let chunker = Chunker::new(small_config()).unwrap();
        let text = "é🇮🇳ü".repeat(80);
        let chunks = chunker.chunk_document(&RawDocument::new("flags", text)).unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.graphemes(true).all(|g| g == "é" || g == "🇮🇳" || g == "ü"));
        }
    }

    #[test]
    fn test_document_category_and_tags_are_inherited() {
        let doc = RawDocument::new("india_profile", words(40))
            .with_category(Category::Assessment)
            .with_entity("India");
        let chunks = Chunker::default().chunk_document(&doc).unwrap();
        assert!(chunks.iter().all(|c| c.category == Category::Assessment));
        assert!(chunks.iter().all(|c| c.is_tagged("india")));
    }

    #[test]
    fn test_corpus_skips_empty_documents() {
        let docs = vec![
            RawDocument::new("a", words(20)),
            RawDocument::new("b", ""),
            RawDocument::new("c", words(20)),
        ];
        let chunks = Chunker::default().chunk_corpus(&docs);
        let sources: Vec<&str> = chunks.iter().map(|c| c.source_document.as_str()).collect();
        assert_eq!(sources, vec!["a", "c"]);
    }
}
