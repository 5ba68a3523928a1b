use serde::{Deserialize, Serialize};

use crate::category::Category;

/// A knowledge-base document before chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Stable source name; chunk ids are derived from it
    pub source_document: String,

    pub text: String,

    /// Fixed category for every chunk of this document (keyword tagging otherwise)
    #[serde(default)]
    pub category: Option<Category>,

    /// Entities this document is about; empty for general knowledge
    #[serde(default)]
    pub entity_tags: Vec<String>,
}

impl RawDocument {
    pub fn new(source_document: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_document: source_document.into(),
            text: text.into(),
            category: None,
            entity_tags: Vec::new(),
        }
    }

    /// Builder: pin the category
    #[must_use]
    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Builder: tag with an entity
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity_tags.push(entity.into());
        self
    }
}

/// A window of knowledge-base text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// `{source_document}#{ordinal}`
    pub chunk_id: String,

    pub text: String,

    pub category: Category,

    pub source_document: String,

    #[serde(default)]
    pub entity_tags: Vec<String>,

    /// Position within the source document (0-based)
    pub ordinal: usize,

    /// Offset of the window in grapheme clusters
    pub start_char: usize,
}

impl KnowledgeChunk {
    #[must_use]
    pub fn chunk_id_for(source_document: &str, ordinal: usize) -> String {
        format!("{source_document}#{ordinal}")
    }

    /// Length in `char`s
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// True when the chunk carries no entity tag (general knowledge).
    #[must_use]
    pub fn is_general(&self) -> bool {
        self.entity_tags.is_empty()
    }

    /// Case-insensitive entity tag check.
    #[must_use]
    pub fn is_tagged(&self, entity: &str) -> bool {
        self.entity_tags
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(entity))
    }
}
