use async_trait::async_trait;
use fvi_fusion::ContextBundle;

use crate::error::Result;
use crate::prompt::Prompt;

/// A generative backend that turns a rendered prompt into answer text.
///
/// Implementations own their transport and retries; failures surface as
/// [`crate::RouterError::Generation`].
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &Prompt, bundle: &ContextBundle) -> Result<String>;
}

/// Offline backend that answers with the score summary and the leading
/// sentence of each passage. Deterministic; used when no model is wired in.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, _prompt: &Prompt, bundle: &ContextBundle) -> Result<String> {
        let mut lines = Vec::new();
        if let Some(snapshot) = &bundle.live_score_snapshot {
            lines.push(format!(
                "{} scores {:.2} for the {} persona (recommendation {}, {} viability).",
                snapshot.composite.entity_id,
                snapshot.composite.value,
                bundle.persona,
                snapshot.recommendation,
                snapshot.viability
            ));
        }
        for passage in &bundle.ranked_passages {
            lines.push(format!(
                "- {} [{}]",
                leading_sentence(&passage.chunk.text),
                passage.chunk.source_document
            ));
        }
        if lines.is_empty() {
            lines.push("No relevant information was found for this question.".to_string());
        }
        Ok(lines.join("\n"))
    }
}

fn leading_sentence(text: &str) -> &str {
    let text = text.trim();
    match text.find(". ") {
        Some(end) => &text[..=end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_sentence_stops_at_first_period() {
        assert_eq!(leading_sentence("One. Two. Three."), "One.");
        assert_eq!(leading_sentence("  No period here "), "No period here");
    }
}
