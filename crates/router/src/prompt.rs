use fvi_fusion::ContextBundle;
use std::fmt::Write as _;

pub const SYSTEM_PROMPT: &str = "You are the FVI assistant for coal-industry assessment.\n\
Be concise, structured, and data-grounded. Use the provided CONTEXT faithfully.\n\
If something is missing or uncertain, say so explicitly. Tailor tone slightly to the persona.\n";

/// Messages handed to a generative backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    #[must_use]
    pub fn from_bundle(bundle: &ContextBundle) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Persona: {}\n\nUser Question:\n{}\n\nCONTEXT (FVI + retrieved docs):\n{}",
                bundle.persona,
                bundle.query,
                render_context(bundle)
            ),
        }
    }
}

/// Plain-text rendering of a bundle: score summary first, then passages
/// grouped by category.
#[must_use]
pub fn render_context(bundle: &ContextBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PERSONA: {}", bundle.persona.as_str().to_uppercase());

    match &bundle.live_score_snapshot {
        Some(snapshot) => {
            let composite = &snapshot.composite;
            let _ = writeln!(
                out,
                "\nFVI SCORE for {} (lower = more viable): {:.2} | recommendation {} | viability {}",
                composite.entity_id, composite.value, snapshot.recommendation, snapshot.viability
            );
            let _ = writeln!(out, "Contributions:");
            for (dimension, c) in &composite.contributions {
                let _ = write!(
                    out,
                    "  {dimension}: raw={:.2}, weight={:.2}%",
                    c.raw_score,
                    c.weight * 100.0
                );
                if c.imputed {
                    out.push_str(" (imputed)");
                }
                out.push('\n');
            }
        }
        None => out.push_str("\nNo entity-specific FVI data in context.\n"),
    }

    if bundle.ranked_passages.is_empty() {
        out.push_str("\nNo relevant knowledge-base passages.\n");
        return out;
    }
    for (category, indices) in &bundle.categories {
        let _ = writeln!(out, "\n[{}]", category.label());
        for passage in indices.iter().filter_map(|i| bundle.ranked_passages.get(*i)) {
            let _ = writeln!(
                out,
                "- ({:.2}, {}) {}",
                passage.relevance, passage.chunk.source_document, passage.chunk.text
            );
        }
    }
    if bundle.is_truncated() {
        out.push_str("\n(context truncated to fit the character budget)\n");
    }
    out
}
