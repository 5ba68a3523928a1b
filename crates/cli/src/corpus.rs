use anyhow::{Context, Result};
use fvi_scoring::EntityAliases;
use fvi_vector_store::{Category, RawDocument};
use std::path::Path;
use walkdir::WalkDir;

const CORPUS_EXTENSIONS: &[&str] = &["txt", "md"];

/// Read every `.txt` / `.md` file under `root` in path order.
///
/// A directory named after a category (`policy_regulatory/`) pins that
/// category; a directory naming a known entity (`India/`, `IND/`) tags the
/// document with it. Empty files are skipped.
pub fn load_corpus(root: &Path, aliases: &EntityAliases) -> Result<Vec<RawDocument>> {
    if !root.is_dir() {
        anyhow::bail!("Knowledge corpus directory not found: {}", root.display());
    }

    let mut docs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !has_corpus_extension(path) {
            continue;
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if text.trim().is_empty() {
            log::warn!("Skipping empty corpus file {}", path.display());
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let source: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let mut doc = RawDocument::new(source.join("/"), text);
        for dir in &source[..source.len().saturating_sub(1)] {
            if let Ok(category) = dir.parse::<Category>() {
                doc = doc.with_category(category);
            } else if let Some(entity) = aliases.resolve(dir) {
                doc = doc.with_entity(entity.as_str());
            }
        }
        docs.push(doc);
    }

    log::info!("Loaded {} corpus documents from {}", docs.len(), root.display());
    Ok(docs)
}

fn has_corpus_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CORPUS_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
