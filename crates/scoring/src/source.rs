use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, ScoringError};

/// Where a reload reads its records from
#[derive(Debug, Clone)]
pub enum ScoreSource {
    /// Records already in memory
    Records(Vec<RawScoreRecord>),
    /// One JSON file holding an array of long or wide rows
    JsonFile(PathBuf),
    /// `<dir>/<dimension>/*.json`; the sub-directory names the dimension for
    /// rows that do not carry one. Top-level `*.json` files are read as-is.
    Directory(PathBuf),
}

impl ScoreSource {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Records(records) => format!("{} inline records", records.len()),
            Self::JsonFile(path) => format!("file {}", path.display()),
            Self::Directory(path) => format!("directory {}", path.display()),
        }
    }
}

/// One unvalidated record as it appears in a source
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawScoreRecord {
    #[serde(alias = "country", alias = "country_name")]
    pub entity: String,
    #[serde(default)]
    pub dimension: Option<String>,
    pub value: f64,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub source: Option<String>,
}

impl RawScoreRecord {
    pub fn new(entity: &str, dimension: &str, value: f64, year: i32) -> Self {
        Self {
            entity: entity.to_string(),
            dimension: Some(dimension.to_string()),
            value,
            year,
            source: None,
        }
    }
}

/// Record flattened out of a source, tagged with where it came from
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceRecord {
    pub entity: String,
    pub dimension: Option<String>,
    pub value: f64,
    pub year: i32,
    pub provenance: String,
}

/// A wide row carries one numeric column per dimension.
#[derive(Debug, Deserialize)]
struct WideRow {
    #[serde(alias = "country", alias = "country_name")]
    entity: String,
    #[serde(default)]
    year: i32,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    columns: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceRow {
    Long(RawScoreRecord),
    Wide(WideRow),
}

/// Columns of wide rows that are identifiers rather than dimension values.
const NON_DIMENSION_COLUMNS: &[&str] = &["country_code", "iso3", "code", "rank", "fvi"];

pub(crate) fn read_source(source: &ScoreSource) -> Result<Vec<SourceRecord>> {
    match source {
        ScoreSource::Records(records) => Ok(records
            .iter()
            .map(|r| from_long(r.clone(), None, "inline"))
            .collect()),
        ScoreSource::JsonFile(path) => read_json_file(path, None),
        ScoreSource::Directory(dir) => read_directory(dir),
    }
}

fn read_directory(dir: &Path) -> Result<Vec<SourceRecord>> {
    if !dir.is_dir() {
        return Err(ScoringError::source_unreadable(
            dir.display().to_string(),
            "not a directory",
        ));
    }

    let mut out = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| ScoringError::source_unreadable(dir.display().to_string(), e))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let hint = if entry.depth() == 2 {
            path.parent()
                .and_then(Path::file_name)
                .and_then(|name| name.to_str())
                .map(ToString::to_string)
        } else {
            None
        };
        out.extend(read_json_file(path, hint.as_deref())?);
    }

    log::debug!("Read {} records from {}", out.len(), dir.display());
    Ok(out)
}

fn read_json_file(path: &Path, dimension_hint: Option<&str>) -> Result<Vec<SourceRecord>> {
    let bytes = std::fs::read(path)
        .map_err(|e| ScoringError::source_unreadable(path.display().to_string(), e))?;
    let rows: Vec<SourceRow> = serde_json::from_slice(&bytes)
        .map_err(|e| ScoringError::source_unreadable(path.display().to_string(), e))?;
    let provenance = path.display().to_string();

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            SourceRow::Long(record) => out.push(from_long(record, dimension_hint, &provenance)),
            SourceRow::Wide(row) => out.extend(from_wide(row, &provenance)),
        }
    }
    Ok(out)
}

fn from_long(record: RawScoreRecord, hint: Option<&str>, provenance: &str) -> SourceRecord {
    SourceRecord {
        entity: record.entity,
        dimension: record.dimension.or_else(|| hint.map(ToString::to_string)),
        value: record.value,
        year: record.year,
        provenance: record.source.unwrap_or_else(|| provenance.to_string()),
    }
}

fn from_wide(row: WideRow, provenance: &str) -> Vec<SourceRecord> {
    let provenance = row.source.unwrap_or_else(|| provenance.to_string());
    row.columns
        .into_iter()
        .filter(|(column, _)| !NON_DIMENSION_COLUMNS.contains(&column.to_ascii_lowercase().as_str()))
        .filter_map(|(column, value)| {
            value.as_f64().map(|value| SourceRecord {
                entity: row.entity.clone(),
                dimension: Some(column),
                value,
                year: row.year,
                provenance: provenance.clone(),
            })
        })
        .collect()
}
