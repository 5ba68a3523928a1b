use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::aliases::EntityAliases;
use crate::dimension::Dimension;
use crate::error::{Result, ScoringError};
use crate::source::{read_source, ScoreSource, SourceRecord};
use crate::types::{DimensionScore, EntityId};

/// Below this share of dimensions with any data, a reload is logged as degraded.
pub const MIN_DIMENSION_COVERAGE: f64 = 0.6;

/// Immutable score table; readers hold an `Arc` to the version they started with.
#[derive(Debug, Default)]
pub struct ScoreTable {
    generation: u64,
    entities: BTreeMap<EntityId, BTreeMap<Dimension, BTreeMap<i32, DimensionScore>>>,
}

impl ScoreTable {
    /// Reload counter: 0 for the empty initial table, +1 per successful reload.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn contains_entity(&self, entity: &EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    /// Most recent year's record for the pair.
    #[must_use]
    pub fn latest(&self, entity: &EntityId, dimension: Dimension) -> Option<&DimensionScore> {
        self.entities
            .get(entity)?
            .get(&dimension)?
            .last_key_value()
            .map(|(_, score)| score)
    }

    /// Most recent record per dimension for one entity.
    #[must_use]
    pub fn records_for(&self, entity: &EntityId) -> BTreeMap<Dimension, &DimensionScore> {
        self.entities
            .get(entity)
            .map(|dims| {
                dims.iter()
                    .filter_map(|(dim, years)| years.last_key_value().map(|(_, s)| (*dim, s)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    /// Number of stored records across all years.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// A record rejected during a reload. The reload itself continues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    OutOfRange {
        index: usize,
        entity: String,
        dimension: Dimension,
        value: f64,
    },
    NonFinite {
        index: usize,
        entity: String,
    },
    UnknownDimension {
        index: usize,
        entity: String,
        dimension: String,
    },
    UnresolvedEntity {
        index: usize,
        entity: String,
    },
    DuplicateRecord {
        index: usize,
        entity: EntityId,
        dimension: Dimension,
        year: i32,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                index,
                entity,
                dimension,
                value,
            } => write!(f, "#{index}: {entity}/{dimension} value {value} outside [0, 100]"),
            Self::NonFinite { index, entity } => write!(f, "#{index}: {entity} value is not finite"),
            Self::UnknownDimension {
                index,
                entity,
                dimension,
            } => write!(f, "#{index}: {entity} has unknown dimension '{dimension}'"),
            Self::UnresolvedEntity { index, entity } => {
                write!(f, "#{index}: entity '{entity}' not in alias table")
            }
            Self::DuplicateRecord {
                index,
                entity,
                dimension,
                year,
            } => write!(f, "#{index}: duplicate {entity}/{dimension}/{year}"),
        }
    }
}

/// Batch summary of one reload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub generation: u64,
    pub accepted: usize,
    pub issues: Vec<ValidationIssue>,
    pub entities: usize,
    /// Entities with at least one record, per dimension
    pub coverage: BTreeMap<Dimension, usize>,
}

impl LoadReport {
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Share of dimensions with data for at least one entity.
    #[must_use]
    pub fn coverage_ratio(&self) -> f64 {
        let covered = Dimension::ALL
            .iter()
            .filter(|dim| self.coverage.get(dim).copied().unwrap_or(0) > 0)
            .count();
        covered as f64 / Dimension::ALL.len() as f64
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: generation {} | accepted {} | skipped {} | entities {} | coverage {:.0}%",
            self.source,
            self.generation,
            self.accepted,
            self.skipped(),
            self.entities,
            self.coverage_ratio() * 100.0
        )
    }
}

/// Sole owner and writer of dimension scores.
///
/// Reads go through an `Arc` snapshot and never block on a reload; reloads
/// are serialized with each other and publish the new table in one swap.
pub struct DimensionScoreStore {
    current: RwLock<Arc<ScoreTable>>,
    reload_lock: Mutex<()>,
    aliases: EntityAliases,
}

impl DimensionScoreStore {
    /// Empty store (generation 0).
    #[must_use]
    pub fn new(aliases: EntityAliases) -> Self {
        Self {
            current: RwLock::new(Arc::new(ScoreTable::default())),
            reload_lock: Mutex::new(()),
            aliases,
        }
    }

    /// Construct and perform the first reload.
    pub fn load(source: &ScoreSource, aliases: EntityAliases) -> Result<(Self, LoadReport)> {
        let store = Self::new(aliases);
        let report = store.reload(source)?;
        Ok((store, report))
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<ScoreTable> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    #[must_use]
    pub const fn aliases(&self) -> &EntityAliases {
        &self.aliases
    }

    /// Latest-year value for the pair.
    ///
    /// An entity absent from the table is `UnknownEntity`; a known entity
    /// without the dimension is `NotFound`. Imputation is the aggregator's call.
    pub fn get(&self, entity: &EntityId, dimension: Dimension) -> Result<f64> {
        let table = self.snapshot();
        if !table.contains_entity(entity) {
            return Err(ScoringError::UnknownEntity(entity.to_string()));
        }
        table
            .latest(entity, dimension)
            .map(|score| score.value)
            .ok_or_else(|| ScoringError::NotFound {
                entity: entity.to_string(),
                dimension,
            })
    }

    #[must_use]
    pub fn list_entities(&self) -> BTreeSet<EntityId> {
        self.snapshot().entities().cloned().collect()
    }

    /// Replace the whole table from `source`.
    ///
    /// Bad records are skipped and listed in the report. If the source cannot
    /// be read at all the previous table stays active and the error is returned.
    pub fn reload(&self, source: &ScoreSource) -> Result<LoadReport> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let records = read_source(source)?;
        let generation = self.snapshot().generation() + 1;
        let (table, report) = self.build_table(source.describe(), generation, records);

        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Arc::new(table);
        }

        if report.is_clean() {
            log::info!("Score store reloaded: {}", report.summary());
        } else {
            log::warn!("Score store reloaded with skipped records: {}", report.summary());
        }
        if report.coverage_ratio() < MIN_DIMENSION_COVERAGE {
            log::warn!(
                "Dimension coverage {:.0}% below {:.0}%",
                report.coverage_ratio() * 100.0,
                MIN_DIMENSION_COVERAGE * 100.0
            );
        }
        Ok(report)
    }

    fn build_table(
        &self,
        source: String,
        generation: u64,
        records: Vec<SourceRecord>,
    ) -> (ScoreTable, LoadReport) {
        let mut entities: BTreeMap<EntityId, BTreeMap<Dimension, BTreeMap<i32, DimensionScore>>> =
            BTreeMap::new();
        let mut issues = Vec::new();
        let mut accepted = 0usize;

        for (index, record) in records.into_iter().enumerate() {
            match self.validate(index, record) {
                Ok(score) => {
                    let years = entities
                        .entry(score.entity_id.clone())
                        .or_default()
                        .entry(score.dimension)
                        .or_default();
                    match years.entry(score.year) {
                        Entry::Vacant(slot) => {
                            slot.insert(score);
                            accepted += 1;
                        }
                        Entry::Occupied(_) => issues.push(ValidationIssue::DuplicateRecord {
                            index,
                            entity: score.entity_id,
                            dimension: score.dimension,
                            year: score.year,
                        }),
                    }
                }
                Err(issue) => {
                    log::debug!("Skipping score record {issue}");
                    issues.push(issue);
                }
            }
        }

        let mut coverage = BTreeMap::new();
        for dims in entities.values() {
            for dim in dims.keys() {
                *coverage.entry(*dim).or_insert(0usize) += 1;
            }
        }

        let report = LoadReport {
            source,
            generation,
            accepted,
            issues,
            entities: entities.len(),
            coverage,
        };
        (
            ScoreTable {
                generation,
                entities,
            },
            report,
        )
    }

    fn validate(
        &self,
        index: usize,
        record: SourceRecord,
    ) -> std::result::Result<DimensionScore, ValidationIssue> {
        let raw_dimension = record.dimension.unwrap_or_default();
        let Ok(dimension) = raw_dimension.parse::<Dimension>() else {
            return Err(ValidationIssue::UnknownDimension {
                index,
                entity: record.entity,
                dimension: raw_dimension,
            });
        };
        if !record.value.is_finite() {
            return Err(ValidationIssue::NonFinite {
                index,
                entity: record.entity,
            });
        }
        if !(0.0..=100.0).contains(&record.value) {
            return Err(ValidationIssue::OutOfRange {
                index,
                entity: record.entity,
                dimension,
                value: record.value,
            });
        }
        let Some(entity_id) = self.aliases.resolve(&record.entity) else {
            return Err(ValidationIssue::UnresolvedEntity {
                index,
                entity: record.entity,
            });
        };

        Ok(DimensionScore {
            entity_id,
            dimension,
            value: record.value,
            year: record.year,
            source_provenance: record.provenance,
        })
    }
}
