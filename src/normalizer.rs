//! Record normalization
//!
//! A raw tracker record is a decoded nested structure (dict of arrays of
//! dicts) whose shape is discriminated by key presence, not by an explicit
//! type tag. This module is the single point where that heterogeneity is
//! resolved: every record is classified exactly once into one of three
//! canonical shapes, and downstream code only ever sees per-entity,
//! per-frame tables.
//!
//! Shapes:
//! - `trx` key → per-entity trajectory tables
//! - `allScores` key → raw/processed behavior score pair
//! - `data` key → one standalone per-frame feature
//!
//! Anything else is a malformed record.

use serde_json::Value;

use crate::error::ExtractError;
use crate::table::FrameTable;
use crate::types::{
    AttributeColumn, BehaviorScoreRecord, EntityId, EntityTrajectory, FeatureRecord,
    TrajectoryRecord,
};

/// Key marking a trajectory record
pub const TRAJECTORY_KEY: &str = "trx";
/// Key marking a behavior score record
pub const SCORES_KEY: &str = "allScores";
/// Key marking a standalone feature record
pub const FEATURE_KEY: &str = "data";

/// Raw score field inside an `allScores` record
const SCORES_FIELD: &str = "scores";
/// Processed score field inside an `allScores` record
const POSTPROCESSED_FIELD: &str = "postprocessed";

/// Filename prefix carried by behavior score records
const SCORES_NAME_PREFIX: &str = "scores_";

/// Source-name suffixes recognized when deriving feature and behavior names
const RECOGNIZED_SUFFIXES: [&str; 2] = [".mat", ".json"];

/// Canonical result of normalizing one raw record.
///
/// The variant is decided once, at normalization time; records are never
/// re-classified.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Trajectory(TrajectoryRecord),
    Feature(FeatureRecord),
    BehaviorScores(BehaviorScoreRecord),
}

impl NormalizedRecord {
    /// Shape name for reporting
    pub fn shape(&self) -> &'static str {
        match self {
            NormalizedRecord::Trajectory(_) => "trajectory",
            NormalizedRecord::Feature(_) => "feature",
            NormalizedRecord::BehaviorScores(_) => "behavior_scores",
        }
    }

    /// Extract per-frame attribute columns from a trajectory record.
    ///
    /// For each requested attribute and each entity the column is keyed
    /// `<attribute>_<entityId>`; multiple attributes are concatenated as
    /// distinct columns in the same table, all aligned by frame index.
    /// The operation is pure and idempotent.
    ///
    /// Fails with `UnsupportedOperation` on a non-trajectory variant and with
    /// `MalformedRecord` when an attribute is missing, non-numeric, or entity
    /// track lengths disagree.
    pub fn extract_attributes(&self, names: &[&str]) -> Result<FrameTable, ExtractError> {
        match self {
            NormalizedRecord::Trajectory(t) => t.extract_attributes(names),
            other => Err(ExtractError::unsupported(format!(
                "attribute extraction requires a trajectory record, got {}",
                other.shape()
            ))),
        }
    }
}

/// Normalizer turning raw nested records into canonical shapes
pub struct RecordNormalizer;

impl RecordNormalizer {
    /// Normalize a raw record from its JSON text.
    ///
    /// `source_name` is the record's identifying string (typically the path of
    /// the file it was decoded from); feature and behavior names are derived
    /// from it.
    pub fn normalize_json(raw: &str, source_name: &str) -> Result<NormalizedRecord, ExtractError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::normalize(&value, source_name)
    }

    /// Normalize an already-decoded raw record
    pub fn normalize(value: &Value, source_name: &str) -> Result<NormalizedRecord, ExtractError> {
        let map = value.as_object().ok_or_else(|| {
            ExtractError::malformed("raw record is not a mapping".to_string())
        })?;

        if let Some(trx) = map.get(TRAJECTORY_KEY) {
            parse_trajectory(trx).map(NormalizedRecord::Trajectory)
        } else if let Some(all_scores) = map.get(SCORES_KEY) {
            parse_scores(all_scores, source_name).map(NormalizedRecord::BehaviorScores)
        } else if let Some(data) = map.get(FEATURE_KEY) {
            parse_feature(data, source_name).map(NormalizedRecord::Feature)
        } else {
            Err(ExtractError::malformed(format!(
                "record matches none of the recognized shapes ('{TRAJECTORY_KEY}', \
                 '{SCORES_KEY}', '{FEATURE_KEY}')"
            )))
        }
    }
}

/// Derive a name from a record's source string: path prefix and recognized
/// suffix removed
pub fn source_stem(source: &str) -> &str {
    let base = source.rsplit('/').next().unwrap_or(source);
    for suffix in RECOGNIZED_SUFFIXES {
        if let Some(stem) = base.strip_suffix(suffix) {
            return stem;
        }
    }
    base
}

fn parse_trajectory(trx: &Value) -> Result<TrajectoryRecord, ExtractError> {
    let per_entity = trx.as_array().ok_or_else(|| {
        ExtractError::malformed(format!("'{TRAJECTORY_KEY}' is not an array"))
    })?;

    let mut entities = Vec::with_capacity(per_entity.len());
    for (idx, sub) in per_entity.iter().enumerate() {
        let id = (idx + 1) as EntityId;
        let attrs = sub.as_object().ok_or_else(|| {
            ExtractError::malformed(format!("trajectory entry {id} is not a mapping"))
        })?;

        let mut frames: Option<usize> = None;
        let mut columns = Vec::with_capacity(attrs.len());
        for (name, raw) in attrs {
            let column = parse_attribute(raw, name, id)?;
            match frames {
                None => frames = Some(column.len()),
                Some(expected) if column.len() != expected => {
                    return Err(ExtractError::malformed(format!(
                        "attribute '{name}' of entity {id} has {} frames, expected {expected}",
                        column.len()
                    )));
                }
                Some(_) => {}
            }
            columns.push((name.clone(), column));
        }

        entities.push(EntityTrajectory::new(id, frames.unwrap_or(0), columns));
    }

    Ok(TrajectoryRecord { entities })
}

fn parse_feature(data: &Value, source_name: &str) -> Result<FeatureRecord, ExtractError> {
    let table = entity_table(data, FEATURE_KEY)?;
    Ok(FeatureRecord {
        name: source_stem(source_name).to_string(),
        table,
    })
}

fn parse_scores(all_scores: &Value, source_name: &str) -> Result<BehaviorScoreRecord, ExtractError> {
    let map = all_scores.as_object().ok_or_else(|| {
        ExtractError::malformed(format!("'{SCORES_KEY}' is not a mapping"))
    })?;

    let scores = map.get(SCORES_FIELD).ok_or_else(|| {
        ExtractError::malformed(format!("'{SCORES_KEY}' has no '{SCORES_FIELD}' field"))
    })?;
    let processed = map.get(POSTPROCESSED_FIELD).ok_or_else(|| {
        ExtractError::malformed(format!("'{SCORES_KEY}' has no '{POSTPROCESSED_FIELD}' field"))
    })?;

    let stem = source_stem(source_name);
    let behavior = stem.strip_prefix(SCORES_NAME_PREFIX).unwrap_or(stem);

    Ok(BehaviorScoreRecord {
        behavior: behavior.to_string(),
        scores: entity_table(scores, SCORES_FIELD)?,
        processed: entity_table(processed, POSTPROCESSED_FIELD)?,
    })
}

/// Build an entity-keyed table from an array of per-entity numeric sequences,
/// ids assigned from array position (1-based)
fn entity_table(value: &Value, what: &str) -> Result<FrameTable, ExtractError> {
    let rows = value
        .as_array()
        .ok_or_else(|| ExtractError::malformed(format!("'{what}' is not an array")))?;

    let mut table = FrameTable::new();
    for (idx, sub) in rows.iter().enumerate() {
        let id = idx + 1;
        let seq = sub.as_array().ok_or_else(|| {
            ExtractError::malformed(format!("'{what}' entry {id} is not a sequence"))
        })?;
        let values = seq
            .iter()
            .map(numeric_value)
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| {
                ExtractError::malformed(format!("'{what}' entry {id} contains a non-numeric value"))
            })?;
        table.push_column(id.to_string(), values)?;
    }
    Ok(table)
}

/// Parse one per-frame attribute sequence; numbers and strings are the two
/// recognized element kinds, and a sequence must be homogeneous
fn parse_attribute(raw: &Value, name: &str, id: EntityId) -> Result<AttributeColumn, ExtractError> {
    let seq = raw.as_array().ok_or_else(|| {
        ExtractError::malformed(format!("attribute '{name}' of entity {id} is not a sequence"))
    })?;

    match seq.first() {
        Some(Value::String(_)) => {
            let values = seq
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
                .ok_or_else(|| {
                    ExtractError::malformed(format!(
                        "attribute '{name}' of entity {id} mixes text and non-text values"
                    ))
                })?;
            Ok(AttributeColumn::Text(values))
        }
        _ => {
            let values = seq
                .iter()
                .map(numeric_value)
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|_| {
                    ExtractError::malformed(format!(
                        "attribute '{name}' of entity {id} contains a non-numeric value"
                    ))
                })?;
            Ok(AttributeColumn::Numeric(values))
        }
    }
}

/// Numbers pass through; null stands for NaN (upstream decoders emit null for
/// .mat NaN values)
fn numeric_value(v: &Value) -> Result<f64, ()> {
    match v {
        Value::Number(n) => n.as_f64().ok_or(()),
        Value::Null => Ok(f64::NAN),
        _ => Err(()),
    }
}
