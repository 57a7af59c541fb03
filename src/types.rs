//! Core types for the Ethograph pipeline
//!
//! This module defines the data structures produced by record normalization:
//! per-entity trajectories, standalone feature tables, and behavior score pairs.

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::table::FrameTable;

/// Identifier of one tracked entity. Ids are 1-based and contiguous within an
/// experiment; they are assigned from array position in the trajectory record
/// and never created elsewhere.
pub type EntityId = u32;

/// Sex of a tracked entity, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Parse a tracker sex label (`"m"` / `"f"`); anything else is unknown
    pub fn from_label(label: &str) -> Option<Sex> {
        match label {
            "m" => Some(Sex::Male),
            "f" => Some(Sex::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "m",
            Sex::Female => "f",
        }
    }
}

/// One per-frame attribute sequence of a trajectory.
///
/// Most tracker attributes are numeric; `sex` is the one textual sequence in
/// practice, so both kinds are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeColumn {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl AttributeColumn {
    pub fn len(&self) -> usize {
        match self {
            AttributeColumn::Numeric(v) => v.len(),
            AttributeColumn::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered per-frame attribute table for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTrajectory {
    /// 1-based entity id (array position + 1 in the raw record)
    pub id: EntityId,
    /// Track length in frames
    pub frames: usize,
    /// Attribute sequences in raw record order
    attributes: Vec<(String, AttributeColumn)>,
}

impl EntityTrajectory {
    pub(crate) fn new(
        id: EntityId,
        frames: usize,
        attributes: Vec<(String, AttributeColumn)>,
    ) -> Self {
        Self {
            id,
            frames,
            attributes,
        }
    }

    /// Attribute names in raw record order
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeColumn> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col)
    }

    /// Numeric attribute sequence, if present and numeric
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match self.attribute(name) {
            Some(AttributeColumn::Numeric(values)) => Some(values),
            _ => None,
        }
    }

    /// Text attribute sequence, if present and textual
    pub fn text(&self, name: &str) -> Option<&[String]> {
        match self.attribute(name) {
            Some(AttributeColumn::Text(values)) => Some(values),
            _ => None,
        }
    }
}

/// Canonical output of normalizing a trajectory record: one table per entity,
/// ids forming a contiguous 1..N range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub entities: Vec<EntityTrajectory>,
}

impl TrajectoryRecord {
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Track length of the first entity; all entities in one experiment share it
    pub fn frame_count(&self) -> Option<usize> {
        self.entities.first().map(|e| e.frames)
    }

    /// Extract per-frame attribute columns across all entities.
    ///
    /// For each requested attribute and each entity the column is keyed
    /// `<attribute>_<entityId>`; multiple attributes are concatenated as
    /// distinct columns in the same table, all aligned by frame index.
    ///
    /// Fails with `MalformedRecord` when an attribute is missing, non-numeric,
    /// or entity track lengths disagree.
    pub fn extract_attributes(&self, names: &[&str]) -> Result<FrameTable, ExtractError> {
        let mut table = FrameTable::new();
        for name in names {
            for entity in &self.entities {
                let values = entity.numeric(name).ok_or_else(|| {
                    ExtractError::malformed(format!(
                        "entity {} has no numeric attribute '{name}'",
                        entity.id
                    ))
                })?;
                table.push_column(format!("{name}_{}", entity.id), values.to_vec())?;
            }
        }
        Ok(table)
    }
}

/// Canonical output of normalizing a standalone per-frame feature record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Feature name derived from the record's source name
    pub name: String,
    /// Per-entity sequences; columns keyed by entity id
    pub table: FrameTable,
}

/// Canonical output of normalizing a behavior classifier score record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorScoreRecord {
    /// Behavior name derived from the record's source name
    pub behavior: String,
    /// Raw classifier scores, columns keyed by entity id
    pub scores: FrameTable,
    /// Thresholded/smoothed scores, columns keyed by entity id
    pub processed: FrameTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_labels_round_trip() {
        assert_eq!(Sex::from_label("m"), Some(Sex::Male));
        assert_eq!(Sex::from_label("f"), Some(Sex::Female));
        assert_eq!(Sex::from_label("x"), None);
        assert_eq!(Sex::Male.as_str(), "m");
    }

    #[test]
    fn trajectory_accessors() {
        let entity = EntityTrajectory::new(
            1,
            3,
            vec![
                ("x".to_string(), AttributeColumn::Numeric(vec![1.0, 2.0, 3.0])),
                (
                    "sex".to_string(),
                    AttributeColumn::Text(vec!["m".into(), "m".into(), "m".into()]),
                ),
            ],
        );

        assert_eq!(entity.numeric("x"), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(entity.numeric("sex"), None);
        assert_eq!(entity.text("sex").map(|s| s.len()), Some(3));
        assert_eq!(
            entity.attribute_names().collect::<Vec<_>>(),
            vec!["x", "sex"]
        );
    }
}
