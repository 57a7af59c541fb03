//! Experiment aggregation
//!
//! An experiment is a set of normalized records sharing one entity population
//! and frame count: one trajectory record plus any number of feature and
//! behavior score records. This module collects them into read-only
//! registries; nothing is registered after construction, so stacking and
//! graph building against the same aggregator can run concurrently.

use std::collections::HashMap;

use crate::error::ExtractError;
use crate::normalizer::NormalizedRecord;
use crate::table::FrameTable;
use crate::types::{EntityId, Sex, TrajectoryRecord};

/// Trajectory attribute used for the sex registry
const SEX_ATTRIBUTE: &str = "sex";

/// Name prefix marking features extracted from the trajectory record
const TRAJECTORY_FEATURE_PREFIX: &str = "trx_";

/// One feature registry entry: the per-entity table plus its provenance.
///
/// Trajectory-derived tables already carry `<attribute>_<entityId>` column
/// names and are never re-prefixed when stacked.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEntry {
    pub table: FrameTable,
    pub from_trajectory: bool,
}

/// Read-only registries built in one pass from an experiment's records
#[derive(Debug, Clone, Default)]
pub struct ExperimentAggregator {
    trajectory: Option<TrajectoryRecord>,
    sexes: HashMap<EntityId, Sex>,
    features: HashMap<String, FeatureEntry>,
    raw_scores: HashMap<String, FrameTable>,
    processed_scores: HashMap<String, FrameTable>,
}

impl ExperimentAggregator {
    /// Aggregate a fixed list of normalized records
    pub fn from_records(records: Vec<NormalizedRecord>) -> Result<Self, ExtractError> {
        Self::with_trajectory_features(records, &[])
    }

    /// Aggregate records and additionally register trajectory attribute
    /// extractions as features.
    ///
    /// Each entry of `extractions` is a set of attribute names; it is
    /// extracted from the trajectory record at build time and registered
    /// under `trx_<names joined by _>`.
    pub fn with_trajectory_features(
        records: Vec<NormalizedRecord>,
        extractions: &[&[&str]],
    ) -> Result<Self, ExtractError> {
        let mut agg = Self::default();

        for record in records {
            match record {
                NormalizedRecord::Trajectory(trajectory) => {
                    if agg.trajectory.is_some() {
                        log::warn!("experiment has more than one trajectory record; keeping the last");
                    }
                    agg.sexes = sex_registry(&trajectory);
                    agg.trajectory = Some(trajectory);
                }
                NormalizedRecord::Feature(feature) => {
                    agg.insert_feature(
                        feature.name,
                        FeatureEntry {
                            table: feature.table,
                            from_trajectory: false,
                        },
                    );
                }
                NormalizedRecord::BehaviorScores(scores) => {
                    if agg
                        .raw_scores
                        .insert(scores.behavior.clone(), scores.scores)
                        .is_some()
                    {
                        log::warn!(
                            "behavior '{}' registered more than once; keeping the last",
                            scores.behavior
                        );
                    }
                    agg.processed_scores
                        .insert(scores.behavior, scores.processed);
                }
            }
        }

        if !extractions.is_empty() {
            let extracted = {
                let trajectory = agg.trajectory.as_ref().ok_or_else(|| {
                    ExtractError::unsupported(
                        "attribute extraction requires a trajectory record in the experiment",
                    )
                })?;
                let mut extracted = Vec::with_capacity(extractions.len());
                for names in extractions {
                    let table = trajectory.extract_attributes(names)?;
                    let name = format!("{TRAJECTORY_FEATURE_PREFIX}{}", names.join("_"));
                    extracted.push((name, table));
                }
                extracted
            };
            for (name, table) in extracted {
                agg.insert_feature(
                    name,
                    FeatureEntry {
                        table,
                        from_trajectory: true,
                    },
                );
            }
        }

        Ok(agg)
    }

    fn insert_feature(&mut self, name: String, entry: FeatureEntry) {
        if self.features.insert(name.clone(), entry).is_some() {
            log::warn!("feature '{name}' registered more than once; keeping the last");
        }
    }

    /// The experiment's trajectory record, if one was aggregated
    pub fn trajectory(&self) -> Option<&TrajectoryRecord> {
        self.trajectory.as_ref()
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureEntry> {
        self.features.get(name)
    }

    pub fn raw_score(&self, behavior: &str) -> Option<&FrameTable> {
        self.raw_scores.get(behavior)
    }

    pub fn processed_score(&self, behavior: &str) -> Option<&FrameTable> {
        self.processed_scores.get(behavior)
    }

    /// Registered feature names, sorted
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.features.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered behavior names with raw scores, sorted
    pub fn raw_score_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.raw_scores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered behavior names with processed scores, sorted
    pub fn processed_score_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.processed_scores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn sex_of(&self, entity: EntityId) -> Option<Sex> {
        self.sexes.get(&entity).copied()
    }

    /// Entities of the given sex, sorted by id
    pub fn entities_with_sex(&self, sex: Sex) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .sexes
            .iter()
            .filter(|(_, &s)| s == sex)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Per-second view of a behavior's processed scores, one row per second
    /// (trailing-partial-block average)
    pub fn scores_per_second(
        &self,
        behavior: &str,
        samples_per_second: usize,
    ) -> Result<FrameTable, ExtractError> {
        let table = self
            .processed_score(behavior)
            .ok_or_else(|| ExtractError::missing("processed score", behavior))?;
        Ok(table.per_second(samples_per_second))
    }
}

/// Entity sex from the first value of each entity's sex attribute; sex is
/// frame-invariant
fn sex_registry(trajectory: &TrajectoryRecord) -> HashMap<EntityId, Sex> {
    let mut sexes = HashMap::new();
    for entity in &trajectory.entities {
        let sex = entity
            .text(SEX_ATTRIBUTE)
            .and_then(|values| values.first())
            .and_then(|label| Sex::from_label(label));
        if let Some(sex) = sex {
            sexes.insert(entity.id, sex);
        }
    }
    sexes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::RecordNormalizer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_records() -> Vec<NormalizedRecord> {
        let trx = json!({
            "trx": [
                { "x": [1.0, 2.0], "y": [3.0, 4.0], "sex": ["m", "m"] },
                { "x": [5.0, 6.0], "y": [7.0, 8.0], "sex": ["f", "f"] }
            ]
        });
        let dcenter = json!({ "data": [[0.5, 1.5], [2.5, 3.5]] });
        let scores = json!({
            "allScores": {
                "scores": [[0.9, -0.1], [0.2, 0.8]],
                "postprocessed": [[1.0, 0.0], [0.0, 1.0]]
            }
        });

        vec![
            RecordNormalizer::normalize(&trx, "trx.mat").unwrap(),
            RecordNormalizer::normalize(&dcenter, "perframe/dcenter.mat").unwrap(),
            RecordNormalizer::normalize(&scores, "scores_chase.mat").unwrap(),
        ]
    }

    #[test]
    fn registries_are_populated_from_each_variant() {
        let agg = ExperimentAggregator::from_records(sample_records()).unwrap();

        assert_eq!(agg.feature_names(), vec!["dcenter"]);
        assert_eq!(agg.raw_score_names(), vec!["chase"]);
        assert_eq!(agg.processed_score_names(), vec!["chase"]);
        assert!(!agg.feature("dcenter").unwrap().from_trajectory);
        assert_eq!(agg.feature("dcenter").unwrap().table.len(), 2);
        assert!(agg.feature("dist").is_none());
    }

    #[test]
    fn sex_registry_uses_first_value_per_entity() {
        let agg = ExperimentAggregator::from_records(sample_records()).unwrap();

        assert_eq!(agg.sex_of(1), Some(Sex::Male));
        assert_eq!(agg.sex_of(2), Some(Sex::Female));
        assert_eq!(agg.sex_of(3), None);
        assert_eq!(agg.entities_with_sex(Sex::Female), vec![2]);
    }

    #[test]
    fn trajectory_extractions_register_with_provenance_prefix() {
        let agg =
            ExperimentAggregator::with_trajectory_features(sample_records(), &[&["x", "y"]])
                .unwrap();

        let entry = agg.feature("trx_x_y").unwrap();
        assert!(entry.from_trajectory);
        let names: Vec<&str> = entry.table.column_names().collect();
        assert_eq!(names, vec!["x_1", "x_2", "y_1", "y_2"]);
    }

    #[test]
    fn extraction_without_trajectory_record_fails() {
        let records = vec![RecordNormalizer::normalize(
            &json!({ "data": [[0.1]] }),
            "dcenter.mat",
        )
        .unwrap()];
        let err =
            ExperimentAggregator::with_trajectory_features(records, &[&["x"]]).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedOperation(_)));
    }

    #[test]
    fn name_collision_keeps_the_last_record() {
        let first = RecordNormalizer::normalize(&json!({ "data": [[1.0]] }), "dcenter.mat").unwrap();
        let second =
            RecordNormalizer::normalize(&json!({ "data": [[2.0]] }), "other/dcenter.mat").unwrap();
        let agg = ExperimentAggregator::from_records(vec![first, second]).unwrap();

        assert_eq!(agg.feature_names(), vec!["dcenter"]);
        assert_eq!(
            agg.feature("dcenter").unwrap().table.column("1").unwrap(),
            &[2.0]
        );
    }

    #[test]
    fn scores_per_second_downsamples_processed_scores() {
        let scores = json!({
            "allScores": {
                "scores": [[0.0, 0.0, 0.0, 0.0]],
                "postprocessed": [[1.0, 0.0, 1.0, 1.0]]
            }
        });
        let records = vec![RecordNormalizer::normalize(&scores, "scores_chase.mat").unwrap()];
        let agg = ExperimentAggregator::from_records(records).unwrap();

        let per_sec = agg.scores_per_second("chase", 2).unwrap();
        assert_eq!(per_sec.column("1").unwrap(), &[0.5, 1.0]);

        let err = agg.scores_per_second("walk", 2).unwrap_err();
        assert!(matches!(err, ExtractError::MissingRegistryEntry { .. }));
    }
}
