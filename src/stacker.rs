//! Time-series stacking
//!
//! Joins selected registry tables into one per-frame table with
//! collision-safe column prefixes. Joins are intersection-based on the frame
//! index: tables of differing length truncate the result to the shortest
//! common span.

use crate::error::ExtractError;
use crate::experiment::ExperimentAggregator;
use crate::table::FrameTable;

/// Selection of registry entries: everything registered, or named entries.
///
/// `All` is resolved against the registry at stack time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Named(Vec<String>),
}

impl Selection {
    /// Select nothing
    pub fn none() -> Self {
        Selection::Named(Vec::new())
    }

    /// Select one named entry
    pub fn one(name: impl Into<String>) -> Self {
        Selection::Named(vec![name.into()])
    }

    fn resolve(&self, available: Vec<&str>) -> Vec<String> {
        match self {
            Selection::All => available.into_iter().map(str::to_string).collect(),
            Selection::Named(names) => names.clone(),
        }
    }
}

/// Stacks registry tables into one frame-indexed table
pub struct TimeSeriesStacker<'a> {
    experiment: &'a ExperimentAggregator,
}

impl<'a> TimeSeriesStacker<'a> {
    pub fn new(experiment: &'a ExperimentAggregator) -> Self {
        Self { experiment }
    }

    /// Join the selected features and behavior scores on the frame index.
    ///
    /// Standalone feature columns are prefixed `<name>_`; trajectory-derived
    /// features already carry `<attribute>_<entityId>` names and are joined
    /// as-is. Score columns are prefixed `<name>_score_` (raw) and
    /// `<name>_processed_` (processed). An empty selection yields an empty
    /// table; an unknown name is a `MissingRegistryEntry` error.
    pub fn stack(
        &self,
        features: &Selection,
        raw_scores: &Selection,
        processed_scores: &Selection,
    ) -> Result<FrameTable, ExtractError> {
        let mut stacked = FrameTable::new();

        for name in features.resolve(self.experiment.feature_names()) {
            let entry = self
                .experiment
                .feature(&name)
                .ok_or_else(|| ExtractError::missing("feature", &name))?;
            let table = if entry.from_trajectory {
                entry.table.clone()
            } else {
                entry.table.with_prefix(&format!("{name}_"))
            };
            stacked = join(stacked, table);
        }

        for name in raw_scores.resolve(self.experiment.raw_score_names()) {
            let table = self
                .experiment
                .raw_score(&name)
                .ok_or_else(|| ExtractError::missing("raw score", &name))?
                .with_prefix(&format!("{name}_score_"));
            stacked = join(stacked, table);
        }

        for name in processed_scores.resolve(self.experiment.processed_score_names()) {
            let table = self
                .experiment
                .processed_score(&name)
                .ok_or_else(|| ExtractError::missing("processed score", &name))?
                .with_prefix(&format!("{name}_processed_"));
            stacked = join(stacked, table);
        }

        Ok(stacked)
    }
}

fn join(stacked: FrameTable, table: FrameTable) -> FrameTable {
    if stacked.is_empty() {
        table
    } else {
        stacked.inner_join(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{NormalizedRecord, RecordNormalizer};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn record(value: Value, source: &str) -> NormalizedRecord {
        RecordNormalizer::normalize(&value, source).unwrap()
    }

    fn sample_experiment() -> ExperimentAggregator {
        let records = vec![
            record(
                json!({
                    "trx": [
                        { "x": [1.0, 2.0], "sex": ["m", "m"] },
                        { "x": [3.0, 4.0], "sex": ["f", "f"] }
                    ]
                }),
                "trx.mat",
            ),
            record(json!({ "data": [[0.5, 1.5], [2.5, 3.5]] }), "dcenter.mat"),
            record(
                json!({
                    "allScores": {
                        "scores": [[0.9, -0.1], [0.2, 0.8]],
                        "postprocessed": [[1.0, 0.0], [0.0, 1.0]]
                    }
                }),
                "scores_chase.mat",
            ),
        ];
        ExperimentAggregator::with_trajectory_features(records, &[&["x"]]).unwrap()
    }

    #[test]
    fn empty_selection_yields_empty_table() {
        let experiment = sample_experiment();
        let stacker = TimeSeriesStacker::new(&experiment);

        let stacked = stacker
            .stack(&Selection::none(), &Selection::none(), &Selection::none())
            .unwrap();
        assert!(stacked.is_empty());
    }

    #[test]
    fn all_selections_resolve_at_stack_time() {
        let experiment = sample_experiment();
        let stacker = TimeSeriesStacker::new(&experiment);

        let stacked = stacker
            .stack(&Selection::All, &Selection::All, &Selection::All)
            .unwrap();

        let names: Vec<&str> = stacked.column_names().collect();
        assert_eq!(
            names,
            vec![
                "dcenter_1",
                "dcenter_2",
                "x_1",
                "x_2",
                "chase_score_1",
                "chase_score_2",
                "chase_processed_1",
                "chase_processed_2",
            ]
        );
        assert_eq!(stacked.len(), 2);
    }

    #[test]
    fn trajectory_features_are_not_reprefixed() {
        let experiment = sample_experiment();
        let stacker = TimeSeriesStacker::new(&experiment);

        let stacked = stacker
            .stack(
                &Selection::one("trx_x"),
                &Selection::none(),
                &Selection::none(),
            )
            .unwrap();
        let names: Vec<&str> = stacked.column_names().collect();
        assert_eq!(names, vec!["x_1", "x_2"]);
    }

    #[test]
    fn mismatched_lengths_truncate_to_shortest() {
        let records = vec![
            record(
                json!({ "data": [(0..100).map(|i| i as f64).collect::<Vec<_>>()] }),
                "long.mat",
            ),
            record(
                json!({ "data": [(0..80).map(|i| i as f64).collect::<Vec<_>>()] }),
                "short.mat",
            ),
        ];
        let experiment = ExperimentAggregator::from_records(records).unwrap();
        let stacker = TimeSeriesStacker::new(&experiment);

        let stacked = stacker
            .stack(&Selection::All, &Selection::none(), &Selection::none())
            .unwrap();
        assert_eq!(stacked.len(), 80);
        assert_eq!(stacked.width(), 2);
    }

    #[test]
    fn unknown_names_are_missing_registry_entries() {
        let experiment = sample_experiment();
        let stacker = TimeSeriesStacker::new(&experiment);

        let err = stacker
            .stack(
                &Selection::one("velmag"),
                &Selection::none(),
                &Selection::none(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingRegistryEntry {
                registry: "feature",
                ..
            }
        ));
    }
}
