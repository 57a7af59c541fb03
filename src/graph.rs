//! Interaction graph inference
//!
//! Derives a weighted undirected graph of pairwise co-location from a
//! distance-to-group-center feature, optionally gated by a behavior signal.
//!
//! Pipeline: stack distance (+ behavior) → one row per second → burn-in →
//! behavior gate → candidate sets → pair counting.
//!
//! Gating is population-wide per one-second sample: a row survives when any
//! entity's processed score reaches the threshold, not just the pair's. Edge
//! weight counts retained samples in which both entities of the pair belonged
//! to a proximity cluster of at least two entities. Zero-weight edges are
//! kept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::experiment::ExperimentAggregator;
use crate::stacker::{Selection, TimeSeriesStacker};
use crate::table::FrameTable;
use crate::types::{EntityId, Sex};

/// Feature name of the distance to the group center in tracker output
pub const DISTANCE_TO_CENTER: &str = "dcenter";

/// Sex-derived node coloring; entities without a known sex are neutral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Male,
    Female,
    Unknown,
}

impl From<Option<Sex>> for NodeCategory {
    fn from(sex: Option<Sex>) -> Self {
        match sex {
            Some(Sex::Male) => NodeCategory::Male,
            Some(Sex::Female) => NodeCategory::Female,
            None => NodeCategory::Unknown,
        }
    }
}

/// One entity in the interaction graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: EntityId,
    pub category: NodeCategory,
}

/// One unordered entity pair with its co-occurrence weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: EntityId,
    pub target: EntityId,
    pub weight: u64,
}

/// Weighted undirected graph of pairwise co-location frequency.
///
/// Nodes are sorted by entity id; edges cover every unordered pair of the
/// candidate population, including pairs never observed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl InteractionGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Weight of the edge between two entities, in either order
    pub fn edge_weight(&self, a: EntityId, b: EntityId) -> Option<u64> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.edges
            .iter()
            .find(|e| e.source == lo && e.target == hi)
            .map(|e| e.weight)
    }
}

/// Parameters of one graph-building run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Feature registry entry holding per-entity distances to the group center
    pub distance_feature: String,
    /// Distance at or under which an entity joins a sample's candidate set
    pub distance_threshold: f64,
    /// Behavior whose processed score gates samples, if any
    pub behavior: Option<String>,
    /// Processed score at or over which a sample passes the gate
    pub behavior_threshold: f64,
    /// One-second samples dropped from the start
    pub burn_in_seconds: usize,
    /// Recording frame rate used for downsampling
    pub samples_per_second: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            distance_feature: DISTANCE_TO_CENTER.to_string(),
            distance_threshold: 2.0,
            behavior: None,
            behavior_threshold: 0.5,
            burn_in_seconds: 0,
            samples_per_second: 30,
        }
    }
}

/// Builds interaction graphs from an experiment's registries.
///
/// Each build is independent; nothing is cached between runs.
pub struct InteractionGraphBuilder<'a> {
    experiment: &'a ExperimentAggregator,
}

impl<'a> InteractionGraphBuilder<'a> {
    pub fn new(experiment: &'a ExperimentAggregator) -> Self {
        Self { experiment }
    }

    /// Build the weighted undirected co-location graph.
    ///
    /// Fails with `MissingRegistryEntry` when the distance feature (or gating
    /// behavior) is not registered, and with `UnsupportedOperation` when the
    /// experiment has fewer than two entities. A gate that removes every
    /// sample yields the full graph with all weights zero.
    pub fn build(&self, config: &GraphConfig) -> Result<InteractionGraph, ExtractError> {
        let entry = self
            .experiment
            .feature(&config.distance_feature)
            .ok_or_else(|| ExtractError::missing("feature", &config.distance_feature))?;

        let entities: Vec<EntityId> = entry
            .table
            .column_names()
            .map(column_entity)
            .collect::<Result<_, _>>()?;
        if entities.len() < 2 {
            return Err(ExtractError::unsupported(
                "interaction graph requires at least two entities",
            ));
        }

        // One row per second over distance (+ behavior) columns
        let stacker = TimeSeriesStacker::new(self.experiment);
        let stacked = stacker.stack(
            &Selection::one(config.distance_feature.as_str()),
            &Selection::none(),
            &match &config.behavior {
                Some(behavior) => Selection::one(behavior.as_str()),
                None => Selection::none(),
            },
        )?;
        let mut samples = stacked
            .per_second(config.samples_per_second)
            .tail_from(config.burn_in_seconds);

        let total_samples = samples.len();
        if let Some(behavior) = &config.behavior {
            samples = apply_behavior_gate(&samples, behavior, config.behavior_threshold);
        }
        log::debug!(
            "graph build over '{}': {} of {} one-second samples retained",
            config.distance_feature,
            samples.len(),
            total_samples
        );

        // Candidate entity per distance column, resolved once
        let columns: Vec<(EntityId, &[f64])> = samples
            .iter_columns()
            .map(|(name, values)| column_entity(name).map(|id| (id, values)))
            .collect::<Result<_, _>>()?;

        let mut weights: BTreeMap<(EntityId, EntityId), u64> = BTreeMap::new();
        for (i, &a) in entities.iter().enumerate() {
            for &b in &entities[i + 1..] {
                weights.insert(pair_key(a, b), 0);
            }
        }

        for row in 0..samples.len() {
            let candidates: Vec<EntityId> = columns
                .iter()
                .filter(|(_, values)| values[row] <= config.distance_threshold)
                .map(|&(id, _)| id)
                .collect();
            if candidates.len() < 2 {
                continue;
            }
            for (i, &a) in candidates.iter().enumerate() {
                for &b in &candidates[i + 1..] {
                    *weights.entry(pair_key(a, b)).or_insert(0) += 1;
                }
            }
        }

        let mut node_ids = entities;
        node_ids.sort_unstable();
        let nodes = node_ids
            .into_iter()
            .map(|id| GraphNode {
                id,
                category: self.experiment.sex_of(id).into(),
            })
            .collect();
        let edges = weights
            .into_iter()
            .map(|((source, target), weight)| GraphEdge {
                source,
                target,
                weight,
            })
            .collect();

        Ok(InteractionGraph { nodes, edges })
    }
}

/// Keep only rows where any behavior column reaches the threshold, then drop
/// the behavior columns
fn apply_behavior_gate(samples: &FrameTable, behavior: &str, threshold: f64) -> FrameTable {
    let behavior_prefix = format!("{behavior}_processed_");
    let behavior_columns: Vec<&[f64]> = samples
        .iter_columns()
        .filter(|(name, _)| name.starts_with(&behavior_prefix))
        .map(|(_, values)| values)
        .collect();
    let distance_columns: Vec<&str> = samples
        .column_names()
        .filter(|name| !name.starts_with(&behavior_prefix))
        .collect();

    let kept: Vec<usize> = (0..samples.len())
        .filter(|&row| behavior_columns.iter().any(|values| values[row] >= threshold))
        .collect();

    samples.select_rows(&kept).select_columns(&distance_columns)
}

/// Entity id from a per-entity column name (`dcenter_3` → 3)
fn column_entity(name: &str) -> Result<EntityId, ExtractError> {
    name.rsplit('_')
        .next()
        .and_then(|tail| tail.parse::<EntityId>().ok())
        .ok_or_else(|| {
            ExtractError::malformed(format!("cannot derive an entity id from column '{name}'"))
        })
}

fn pair_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
