//! Ethograph - Compute engine for multi-animal tracker recordings
//!
//! Ethograph turns heterogeneous tracker output (per-entity trajectories,
//! per-frame features, behavior classifier scores) into tabular time series
//! and derives a social-interaction graph from spatial proximity between
//! tracked entities, optionally gated by a behavior signal.
//!
//! Pipeline: raw records → normalization → experiment aggregation →
//! {time-series stacking, interaction-graph inference}.
//!
//! ## Modules
//!
//! - **normalizer**: classify raw records and flatten them into canonical
//!   per-entity tables
//! - **experiment**: collect normalized records into read-only registries
//! - **stacker**: join registry tables into one per-frame table
//! - **graph**: infer the weighted co-location graph
//! - **export**: delimited text and JSON surfaces for collaborators

pub mod downsample;
pub mod error;
pub mod experiment;
pub mod export;
pub mod graph;
pub mod normalizer;
pub mod stacker;
pub mod table;
pub mod types;

pub use error::ExtractError;
pub use experiment::ExperimentAggregator;
pub use graph::{GraphConfig, InteractionGraph, InteractionGraphBuilder};
pub use normalizer::{NormalizedRecord, RecordNormalizer};
pub use stacker::{Selection, TimeSeriesStacker};
pub use table::FrameTable;
pub use types::{EntityId, Sex};

/// Crate version embedded in exported graph documents
pub const ETHOGRAPH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported graph documents
pub const PRODUCER_NAME: &str = "ethograph";
