//! Export surface for persistence and rendering collaborators
//!
//! The core never touches the filesystem; this module renders canonical
//! outputs into the forms collaborators consume: delimited text for tables
//! and a JSON graph document carrying producer and provenance metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExtractError;
use crate::graph::{GraphConfig, InteractionGraph};
use crate::types::{AttributeColumn, EntityTrajectory};
use crate::{ETHOGRAPH_VERSION, PRODUCER_NAME};

/// Producer metadata embedded in every graph document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

impl Producer {
    fn this_crate() -> Self {
        Self {
            name: PRODUCER_NAME.to_string(),
            version: ETHOGRAPH_VERSION.to_string(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Provenance of one graph-building run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub computed_at_utc: DateTime<Utc>,
    /// Parameters the graph was built with
    pub config: GraphConfig,
}

/// JSON envelope handed to rendering collaborators: the graph plus who
/// computed it, when, and with which parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub producer: Producer,
    pub provenance: Provenance,
    pub graph: InteractionGraph,
}

impl GraphDocument {
    pub fn new(graph: InteractionGraph, config: GraphConfig) -> Self {
        Self {
            producer: Producer::this_crate(),
            provenance: Provenance {
                computed_at_utc: Utc::now(),
                config,
            },
            graph,
        }
    }

    pub fn to_json(&self) -> Result<String, ExtractError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Render one entity's trajectory table as delimited text: attribute names as
/// the header, one row per frame
pub fn trajectory_to_delimited(entity: &EntityTrajectory, sep: char) -> String {
    let names: Vec<&str> = entity.attribute_names().collect();
    let mut out = String::new();
    out.push_str(&names.join(&sep.to_string()));
    out.push('\n');
    for row in 0..entity.frames {
        let cells: Vec<String> = names
            .iter()
            .map(|name| match entity.attribute(name) {
                Some(AttributeColumn::Numeric(values)) => format!("{}", values[row]),
                Some(AttributeColumn::Text(values)) => values[row].clone(),
                None => String::new(),
            })
            .collect();
        out.push_str(&cells.join(&sep.to_string()));
        out.push('\n');
    }
    out
}

/// `<prefix>_<stem>.csv`, or `<stem>.csv` with an empty prefix
fn csv_name(prefix: &str, stem: &str) -> String {
    if prefix.is_empty() {
        format!("{stem}.csv")
    } else {
        format!("{prefix}_{stem}.csv")
    }
}

/// File name for an exported feature table
pub fn feature_filename(prefix: &str, name: &str) -> String {
    csv_name(prefix, name)
}

/// File name for an exported raw score table
pub fn scores_filename(prefix: &str, behavior: &str) -> String {
    csv_name(prefix, &format!("{behavior}_scores"))
}

/// File name for an exported processed score table
pub fn processed_scores_filename(prefix: &str, behavior: &str) -> String {
    csv_name(prefix, &format!("{behavior}_processed_scores"))
}

/// File name for one entity's exported trajectory table
pub fn trajectory_filename(prefix: &str, entity: u32) -> String {
    csv_name(prefix, &format!("entity_{entity}"))
}

/// File name for an exported stacked table, named after everything stacked
pub fn stack_filename(prefix: &str, names: &[&str]) -> String {
    csv_name(prefix, &names.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode, NodeCategory};
    use pretty_assertions::assert_eq;

    fn sample_graph() -> InteractionGraph {
        InteractionGraph {
            nodes: vec![
                GraphNode { id: 1, category: NodeCategory::Male },
                GraphNode { id: 2, category: NodeCategory::Female },
            ],
            edges: vec![GraphEdge { source: 1, target: 2, weight: 4 }],
        }
    }

    #[test]
    fn graph_document_round_trips_through_json() {
        let doc = GraphDocument::new(sample_graph(), GraphConfig::default());
        let json = doc.to_json().unwrap();

        let parsed: GraphDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.graph, doc.graph);
        assert_eq!(parsed.producer.name, PRODUCER_NAME);
        assert_eq!(parsed.provenance.config.distance_threshold, 2.0);
    }

    #[test]
    fn filenames_follow_the_export_scheme() {
        assert_eq!(feature_filename("", "dcenter"), "dcenter.csv");
        assert_eq!(feature_filename("run1", "dcenter"), "run1_dcenter.csv");
        assert_eq!(scores_filename("run1", "chase"), "run1_chase_scores.csv");
        assert_eq!(
            processed_scores_filename("", "chase"),
            "chase_processed_scores.csv"
        );
        assert_eq!(trajectory_filename("run1", 3), "run1_entity_3.csv");
        assert_eq!(stack_filename("", &["dcenter", "chase"]), "dcenter_chase.csv");
    }

    #[test]
    fn trajectory_rendering_mixes_numeric_and_text_columns() {
        let entity = crate::normalizer::RecordNormalizer::normalize(
            &serde_json::json!({
                "trx": [{ "x": [1.0, 2.5], "sex": ["m", "m"] }]
            }),
            "trx.mat",
        )
        .unwrap();
        let trajectory = match entity {
            crate::normalizer::NormalizedRecord::Trajectory(t) => t,
            _ => unreachable!(),
        };

        let rendered = trajectory_to_delimited(&trajectory.entities[0], ',');
        assert_eq!(rendered, "x,sex\n1,m\n2.5,m\n");
    }
}
