//! Error types for Ethograph

use thiserror::Error;

/// Errors that can occur during record extraction and graph inference
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("No entry named '{name}' in the {registry} registry")]
    MissingRegistryEntry { registry: &'static str, name: String },
}

impl ExtractError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ExtractError::MalformedRecord(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        ExtractError::UnsupportedOperation(msg.into())
    }

    pub(crate) fn missing(registry: &'static str, name: impl Into<String>) -> Self {
        ExtractError::MissingRegistryEntry {
            registry,
            name: name.into(),
        }
    }
}
