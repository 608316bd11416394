use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid scenario parameter '{field}' = {value}: {reason}")]
    InvalidParameter {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Unknown key '{key}' in scenario field '{field}'")]
    UnknownKey { field: &'static str, key: String },

    #[error("Scenario distribution '{field}' has no usable entries")]
    EmptyDistribution { field: &'static str },

    #[error("Failed to load scenario file: {path}\n{source}")]
    ScenarioFile {
        path: PathBuf,
        source: anyhow::Error,
    },
}
