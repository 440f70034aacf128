//! Error types for pipeline runs.

use thiserror::Error;

/// Errors produced while building, running or exporting a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source id unknown, band missing or file unreadable. Aborts the run.
    #[error("source {id} unavailable: {reason}")]
    SourceUnavailable { id: String, reason: String },

    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("invalid analysis window: {0}")]
    InvalidWindow(String),

    #[error("unknown export column: {0}")]
    UnknownColumn(String),

    #[error("export {description} failed after {attempts} attempt(s): {reason}")]
    ExportFailed {
        description: String,
        attempts: u32,
        reason: String,
    },

    #[error("unknown pipeline: {0}")]
    UnknownPipeline(String),

    #[error("raster error: {0}")]
    Core(#[from] terramex_core::Error),

    #[error("colormap error: {0}")]
    Colormap(#[from] terramex_colormap::ColormapError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PipelineError {
    pub(crate) fn unavailable(id: &str, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
