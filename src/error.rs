//! Error taxonomy for the scoring pipeline and its collaborators

use thiserror::Error;

/// Result alias used across the scoring core
pub type ScoringResult<T> = Result<T, ScoringError>;

/// Failures surfaced by scoring and the query surface.
///
/// Unseen categorical values are deliberately absent: they are encoded with
/// the fallback code and never fail a request.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Artifact bundle missing or incompatible with the feature layout
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Artifacts failed to load at startup, scoring is disabled
    #[error("scoring unavailable: {0}")]
    Unavailable(String),

    /// Request rejected before entering the pipeline
    #[error("invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// Model execution failed
    #[error("inference failed: {0}")]
    Inference(String),

    /// Storage collaborator failed to persist or read a record
    #[error("storage error: {0}")]
    Storage(String),

    /// No record with this identifier exists
    #[error("transaction {0} not found")]
    NotFound(u64),

    /// Report collaborator failed to render
    #[error("report error: {0}")]
    Report(String),
}

impl ScoringError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ScoringError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind used in query responses
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::Configuration(_) => "configuration",
            ScoringError::Unavailable(_) => "unavailable",
            ScoringError::InvalidInput { .. } => "invalid_input",
            ScoringError::Inference(_) => "inference",
            ScoringError::Storage(_) => "storage",
            ScoringError::NotFound(_) => "not_found",
            ScoringError::Report(_) => "report",
        }
    }
}
