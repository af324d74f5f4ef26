//! Error types for rnaseq_dge

use thiserror::Error;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("External tool '{tool}' failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("Invalid annotation: {reason}")]
    InvalidAnnotation { reason: String },

    #[error("Missing column '{column}' in {table}")]
    MissingColumn { column: String, table: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Statistical fit failed: {reason}")]
    StatisticalFit { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid pattern: {0}")]
    RegexError(#[from] regex::Error),
}

impl PipelineError {
    /// Whether the error comes from malformed or mismatched input tables
    pub fn is_data_shape(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidCountMatrix { .. }
                | PipelineError::InvalidMetadata { .. }
                | PipelineError::InvalidAnnotation { .. }
                | PipelineError::MissingColumn { .. }
                | PipelineError::DimensionMismatch { .. }
                | PipelineError::EmptyData { .. }
        )
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
