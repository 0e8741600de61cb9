//! Error types for the benchpivot pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ConfigError`] - Configuration loading errors
//! - [`CsvError`] - CSV ingestion errors
//! - [`ReshapeError`] - Reshaping engine errors
//! - [`ExportError`] - Table export errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Recoverable conditions (a configured field missing from the data, a
//! baseline row that does not exist) are NOT errors: they are logged as
//! warnings and processing degrades to a default behavior. Only the
//! complete absence of output data is fatal.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading the declarative configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed YAML document.
    #[error("Invalid config document: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

// =============================================================================
// CSV Ingestion Errors
// =============================================================================

/// Errors during CSV ingestion.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode content.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Reshaping Errors
// =============================================================================

/// Errors from the reshaping engine.
#[derive(Debug, Error)]
pub enum ReshapeError {
    /// No metric group produced a usable pivot block.
    #[error("No metric group produced any usable pivot block")]
    EmptyResult,

    /// None of the configured fields exist in the data.
    #[error("No configured field exists in the data")]
    NoColumns,
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing output tables.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output directory or file.
    #[error("Export IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// XLSX writer error.
    #[error("XLSX error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    CsvError(#[from] csv::Error),

    /// The requested output format cannot represent the result.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// The sheet-split field is not present in the table.
    #[error("Split field not found in result: {0}")]
    SplitFieldMissing(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::run`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// CSV ingestion error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Reshaping error.
    #[error("Reshape error: {0}")]
    Reshape(#[from] ReshapeError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// No input files matched the configured source.
    #[error("No input files found under {dir} matching '{pattern}'")]
    NoInputFiles { dir: PathBuf, pattern: String },

    /// Every input file failed to load.
    #[error("No records could be loaded from any input file")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for CSV ingestion.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for reshaping operations.
pub type ReshapeResult<T> = Result<T, ReshapeError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ReshapeError -> PipelineError
        let reshape_err = ReshapeError::EmptyResult;
        let pipeline_err: PipelineError = reshape_err.into();
        assert!(pipeline_err.to_string().contains("pivot block"));
    }

    #[test]
    fn test_no_input_files_format() {
        let err = PipelineError::NoInputFiles {
            dir: PathBuf::from("./raw_data/"),
            pattern: "*.csv".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("raw_data"));
        assert!(msg.contains("*.csv"));
    }
}
