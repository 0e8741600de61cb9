//! # Benchpivot - benchmark-result reshaping and normalization
//!
//! Benchpivot ingests heterogeneous benchmark-result CSVs (standard or
//! transposed per-run layout, any common encoding) and reshapes them
//! into analyst-facing wide tables, driven entirely by a declarative
//! YAML configuration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌─────────────┐
//! │  CSV Files  │──▶│   Parser    │──▶│   Reshape    │──▶│  XLSX/CSV   │
//! │ (auto-enc)  │   │ (transpose) │   │ (pivot/norm) │   │  (sheets)   │
//! └─────────────┘   └─────────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! The reshaping engine runs six stages in order: metric-group
//! resolution, derived-row expansion, pivot assembly, column ordering,
//! baseline normalization, and row sorting. Each stage takes and
//! returns explicit values; nothing persists between invocations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use benchpivot::{run, Config};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("benchpivot.yaml")?;
//!     let summary = run(&config)?;
//!     println!("wrote {} file(s)", summary.output_files.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Declarative YAML configuration
//! - [`parser`] - CSV ingestion with auto-detection
//! - [`table`] - Table value model and cell helpers
//! - [`filter`] - Row-level filtering
//! - [`reshape`] - The reshaping and normalization engine
//! - [`pipeline`] - End-to-end orchestration
//! - [`export`] - XLSX/CSV output

// Core modules
pub mod error;
pub mod table;

// Configuration
pub mod config;

// Ingestion
pub mod parser;
pub mod filter;

// Reshaping engine
pub mod reshape;

// Orchestration
pub mod pipeline;

// Output
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, ExportError, PipelineError, ReshapeError};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    example_config, AnalysisConfig, AnalysisMode, Config, DependentVariableSpec,
    DerivedRowsConfig, FieldSpec, FilterSpec, IndependentVariables, InputConfig, OutputConfig,
};

// =============================================================================
// Re-exports - Table model
// =============================================================================

pub use table::{Row, Table};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_file_auto,
    parse_str, ParseResult,
};

// =============================================================================
// Re-exports - Reshaping engine
// =============================================================================

pub use reshape::{
    build_flat_table, build_pivot_table, expand_derived_rows, matches_pattern,
    normalize_against_baseline, order_columns, resolve_metric_groups, sort_rows, MetricGroup,
    PivotTarget,
};

// =============================================================================
// Re-exports - Pipeline & Export
// =============================================================================

pub use pipeline::{load_records, run, RunSummary};

pub use export::{export_split_sheets, export_table, write_table};
