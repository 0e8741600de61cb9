//! Declarative analysis configuration.
//!
//! The whole pipeline is driven by one YAML document: which fields are
//! row keys, which are column keys, which are measured metrics, how
//! derived per-unit rows relate to aggregate rows, how to normalize
//! against a baseline, and how to order output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::ConfigResult;

/// A complete analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where to find input CSV files.
    #[serde(default)]
    pub input: InputConfig,

    /// Row-level filters applied before reshaping.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,

    /// Row/column key fields of the pivot.
    #[serde(default)]
    pub independent_variables: IndependentVariables,

    /// Measured metric fields.
    #[serde(default)]
    pub dependent_variables: Vec<DependentVariableSpec>,

    /// Extra fields carried into the flat table only.
    #[serde(default)]
    pub additional_fields: Vec<String>,

    /// Reshaping and normalization settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Output location and format.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input file discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Load exactly this file (takes precedence over the scan).
    #[serde(default)]
    pub single_file: Option<PathBuf>,

    /// Directory to scan for result files.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Filename wildcard, e.g. `*.csv` (see [`crate::reshape::matches_pattern`]).
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            single_file: None,
            source_dir: default_source_dir(),
            file_pattern: default_file_pattern(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("./raw_data/")
}

fn default_file_pattern() -> String {
    "*.csv".to_string()
}

/// One row-level filter.
///
/// The operator is kept as free text on purpose: an unknown operator is
/// a warning at apply time, not a load failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Field the filter applies to.
    pub field: String,

    /// One of `==`, `!=`, `>`, `<`, `>=`, `<=`, `in`, `not_in`.
    #[serde(default = "default_operator")]
    pub operator: String,

    /// Comparison values (a single value for scalar operators).
    #[serde(default)]
    pub values: Vec<Value>,
}

fn default_operator() -> String {
    "==".to_string()
}

/// Row and column key fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndependentVariables {
    /// Fields whose distinct value combinations define one output row.
    #[serde(default)]
    pub row_fields: Vec<FieldSpec>,

    /// Fields whose distinct values spread into separate output columns.
    #[serde(default)]
    pub column_fields: Vec<FieldSpec>,
}

/// A row or column key field with an optional display alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name in the input data.
    pub field: String,

    /// Header name in the output (falls back to the field name).
    #[serde(default)]
    pub alias: Option<String>,
}

impl FieldSpec {
    /// Create a spec with no alias.
    pub fn new(field: &str) -> Self {
        Self { field: field.to_string(), alias: None }
    }

    /// Create a spec with a display alias.
    pub fn aliased(field: &str, alias: &str) -> Self {
        Self { field: field.to_string(), alias: Some(alias.to_string()) }
    }

    /// Output header name: alias if set, else the raw field name.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }
}

/// A measured metric field.
///
/// `prefix` names the logical metric group; fields sharing a prefix form
/// a total / per-unit pair (see [`crate::reshape::resolve_metric_groups`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependentVariableSpec {
    /// Field name in the input data.
    pub field: String,

    /// Header name in the output (falls back to the field name).
    #[serde(default)]
    pub alias: Option<String>,

    /// Logical metric group key (falls back to alias, then field).
    #[serde(default)]
    pub prefix: Option<String>,
}

impl DependentVariableSpec {
    /// The logical group key: prefix, else alias, else field.
    pub fn group_prefix(&self) -> &str {
        self.prefix
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.alias.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(&self.field)
    }

    /// Output header name: alias if set, else the raw field name.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }
}

/// Which table(s) to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Wide pivot table only.
    #[default]
    Pivot,
    /// Flat table only.
    Flat,
    /// Both pivot and flat tables.
    Both,
    /// Pivot table, split into one sheet per value of the last row field.
    SplitPivot,
}

/// Sort direction for per-file top-N preselection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Derived-row synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRowsConfig {
    /// Duplicate each record into aggregate and single-unit rows.
    #[serde(default)]
    pub enabled: bool,

    /// Field holding the number of units an aggregate measurement spans.
    #[serde(default = "default_npu_count_field")]
    pub npu_count_field: String,
}

impl Default for DerivedRowsConfig {
    fn default() -> Self {
        Self { enabled: false, npu_count_field: default_npu_count_field() }
    }
}

fn default_npu_count_field() -> String {
    "decoder_num_npu".to_string()
}

/// Reshaping and normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Which table(s) to build.
    #[serde(default)]
    pub mode: AnalysisMode,

    /// Derived-row synthesis.
    #[serde(default)]
    pub derived_rows: DerivedRowsConfig,

    /// Selector value of the baseline system; unset disables normalization.
    #[serde(default)]
    pub normalization_baseline: Option<String>,

    /// Metric-column name prefixes in output order.
    #[serde(default)]
    pub metric_order: Vec<String>,

    /// Selector wildcard patterns in output row order.
    #[serde(default)]
    pub system_order: Vec<String>,

    /// Rounding for normalization ratios.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,

    /// Keep only the best N rows of each input file.
    #[serde(default)]
    pub top_n_per_file: Option<usize>,

    /// Field the per-file top-N selection sorts by.
    #[serde(default)]
    pub sort_by: Option<String>,

    /// Direction of the per-file top-N sort.
    #[serde(default)]
    pub sort_order: SortDirection,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            derived_rows: DerivedRowsConfig::default(),
            normalization_baseline: None,
            metric_order: Vec::new(),
            system_order: Vec::new(),
            decimal_places: default_decimal_places(),
            top_n_per_file: None,
            sort_by: None,
            sort_order: SortDirection::default(),
        }
    }
}

fn default_decimal_places() -> u32 {
    2
}

/// Output location and format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory (created if absent).
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Filename template; `{timestamp}` expands to `YYYYMMDD_HHMMSS`.
    /// The extension selects the writer (`.xlsx` or `.csv`).
    #[serde(default = "default_output_filename")]
    pub filename: String,

    /// Additionally write single-unit-only / aggregate-only / full files.
    #[serde(default)]
    pub split_by_npu: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            filename: default_output_filename(),
            split_by_npu: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data/")
}

fn default_output_filename() -> String {
    "analysis_{timestamp}.xlsx".to_string()
}

impl Config {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Generate an example configuration for documentation and tests.
pub fn example_config() -> Config {
    Config {
        input: InputConfig {
            single_file: None,
            source_dir: PathBuf::from("./raw_data/inference/"),
            file_pattern: "*.csv".to_string(),
        },
        filters: vec![FilterSpec {
            field: "model_name".to_string(),
            operator: "==".to_string(),
            values: vec![Value::String("llama-70b".to_string())],
        }],
        independent_variables: IndependentVariables {
            row_fields: vec![
                FieldSpec::aliased("system_name", "System"),
                FieldSpec::aliased("input_length", "Input Length"),
            ],
            column_fields: vec![FieldSpec::aliased("time_limit", "TPOT")],
        },
        dependent_variables: vec![
            DependentVariableSpec {
                field: "decode_throughput".to_string(),
                alias: Some("Decode Total".to_string()),
                prefix: Some("Decode".to_string()),
            },
            DependentVariableSpec {
                field: "decode_throughput_per_npu".to_string(),
                alias: Some("Decode Single".to_string()),
                prefix: Some("Decode".to_string()),
            },
            DependentVariableSpec {
                field: "prefill_latency".to_string(),
                alias: Some("Prefill".to_string()),
                prefix: Some("Prefill".to_string()),
            },
        ],
        additional_fields: vec!["batch_size".to_string()],
        analysis: AnalysisConfig {
            mode: AnalysisMode::Pivot,
            derived_rows: DerivedRowsConfig {
                enabled: true,
                npu_count_field: "decoder_num_npu".to_string(),
            },
            normalization_baseline: Some("POR_SYSTEM".to_string()),
            metric_order: vec!["Prefill".to_string(), "Decode".to_string()],
            system_order: vec!["*POR*".to_string(), "LEG*".to_string()],
            ..AnalysisConfig::default()
        },
        output: OutputConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_roundtrip() {
        let config = example_config();
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.dependent_variables.len(), 3);
        assert_eq!(parsed.analysis.metric_order, vec!["Prefill", "Decode"]);
    }

    #[test]
    fn test_empty_document_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.analysis.mode, AnalysisMode::Pivot);
        assert_eq!(config.analysis.decimal_places, 2);
        assert!(!config.analysis.derived_rows.enabled);
        assert_eq!(config.analysis.derived_rows.npu_count_field, "decoder_num_npu");
        assert_eq!(config.input.file_pattern, "*.csv");
        assert_eq!(config.output.filename, "analysis_{timestamp}.xlsx");
    }

    #[test]
    fn test_group_prefix_fallback_chain() {
        let with_prefix = DependentVariableSpec {
            field: "f".into(),
            alias: Some("A".into()),
            prefix: Some("P".into()),
        };
        assert_eq!(with_prefix.group_prefix(), "P");

        let with_alias = DependentVariableSpec {
            field: "f".into(),
            alias: Some("A".into()),
            prefix: None,
        };
        assert_eq!(with_alias.group_prefix(), "A");

        let bare = DependentVariableSpec { field: "f".into(), alias: None, prefix: None };
        assert_eq!(bare.group_prefix(), "f");

        // Empty prefix falls through to the alias.
        let empty_prefix = DependentVariableSpec {
            field: "f".into(),
            alias: Some("A".into()),
            prefix: Some(String::new()),
        };
        assert_eq!(empty_prefix.group_prefix(), "A");
    }

    #[test]
    fn test_mode_spelling() {
        let config = Config::from_yaml("analysis: {mode: split_pivot}").unwrap();
        assert_eq!(config.analysis.mode, AnalysisMode::SplitPivot);
    }

    #[test]
    fn test_field_spec_display_name() {
        assert_eq!(FieldSpec::aliased("a", "Alpha").display_name(), "Alpha");
        assert_eq!(FieldSpec::new("a").display_name(), "a");
    }
}
