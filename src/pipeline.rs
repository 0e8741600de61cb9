//! End-to-end pipeline: discover input files, ingest, filter, reshape,
//! and export.
//!
//! Per-file ingest failures are logged and skipped; only a complete
//! absence of loadable input is fatal. The reshaping itself is
//! delegated to [`crate::reshape::pipeline`].

use serde_json::Value;
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, AnalysisMode, Config, SortDirection};
use crate::error::{PipelineError, PipelineResult};
use crate::export::{export_split_sheets, export_table};
use crate::filter::{apply_filters, schema_contains};
use crate::parser::parse_file_auto;
use crate::reshape::{
    build_flat_table, build_pivot_table, matches_pattern, METRIC_LABEL_HEADER,
    SINGLE_UNIT_LABEL, SOURCE_FILE_COLUMN,
};
use crate::table::{coerce_numeric, display_value, is_missing, Row, Table};

/// What a pipeline run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Files written, in export order.
    pub output_files: Vec<PathBuf>,
    /// Records that survived filtering.
    pub record_count: usize,
}

/// Execute the full pipeline described by the configuration.
pub fn run(config: &Config) -> PipelineResult<RunSummary> {
    let records = load_records(config)?;
    info!(records = records.len(), "input loaded");

    let records = preprocess(records, config);
    info!(records = records.len(), "preprocessing done");

    let mode = config.analysis.mode;
    let mut output_files = Vec::new();

    if matches!(
        mode,
        AnalysisMode::Pivot | AnalysisMode::Both | AnalysisMode::SplitPivot
    ) {
        let pivot = build_pivot_table(&records, config)?;
        export_pivot(&pivot, config, mode, &mut output_files)?;
    }

    if matches!(mode, AnalysisMode::Flat | AnalysisMode::Both) {
        let flat = build_flat_table(&records, config)?;
        let suffix = if mode == AnalysisMode::Both { "flat" } else { "" };
        output_files.push(export_table(&flat, &config.output, suffix)?);
    }

    Ok(RunSummary {
        output_files,
        record_count: records.len(),
    })
}

/// Load all configured input files into one record sequence.
///
/// Every record is tagged with its source filename. Files that fail to
/// parse are skipped with a warning.
pub fn load_records(config: &Config) -> PipelineResult<Vec<Value>> {
    let input = &config.input;

    if let Some(single) = input.single_file.as_ref().filter(|p| p.exists()) {
        info!(file = %single.display(), "loading single input file");
        let result = parse_file_auto(single)?;
        let mut records = result.records;
        apply_top_n(&mut records, &config.analysis);
        tag_source(&mut records, single);
        return Ok(records);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&input.source_dir)
        .map_err(crate::error::CsvError::from)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| matches_pattern(&input.file_pattern, n))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(PipelineError::NoInputFiles {
            dir: input.source_dir.clone(),
            pattern: input.file_pattern.clone(),
        });
    }
    info!(files = paths.len(), dir = %input.source_dir.display(), "scanning input files");

    let mut records = Vec::new();
    for path in &paths {
        match parse_file_auto(path) {
            Ok(result) => {
                let mut file_records = result.records;
                apply_top_n(&mut file_records, &config.analysis);
                tag_source(&mut file_records, path);
                info!(
                    file = %path.display(),
                    rows = file_records.len(),
                    encoding = %result.encoding,
                    "file loaded"
                );
                records.extend(file_records);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to load file, skipped");
            }
        }
    }

    if records.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(records)
}

fn tag_source(records: &mut [Value], path: &std::path::Path) {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    for record in records.iter_mut() {
        if let Some(obj) = record.as_object_mut() {
            obj.insert(SOURCE_FILE_COLUMN.to_string(), Value::String(name.clone()));
        }
    }
}

/// Keep only the best N records of one file, by the configured metric.
fn apply_top_n(records: &mut Vec<Value>, analysis: &AnalysisConfig) {
    let (Some(top_n), Some(sort_by)) = (analysis.top_n_per_file, analysis.sort_by.as_deref())
    else {
        return;
    };
    if top_n == 0 || records.len() <= top_n {
        return;
    }
    if !schema_contains(records, sort_by) {
        warn!(field = %sort_by, "top-N sort field does not exist, selection skipped");
        return;
    }

    records.sort_by(|a, b| {
        let va = a.get(sort_by).unwrap_or(&Value::Null);
        let vb = b.get(sort_by).unwrap_or(&Value::Null);
        // Missing values lose regardless of direction.
        match (is_missing(va), is_missing(vb)) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = crate::table::compare_values(va, vb);
                match analysis.sort_order {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            }
        }
    });
    records.truncate(top_n);
}

/// Filters, then numeric coercion of every configured measure field.
fn preprocess(records: Vec<Value>, config: &Config) -> Vec<Value> {
    let mut records = apply_filters(records, &config.filters);

    let mut numeric_fields: Vec<&str> = config
        .dependent_variables
        .iter()
        .map(|dv| dv.field.as_str())
        .collect();
    numeric_fields.extend(
        config
            .independent_variables
            .column_fields
            .iter()
            .map(|f| f.field.as_str()),
    );
    numeric_fields.extend(config.additional_fields.iter().map(String::as_str));

    for record in &mut records {
        let Some(obj) = record.as_object_mut() else { continue };
        for field in &numeric_fields {
            if let Some(v) = obj.get(*field) {
                let coerced = coerce_numeric(v);
                obj.insert((*field).to_string(), coerced);
            }
        }
    }

    records
}

fn export_pivot(
    pivot: &Table,
    config: &Config,
    mode: AnalysisMode,
    output_files: &mut Vec<PathBuf>,
) -> PipelineResult<()> {
    if config.output.split_by_npu && pivot.has_column(METRIC_LABEL_HEADER) {
        info!("splitting output by unit granularity");
        let single = subset(pivot, |row| {
            display_value(row.get(METRIC_LABEL_HEADER).unwrap_or(&Value::Null))
                == SINGLE_UNIT_LABEL
        });
        let multi = subset(pivot, |row| {
            display_value(row.get(METRIC_LABEL_HEADER).unwrap_or(&Value::Null))
                != SINGLE_UNIT_LABEL
        });

        if !single.is_empty() {
            output_files.push(export_table(&single, &config.output, "single")?);
        }
        if !multi.is_empty() {
            output_files.push(export_table(&multi, &config.output, "multi")?);
        }
        output_files.push(export_table(pivot, &config.output, "all")?);
        return Ok(());
    }

    if mode == AnalysisMode::SplitPivot {
        let split_field = config
            .independent_variables
            .row_fields
            .last()
            .map(|spec| spec.display_name().to_string());

        if let Some(field) = split_field {
            if pivot.has_column(&field) {
                output_files.push(export_split_sheets(pivot, &field, &config.output, "split")?);
            } else {
                warn!(field = %field, "split field missing from result, standard export");
                output_files.push(export_table(pivot, &config.output, "pivot")?);
            }
        } else {
            output_files.push(export_table(pivot, &config.output, "pivot")?);
        }
        return Ok(());
    }

    let suffix = if mode == AnalysisMode::Both { "pivot" } else { "" };
    output_files.push(export_table(pivot, &config.output, suffix)?);
    Ok(())
}

/// Rows of a table satisfying a predicate, same columns.
fn subset(table: &Table, keep: impl Fn(&Row) -> bool) -> Table {
    let mut out = Table::new(table.columns.clone());
    out.rows = table.rows.iter().filter(|r| keep(r)).cloned().collect();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DependentVariableSpec, DerivedRowsConfig, FieldSpec, IndependentVariables, InputConfig,
        OutputConfig,
    };
    use std::io::Write;

    fn write_file(dir: &std::path::Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn run_config(input_dir: &std::path::Path, output_dir: &std::path::Path) -> Config {
        Config {
            input: InputConfig {
                single_file: None,
                source_dir: input_dir.to_path_buf(),
                file_pattern: "*.csv".into(),
            },
            independent_variables: IndependentVariables {
                row_fields: vec![
                    FieldSpec::aliased("system_name", "System"),
                    FieldSpec::aliased("input_length", "Input Length"),
                ],
                column_fields: vec![FieldSpec::new("time_limit")],
            },
            dependent_variables: vec![
                DependentVariableSpec {
                    field: "tp_total".into(),
                    alias: None,
                    prefix: Some("Decode".into()),
                },
                DependentVariableSpec {
                    field: "tp_per_npu".into(),
                    alias: Some("Decode Single".into()),
                    prefix: Some("Decode".into()),
                },
            ],
            analysis: crate::config::AnalysisConfig {
                derived_rows: DerivedRowsConfig {
                    enabled: true,
                    npu_count_field: "units".into(),
                },
                ..Default::default()
            },
            output: OutputConfig {
                dir: output_dir.to_path_buf(),
                filename: "result.csv".into(),
                split_by_npu: false,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_run_end_to_end() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_file(
            input.path(),
            "a.csv",
            "system_name,input_length,time_limit,units,tp_total,tp_per_npu\n\
             SYS_A,4096,50,8,800,100\n\
             SYS_A,4096,100,8,1600,200\n",
        );
        write_file(input.path(), "notes.txt", "ignored");

        let config = run_config(input.path(), output.path());
        let summary = run(&config).unwrap();

        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.output_files.len(), 1);
        let content = std::fs::read_to_string(&summary.output_files[0]).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "System,Input Length,Metric,Decode_100ms,Decode_50ms"
        );
        // One aggregate and one single row.
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_no_matching_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_file(input.path(), "notes.txt", "ignored");

        let config = run_config(input.path(), output.path());
        let result = run(&config);
        assert!(matches!(result, Err(PipelineError::NoInputFiles { .. })));
    }

    #[test]
    fn test_unparseable_file_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_file(input.path(), "bad.csv", "");
        write_file(
            input.path(),
            "good.csv",
            "system_name,input_length,time_limit,units,tp_total,tp_per_npu\n\
             SYS_A,4096,50,8,800,100\n",
        );

        let config = run_config(input.path(), output.path());
        let summary = run(&config).unwrap();
        assert_eq!(summary.record_count, 1);
    }

    #[test]
    fn test_source_file_tagging() {
        let input = tempfile::tempdir().unwrap();
        write_file(input.path(), "a.csv", "x\n1\n");

        let mut config = Config::default();
        config.input.source_dir = input.path().to_path_buf();
        let records = load_records(&config).unwrap();
        assert_eq!(records[0][SOURCE_FILE_COLUMN], "a.csv");
    }

    #[test]
    fn test_top_n_selection() {
        let mut records = vec![
            serde_json::json!({"tp": "10"}),
            serde_json::json!({"tp": "30"}),
            serde_json::json!({"tp": "20"}),
        ];
        let analysis = crate::config::AnalysisConfig {
            top_n_per_file: Some(2),
            sort_by: Some("tp".into()),
            ..Default::default()
        };

        apply_top_n(&mut records, &analysis);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["tp"], "30");
        assert_eq!(records[1]["tp"], "20");
    }

    #[test]
    fn test_preprocess_coerces_measures() {
        let config = Config {
            dependent_variables: vec![DependentVariableSpec {
                field: "tp".into(),
                alias: None,
                prefix: None,
            }],
            ..Config::default()
        };
        let records = preprocess(
            vec![serde_json::json!({"tp": "12.5", "other": "x"})],
            &config,
        );
        assert_eq!(records[0]["tp"], serde_json::json!(12.5));
        // Unconfigured fields stay text.
        assert_eq!(records[0]["other"], "x");
    }

    #[test]
    fn test_split_by_npu_outputs() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_file(
            input.path(),
            "a.csv",
            "system_name,input_length,time_limit,units,tp_total,tp_per_npu\n\
             SYS_A,4096,50,8,800,100\n",
        );

        let mut config = run_config(input.path(), output.path());
        config.output.split_by_npu = true;

        let summary = run(&config).unwrap();
        // single + multi + all
        assert_eq!(summary.output_files.len(), 3);
        let names: Vec<String> = summary
            .output_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["result_single.csv", "result_multi.csv", "result_all.csv"]);
    }
}
