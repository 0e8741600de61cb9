//! Table export: XLSX and CSV writers, sheet splitting, filename
//! templating.
//!
//! The writer is selected by the configured filename extension. Cells
//! are written typed — numbers as numbers, text as text, nulls blank —
//! so spreadsheet sorting and formulas keep working downstream.

use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::OutputConfig;
use crate::error::{ExportError, ExportResult};
use crate::table::{compare_values, display_value, values_equal, Table};
use serde_json::Value;

/// Excel worksheet names are capped at 31 characters.
const MAX_SHEET_NAME: usize = 31;

/// Expand `{timestamp}` in a filename template to `YYYYMMDD_HHMMSS`.
pub fn format_output_filename(template: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    template.replace("{timestamp}", &timestamp)
}

/// Insert a suffix before the file extension: `a.xlsx` + `flat` → `a_flat.xlsx`.
pub fn with_suffix(filename: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{filename}_{suffix}"),
    }
}

/// Resolve the output path for a table, creating the directory.
fn prepare_path(output: &OutputConfig, suffix: &str) -> ExportResult<PathBuf> {
    std::fs::create_dir_all(&output.dir)?;
    let filename = with_suffix(&format_output_filename(&output.filename), suffix);
    Ok(output.dir.join(filename))
}

/// Write a table to the configured location and return the path.
pub fn export_table(table: &Table, output: &OutputConfig, suffix: &str) -> ExportResult<PathBuf> {
    let path = prepare_path(output, suffix)?;
    write_table(table, &path)?;
    info!(path = %path.display(), rows = table.len(), "table exported");
    Ok(path)
}

/// Write a table, dispatching on the file extension.
pub fn write_table(table: &Table, path: &Path) -> ExportResult<()> {
    match extension(path).as_deref() {
        Some("csv") => write_csv(table, path),
        Some("xlsx") | None => write_xlsx(table, path),
        Some(other) => Err(ExportError::UnsupportedFormat(other.to_string())),
    }
}

/// Write one worksheet per distinct value of `split_field` and return
/// the path. The split column itself is removed from every sheet.
pub fn export_split_sheets(
    table: &Table,
    split_field: &str,
    output: &OutputConfig,
    suffix: &str,
) -> ExportResult<PathBuf> {
    if !table.has_column(split_field) {
        return Err(ExportError::SplitFieldMissing(split_field.to_string()));
    }
    let path = prepare_path(output, suffix)?;
    if extension(&path).as_deref() == Some("csv") {
        return Err(ExportError::UnsupportedFormat(
            "sheet splitting requires an .xlsx output".to_string(),
        ));
    }

    // Distinct split values, ascending.
    let mut values: Vec<Value> = Vec::new();
    for row in &table.rows {
        let v = row.get(split_field).cloned().unwrap_or(Value::Null);
        if !values.iter().any(|seen| display_value(seen) == display_value(&v)) {
            values.push(v);
        }
    }
    values.sort_by(compare_values);

    let columns: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.as_str() != split_field)
        .cloned()
        .collect();

    let mut workbook = Workbook::new();
    for value in &values {
        let mut name: String = display_value(value).chars().take(MAX_SHEET_NAME).collect();
        if name.is_empty() {
            name = "blank".to_string();
        }
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;

        let mut sheet = Table::new(columns.clone());
        for row in &table.rows {
            let cell = row.get(split_field).unwrap_or(&Value::Null);
            if values_equal(cell, value)
                || (display_value(cell) == display_value(value))
            {
                let mut out = row.clone();
                out.remove(split_field);
                sheet.rows.push(out);
            }
        }
        write_sheet(&sheet, worksheet)?;
    }

    workbook.save(&path)?;
    info!(path = %path.display(), sheets = values.len(), field = %split_field, "split export done");
    Ok(path)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn write_xlsx(table: &Table, path: &Path) -> ExportResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_sheet(table, worksheet)?;
    workbook.save(path)?;
    Ok(())
}

fn write_sheet(
    table: &Table,
    worksheet: &mut rust_xlsxwriter::Worksheet,
) -> ExportResult<()> {
    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let row_idx = (r + 1) as u32;
        for (c, name) in table.columns.iter().enumerate() {
            let col_idx = c as u16;
            match row.get(name).unwrap_or(&Value::Null) {
                Value::Null => {}
                Value::Number(n) => {
                    if let Some(f) = n.as_f64() {
                        worksheet.write_number(row_idx, col_idx, f)?;
                    }
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(row_idx, col_idx, *b)?;
                }
                other => {
                    let text = display_value(other);
                    if !text.is_empty() {
                        worksheet.write_string(row_idx, col_idx, &text)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn write_csv(table: &Table, path: &Path) -> ExportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|c| display_value(row.get(c).unwrap_or(&Value::Null)))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Row;
    use serde_json::json;

    fn sample_table() -> Table {
        let mut table = Table::new(vec!["System".into(), "Len".into(), "Decode".into()]);
        for (s, l, d) in [("A", 4096, 1.5), ("A", 8192, 2.0), ("B", 4096, 0.5)] {
            let mut row = Row::new();
            row.insert("System".into(), json!(s));
            row.insert("Len".into(), json!(l));
            row.insert("Decode".into(), json!(d));
            table.rows.push(row);
        }
        table
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("out.xlsx", "flat"), "out_flat.xlsx");
        assert_eq!(with_suffix("out.xlsx", ""), "out.xlsx");
        assert_eq!(with_suffix("out", "flat"), "out_flat");
    }

    #[test]
    fn test_format_output_filename() {
        let name = format_output_filename("analysis_{timestamp}.xlsx");
        assert!(name.starts_with("analysis_"));
        assert!(name.ends_with(".xlsx"));
        assert!(!name.contains("{timestamp}"));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table(&sample_table(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("System,Len,Decode"));
        assert_eq!(lines.next(), Some("A,4096,1.5"));
    }

    #[test]
    fn test_write_xlsx_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_table(&sample_table(), &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let result = write_table(&sample_table(), &path);
        assert!(matches!(result, Err(ExportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_split_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            dir: dir.path().to_path_buf(),
            filename: "split.xlsx".into(),
            split_by_npu: false,
        };
        let path = export_split_sheets(&sample_table(), "Len", &output, "").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_split_field_missing() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            dir: dir.path().to_path_buf(),
            filename: "split.xlsx".into(),
            split_by_npu: false,
        };
        let result = export_split_sheets(&sample_table(), "nope", &output, "");
        assert!(matches!(result, Err(ExportError::SplitFieldMissing(_))));
    }
}
