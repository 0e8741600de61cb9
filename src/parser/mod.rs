//! CSV ingestion with encoding and delimiter auto-detection.
//!
//! Converts result CSVs into JSON object records. Two layouts are
//! accepted:
//!
//! - standard: first row is the header, each following row is a record;
//! - transposed per-run: the first column holds field names and each
//!   subsequent column holds one run's values. Detected by the presence
//!   of `field_name` or `model_name` in the first column and flipped
//!   into standard orientation before record construction.
//!
//! No reshaping logic lives here.

use serde_json::{json, Map, Value};
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Result of parsing with metadata.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records as JSON objects (all cells are strings).
    pub records: Vec<Value>,
    /// Detected or used encoding.
    pub encoding: String,
    /// Detected or used delimiter.
    pub delimiter: char,
    /// Column headers.
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "gb2312" | "gbk" | "gb18030" => "gb18030".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string()),
        "gb18030" | "gbk" | "gb2312" => encoding_rs::GB18030.decode(bytes).0.to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    // Strip a UTF-8 BOM left over from utf-8-sig exports.
    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Split decoded content into a cell grid, skipping blank lines.
fn read_grid(content: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut grid = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<String> = line
            .split(delimiter)
            .map(|s| s.trim().trim_matches('"').to_string())
            .collect();
        grid.push(cells);
    }
    grid
}

/// True if the grid is a transposed per-run table.
///
/// Mirrors the original heuristic: the first column of the raw grid
/// (header cell included) mentions `field_name` or `model_name`.
fn is_transposed(grid: &[Vec<String>]) -> bool {
    grid.iter().any(|row| {
        row.first()
            .map(|c| c == "field_name" || c == "model_name")
            .unwrap_or(false)
    })
}

/// Flip a transposed grid into (headers, data rows).
///
/// First-column cells become headers; column `k+1` becomes record `k`.
fn transpose_grid(grid: &[Vec<String>]) -> (Vec<String>, Vec<Vec<String>>) {
    let headers: Vec<String> = grid
        .iter()
        .map(|row| row.first().cloned().unwrap_or_default())
        .collect();

    let run_count = grid
        .iter()
        .map(|row| row.len().saturating_sub(1))
        .max()
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(run_count);
    for run in 0..run_count {
        let row: Vec<String> = grid
            .iter()
            .map(|r| r.get(run + 1).cloned().unwrap_or_default())
            .collect();
        rows.push(row);
    }

    (headers, rows)
}

/// Build JSON object records from headers plus data rows.
fn records_from_grid(headers: &[String], rows: &[Vec<String>]) -> Vec<Value> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let raw_value = row.get(i).map(String::as_str).unwrap_or("");
            obj.insert(header.clone(), json!(raw_value));
        }
        records.push(Value::Object(obj));
    }
    records
}

/// Parse CSV bytes with auto-detection of encoding, delimiter, and layout.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    let grid = read_grid(&content, delimiter);
    if grid.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let (headers, data_rows) = if is_transposed(&grid) {
        transpose_grid(&grid)
    } else {
        let headers = grid[0].clone();
        (headers, grid[1..].to_vec())
    };

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    Ok(ParseResult {
        records: records_from_grid(&headers, &data_rows),
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a CSV file with auto-detection of encoding, delimiter, and layout.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse a CSV string with an explicit delimiter (standard layout only).
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<Vec<Value>> {
    let grid = read_grid(content, delimiter);
    if grid.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    let headers = grid[0].clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }
    Ok(records_from_grid(&headers, &grid[1..]))
}
