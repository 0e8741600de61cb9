//! Table value model and cell helpers.
//!
//! Records flow through the pipeline as `serde_json::Value` objects
//! (field name → value); the reshaping engine materializes them into a
//! [`Table`]: an explicit column order plus a list of object rows. The
//! column list is the single source of truth for ordering — row objects
//! are plain maps and carry no order of their own.
//!
//! The helpers here implement the numeric-tolerant cell semantics the
//! whole pipeline relies on: values arrive from CSV as strings, and a
//! cell that *looks* numeric must compare, sort, and divide as a number
//! (so that `"10"` sorts after `"9"`, not before `"2"`).

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// One output row: field name → cell value.
pub type Row = Map<String, Value>;

/// An ordered table: explicit column order plus object rows.
///
/// Rows may omit keys; a missing key reads as a null cell.
#[derive(Debug, Clone)]
pub struct Table {
    /// Output column names, in presentation order.
    pub columns: Vec<String>,
    /// Row objects keyed by column name.
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column order.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Cell value at (row, column), null if absent.
    pub fn cell<'a>(&'a self, row: usize, column: &str) -> &'a Value {
        self.rows[row].get(column).unwrap_or(&Value::Null)
    }

    /// Remove a column from the header and from every row.
    pub fn drop_column(&mut self, name: &str) {
        self.columns.retain(|c| c != name);
        for row in &mut self.rows {
            row.remove(name);
        }
    }

    /// Rename a column in the header and re-key every row.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        for c in &mut self.columns {
            if c == from {
                *c = to.to_string();
            }
        }
        for row in &mut self.rows {
            if let Some(v) = row.remove(from) {
                row.insert(to.to_string(), v);
            }
        }
    }
}

/// Numeric view of a cell: JSON numbers directly, strings if they parse.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                t.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// True for null cells and blank strings.
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Render a cell for display, join keys, and column labels.
///
/// Integral numbers render without a trailing `.0`, so a cell coerced
/// to the number `8` produces the same text as the raw string `"8"`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Wrap an `f64` as a JSON number, preferring integer representation.
pub fn number_from_f64(f: f64) -> Value {
    if !f.is_finite() {
        return Value::Null;
    }
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Coerce to a number, losing unparseable values (`errors=coerce`).
pub fn coerce_numeric(value: &Value) -> Value {
    match as_f64(value) {
        Some(f) => number_from_f64(f),
        None => Value::Null,
    }
}

/// Coerce to a number when possible, otherwise keep the original value.
///
/// Used on row-index fields after pivoting so that numeric-looking text
/// sorts numerically while genuinely textual keys survive unchanged.
pub fn coerce_numeric_keep(value: &Value) -> Value {
    match as_f64(value) {
        Some(f) => number_from_f64(f),
        None => value.clone(),
    }
}

/// Total order over cells: numbers before text, missing values last.
///
/// Two cells that both read as numbers compare numerically (this covers
/// numeric strings); otherwise their display forms compare as text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (is_missing(a), is_missing(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => display_value(a).cmp(&display_value(b)),
        },
    }
}

/// Equality for filter/join purposes, numeric-aware.
///
/// A missing cell equals nothing, not even another missing cell.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if is_missing(a) || is_missing(b) {
        return false;
    }
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => display_value(a) == display_value(b),
    }
}

/// Compare two rows field-by-field, in the given field order.
pub fn compare_rows(a: &Row, b: &Row, fields: &[String]) -> Ordering {
    for f in fields {
        let ord = compare_values(
            a.get(f).unwrap_or(&Value::Null),
            b.get(f).unwrap_or(&Value::Null),
        );
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Canonical string key over a row's values for the given fields.
///
/// Used for pivot grouping and the baseline join. Built from
/// [`display_value`], so a coerced number and its original text form
/// produce the same key.
pub fn group_key(row: &Row, fields: &[String]) -> String {
    let mut key = String::new();
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            key.push('\u{1f}');
        }
        key.push_str(&display_value(row.get(f).unwrap_or(&Value::Null)));
    }
    key
}

/// Round to a fixed number of decimal places.
pub fn round_to(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}
