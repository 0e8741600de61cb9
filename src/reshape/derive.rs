//! Derived-row expansion.
//!
//! When enabled, every input record is duplicated into two semantically
//! distinct rows: an aggregate-granularity row and a single-unit row.
//! Each copy carries tag columns identifying its granularity and, per
//! metric group, a synthetic value column holding the variant of the
//! measurement appropriate for that granularity.

use serde_json::{Map, Value};

use super::groups::MetricGroup;
use crate::table::as_f64;

/// Tag column: human-readable granularity label.
pub const METRIC_LABEL_COLUMN: &str = "_metric_label";
/// Tag column: granularity kind, used as a normalization match key.
pub const ROW_TYPE_COLUMN: &str = "_row_type";
/// Tag column: keeps aggregate rows before single-unit rows when sorting.
pub const SORT_ORDER_COLUMN: &str = "_sort_order";
/// Provenance column added at load time.
pub const SOURCE_FILE_COLUMN: &str = "_source_file";

/// Label for single-unit rows.
pub const SINGLE_UNIT_LABEL: &str = "single";
/// Label for aggregate rows whose unit count is unknown.
pub const AGGREGATE_FALLBACK_LABEL: &str = "aggregate";

/// Header the metric label column is renamed to in the final table.
pub const METRIC_LABEL_HEADER: &str = "Metric";

/// Granularity of a derived row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    Total,
    Single,
    Default,
}

impl RowType {
    pub fn as_str(self) -> &'static str {
        match self {
            RowType::Total => "total",
            RowType::Single => "single",
            RowType::Default => "default",
        }
    }
}

/// Synthetic value column name for a metric group.
pub fn value_column(prefix: &str) -> String {
    format!("_val_{prefix}")
}

/// Tag records with a default row type, without expansion.
pub fn tag_default_rows(records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .map(|r| {
            let mut obj = r.as_object().cloned().unwrap_or_default();
            obj.insert(
                ROW_TYPE_COLUMN.to_string(),
                Value::String(RowType::Default.as_str().to_string()),
            );
            Value::Object(obj)
        })
        .collect()
}

/// Expand each record into an aggregate copy and a single-unit copy.
///
/// Output length is exactly twice the input length; per input record
/// the aggregate copy precedes the single-unit copy. Tag columns are
/// written unconditionally — an upstream `_metric_label` value is
/// overwritten, last wins.
pub fn expand_derived_rows(
    records: &[Value],
    groups: &[MetricGroup],
    unit_count_field: &str,
) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(records.len() * 2);

    for record in records {
        let obj = record.as_object().cloned().unwrap_or_default();
        expanded.push(aggregate_copy(&obj, groups, unit_count_field));
        expanded.push(single_copy(&obj, groups));
    }

    expanded
}

fn aggregate_copy(obj: &Map<String, Value>, groups: &[MetricGroup], unit_count_field: &str) -> Value {
    let mut copy = obj.clone();

    let label = match obj.get(unit_count_field).and_then(as_f64) {
        Some(n) => format!("{}units", n as i64),
        None => AGGREGATE_FALLBACK_LABEL.to_string(),
    };
    copy.insert(METRIC_LABEL_COLUMN.to_string(), Value::String(label));
    copy.insert(
        ROW_TYPE_COLUMN.to_string(),
        Value::String(RowType::Total.as_str().to_string()),
    );
    copy.insert(SORT_ORDER_COLUMN.to_string(), Value::from(0));

    for group in groups {
        if let Some(field) = group.total_field.as_deref() {
            let value = obj.get(field).cloned().unwrap_or(Value::Null);
            copy.insert(value_column(&group.prefix), value);
        }
    }

    Value::Object(copy)
}

fn single_copy(obj: &Map<String, Value>, groups: &[MetricGroup]) -> Value {
    let mut copy = obj.clone();

    copy.insert(
        METRIC_LABEL_COLUMN.to_string(),
        Value::String(SINGLE_UNIT_LABEL.to_string()),
    );
    copy.insert(
        ROW_TYPE_COLUMN.to_string(),
        Value::String(RowType::Single.as_str().to_string()),
    );
    copy.insert(SORT_ORDER_COLUMN.to_string(), Value::from(1));

    for group in groups {
        if let Some(field) = group.single_source() {
            let value = obj.get(field).cloned().unwrap_or(Value::Null);
            copy.insert(value_column(&group.prefix), value);
        }
    }

    Value::Object(copy)
}
