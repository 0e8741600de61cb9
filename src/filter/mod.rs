//! Row-level filtering applied before reshaping.
//!
//! Filters narrow the record set with equality, ordering, and
//! membership tests. A filter naming a field that does not exist in the
//! data, or an unknown operator, is logged and skipped — never fatal.

use serde_json::Value;
use tracing::warn;

use crate::config::FilterSpec;
use crate::table::{compare_values, values_equal};
use std::cmp::Ordering;

/// True if any record carries the field.
pub fn schema_contains(records: &[Value], field: &str) -> bool {
    records
        .iter()
        .any(|r| r.as_object().map(|o| o.contains_key(field)).unwrap_or(false))
}

/// Apply all filters in order, returning the surviving records.
pub fn apply_filters(records: Vec<Value>, filters: &[FilterSpec]) -> Vec<Value> {
    let mut result = records;

    const OPERATORS: [&str; 8] = ["==", "!=", ">", "<", ">=", "<=", "in", "not_in"];

    for f in filters {
        if !schema_contains(&result, &f.field) {
            warn!(field = %f.field, "filter field does not exist, skipped");
            continue;
        }
        if !OPERATORS.contains(&f.operator.as_str()) {
            warn!(operator = %f.operator, "unknown filter operator, skipped");
            continue;
        }
        if f.values.is_empty() {
            continue;
        }

        result = result
            .into_iter()
            .filter(|record| row_matches(record, f))
            .collect();
    }

    result
}

fn row_matches(record: &Value, f: &FilterSpec) -> bool {
    let cell = record.get(&f.field).unwrap_or(&Value::Null);

    match f.operator.as_str() {
        // A multi-value equality degrades to membership.
        "==" => f.values.iter().any(|v| values_equal(cell, v)),
        "!=" => !f.values.iter().any(|v| values_equal(cell, v)),
        ">" => ordered(cell, &f.values[0], Ordering::Greater, false),
        "<" => ordered(cell, &f.values[0], Ordering::Less, false),
        ">=" => ordered(cell, &f.values[0], Ordering::Greater, true),
        "<=" => ordered(cell, &f.values[0], Ordering::Less, true),
        "in" => f.values.iter().any(|v| values_equal(cell, v)),
        "not_in" => !f.values.iter().any(|v| values_equal(cell, v)),
        // Unknown operators are rejected before the row loop.
        _ => true,
    }
}

/// Ordering test; missing cells never satisfy an ordering comparison.
fn ordered(cell: &Value, bound: &Value, want: Ordering, or_equal: bool) -> bool {
    if crate::table::is_missing(cell) || crate::table::is_missing(bound) {
        return false;
    }
    let ord = compare_values(cell, bound);
    ord == want || (or_equal && ord == Ordering::Equal)
}
