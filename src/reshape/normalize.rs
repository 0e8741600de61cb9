//! Baseline normalization.
//!
//! Joins every row to its baseline counterpart and rewrites each metric
//! column as a ratio to the baseline value. Rows match their baseline
//! on the row-index fields and derived tags, excluding the selector
//! field (which is exactly what varies between a row and its baseline)
//! and the presentation-only tags. `_row_type` stays in the match keys:
//! an aggregate row must find the baseline's aggregate row and a
//! single-unit row the baseline's single-unit row, regardless of how
//! many units each system reports.

use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::derive::{METRIC_LABEL_COLUMN, SORT_ORDER_COLUMN};
use crate::table::{as_f64, group_key, number_from_f64, round_to, values_equal, Row, Table};

/// Match keys: the pivot index minus the selector and presentation tags.
pub fn match_keys(index_fields: &[String], selector_field: &str) -> Vec<String> {
    index_fields
        .iter()
        .filter(|f| {
            f.as_str() != selector_field
                && f.as_str() != SORT_ORDER_COLUMN
                && f.as_str() != METRIC_LABEL_COLUMN
        })
        .cloned()
        .collect()
}

/// Rewrite metric columns as ratios against the baseline rows, in place.
///
/// Ratios are rounded to `decimal_places`. A row with no baseline match
/// keeps a null ratio; if no baseline row exists at all the table is
/// returned unmodified (logged, non-fatal).
pub fn normalize_against_baseline(
    table: &mut Table,
    baseline: &str,
    selector_field: &str,
    index_fields: &[String],
    decimal_places: u32,
) {
    let keys = match_keys(index_fields, selector_field);
    let data_cols: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !index_fields.contains(c) && c.as_str() != selector_field)
        .cloned()
        .collect();

    let baseline_value = Value::String(baseline.to_string());
    let mut baseline_rows: HashMap<String, Row> = HashMap::new();
    for row in &table.rows {
        let selector = row.get(selector_field).unwrap_or(&Value::Null);
        if values_equal(selector, &baseline_value) {
            // First baseline wins for duplicate match keys.
            baseline_rows
                .entry(group_key(row, &keys))
                .or_insert_with(|| row.clone());
        }
    }

    if baseline_rows.is_empty() {
        warn!(baseline = %baseline, "no row matches the normalization baseline, step skipped");
        return;
    }

    for row in &mut table.rows {
        let base = baseline_rows.get(&group_key(row, &keys));
        for col in &data_cols {
            let ratio = base.and_then(|b| {
                let own = as_f64(row.get(col).unwrap_or(&Value::Null))?;
                let base_val = as_f64(b.get(col).unwrap_or(&Value::Null))?;
                Some(own / base_val)
            });
            let cell = match ratio {
                Some(r) => number_from_f64(round_to(r, decimal_places)),
                None => Value::Null,
            };
            row.insert(col.clone(), cell);
        }
    }
}
