//! Column ordering.
//!
//! Reorders the wide metric columns by a configured list of name-prefix
//! priorities. Row-index columns always come first, in their original
//! order; data columns matching no prefix keep their original relative
//! order at the end.

use crate::table::Table;

/// Reorder data columns by `metric_order` prefix priority.
///
/// Idempotent: reapplying with the same `metric_order` is a no-op.
pub fn order_columns(mut table: Table, index_fields: &[String], metric_order: &[String]) -> Table {
    if metric_order.is_empty() {
        return table;
    }

    let index_cols: Vec<String> = table
        .columns
        .iter()
        .filter(|c| index_fields.contains(c))
        .cloned()
        .collect();
    let data_cols: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !index_fields.contains(c))
        .cloned()
        .collect();

    let mut ordered: Vec<String> = Vec::with_capacity(data_cols.len());
    for prefix in metric_order {
        for col in &data_cols {
            if col.starts_with(prefix.as_str()) && !ordered.contains(col) {
                ordered.push(col.clone());
            }
        }
    }
    for col in &data_cols {
        if !ordered.contains(col) {
            ordered.push(col.clone());
        }
    }

    let mut columns = index_cols;
    columns.extend(ordered);
    table.columns = columns;
    table
}
