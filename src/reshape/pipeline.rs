//! Core reshaping orchestration.
//!
//! Runs the engine stages in order over preprocessed records:
//! metric-group resolution, derived-row expansion, pivot assembly,
//! column ordering, baseline normalization, row sorting, and finally
//! alias renaming. Each stage takes and returns explicit values; no
//! state is shared between invocations.

use serde_json::Value;
use tracing::warn;

use super::derive::{
    expand_derived_rows, tag_default_rows, value_column, METRIC_LABEL_COLUMN,
    METRIC_LABEL_HEADER, ROW_TYPE_COLUMN, SORT_ORDER_COLUMN,
};
use super::groups::resolve_metric_groups;
use super::normalize::normalize_against_baseline;
use super::order::order_columns;
use super::pivot::{assemble_pivot, PivotTarget};
use super::sort::sort_rows;
use crate::config::{Config, FieldSpec};
use crate::error::{ReshapeError, ReshapeResult};
use crate::filter::schema_contains;
use crate::table::{coerce_numeric_keep, Table};

/// The row-index field carrying system/variant identity: the first row
/// field whose name mentions "system".
pub fn detect_selector_field(row_fields: &[FieldSpec]) -> Option<String> {
    row_fields
        .iter()
        .find(|f| f.field.to_lowercase().contains("system"))
        .map(|f| f.field.clone())
}

/// Keep only fields that exist in the data, warning on the rest.
fn existing_fields(records: &[Value], specs: &[FieldSpec], role: &str) -> Vec<String> {
    let mut fields = Vec::new();
    for spec in specs {
        if schema_contains(records, &spec.field) {
            fields.push(spec.field.clone());
        } else {
            warn!(field = %spec.field, role = %role, "configured field does not exist, skipped");
        }
    }
    fields
}

/// Build the analyst-facing wide pivot table.
pub fn build_pivot_table(records: &[Value], config: &Config) -> ReshapeResult<Table> {
    let iv = &config.independent_variables;
    let analysis = &config.analysis;

    let groups = resolve_metric_groups(&config.dependent_variables);
    let row_fields = existing_fields(records, &iv.row_fields, "row");
    let column_fields = existing_fields(records, &iv.column_fields, "column");

    let derived = &analysis.derived_rows;
    let (rows, tag_fields, targets): (Vec<Value>, Vec<&str>, Vec<PivotTarget>) = if derived.enabled
    {
        let rows = expand_derived_rows(records, &groups, &derived.npu_count_field);
        let targets = groups
            .iter()
            .map(|g| PivotTarget {
                prefix: g.prefix.clone(),
                value_column: value_column(&g.prefix),
            })
            .collect();
        (
            rows,
            vec![METRIC_LABEL_COLUMN, SORT_ORDER_COLUMN, ROW_TYPE_COLUMN],
            targets,
        )
    } else {
        let rows = tag_default_rows(records);
        let targets = config
            .dependent_variables
            .iter()
            .map(|dv| PivotTarget {
                prefix: dv.group_prefix().to_string(),
                value_column: dv.field.clone(),
            })
            .collect();
        (rows, vec![ROW_TYPE_COLUMN], targets)
    };

    let mut index_fields = row_fields.clone();
    index_fields.extend(tag_fields.iter().map(|s| s.to_string()));

    let table = assemble_pivot(&rows, &row_fields, &index_fields, &column_fields, &targets)?;
    let mut table = order_columns(table, &index_fields, &analysis.metric_order);

    let selector = detect_selector_field(&iv.row_fields);

    if let (Some(baseline), Some(selector_field)) =
        (analysis.normalization_baseline.as_deref(), selector.as_deref())
    {
        if table.has_column(selector_field) {
            normalize_against_baseline(
                &mut table,
                baseline,
                selector_field,
                &index_fields,
                analysis.decimal_places,
            );
        }
    }

    sort_rows(
        &mut table,
        &analysis.system_order,
        selector.as_deref(),
        &row_fields,
    );

    table.drop_column(SORT_ORDER_COLUMN);
    table.drop_column(ROW_TYPE_COLUMN);

    for spec in &iv.row_fields {
        if let Some(alias) = spec.alias.as_deref() {
            table.rename_column(&spec.field, alias);
        }
    }
    table.rename_column(METRIC_LABEL_COLUMN, METRIC_LABEL_HEADER);

    Ok(table)
}

/// Build the flat table: selected raw columns, numerically sorted.
pub fn build_flat_table(records: &[Value], config: &Config) -> ReshapeResult<Table> {
    let iv = &config.independent_variables;

    let row_fields: Vec<String> = iv.row_fields.iter().map(|f| f.field.clone()).collect();
    let mut display_order: Vec<String> = row_fields.clone();
    display_order.extend(iv.column_fields.iter().map(|f| f.field.clone()));
    display_order.extend(config.additional_fields.iter().cloned());
    display_order.extend(config.dependent_variables.iter().map(|dv| dv.field.clone()));

    let mut columns: Vec<String> = Vec::new();
    for field in display_order {
        if !columns.contains(&field) && schema_contains(records, &field) {
            columns.push(field);
        }
    }
    if columns.is_empty() {
        return Err(ReshapeError::NoColumns);
    }

    let mut table = Table::new(columns.clone());
    for record in records {
        let Some(obj) = record.as_object() else { continue };
        let mut row = crate::table::Row::new();
        for col in &columns {
            row.insert(col.clone(), obj.get(col).cloned().unwrap_or(Value::Null));
        }
        table.rows.push(row);
    }

    let sort_fields: Vec<String> = row_fields
        .iter()
        .filter(|f| table.has_column(f))
        .cloned()
        .collect();
    for field in &sort_fields {
        for row in &mut table.rows {
            if let Some(v) = row.get(field) {
                let coerced = coerce_numeric_keep(v);
                row.insert(field.clone(), coerced);
            }
        }
    }
    sort_rows(&mut table, &[], None, &sort_fields);

    for spec in iv.row_fields.iter().chain(iv.column_fields.iter()) {
        if let Some(alias) = spec.alias.as_deref() {
            table.rename_column(&spec.field, alias);
        }
    }
    for dv in &config.dependent_variables {
        if let Some(alias) = dv.alias.as_deref() {
            table.rename_column(&dv.field, alias);
        }
    }

    Ok(table)
}
