//! Pivot assembly.
//!
//! Groups derived rows by the row-index fields and spreads each metric
//! across the column-key fields into wide columns, one pivot block per
//! metric group, then concatenates the blocks horizontally over a
//! shared row index.
//!
//! Duplicate (row-index, column-key) cells are a configuration error
//! tolerated by an explicit deduplication policy: the first non-null
//! value encountered wins and the rest are ignored. No averaging or
//! reduction is ever performed.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::error::{ReshapeError, ReshapeResult};
use crate::table::{
    coerce_numeric_keep, compare_values, display_value, group_key, is_missing, Row, Table,
};

/// One metric group's pivot request: output prefix plus value column.
#[derive(Debug, Clone)]
pub struct PivotTarget {
    pub prefix: String,
    pub value_column: String,
}

/// A single metric group pivoted into wide columns.
struct PivotBlock {
    /// Output column names, widest column-key combination first.
    columns: Vec<String>,
    /// index key → (column name → selected value).
    cells: HashMap<String, HashMap<String, Value>>,
}

/// First-non-null-wins cell selection.
fn offer(slot: &mut HashMap<String, Value>, column: String, value: Value) {
    let replace = match slot.get(&column) {
        None => true,
        Some(existing) => is_missing(existing) && !is_missing(&value),
    };
    if replace {
        slot.insert(column, value);
    }
}

/// Assemble the wide table from derived rows.
///
/// `index_fields` is the full pivot index (row fields plus derived-row
/// tags); `row_fields` names the subset re-coerced to numbers after
/// concatenation so later sorting is numeric, not lexicographic.
pub fn assemble_pivot(
    rows: &[Value],
    row_fields: &[String],
    index_fields: &[String],
    column_fields: &[String],
    targets: &[PivotTarget],
) -> ReshapeResult<Table> {
    let objects: Vec<&Row> = rows.iter().filter_map(|r| r.as_object()).collect();

    // Shared row index: first-seen order of distinct index combinations.
    let mut index_order: Vec<String> = Vec::new();
    let mut index_snapshots: HashMap<String, Row> = HashMap::new();
    for obj in &objects {
        let key = group_key(obj, index_fields);
        index_snapshots.entry(key.clone()).or_insert_with(|| {
            index_order.push(key.clone());
            let mut snapshot = Row::new();
            for f in index_fields {
                snapshot.insert(f.clone(), obj.get(f).cloned().unwrap_or(Value::Null));
            }
            snapshot
        });
    }

    let unit_suffix = if column_fields.iter().any(|f| {
        let lower = f.to_lowercase();
        lower.contains("time") || lower.contains("limit")
    }) {
        "ms"
    } else {
        ""
    };

    let mut blocks: Vec<PivotBlock> = Vec::new();
    for target in targets {
        if !objects.iter().any(|o| o.contains_key(&target.value_column)) {
            warn!(
                field = %target.value_column,
                metric = %target.prefix,
                "value column does not exist in the data, metric skipped"
            );
            continue;
        }

        let prefill_like = target.prefix.to_lowercase().contains("prefill");
        let block = if !column_fields.is_empty() && !prefill_like {
            pivot_spread(&objects, index_fields, column_fields, target, unit_suffix)
        } else {
            pivot_single(&objects, index_fields, target)
        };
        blocks.push(block);
    }

    if blocks.is_empty() {
        return Err(ReshapeError::EmptyResult);
    }

    // Horizontal concatenation over the shared row index.
    let mut columns: Vec<String> = index_fields.to_vec();
    let mut used: HashSet<String> = columns.iter().cloned().collect();
    let mut kept: Vec<Vec<String>> = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let mut block_kept = Vec::new();
        for col in &block.columns {
            if used.insert(col.clone()) {
                columns.push(col.clone());
                block_kept.push(col.clone());
            } else {
                warn!(column = %col, "duplicate pivot column name, first block wins");
            }
        }
        kept.push(block_kept);
    }

    let mut table = Table::new(columns);
    for key in &index_order {
        let mut row = index_snapshots[key].clone();
        for (block, block_kept) in blocks.iter().zip(&kept) {
            let cells = block.cells.get(key);
            for col in block_kept {
                let value = cells
                    .and_then(|c| c.get(col))
                    .cloned()
                    .unwrap_or(Value::Null);
                row.insert(col.clone(), value);
            }
        }
        table.rows.push(row);
    }

    // Numeric-looking row-index text becomes numeric so that "10" no
    // longer sorts before "2".
    for field in row_fields {
        for row in &mut table.rows {
            if let Some(v) = row.get(field) {
                let coerced = coerce_numeric_keep(v);
                row.insert(field.clone(), coerced);
            }
        }
    }

    Ok(table)
}

/// Spread one metric across the column-key fields.
fn pivot_spread(
    objects: &[&Row],
    index_fields: &[String],
    column_fields: &[String],
    target: &PivotTarget,
    unit_suffix: &str,
) -> PivotBlock {
    // Distinct column-key combinations, with raw values kept for sorting.
    let mut combo_order: Vec<String> = Vec::new();
    let mut combo_values: HashMap<String, Vec<Value>> = HashMap::new();
    let mut cells: HashMap<String, HashMap<String, Value>> = HashMap::new();

    for obj in objects {
        let combo_key = group_key(obj, column_fields);
        combo_values.entry(combo_key.clone()).or_insert_with(|| {
            combo_order.push(combo_key.clone());
            column_fields
                .iter()
                .map(|f| obj.get(f).cloned().unwrap_or(Value::Null))
                .collect()
        });

        let index_key = group_key(obj, index_fields);
        let value = obj.get(&target.value_column).cloned().unwrap_or(Value::Null);
        offer(cells.entry(index_key).or_default(), combo_key, value);
    }

    // Descending column-key order: the widest / most permissive setting
    // appears first.
    combo_order.sort_by(|a, b| {
        let va = &combo_values[a];
        let vb = &combo_values[b];
        for (x, y) in va.iter().zip(vb.iter()) {
            let ord = compare_values(x, y);
            if ord != std::cmp::Ordering::Equal {
                return ord.reverse();
            }
        }
        std::cmp::Ordering::Equal
    });

    let mut columns = Vec::with_capacity(combo_order.len());
    let mut rename: HashMap<String, String> = HashMap::new();
    for combo_key in &combo_order {
        let label = combo_values[combo_key]
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join("_");
        let name = format!("{}_{}{}", target.prefix, label, unit_suffix);
        rename.insert(combo_key.clone(), name.clone());
        columns.push(name);
    }

    let cells = cells
        .into_iter()
        .map(|(index_key, by_combo)| {
            let named = by_combo
                .into_iter()
                .map(|(combo_key, v)| (rename[&combo_key].clone(), v))
                .collect();
            (index_key, named)
        })
        .collect();

    PivotBlock { columns, cells }
}

/// Collapse one metric into a single column, ignoring the column keys.
fn pivot_single(objects: &[&Row], index_fields: &[String], target: &PivotTarget) -> PivotBlock {
    let mut cells: HashMap<String, HashMap<String, Value>> = HashMap::new();

    for obj in objects {
        let index_key = group_key(obj, index_fields);
        let value = obj.get(&target.value_column).cloned().unwrap_or(Value::Null);
        offer(cells.entry(index_key).or_default(), target.prefix.clone(), value);
    }

    PivotBlock {
        columns: vec![target.prefix.clone()],
        cells,
    }
}
