//! Row ordering and the wildcard pattern grammar.
//!
//! Output rows are ordered by a configured pattern-priority over the
//! selector field, then by the row-index fields, then by the derived
//! `_sort_order` tag (aggregate rows before single-unit rows). The
//! pattern grammar, evaluated case-insensitively:
//!
//! - `*X*` — value contains `X`
//! - `*X`  — value ends with `X`
//! - `X*`  — value starts with `X`
//! - `X`   — exact match
//!
//! The same grammar matches input filenames against
//! `input.file_pattern`.

use serde_json::Value;

use super::derive::SORT_ORDER_COLUMN;
use crate::table::{compare_rows, display_value, Table};

/// Evaluate one wildcard pattern against a value, case-insensitively.
pub fn matches_pattern(pattern: &str, value: &str) -> bool {
    let value = value.to_uppercase();
    let pattern = pattern.to_uppercase();

    if pattern.starts_with('*') && pattern.ends_with('*') && pattern.len() >= 2 {
        let keyword = &pattern[1..pattern.len() - 1];
        value.contains(keyword)
    } else if let Some(suffix) = pattern.strip_prefix('*') {
        value.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        value.starts_with(prefix)
    } else {
        value == pattern
    }
}

/// Index of the first pattern the value satisfies; unmatched values get
/// `patterns.len()` and sort last.
pub fn pattern_priority(value: &str, patterns: &[String]) -> usize {
    patterns
        .iter()
        .position(|p| matches_pattern(p, value))
        .unwrap_or(patterns.len())
}

/// Sort rows by `(pattern priority, row-index fields, _sort_order)`.
///
/// Stable and deterministic: re-sorting sorted output is a no-op. With
/// no patterns or no usable selector the priority key drops out.
pub fn sort_rows(
    table: &mut Table,
    system_order: &[String],
    selector_field: Option<&str>,
    row_fields: &[String],
) {
    let selector = selector_field.filter(|f| table.has_column(f));
    let use_patterns = !system_order.is_empty() && selector.is_some();

    let mut sort_fields: Vec<String> = row_fields.to_vec();
    if table.has_column(SORT_ORDER_COLUMN) {
        sort_fields.push(SORT_ORDER_COLUMN.to_string());
    }

    table.rows.sort_by(|a, b| {
        if use_patterns {
            let field = selector.unwrap();
            let pa = pattern_priority(
                &display_value(a.get(field).unwrap_or(&Value::Null)),
                system_order,
            );
            let pb = pattern_priority(
                &display_value(b.get(field).unwrap_or(&Value::Null)),
                system_order,
            );
            pa.cmp(&pb).then_with(|| compare_rows(a, b, &sort_fields))
        } else {
            compare_rows(a, b, &sort_fields)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Row;
    use serde_json::json;

    #[test]
    fn test_pattern_grammar() {
        // contains
        assert!(matches_pattern("*POR*", "A_POR_1"));
        assert!(!matches_pattern("*POR*", "LEGACY"));
        // ends with
        assert!(matches_pattern("*LEG", "X_LEG"));
        assert!(!matches_pattern("*LEG", "LEG_X"));
        // starts with
        assert!(matches_pattern("LEG*", "LEG_X"));
        assert!(!matches_pattern("LEG*", "X_LEG"));
        // exact
        assert!(matches_pattern("POR", "por"));
        assert!(!matches_pattern("POR", "POR_A"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_pattern("*por*", "A_POR_1"));
        assert!(matches_pattern("*POR*", "a_por_1"));
    }

    #[test]
    fn test_priority_assignment() {
        let order = vec!["*POR*".to_string(), "LEG*".to_string()];
        assert_eq!(pattern_priority("X_LEG", &order), 1);
        assert_eq!(pattern_priority("A_POR_1", &order), 0);
        assert_eq!(pattern_priority("Z", &order), 2);
    }

    fn make_table(selectors: &[&str]) -> Table {
        let mut table = Table::new(vec!["system".to_string()]);
        for s in selectors {
            let mut row = Row::new();
            row.insert("system".to_string(), json!(s));
            table.rows.push(row);
        }
        table
    }

    #[test]
    fn test_sort_by_pattern_priority() {
        let order = vec!["*POR*".to_string(), "LEG*".to_string()];
        let mut table = make_table(&["X_LEG", "A_POR_1", "Z"]);

        sort_rows(&mut table, &order, Some("system"), &["system".to_string()]);

        let systems: Vec<String> = table
            .rows
            .iter()
            .map(|r| display_value(&r["system"]))
            .collect();
        assert_eq!(systems, vec!["A_POR_1", "X_LEG", "Z"]);
    }

    #[test]
    fn test_resort_is_noop() {
        let order = vec!["*POR*".to_string()];
        let mut table = make_table(&["B", "A_POR", "A"]);
        sort_rows(&mut table, &order, Some("system"), &["system".to_string()]);
        let first: Vec<Row> = table.rows.clone();
        sort_rows(&mut table, &order, Some("system"), &["system".to_string()]);
        assert_eq!(table.rows, first);
    }

    #[test]
    fn test_fallback_sort_without_patterns() {
        let mut table = make_table(&["c", "a", "b"]);
        sort_rows(&mut table, &[], None, &["system".to_string()]);
        let systems: Vec<String> = table
            .rows
            .iter()
            .map(|r| display_value(&r["system"]))
            .collect();
        assert_eq!(systems, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_aggregate_rows_before_single_rows() {
        let mut table = Table::new(vec!["system".to_string(), SORT_ORDER_COLUMN.to_string()]);
        for (s, o) in [("A", 1), ("A", 0)] {
            let mut row = Row::new();
            row.insert("system".to_string(), json!(s));
            row.insert(SORT_ORDER_COLUMN.to_string(), json!(o));
            table.rows.push(row);
        }

        sort_rows(&mut table, &[], None, &["system".to_string()]);
        assert_eq!(table.rows[0][SORT_ORDER_COLUMN], json!(0));
        assert_eq!(table.rows[1][SORT_ORDER_COLUMN], json!(1));
    }

    #[test]
    fn test_numeric_row_field_sort() {
        let mut table = Table::new(vec!["len".to_string()]);
        for v in [json!(10), json!(2), json!(9)] {
            let mut row = Row::new();
            row.insert("len".to_string(), v);
            table.rows.push(row);
        }

        sort_rows(&mut table, &[], None, &["len".to_string()]);
        let lens: Vec<String> = table
            .rows
            .iter()
            .map(|r| display_value(&r["len"]))
            .collect();
        assert_eq!(lens, vec!["2", "9", "10"]);
    }
}
