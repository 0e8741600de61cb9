//! The reshaping and normalization engine.
//!
//! - `groups`: metric-group resolution (total / per-unit pairs)
//! - `derive`: derived-row expansion (aggregate vs single-unit)
//! - `pivot`: long-to-wide pivot assembly
//! - `order`: prefix-priority column ordering
//! - `normalize`: baseline-ratio normalization
//! - `sort`: pattern-priority row ordering
//! - `pipeline`: the staged orchestration of the above

pub mod derive;
pub mod groups;
pub mod normalize;
pub mod order;
pub mod pivot;
pub mod pipeline;
pub mod sort;

pub use derive::{
    expand_derived_rows, tag_default_rows, RowType, AGGREGATE_FALLBACK_LABEL,
    METRIC_LABEL_COLUMN, METRIC_LABEL_HEADER, ROW_TYPE_COLUMN, SINGLE_UNIT_LABEL,
    SORT_ORDER_COLUMN, SOURCE_FILE_COLUMN,
};
pub use groups::{resolve_metric_groups, MetricGroup};
pub use normalize::normalize_against_baseline;
pub use order::order_columns;
pub use pipeline::{build_flat_table, build_pivot_table, detect_selector_field};
pub use pivot::{assemble_pivot, PivotTarget};
pub use sort::{matches_pattern, pattern_priority, sort_rows};
