//! Metric group resolution.
//!
//! Configured dependent variables are classified into logical metric
//! groups keyed by a shared prefix. A group holds up to two source
//! fields: the aggregate ("total") variant and the per-unit ("single")
//! variant of the same measurement.

use crate::config::DependentVariableSpec;

/// A logical measurement with a total and/or a per-unit source field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricGroup {
    /// Shared output prefix naming the group.
    pub prefix: String,
    /// Field holding the aggregate measurement.
    pub total_field: Option<String>,
    /// Field holding the per-unit measurement.
    pub single_field: Option<String>,
}

impl MetricGroup {
    /// Source field for single-unit rows: per-unit variant, else the
    /// aggregate variant.
    pub fn single_source(&self) -> Option<&str> {
        self.single_field.as_deref().or(self.total_field.as_deref())
    }

    /// A prefill-like group never spreads across the column-key axis;
    /// that quantity is invariant under the scanned column dimension.
    pub fn is_prefill_like(&self) -> bool {
        self.prefix.to_lowercase().contains("prefill")
    }
}

/// True if the spec names the per-unit variant of its group.
fn is_single_variant(spec: &DependentVariableSpec) -> bool {
    let alias = spec.alias.as_deref().unwrap_or("").to_lowercase();
    spec.field.to_lowercase().contains("per_npu")
        || alias.contains("single")
        || alias.contains("per npu")
}

/// Classify dependent variables into metric groups, in configured order.
///
/// Slot assignment is last-wins: if two specs map to the same group and
/// variant, the later spec silently overrides the earlier one.
pub fn resolve_metric_groups(specs: &[DependentVariableSpec]) -> Vec<MetricGroup> {
    let mut groups: Vec<MetricGroup> = Vec::new();

    for spec in specs {
        let prefix = spec.group_prefix().to_string();
        let group = match groups.iter_mut().find(|g| g.prefix == prefix) {
            Some(g) => g,
            None => {
                groups.push(MetricGroup {
                    prefix,
                    total_field: None,
                    single_field: None,
                });
                groups.last_mut().unwrap()
            }
        };

        if is_single_variant(spec) {
            group.single_field = Some(spec.field.clone());
        } else {
            group.total_field = Some(spec.field.clone());
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(field: &str, alias: Option<&str>, prefix: Option<&str>) -> DependentVariableSpec {
        DependentVariableSpec {
            field: field.to_string(),
            alias: alias.map(String::from),
            prefix: prefix.map(String::from),
        }
    }

    #[test]
    fn test_total_and_single_pair() {
        let groups = resolve_metric_groups(&[
            spec("decode_tp", Some("Decode Total"), Some("Decode")),
            spec("decode_tp_per_npu", Some("Decode Single"), Some("Decode")),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].prefix, "Decode");
        assert_eq!(groups[0].total_field.as_deref(), Some("decode_tp"));
        assert_eq!(groups[0].single_field.as_deref(), Some("decode_tp_per_npu"));
    }

    #[test]
    fn test_single_heuristics() {
        // Field name mentions per_npu.
        let g = resolve_metric_groups(&[spec("tp_PER_NPU", None, Some("T"))]);
        assert!(g[0].single_field.is_some());

        // Alias mentions "single".
        let g = resolve_metric_groups(&[spec("tp", Some("Single-card TP"), Some("T"))]);
        assert!(g[0].single_field.is_some());

        // Alias mentions "per npu".
        let g = resolve_metric_groups(&[spec("tp", Some("TP per NPU"), Some("T"))]);
        assert!(g[0].single_field.is_some());

        // Nothing matches: total variant.
        let g = resolve_metric_groups(&[spec("tp", Some("Total TP"), Some("T"))]);
        assert!(g[0].single_field.is_none());
        assert!(g[0].total_field.is_some());
    }

    #[test]
    fn test_last_wins_override() {
        let groups = resolve_metric_groups(&[
            spec("old_total", None, Some("Decode")),
            spec("new_total", None, Some("Decode")),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_field.as_deref(), Some("new_total"));
    }

    #[test]
    fn test_group_order_follows_config() {
        let groups = resolve_metric_groups(&[
            spec("b_metric", None, Some("B")),
            spec("a_metric", None, Some("A")),
        ]);

        let prefixes: Vec<&str> = groups.iter().map(|g| g.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["B", "A"]);
    }

    #[test]
    fn test_single_source_falls_back_to_total() {
        let g = MetricGroup {
            prefix: "Decode".into(),
            total_field: Some("tp".into()),
            single_field: None,
        };
        assert_eq!(g.single_source(), Some("tp"));
    }

    #[test]
    fn test_prefill_like() {
        let g = MetricGroup {
            prefix: "Prefill Latency".into(),
            total_field: Some("x".into()),
            single_field: None,
        };
        assert!(g.is_prefill_like());
    }
}
