//! Metrics registry for coordinating phase-specific metrics
//!
//! Registers the metrics of every phase and detects naming conflicts early.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Register all metrics from all phases
pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::silver::SilverMetrics>(&mut all_metrics);
    register_phase_metrics::<super::gold::GoldMetrics>(&mut all_metrics);

    info!(
        "Registered {} total metrics across all phases",
        all_metrics.len()
    );
    for doc in all_metrics.values() {
        debug!(
            phase = extract_phase_from_metric_name(doc.name),
            metric_type = ?doc.metric_type,
            labels = ?doc.labels,
            "{}: {}",
            doc.name,
            doc.help
        );
    }
}

/// Register metrics for a specific phase and detect conflicts
fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<String, MetricDoc>) {
    T::register_metrics();
    let phase_docs = T::metrics_documentation();
    let phase_name = T::phase_name();

    info!(
        "Registering {} metrics for phase '{}'",
        phase_docs.len(),
        phase_name
    );

    for doc in phase_docs {
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' is already registered (phase '{}')",
                doc.name, phase_name
            );
        } else {
            all_metrics.insert(doc.name.to_string(), doc);
        }
    }
}

/// Extract phase name from metric name (e.g., "etl_silver_files_routed_total" -> "silver")
fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    if let Some(stripped) = metric_name.strip_prefix("etl_") {
        if let Some(next_underscore) = stripped.find('_') {
            return &stripped[..next_underscore];
        }
    }
    "unknown"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{GoldMetrics, SilverMetrics};

    #[test]
    fn test_extract_phase_from_metric_name() {
        assert_eq!(
            extract_phase_from_metric_name("etl_silver_files_routed_total"),
            "silver"
        );
        assert_eq!(
            extract_phase_from_metric_name("etl_gold_load_duration_seconds"),
            "gold"
        );
        assert_eq!(
            extract_phase_from_metric_name("invalid_metric_name"),
            "unknown"
        );
    }

    #[test]
    fn test_phase_metric_names_are_unique() {
        let mut names: Vec<&str> = SilverMetrics::metrics_documentation()
            .into_iter()
            .chain(GoldMetrics::metrics_documentation())
            .map(|d| d.name)
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.iter().all(|n| n.starts_with("etl_")));
    }
}
