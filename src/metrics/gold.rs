//! Gold Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

/// Metrics collection for the Gold phase
pub struct GoldMetrics;

impl GoldMetrics {
    pub fn record_rows_loaded(table: &'static str, rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "gold", "rows_loaded"), "table" => table)
            .increment(rows as u64);
    }

    /// Fact rows with at least one dimension key left null
    pub fn record_unresolved_fact_rows(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "gold", "unresolved_fact_rows"))
            .increment(rows as u64);
    }

    pub fn record_load_duration(duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "gold", "load_duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for GoldMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "gold", "rows_loaded"));
        let _ = counter!(phase_metric!(counter, "gold", "unresolved_fact_rows"));
        let _ = histogram!(phase_metric!(histogram, "gold", "load_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "gold"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "gold", "rows_loaded"),
                metric_type: MetricType::Counter,
                help: "Rows appended to warehouse tables",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "gold", "unresolved_fact_rows"),
                metric_type: MetricType::Counter,
                help: "Fact rows loaded with one or more null dimension keys",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "gold", "load_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall time of a gold load",
                labels: vec![],
            },
        ]
    }
}
