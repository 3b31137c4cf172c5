//! Silver Phase Metrics
//!
//! Routing outcomes, rows written and removed during cleaning, and quality
//! issues by kind.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::pipeline::processing::quality::{IssueKind, Severity};

/// Metrics collection for the Silver phase
pub struct SilverMetrics;

impl SilverMetrics {
    /// A file was handed to a cleaner
    pub fn record_file_routed(family: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "silver", "files_routed"), "family" => family)
            .increment(1);
    }

    /// A file was skipped (unknown family or unusable content)
    pub fn record_file_skipped() {
        ::metrics::counter!(phase_metric!(counter, "silver", "files_skipped")).increment(1);
    }

    /// Reading or cleaning a file failed
    pub fn record_file_failed() {
        ::metrics::counter!(phase_metric!(counter, "silver", "files_failed")).increment(1);
    }

    pub fn record_rows_written(table: &'static str, rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "silver", "rows_written"), "table" => table)
            .increment(rows as u64);
    }

    /// Rows dropped by a cleaning step (`reason` is `null` or `duplicate`)
    pub fn record_rows_removed(reason: &'static str, rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "silver", "rows_removed"), "reason" => reason)
            .increment(rows as u64);
    }

    pub fn record_quality_issue(kind: IssueKind, severity: Severity) {
        ::metrics::counter!(
            phase_metric!(counter, "silver", "quality_issues"),
            "kind" => kind.as_str(),
            "severity" => severity.as_str()
        )
        .increment(1);
    }

    pub fn record_run_duration(duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "silver", "run_duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for SilverMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "silver", "files_routed"));
        let _ = counter!(phase_metric!(counter, "silver", "files_skipped"));
        let _ = counter!(phase_metric!(counter, "silver", "files_failed"));
        let _ = counter!(phase_metric!(counter, "silver", "rows_written"));
        let _ = counter!(phase_metric!(counter, "silver", "rows_removed"));
        let _ = counter!(phase_metric!(counter, "silver", "quality_issues"));
        let _ = histogram!(phase_metric!(histogram, "silver", "run_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "silver"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "silver", "files_routed"),
                metric_type: MetricType::Counter,
                help: "Bronze files handed to a department cleaner",
                labels: vec!["family"],
            },
            MetricDoc {
                name: phase_metric!(counter, "silver", "files_skipped"),
                metric_type: MetricType::Counter,
                help: "Bronze files skipped as unknown or unusable",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "silver", "files_failed"),
                metric_type: MetricType::Counter,
                help: "Bronze files whose read or clean step failed",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "silver", "rows_written"),
                metric_type: MetricType::Counter,
                help: "Rows persisted to silver tables",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "silver", "rows_removed"),
                metric_type: MetricType::Counter,
                help: "Rows dropped for null keys or duplicate keys",
                labels: vec!["reason"],
            },
            MetricDoc {
                name: phase_metric!(counter, "silver", "quality_issues"),
                metric_type: MetricType::Counter,
                help: "Quality issues logged",
                labels: vec!["kind", "severity"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "silver", "run_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall time of a silver run",
                labels: vec![],
            },
        ]
    }
}
