use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::error::Result;

/// Kinds of findings the validators record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// Required columns absent from the source
    MissingColumns,
    /// Nulls found in a key column
    NullValues,
    /// Repeated key tuples
    Duplicates,
    /// Values that could not be read as dates
    InvalidDatetime,
    /// Values that could not be read as numbers
    InvalidNumeric,
    /// Read or clean failure caught at the router
    ProcessingError,
    /// The product table needed for line-item product resolution was unreadable
    ProductDimLoadError,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingColumns => "MISSING_COLUMNS",
            IssueKind::NullValues => "NULL_VALUES",
            IssueKind::Duplicates => "DUPLICATES",
            IssueKind::InvalidDatetime => "INVALID_DATETIME",
            IssueKind::InvalidNumeric => "INVALID_NUMERIC",
            IssueKind::ProcessingError => "PROCESSING_ERROR",
            IssueKind::ProductDimLoadError => "PRODUCT_DIM_LOAD_ERROR",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding. Issues are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub timestamp: DateTime<Utc>,
    /// Canonical table name, or the source file name for failures before routing
    pub table: String,
    pub issue_type: IssueKind,
    pub details: String,
    pub severity: Severity,
}

/// Append-only log of quality issues for one pipeline run
#[derive(Debug, Default)]
pub struct QualityLog {
    issues: Vec<QualityIssue>,
}

impl QualityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue and echo it to the tracing output
    pub fn log(
        &mut self,
        table: impl Into<String>,
        issue_type: IssueKind,
        details: impl Into<String>,
        severity: Severity,
    ) {
        let issue = QualityIssue {
            timestamp: Utc::now(),
            table: table.into(),
            issue_type,
            details: details.into(),
            severity,
        };
        match severity {
            Severity::Warning => warn!(table = %issue.table, issue = %issue_type, "{}", issue.details),
            Severity::Error => error!(table = %issue.table, issue = %issue_type, "{}", issue.details),
        }
        crate::metrics::silver::SilverMetrics::record_quality_issue(issue_type, severity);
        self.issues.push(issue);
    }

    pub fn warning(&mut self, table: impl Into<String>, issue_type: IssueKind, details: impl Into<String>) {
        self.log(table, issue_type, details, Severity::Warning);
    }

    pub fn error(&mut self, table: impl Into<String>, issue_type: IssueKind, details: impl Into<String>) {
        self.log(table, issue_type, details, Severity::Error);
    }

    pub fn issues(&self) -> &[QualityIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a QualityIssue> + 'a {
        self.issues.iter().filter(move |i| i.table == table)
    }

    pub fn has_issue(&self, table: &str, kind: IssueKind) -> bool {
        self.for_table(table).any(|i| i.issue_type == kind)
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Warning).count()
    }

    /// Print a summary of ERROR issues for `table`; diagnostic only
    pub fn flag_errors(&self, table: &str) -> usize {
        let errors = self
            .for_table(table)
            .filter(|i| i.severity == Severity::Error)
            .count();
        if errors > 0 {
            warn!(table, errors, "table has ERROR-level quality issues");
        }
        errors
    }

    /// Write the log as CSV (`timestamp,table,issue_type,details,severity`).
    /// The header is written even when no issues were logged.
    pub fn save_report(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(["timestamp", "table", "issue_type", "details", "severity"])?;
        for issue in &self.issues {
            writer.write_record([
                issue.timestamp.to_rfc3339(),
                issue.table.clone(),
                issue.issue_type.to_string(),
                issue.details.clone(),
                issue.severity.to_string(),
            ])?;
        }
        writer.flush()?;
        info!(path = %path.display(), issues = self.issues.len(), "quality report saved");
        Ok(())
    }
}
