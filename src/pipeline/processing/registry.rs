use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{error, info, instrument, warn};

use super::cleaners::{
    BusinessCleaner, CustomerCleaner, DepartmentCleaner, EnterpriseCleaner, MarketingCleaner,
    OperationsCleaner, SkipReason, SourceFile,
};
use super::context::SilverContext;
use super::quality::IssueKind;
use crate::constants::{
    BUSINESS_PREFIX, CUSTOMER_MANAGEMENT_PREFIX, CUSTOMER_PREFIX, ENTERPRISE_PREFIX,
    MARKETING_PREFIX, OPERATIONS_PREFIX,
};
use crate::metrics::SilverMetrics;
use crate::table::parquet::{read_parquet, write_parquet};
use crate::types::TableId;

/// Source-file family, derived once from the normalized file name.
///
/// Variant order is routing order: business products are written before
/// operations line items look product ids up in them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFamily {
    Business,
    Customer,
    Enterprise,
    Operations,
    Marketing,
}

impl TableFamily {
    /// Prefix precedence: business, customer (management), enterprise, operations, marketing
    pub fn detect(file_id: &str) -> Option<TableFamily> {
        if file_id.starts_with(BUSINESS_PREFIX) {
            Some(TableFamily::Business)
        } else if file_id.starts_with(CUSTOMER_MANAGEMENT_PREFIX)
            || file_id.starts_with(CUSTOMER_PREFIX)
        {
            Some(TableFamily::Customer)
        } else if file_id.starts_with(ENTERPRISE_PREFIX) {
            Some(TableFamily::Enterprise)
        } else if file_id.starts_with(OPERATIONS_PREFIX) {
            Some(TableFamily::Operations)
        } else if file_id.starts_with(MARKETING_PREFIX) {
            Some(TableFamily::Marketing)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TableFamily::Business => "business",
            TableFamily::Customer => "customer",
            TableFamily::Enterprise => "enterprise",
            TableFamily::Operations => "operations",
            TableFamily::Marketing => "marketing",
        }
    }
}

impl fmt::Display for TableFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one routed file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// Canonical output written
    Persisted {
        table: TableId,
        output: String,
        rows: usize,
    },
    /// Rows held in the line-item buffer until the end of the run
    Buffered { table: TableId, rows: usize },
    Skipped { reason: String },
    /// Read, clean or write failed; recorded as PROCESSING_ERROR
    Failed { error: String },
}

/// Registry for department cleaners, keyed by file family
pub struct CleanerRegistry {
    cleaners: HashMap<TableFamily, Box<dyn DepartmentCleaner>>,
}

impl Default for CleanerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanerRegistry {
    /// Create a registry with the five built-in department cleaners
    pub fn new() -> Self {
        let mut registry = Self {
            cleaners: HashMap::new(),
        };
        registry.register(Box::new(BusinessCleaner));
        registry.register(Box::new(CustomerCleaner));
        registry.register(Box::new(EnterpriseCleaner));
        registry.register(Box::new(OperationsCleaner));
        registry.register(Box::new(MarketingCleaner));
        registry
    }

    /// Register (or replace) the cleaner for its family
    pub fn register(&mut self, cleaner: Box<dyn DepartmentCleaner>) {
        self.cleaners.insert(cleaner.family(), cleaner);
    }

    pub fn get(&self, family: TableFamily) -> Option<&dyn DepartmentCleaner> {
        self.cleaners.get(&family).map(|c| c.as_ref())
    }

    pub fn families(&self) -> Vec<TableFamily> {
        self.cleaners.keys().copied().collect()
    }

    /// Read, clean and persist (or buffer) one bronze file.
    ///
    /// Never fails: unknown files are skipped with a warning and any read, clean
    /// or write error becomes a PROCESSING_ERROR issue keyed by the file id.
    #[instrument(skip(self, ctx), fields(file = %path.display()))]
    pub fn route(&self, path: &Path, ctx: &mut SilverContext) -> RouteOutcome {
        let source = SourceFile::from_path(path);
        info!(file_id = %source.file_id, "routing bronze file");

        let Some(cleaner) = TableFamily::detect(&source.file_id).and_then(|f| self.get(f)) else {
            return skipped(&source, SkipReason::UnknownFamily);
        };

        let records = match read_parquet(path) {
            Ok(records) => records,
            Err(e) => return failed(&source, e.to_string(), ctx),
        };
        let canonical = match cleaner.clean(records, &source, ctx) {
            Ok(canonical) => canonical,
            Err(reason) => return skipped(&source, reason),
        };
        SilverMetrics::record_file_routed(cleaner.family().name());

        let rows = canonical.records.num_rows();
        if canonical.table.is_buffered() {
            ctx.line_items.push(canonical.records);
            return RouteOutcome::Buffered {
                table: canonical.table,
                rows,
            };
        }

        let out = ctx.silver_dir().join(&canonical.output_name);
        if let Err(e) = write_parquet(&canonical.records, &out) {
            return failed(&source, e.to_string(), ctx);
        }
        info!(table = %canonical.table, output = %canonical.output_name, rows, "saved");
        SilverMetrics::record_rows_written(canonical.table.name(), rows);
        RouteOutcome::Persisted {
            table: canonical.table,
            output: canonical.output_name,
            rows,
        }
    }
}

fn skipped(source: &SourceFile, reason: SkipReason) -> RouteOutcome {
    warn!(file_id = %source.file_id, "skipped: {}", reason);
    SilverMetrics::record_file_skipped();
    RouteOutcome::Skipped {
        reason: reason.to_string(),
    }
}

fn failed(source: &SourceFile, message: String, ctx: &mut SilverContext) -> RouteOutcome {
    error!(file_id = %source.file_id, "processing failed: {}", message);
    ctx.quality
        .error(source.file_id.clone(), IssueKind::ProcessingError, message.clone());
    SilverMetrics::record_file_failed();
    RouteOutcome::Failed { error: message }
}
