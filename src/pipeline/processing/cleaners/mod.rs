//! Department cleaners: one per source-file family.
//!
//! Every cleaner standardizes columns, applies its family renames, resolves
//! identifiers, then hands the record set to [`TableRules::apply`] which runs the
//! shared validate/drop/dedupe sequence. Persisting the result is the router's job.

pub mod business;
pub mod customer;
pub mod enterprise;
pub mod marketing;
pub mod operations;

pub use business::BusinessCleaner;
pub use customer::CustomerCleaner;
pub use enterprise::EnterpriseCleaner;
pub use marketing::MarketingCleaner;
pub use operations::OperationsCleaner;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use super::context::SilverContext;
use super::quality::QualityLog;
use super::registry::TableFamily;
use super::validate::{
    check_duplicates, check_nulls, flag_errors, validate_data_types, validate_required_columns,
    ExpectedKind,
};
use crate::constants::{BRONZE_SUFFIX, PARQUET_EXTENSION};
use crate::metrics::SilverMetrics;
use crate::table::RecordSet;
use crate::types::TableId;

/// A bronze input file as seen by the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Normalized base name (see [`normalize_file_id`]), extension included
    pub file_id: String,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> Self {
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            file_id: normalize_file_id(&base),
        }
    }

    /// `file_id` without the parquet extension and the `_bronze` suffix
    pub fn stem(&self) -> &str {
        let id = self.file_id.as_str();
        let id = id
            .strip_suffix(PARQUET_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(id);
        id.strip_suffix(BRONZE_SUFFIX).unwrap_or(id)
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.file_id.contains(pattern)
    }
}

/// Lower-case the base name, collapse a " department" marker and runs of spaces
/// into single underscores.
pub fn normalize_file_id(base_name: &str) -> String {
    let mut id = base_name
        .to_lowercase()
        .replace(" department_", "_")
        .replace(" department ", "_");
    while id.contains("  ") {
        id = id.replace("  ", " ");
    }
    id.replace(' ', "_")
}

/// Cleaner output: the canonical table and the file name it is persisted under
#[derive(Debug, Clone)]
pub struct CanonicalTable {
    pub table: TableId,
    pub output_name: String,
    pub records: RecordSet,
}

impl CanonicalTable {
    pub fn new(table: TableId, records: RecordSet) -> Self {
        Self {
            table,
            output_name: table.file_name(),
            records,
        }
    }

    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }
}

/// Why a file produced no canonical table. Never a quality issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No cleaner for the file name prefix
    UnknownFamily,
    /// The family cleaner does not recognise the table kind
    UnknownTablePattern { family: TableFamily },
    /// Line items with neither product identity nor order/quantity/price
    UnusableLineItems,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownFamily => f.write_str("no cleaning logic for this file"),
            SkipReason::UnknownTablePattern { family } => {
                write!(f, "unknown {} file pattern", family)
            }
            SkipReason::UnusableLineItems => f.write_str(
                "line-item file without product_id/product_name and no usable quantity",
            ),
        }
    }
}

/// Capability shared by all department cleaners
pub trait DepartmentCleaner {
    fn family(&self) -> TableFamily;

    /// Turn a raw record set into its canonical table, logging findings into
    /// `ctx.quality`.
    fn clean(
        &self,
        records: RecordSet,
        source: &SourceFile,
        ctx: &mut SilverContext,
    ) -> Result<CanonicalTable, SkipReason>;
}

/// Which rows count as duplicates for the drop step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dedupe {
    /// Repeated key-column tuples, only when every key column is present
    KeyColumns,
    /// Identical rows across all columns
    FullRow,
}

/// Declarative validation rules for one canonical table
#[derive(Debug, Clone)]
pub struct TableRules<'a> {
    pub table: TableId,
    pub required: &'a [&'a str],
    pub key_cols: Vec<&'a str>,
    pub dedupe: Dedupe,
    pub type_map: Vec<(String, ExpectedKind)>,
}

impl<'a> TableRules<'a> {
    pub fn new(table: TableId, required: &'a [&'a str], key_cols: &[&'a str]) -> Self {
        Self {
            table,
            required,
            key_cols: key_cols.to_vec(),
            dedupe: Dedupe::KeyColumns,
            type_map: Vec::new(),
        }
    }

    pub fn dedupe(mut self, dedupe: Dedupe) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn coerce(mut self, column: impl Into<String>, kind: ExpectedKind) -> Self {
        self.type_map.push((column.into(), kind));
        self
    }

    /// Required columns that are also keys: rows null in any of these are dropped
    fn required_keys(&self) -> Vec<&'a str> {
        self.key_cols
            .iter()
            .copied()
            .filter(|k| self.required.contains(k))
            .collect()
    }

    /// Run the shared sequence: required columns, null and duplicate checks, drop
    /// null required keys, drop duplicates, type coercion, error summary.
    pub fn apply(&self, mut records: RecordSet, log: &mut QualityLog) -> RecordSet {
        let table = self.table.name();
        validate_required_columns(&records, self.required, table, log);
        check_nulls(&records, &self.key_cols, table, log);
        check_duplicates(&records, &self.key_cols, table, log);

        let null_keys = self.required_keys();
        let removed = records.drop_nulls(&null_keys);
        if removed > 0 {
            info!(table, removed, "removed rows with NULL [{}]", null_keys.join(", "));
            SilverMetrics::record_rows_removed("null", removed);
        }

        let removed = match self.dedupe {
            Dedupe::KeyColumns
                if !self.key_cols.is_empty()
                    && self.key_cols.iter().all(|k| records.has_column(k)) =>
            {
                records.drop_duplicates(Some(self.key_cols.as_slice()))
            }
            Dedupe::KeyColumns => 0,
            Dedupe::FullRow => records.drop_duplicates(None),
        };
        if removed > 0 {
            info!(
                table,
                removed,
                rows = records.num_rows(),
                "removed duplicates on [{}]",
                if self.dedupe == Dedupe::FullRow {
                    "all columns".to_string()
                } else {
                    self.key_cols.join(", ")
                }
            );
            SilverMetrics::record_rows_removed("duplicate", removed);
        }

        validate_data_types(&mut records, &self.type_map, table, log);
        flag_errors(table, log);
        records
    }
}
