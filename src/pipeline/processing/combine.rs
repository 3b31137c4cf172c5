use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::cleaners::normalize_file_id;
use super::quality::{IssueKind, QualityLog};
use super::standardize::{apply_renames, standardize_columns};
use crate::constants::{BRONZE_SUFFIX, ENTERPRISE_RENAMES, ENTERPRISE_TX_PART_PREFIX, PARQUET_EXTENSION};
use crate::error::Result;
use crate::table::parquet::{read_parquet, write_parquet};
use crate::table::RecordSet;
use crate::types::TableId;

/// Unions the numbered enterprise order/merchant extracts into the single
/// `enterprise_order_merchant_tx` table.
pub struct TransactionCombiner;

impl TransactionCombiner {
    /// Bronze part files, sorted by file name
    pub fn find_parts(bronze_dir: &Path) -> Result<Vec<PathBuf>> {
        let suffix = format!("{}.{}", BRONZE_SUFFIX, PARQUET_EXTENSION);
        let mut parts: Vec<PathBuf> = fs::read_dir(bronze_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                let id = path
                    .file_name()
                    .map(|n| normalize_file_id(&n.to_string_lossy()))
                    .unwrap_or_default();
                id.starts_with(ENTERPRISE_TX_PART_PREFIX) && id.ends_with(&suffix)
            })
            .collect();
        parts.sort();
        Ok(parts)
    }

    /// Re-read every part from bronze, standardize, concatenate and write the
    /// combined table. Unreadable parts are logged and left out.
    ///
    /// Returns the combined row count, or `None` when no part was found.
    pub fn combine(bronze_dir: &Path, silver_dir: &Path, log: &mut QualityLog) -> Result<Option<usize>> {
        let parts = Self::find_parts(bronze_dir)?;
        if parts.is_empty() {
            info!("no multi-part enterprise transaction files to combine");
            return Ok(None);
        }

        let mut frames: Vec<RecordSet> = Vec::with_capacity(parts.len());
        for path in &parts {
            match read_parquet(path) {
                Ok(records) => {
                    let mut records = standardize_columns(records);
                    apply_renames(&mut records, ENTERPRISE_RENAMES);
                    frames.push(records);
                }
                Err(e) => {
                    let file_id = path
                        .file_name()
                        .map(|n| normalize_file_id(&n.to_string_lossy()))
                        .unwrap_or_default();
                    warn!(file_id = %file_id, "could not read transaction part: {}", e);
                    log.error(file_id, IssueKind::ProcessingError, e.to_string());
                }
            }
        }
        if frames.is_empty() {
            warn!("no readable enterprise transaction parts");
            return Ok(None);
        }

        let table = TableId::EnterpriseOrderMerchantTx;
        let combined = RecordSet::concat(frames);
        write_parquet(&combined, &silver_dir.join(table.file_name()))?;
        info!(
            table = %table,
            parts = parts.len(),
            rows = combined.num_rows(),
            "combined enterprise transaction parts"
        );
        Ok(Some(combined.num_rows()))
    }
}
