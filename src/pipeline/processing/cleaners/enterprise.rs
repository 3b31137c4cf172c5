use super::{CanonicalTable, DepartmentCleaner, SkipReason, SourceFile, TableRules};
use crate::constants::{ENTERPRISE_PREFIX, ENTERPRISE_RENAMES, PARQUET_EXTENSION};
use crate::pipeline::processing::context::SilverContext;
use crate::pipeline::processing::registry::TableFamily;
use crate::pipeline::processing::standardize::{apply_renames, standardize_columns};
use crate::table::RecordSet;
use crate::types::TableId;

const TX_REQUIRED: &[&str] = &["order_id", "merchant_id"];
const MERCHANT_REQUIRED: &[&str] = &["merchant_id"];
const STAFF_REQUIRED: &[&str] = &["staff_id"];

/// Enterprise extracts: merchant and staff dimensions plus the per-part
/// order/merchant transaction files
#[derive(Debug, Default)]
pub struct EnterpriseCleaner;

impl EnterpriseCleaner {
    /// Per-part output name, `enterprise_<stem>_tx.parquet`
    pub fn part_output_name(source: &SourceFile) -> String {
        let stem = source.stem();
        let stem = stem.strip_prefix(ENTERPRISE_PREFIX).unwrap_or(stem);
        format!("{}{}_tx.{}", ENTERPRISE_PREFIX, stem, PARQUET_EXTENSION)
    }
}

impl DepartmentCleaner for EnterpriseCleaner {
    fn family(&self) -> TableFamily {
        TableFamily::Enterprise
    }

    fn clean(
        &self,
        records: RecordSet,
        source: &SourceFile,
        ctx: &mut SilverContext,
    ) -> Result<CanonicalTable, SkipReason> {
        let mut records = standardize_columns(records);
        apply_renames(&mut records, ENTERPRISE_RENAMES);

        if source.contains("order_with_merchant") {
            let table = TableId::EnterpriseOrderMerchantTx;
            let records =
                TableRules::new(table, TX_REQUIRED, &["order_id"]).apply(records, &mut ctx.quality);
            return Ok(CanonicalTable::new(table, records)
                .with_output_name(Self::part_output_name(source)));
        }

        let (table, required) = if source.contains("merchant_data") {
            (TableId::EnterpriseMerchant, MERCHANT_REQUIRED)
        } else if source.contains("staff_data") {
            (TableId::EnterpriseStaff, STAFF_REQUIRED)
        } else {
            return Err(SkipReason::UnknownTablePattern {
                family: TableFamily::Enterprise,
            });
        };
        let records = TableRules::new(table, required, required).apply(records, &mut ctx.quality);
        Ok(CanonicalTable::new(table, records))
    }
}
