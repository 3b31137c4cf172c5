use super::{CanonicalTable, DepartmentCleaner, SkipReason, SourceFile, TableRules};
use crate::constants::PRODUCT_ID_RENAMES;
use crate::pipeline::processing::context::SilverContext;
use crate::pipeline::processing::registry::TableFamily;
use crate::pipeline::processing::standardize::{apply_renames, standardize_columns};
use crate::table::RecordSet;
use crate::types::TableId;

const REQUIRED: &[&str] = &["product_id", "product_name"];
const KEYS: &[&str] = &["product_id"];

/// Product catalogue extracts
#[derive(Debug, Default)]
pub struct BusinessCleaner;

impl DepartmentCleaner for BusinessCleaner {
    fn family(&self) -> TableFamily {
        TableFamily::Business
    }

    fn clean(
        &self,
        records: RecordSet,
        _source: &SourceFile,
        ctx: &mut SilverContext,
    ) -> Result<CanonicalTable, SkipReason> {
        let mut records = standardize_columns(records);
        apply_renames(&mut records, PRODUCT_ID_RENAMES);

        let records = TableRules::new(TableId::BusinessProduct, REQUIRED, KEYS)
            .apply(records, &mut ctx.quality);
        Ok(CanonicalTable::new(TableId::BusinessProduct, records))
    }
}
