use super::{CanonicalTable, DepartmentCleaner, SkipReason, SourceFile, TableRules};
use crate::constants::CUSTOMER_RENAMES;
use crate::pipeline::processing::context::SilverContext;
use crate::pipeline::processing::registry::TableFamily;
use crate::pipeline::processing::standardize::{apply_renames, standardize_columns};
use crate::pipeline::processing::validate::ExpectedKind;
use crate::table::RecordSet;
use crate::types::TableId;

const REQUIRED: &[&str] = &["user_id"];

/// Customer management extracts: users, their jobs and credit cards
#[derive(Debug, Default)]
pub struct CustomerCleaner;

impl CustomerCleaner {
    fn table_for(source: &SourceFile) -> Option<TableId> {
        if source.contains("user_job") {
            Some(TableId::CustomerUserJob)
        } else if source.contains("user_credit_card") {
            Some(TableId::CustomerUserCreditCard)
        } else if source.contains("user_data") || source.contains("user_") {
            Some(TableId::CustomerUser)
        } else {
            None
        }
    }
}

impl DepartmentCleaner for CustomerCleaner {
    fn family(&self) -> TableFamily {
        TableFamily::Customer
    }

    fn clean(
        &self,
        records: RecordSet,
        source: &SourceFile,
        ctx: &mut SilverContext,
    ) -> Result<CanonicalTable, SkipReason> {
        let table = Self::table_for(source).ok_or(SkipReason::UnknownTablePattern {
            family: TableFamily::Customer,
        })?;
        let mut records = standardize_columns(records);
        apply_renames(&mut records, CUSTOMER_RENAMES);

        let rules = match table {
            TableId::CustomerUserCreditCard => {
                TableRules::new(table, REQUIRED, &["user_id", "credit_card_number"])
            }
            TableId::CustomerUser => TableRules::new(table, REQUIRED, &["user_id"])
                .coerce("birthdate", ExpectedKind::Datetime),
            _ => TableRules::new(table, REQUIRED, &["user_id"]),
        };
        let records = rules.apply(records, &mut ctx.quality);
        Ok(CanonicalTable::new(table, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::quality::IssueKind;
    use crate::table::Value;
    use std::path::Path;

    fn source(name: &str) -> SourceFile {
        SourceFile::from_path(Path::new(name))
    }

    #[test]
    fn test_file_patterns_pick_table() {
        assert_eq!(
            CustomerCleaner::table_for(&source("customer_management_user_job_bronze.parquet")),
            Some(TableId::CustomerUserJob)
        );
        assert_eq!(
            CustomerCleaner::table_for(&source("customer_management_user_credit_card.parquet")),
            Some(TableId::CustomerUserCreditCard)
        );
        assert_eq!(
            CustomerCleaner::table_for(&source("customer_management_user_data.parquet")),
            Some(TableId::CustomerUser)
        );
        assert_eq!(CustomerCleaner::table_for(&source("customer_misc.parquet")), None);
    }

    #[test]
    fn test_unknown_pattern_is_skipped() {
        let mut ctx = SilverContext::new("/unused");
        let records = RecordSet::from_columns(vec![("x", vec![Value::Int(1)])]).unwrap();
        let err = CustomerCleaner
            .clean(records, &source("customer_misc.parquet"), &mut ctx)
            .unwrap_err();
        assert_eq!(err, SkipReason::UnknownTablePattern { family: TableFamily::Customer });
        assert!(ctx.quality.is_empty());
    }

    #[test]
    fn test_user_birthdate_coerced() {
        let mut ctx = SilverContext::new("/unused");
        let records = RecordSet::from_columns(vec![
            ("UserID", vec!["U1".into(), "U2".into()]),
            ("Birthdate", vec!["1990-05-01".into(), "someday".into()]),
        ])
        .unwrap();
        let out = CustomerCleaner
            .clean(records, &source("customer_management_user_data.parquet"), &mut ctx)
            .unwrap();
        assert_eq!(out.table, TableId::CustomerUser);
        assert!(matches!(out.records.column("birthdate").unwrap()[0], Value::DateTime(_)));
        assert!(out.records.column("birthdate").unwrap()[1].is_null());
        assert!(ctx.quality.has_issue("customer_user", IssueKind::InvalidDatetime));
    }

    #[test]
    fn test_credit_cards_dedupe_on_user_and_card() {
        let mut ctx = SilverContext::new("/unused");
        let records = RecordSet::from_columns(vec![
            ("user_id", vec!["U1".into(), "U1".into(), "U1".into()]),
            ("credit_card_number", vec![Value::Int(1), Value::Int(2), Value::Int(2)]),
        ])
        .unwrap();
        let out = CustomerCleaner
            .clean(records, &source("customer_management_user_credit_card.parquet"), &mut ctx)
            .unwrap();
        assert_eq!(out.records.num_rows(), 2);
    }
}
