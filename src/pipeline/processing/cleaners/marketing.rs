use once_cell::sync::Lazy;
use regex::Regex;

use super::{CanonicalTable, DepartmentCleaner, SkipReason, SourceFile, TableRules};
use crate::constants::MARKETING_RENAMES;
use crate::pipeline::processing::context::SilverContext;
use crate::pipeline::processing::keys::KeySynthesizer;
use crate::pipeline::processing::registry::TableFamily;
use crate::pipeline::processing::standardize::{apply_renames, standardize_columns};
use crate::table::{RecordSet, Value};
use crate::types::TableId;

static NON_LABEL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9%]").expect("valid regex"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

const CAMPAIGN_KEYS: &[&str] = &["campaign_id"];
const TRANSACTIONAL_KEY_CANDIDATES: &[&str] = &["campaign_id", "order_id", "user_id"];

/// Canonical `"<int>%"` discount label; `None` when the text carries no digits.
///
/// `"15pct"`, `"15 percent"` and `"15%"` all become `"15%"`.
pub fn normalize_discount_label(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase().replace("percent", "%").replace("pct", "%");
    let stripped = NON_LABEL_CHARS.replace_all(&lowered, "");
    DIGITS.find(&stripped).map(|m| format!("{}%", m.as_str()))
}

/// Marketing extracts: campaigns and campaign transactions
#[derive(Debug, Default)]
pub struct MarketingCleaner;

impl MarketingCleaner {
    fn clean_campaigns(mut records: RecordSet, ctx: &mut SilverContext) -> CanonicalTable {
        let table = TableId::MarketingCampaign;
        if records.has_column("id") && !records.has_column("campaign_id") {
            records.rename_column("id", "campaign_id");
        }
        let sole_column = match records.column_names().as_slice() {
            [only] => Some(only.to_string()),
            _ => None,
        };
        KeySynthesizer::ensure_key(&mut records, "campaign_id", sole_column.as_deref(), table.name());

        let labels: Vec<Value> = match records.column("discount") {
            Some(values) => values
                .iter()
                .map(|v| {
                    v.to_text()
                        .and_then(|text| normalize_discount_label(&text))
                        .map(Value::Str)
                        .unwrap_or(Value::Null)
                })
                .collect(),
            None => vec![Value::Null; records.num_rows()],
        };
        records.fill_column_with("discount_normalized", |row| labels[row].clone());

        let records =
            TableRules::new(table, CAMPAIGN_KEYS, CAMPAIGN_KEYS).apply(records, &mut ctx.quality);
        CanonicalTable::new(table, records)
    }

    fn clean_transactions(mut records: RecordSet, ctx: &mut SilverContext) -> CanonicalTable {
        let table = TableId::MarketingTransactionalCampaign;
        KeySynthesizer::ensure_key(&mut records, "campaign_id", None, table.name());
        KeySynthesizer::ensure_key(&mut records, "order_id", None, table.name());

        let keys: Vec<&str> = TRANSACTIONAL_KEY_CANDIDATES
            .iter()
            .copied()
            .filter(|k| records.has_column(k))
            .collect();
        let records = TableRules::new(table, &[], &keys).apply(records, &mut ctx.quality);
        CanonicalTable::new(table, records)
    }
}

impl DepartmentCleaner for MarketingCleaner {
    fn family(&self) -> TableFamily {
        TableFamily::Marketing
    }

    fn clean(
        &self,
        records: RecordSet,
        source: &SourceFile,
        ctx: &mut SilverContext,
    ) -> Result<CanonicalTable, SkipReason> {
        let mut records = standardize_columns(records);
        apply_renames(&mut records, MARKETING_RENAMES);

        if source.contains("campaign_data") && !source.contains("transactional") {
            Ok(Self::clean_campaigns(records, ctx))
        } else if source.contains("transactional_campaign") {
            Ok(Self::clean_transactions(records, ctx))
        } else {
            Err(SkipReason::UnknownTablePattern {
                family: TableFamily::Marketing,
            })
        }
    }
}
