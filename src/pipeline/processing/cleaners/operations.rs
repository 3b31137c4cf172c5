use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::{CanonicalTable, Dedupe, DepartmentCleaner, SkipReason, SourceFile, TableRules};
use crate::constants::{OPERATIONS_RENAMES, PRODUCT_NAME_ALIASES, QUANTITY_ALIASES};
use crate::error::Result as EtlResult;
use crate::pipeline::processing::context::SilverContext;
use crate::pipeline::processing::quality::IssueKind;
use crate::pipeline::processing::registry::TableFamily;
use crate::pipeline::processing::standardize::{apply_renames, standardize_columns};
use crate::pipeline::processing::validate::ExpectedKind;
use crate::table::parquet::read_parquet;
use crate::table::{JoinKind, RecordSet, Value};
use crate::types::TableId;

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

const ORDER_REQUIRED: &[&str] = &["order_id"];
const LINE_ITEM_KEYS: &[&str] = &["order_id", "product_id"];

/// Operations extracts: orders, line items and delivery delays
#[derive(Debug, Default)]
pub struct OperationsCleaner;

impl DepartmentCleaner for OperationsCleaner {
    fn family(&self) -> TableFamily {
        TableFamily::Operations
    }

    fn clean(
        &self,
        records: RecordSet,
        source: &SourceFile,
        ctx: &mut SilverContext,
    ) -> Result<CanonicalTable, SkipReason> {
        let mut records = standardize_columns(records);
        apply_renames(&mut records, OPERATIONS_RENAMES);

        if source.contains("order_data") {
            Ok(clean_orders(records, ctx))
        } else if source.contains("line_item") {
            clean_line_items(records, ctx)
        } else if source.contains("order_delays") {
            let table = TableId::OperationsOrderDelays;
            let records = TableRules::new(table, &[], &[])
                .dedupe(Dedupe::FullRow)
                .apply(records, &mut ctx.quality);
            Ok(CanonicalTable::new(table, records))
        } else {
            Err(SkipReason::UnknownTablePattern {
                family: TableFamily::Operations,
            })
        }
    }
}

fn clean_orders(records: RecordSet, ctx: &mut SilverContext) -> CanonicalTable {
    let table = TableId::OperationsOrders;
    let date_columns: Vec<String> = records
        .column_names()
        .into_iter()
        .filter(|c| c.contains("date"))
        .map(str::to_string)
        .collect();
    let rules = date_columns
        .into_iter()
        .fold(TableRules::new(table, ORDER_REQUIRED, ORDER_REQUIRED), |rules, col| {
            rules.coerce(col, ExpectedKind::Datetime)
        });
    CanonicalTable::new(table, rules.apply(records, &mut ctx.quality))
}

fn clean_line_items(
    mut records: RecordSet,
    ctx: &mut SilverContext,
) -> Result<CanonicalTable, SkipReason> {
    let table = TableId::OperationsLineItems;
    map_line_item_aliases(&mut records);

    if !records.has_column("product_id") {
        resolve_product_ids(&mut records, ctx)?;
    }
    normalize_quantity(&mut records);

    let records = TableRules::new(table, LINE_ITEM_KEYS, LINE_ITEM_KEYS).apply(records, &mut ctx.quality);
    Ok(CanonicalTable::new(table, records))
}

/// Fill `quantity`, `price` and `product_name` from their raw aliases
fn map_line_item_aliases(records: &mut RecordSet) {
    if !records.has_column("quantity") {
        if let Some(values) = QUANTITY_ALIASES
            .iter()
            .find_map(|alias| records.column(alias))
            .map(<[Value]>::to_vec)
        {
            records.fill_column_with("quantity", |row| values[row].clone());
        }
    }
    if !records.has_column("price") {
        if let Some(values) = records.column("unit_price").map(<[Value]>::to_vec) {
            records.fill_column_with("price", |row| values[row].clone());
        }
    }
    if !records.has_column("product_name") {
        if let Some((alias, values)) = PRODUCT_NAME_ALIASES
            .iter()
            .find_map(|alias| records.column(alias).map(|v| (*alias, v)))
        {
            let names: Vec<Value> = values.iter().map(|v| Value::from(v.to_text())).collect();
            records.fill_column_with("product_name", |row| names[row].clone());
            info!(alias, "mapped product_name alias on line items");
        }
    }
}

/// Derive `product_id` by name lookup against the silver product table, else
/// synthesize `<order_id>_<row offset>` for price-only files.
fn resolve_product_ids(records: &mut RecordSet, ctx: &mut SilverContext) -> Result<(), SkipReason> {
    let table = TableId::OperationsLineItems;

    if records.has_column("product_name") {
        let path = ctx.silver_dir().join(TableId::BusinessProduct.file_name());
        match load_product_names(&path) {
            Ok(Some(products)) => {
                if let Ok(joined) = records.join(&products, "product_name", JoinKind::Left) {
                    *records = joined;
                    info!(table = %table, "joined line items to business_product on product_name");
                    return Ok(());
                }
            }
            Ok(None) => {
                warn!(path = %path.display(), "business_product has no product_id/product_name pair");
            }
            Err(e) => {
                ctx.quality.error(
                    table.name(),
                    IssueKind::ProductDimLoadError,
                    format!("Could not read {}: {}", TableId::BusinessProduct.file_name(), e),
                );
            }
        }
    }

    if ["order_id", "quantity", "price"].iter().all(|c| records.has_column(c)) {
        let orders: Vec<String> = records
            .column("order_id")
            .map(|values| values.iter().map(|v| v.to_text().unwrap_or_default()).collect())
            .unwrap_or_default();
        records.fill_column_with("product_id", |row| Value::Str(format!("{}_{}", orders[row], row)));
        info!(
            table = %table,
            rows = records.num_rows(),
            "synthetic product_id created from order_id and row offset"
        );
        return Ok(());
    }

    warn!(table = %table, "line-item file has no product identity and no usable quantity");
    Err(SkipReason::UnusableLineItems)
}

/// `(product_id, product_name)` pairs from the silver product table, one row per
/// name so the lookup join cannot multiply line items
fn load_product_names(path: &std::path::Path) -> EtlResult<Option<RecordSet>> {
    let products = standardize_columns(read_parquet(path)?);
    if !products.has_column("product_id") || !products.has_column("product_name") {
        return Ok(None);
    }
    let mut pairs = products.select(&["product_id", "product_name"]);
    pairs.map_column("product_name", |v| Value::from(v.to_text()));
    pairs.drop_nulls(&["product_name"]);
    pairs.drop_duplicates(Some(&["product_name"][..]));
    Ok(Some(pairs))
}

/// Numeric quantity columns are kept as they are; anything else is reduced to
/// its first embedded integer, or null.
pub fn normalize_quantity(records: &mut RecordSet) {
    let Some(values) = records.column("quantity") else {
        records.fill_column("quantity", Value::Null);
        return;
    };
    if values.iter().all(|v| v.is_null() || v.is_numeric()) {
        records.map_column("quantity", Value::coerce_numeric);
        return;
    }
    records.map_column("quantity", |v| {
        v.to_text()
            .and_then(|text| {
                FIRST_INTEGER
                    .find(&text)
                    .and_then(|m| m.as_str().parse::<i64>().ok())
            })
            .map(Value::Int)
            .unwrap_or(Value::Null)
    });
}
