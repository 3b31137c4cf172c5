use std::collections::HashMap;
use tracing::info;

use super::warehouse::{GoldTable, KeyMap};
use crate::error::Result;
use crate::table::{JoinKind, RecordSet, Value};

/// Silver inputs of the order line fact
#[derive(Debug, Clone, Default)]
pub struct FactInputs {
    pub orders: RecordSet,
    pub lines: RecordSet,
    pub order_merchants: RecordSet,
    pub campaign_transactions: RecordSet,
}

/// Surrogate key lookups read from the warehouse after the dimensions load
#[derive(Debug, Clone, Default)]
pub struct DimensionKeys {
    maps: HashMap<GoldTable, KeyMap>,
}

impl DimensionKeys {
    pub fn insert(&mut self, dimension: GoldTable, map: KeyMap) {
        self.maps.insert(dimension, map);
    }

    pub fn lookup(&self, dimension: GoldTable, natural: &Value) -> Value {
        natural
            .to_text()
            .and_then(|text| self.maps.get(&dimension)?.get(&text).copied())
            .map(Value::Int)
            .unwrap_or(Value::Null)
    }
}

/// Fact columns carrying dimension keys, with the fact column holding the natural id
const KEY_RESOLUTIONS: [(&str, &str, GoldTable); 5] = [
    ("user_key", "user_id", GoldTable::UserDim),
    ("product_key", "product_id", GoldTable::ProductDim),
    ("merchant_key", "merchant_id", GoldTable::MerchantDim),
    ("staff_key", "staff_id", GoldTable::StaffDim),
    ("campaign_key", "campaign_id", GoldTable::CampaignDim),
];

pub const FACT_COLUMNS: [&str; 10] = [
    "order_id",
    "order_line_id",
    "user_key",
    "product_key",
    "merchant_key",
    "staff_key",
    "campaign_key",
    "order_date_key",
    "quantity",
    "line_amount",
];

#[derive(Debug, Clone)]
pub struct FactBuild {
    pub records: RecordSet,
    /// Rows with at least one dimension key left null
    pub unresolved: usize,
}

fn as_text_column(records: &mut RecordSet, name: &str) {
    records.map_column(name, |v| v.to_text().map(Value::Str).unwrap_or(Value::Null));
}

/// Assemble the order line fact at line grain.
///
/// Lines are inner joined to orders, then merchant/staff and campaign ids are
/// attached with left joins. Keys that do not resolve stay null; no row is
/// rejected for it. Returns `None` when orders or lines are empty.
pub fn build_fact(mut inputs: FactInputs, keys: &DimensionKeys) -> Result<Option<FactBuild>> {
    if inputs.orders.is_empty() || inputs.lines.is_empty() {
        return Ok(None);
    }
    for records in [
        &mut inputs.orders,
        &mut inputs.lines,
        &mut inputs.order_merchants,
        &mut inputs.campaign_transactions,
    ] {
        as_text_column(records, "order_id");
        as_text_column(records, "campaign_id");
    }
    info!(
        orders = inputs.orders.num_rows(),
        lines = inputs.lines.num_rows(),
        order_merchants = inputs.order_merchants.num_rows(),
        campaign_transactions = inputs.campaign_transactions.num_rows(),
        "building order line fact"
    );

    let mut fact = inputs.lines.join(&inputs.orders, "order_id", JoinKind::Inner)?;
    if inputs.order_merchants.has_column("order_id") {
        let merchants = inputs
            .order_merchants
            .select(&["order_id", "merchant_id", "staff_id"]);
        fact = fact.join(&merchants, "order_id", JoinKind::Left)?;
    }
    if inputs.campaign_transactions.has_column("order_id")
        && inputs.campaign_transactions.has_column("campaign_id")
    {
        let campaigns = inputs.campaign_transactions.select(&["order_id", "campaign_id"]);
        fact = fact.join(&campaigns, "order_id", JoinKind::Left)?;
    }
    info!(rows = fact.num_rows(), "fact rows after base joins");

    let rows = fact.num_rows();
    let mut columns: Vec<(&str, Vec<Value>)> = Vec::with_capacity(FACT_COLUMNS.len());
    let order_ids: Vec<Value> = fact.column("order_id").map(<[Value]>::to_vec).unwrap_or_default();

    let order_line_ids: Vec<Value> = {
        let mut line_numbers: HashMap<&Value, i64> = HashMap::new();
        order_ids
            .iter()
            .map(|order| {
                let n = line_numbers.entry(order).or_insert(0);
                *n += 1;
                Value::Str(n.to_string())
            })
            .collect()
    };

    let mut key_columns: Vec<(&str, Vec<Value>)> = Vec::with_capacity(KEY_RESOLUTIONS.len() + 1);
    for (key, natural, dimension) in KEY_RESOLUTIONS {
        let values = match fact.column(natural) {
            Some(ids) => ids.iter().map(|id| keys.lookup(dimension, id)).collect(),
            None => vec![Value::Null; rows],
        };
        key_columns.push((key, values));
    }
    let order_date_keys: Vec<Value> = match fact.column("transaction_date") {
        Some(dates) => dates
            .iter()
            .map(|v| match v.to_date() {
                Some(day) => keys.lookup(
                    GoldTable::DateDim,
                    &Value::from(day.format("%Y-%m-%d").to_string()),
                ),
                None => Value::Null,
            })
            .collect(),
        None => vec![Value::Null; rows],
    };
    key_columns.push(("order_date_key", order_date_keys));

    let unresolved = (0..rows)
        .filter(|&r| key_columns.iter().any(|(_, values)| values[r].is_null()))
        .count();

    let quantities: Vec<Value> = match fact.column("quantity") {
        Some(values) => values.iter().map(Value::coerce_numeric).collect(),
        None => vec![Value::Null; rows],
    };
    let line_amounts: Vec<Value> = match fact.column("price") {
        Some(prices) => quantities
            .iter()
            .zip(prices)
            .map(|(q, p)| match (q.as_f64(), p.coerce_numeric().as_f64()) {
                (Some(q), Some(p)) => Value::Float(q * p),
                _ => Value::Null,
            })
            .collect(),
        None => vec![Value::Null; rows],
    };

    columns.push(("order_id", order_ids));
    columns.push(("order_line_id", order_line_ids));
    columns.extend(key_columns);
    columns.push(("quantity", quantities));
    columns.push(("line_amount", line_amounts));

    Ok(Some(FactBuild {
        records: RecordSet::from_columns(columns)?,
        unresolved,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> DimensionKeys {
        let mut keys = DimensionKeys::default();
        keys.insert(GoldTable::UserDim, KeyMap::from([("U1".to_string(), 1)]));
        keys.insert(GoldTable::ProductDim, KeyMap::from([("P1".to_string(), 10)]));
        keys.insert(GoldTable::MerchantDim, KeyMap::from([("M1".to_string(), 5)]));
        keys.insert(GoldTable::StaffDim, KeyMap::from([("S1".to_string(), 7)]));
        keys.insert(GoldTable::CampaignDim, KeyMap::from([("C1".to_string(), 3)]));
        keys.insert(GoldTable::DateDim, KeyMap::from([("2021-06-01".to_string(), 20210601)]));
        keys
    }

    fn inputs() -> FactInputs {
        FactInputs {
            orders: RecordSet::from_columns(vec![
                ("order_id", vec![Value::from("O1"), Value::from("O2")]),
                ("user_id", vec![Value::from("U1"), Value::from("U1")]),
                ("transaction_date", vec![Value::from("2021-06-01"), Value::Null]),
            ])
            .unwrap(),
            lines: RecordSet::from_columns(vec![
                ("order_id", vec![Value::from("O1"), Value::from("O1"), Value::from("O2"), Value::from("O9")]),
                ("product_id", vec![Value::from("P1"), Value::from("P1"), Value::from("P2"), Value::from("P1")]),
                ("quantity", vec![Value::Int(2), Value::Null, Value::Int(1), Value::Int(1)]),
                ("price", vec![Value::Float(1.5), Value::Float(2.0), Value::Float(4.0), Value::Float(1.0)]),
            ])
            .unwrap(),
            order_merchants: RecordSet::from_columns(vec![
                ("order_id", vec![Value::from("O1"), Value::from("O2")]),
                ("merchant_id", vec![Value::from("M1"), Value::from("M404")]),
                ("staff_id", vec![Value::from("S1"), Value::from("S1")]),
            ])
            .unwrap(),
            campaign_transactions: RecordSet::from_columns(vec![
                ("order_id", vec![Value::from("O1")]),
                ("campaign_id", vec![Value::from("C1")]),
            ])
            .unwrap(),
        }
    }

    #[test]
    fn test_fact_keys_and_amounts() {
        let build = build_fact(inputs(), &keys()).unwrap().unwrap();
        let fact = build.records;

        assert_eq!(fact.column_names(), FACT_COLUMNS.to_vec());
        // O9 has no order, so its line is dropped by the inner join
        assert_eq!(fact.num_rows(), 3);
        assert_eq!(
            fact.column("order_line_id").unwrap(),
            &[Value::from("1"), Value::from("2"), Value::from("1")]
        );
        assert_eq!(fact.value(0, "user_key"), Some(&Value::Int(1)));
        assert_eq!(fact.value(0, "campaign_key"), Some(&Value::Int(3)));
        assert_eq!(fact.value(0, "order_date_key"), Some(&Value::Int(20210601)));
        assert_eq!(fact.value(0, "line_amount"), Some(&Value::Float(3.0)));
        assert_eq!(fact.value(1, "line_amount"), Some(&Value::Null));
    }

    #[test]
    fn test_unmatched_merchant_kept_with_null_key() {
        let build = build_fact(inputs(), &keys()).unwrap().unwrap();
        let fact = build.records;

        assert_eq!(fact.value(2, "order_id"), Some(&Value::from("O2")));
        assert_eq!(fact.value(2, "merchant_key"), Some(&Value::Null));
        assert_eq!(fact.value(2, "staff_key"), Some(&Value::Int(7)));
        // Every O1 row resolves all keys; the O2 row misses merchant, product, campaign and date
        assert_eq!(build.unresolved, 1);
    }

    #[test]
    fn test_numeric_order_ids_match_text_ids() {
        let mut inputs = inputs();
        inputs.orders = RecordSet::from_columns(vec![("order_id", vec![Value::Int(1)])]).unwrap();
        inputs.lines = RecordSet::from_columns(vec![("order_id", vec![Value::from("1")])]).unwrap();
        let build = build_fact(inputs, &keys()).unwrap().unwrap();
        assert_eq!(build.records.num_rows(), 1);
        assert_eq!(build.unresolved, 1);
    }

    #[test]
    fn test_empty_lines_skip_fact() {
        let mut inputs = inputs();
        inputs.lines = RecordSet::new();
        assert!(build_fact(inputs, &keys()).unwrap().is_none());
    }
}
