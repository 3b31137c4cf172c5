use rusqlite::types::Value as SqlValue;
use std::path::Path;

use shopzada_etl::config::EtlConfig;
use shopzada_etl::pipeline::gold::{GoldLoader, GoldTable, SqliteWarehouse, Warehouse};
use shopzada_etl::pipeline::silver::SilverPipeline;
use shopzada_etl::table::parquet::write_parquet;
use shopzada_etl::table::{RecordSet, Value};
use tempfile::TempDir;

fn text(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

fn silver_table(dir: &Path, name: &str, columns: Vec<(&str, Vec<Value>)>) {
    let records = RecordSet::from_columns(columns).unwrap();
    write_parquet(&records, &dir.join(format!("{}.parquet", name))).unwrap();
}

/// A small but complete silver folder
fn seed_silver(dir: &Path) {
    silver_table(dir, "customer_user", vec![
        ("user_id", text(&["U1", "U2"])),
        ("name", text(&["Ana", "Ben"])),
        ("birthdate", text(&["1995-01-10", "2000-12-31"])),
    ]);
    silver_table(dir, "customer_user_job", vec![
        ("user_id", text(&["U1"])),
        ("job_title", text(&["Engineer"])),
        ("job_level", text(&["Senior"])),
    ]);
    silver_table(dir, "business_product", vec![
        ("product_id", text(&["P1", "P2"])),
        ("product_name", text(&["Mug", "Pen"])),
        ("price", vec![Value::Float(3.25), Value::Float(1.25)]),
    ]);
    silver_table(dir, "enterprise_merchant", vec![
        ("merchant_id", text(&["M1"])),
        ("name", text(&["Shop One"])),
    ]);
    silver_table(dir, "enterprise_staff", vec![
        ("staff_id", text(&["S1"])),
        ("name", text(&["Cara"])),
    ]);
    silver_table(dir, "marketing_campaign", vec![
        ("campaign_id", text(&["C1"])),
        ("campaign_name", text(&["Spring"])),
        ("discount", text(&["15pct"])),
        ("discount_normalized", text(&["15%"])),
    ]);
    silver_table(dir, "operations_orders", vec![
        ("order_id", text(&["O1", "O2"])),
        ("user_id", text(&["U1", "U2"])),
        ("transaction_date", text(&["2021-03-01", "2021-03-02"])),
    ]);
    silver_table(dir, "operations_line_items", vec![
        ("order_id", text(&["O1", "O1", "O2"])),
        ("product_id", text(&["P1", "P2", "P1"])),
        ("quantity", vec![Value::Int(2), Value::Int(1), Value::Int(4)]),
        ("price", vec![Value::Float(3.25), Value::Float(1.25), Value::Float(3.25)]),
    ]);
    silver_table(dir, "enterprise_order_merchant_tx", vec![
        ("order_id", text(&["O1", "O2"])),
        ("merchant_id", text(&["M1", "M999"])),
        ("staff_id", text(&["S1", "S1"])),
    ]);
    silver_table(dir, "marketing_transactional_campaign", vec![
        ("order_id", text(&["O1"])),
        ("campaign_id", text(&["C1"])),
    ]);
}

fn loader(dir: &Path) -> GoldLoader<SqliteWarehouse> {
    let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
    warehouse.provision().unwrap();
    GoldLoader::new(dir, warehouse)
}

#[test]
fn test_dimensions_and_fact_loaded() {
    let dir = TempDir::new().unwrap();
    seed_silver(dir.path());
    let mut loader = loader(dir.path());

    let report = loader.run().unwrap();

    assert_eq!(report.rows(GoldTable::UserDim), 2);
    assert_eq!(report.rows(GoldTable::ProductDim), 2);
    assert_eq!(report.rows(GoldTable::MerchantDim), 1);
    assert_eq!(report.rows(GoldTable::CreditCardDim), 0);
    assert_eq!(report.skipped, vec!["credit_card_dim".to_string()]);
    // 1995-01-10 ..= 2021-03-02
    let warehouse = loader.warehouse();
    let days = warehouse.row_count(GoldTable::DateDim).unwrap();
    assert_eq!(days, 9549);
    assert_eq!(warehouse.row_count(GoldTable::OrderLineFact).unwrap(), 3);

    let users = warehouse
        .query_rows(GoldTable::UserDim, &["user_id", "user_job", "user_job_lvl"])
        .unwrap();
    assert_eq!(users[0][1], SqlValue::Text("Engineer".into()));
    assert_eq!(users[1][2], SqlValue::Null);

    let fact = warehouse
        .query_rows(
            GoldTable::OrderLineFact,
            &["order_id", "order_line_id", "campaign_key", "order_date_key", "line_amount"],
        )
        .unwrap();
    assert_eq!(fact[0][1], SqlValue::Text("1".into()));
    assert_eq!(fact[1][1], SqlValue::Text("2".into()));
    assert_eq!(fact[0][2], SqlValue::Integer(1));
    assert_eq!(fact[0][3], SqlValue::Integer(20210301));
    assert_eq!(fact[0][4], SqlValue::Real(6.5));
    assert_eq!(fact[2][2], SqlValue::Null);
}

#[test]
fn test_unknown_merchant_gives_null_key_not_dropped_row() {
    let dir = TempDir::new().unwrap();
    seed_silver(dir.path());
    let mut loader = loader(dir.path());

    let report = loader.run().unwrap();

    let fact = loader
        .warehouse()
        .query_rows(GoldTable::OrderLineFact, &["order_id", "merchant_key", "staff_key"])
        .unwrap();
    let o2: Vec<_> = fact
        .iter()
        .filter(|row| row[0] == SqlValue::Text("O2".into()))
        .collect();
    assert_eq!(o2.len(), 1);
    assert_eq!(o2[0][1], SqlValue::Null);
    assert_eq!(o2[0][2], SqlValue::Integer(1));
    // O2 also has no campaign
    assert_eq!(report.unresolved_fact_rows, 1);
}

#[test]
fn test_ids_longer_than_column_width_still_resolve() {
    let dir = TempDir::new().unwrap();
    seed_silver(dir.path());
    let long_user = format!("U-{}", "7".repeat(70));
    silver_table(dir.path(), "customer_user", vec![
        ("user_id", text(&[long_user.as_str()])),
        ("name", text(&["Ana"])),
    ]);
    silver_table(dir.path(), "operations_orders", vec![
        ("order_id", text(&["O1", "O2"])),
        ("user_id", text(&[long_user.as_str(), long_user.as_str()])),
        ("transaction_date", text(&["2021-03-01", "2021-03-02"])),
    ]);
    let mut loader = loader(dir.path());

    loader.run().unwrap();

    let warehouse = loader.warehouse();
    assert_eq!(warehouse.key_map(GoldTable::UserDim).unwrap().get(&long_user), Some(&1));
    let fact = warehouse
        .query_rows(GoldTable::OrderLineFact, &["user_key"])
        .unwrap();
    assert_eq!(fact.len(), 3);
    assert!(fact.iter().all(|row| row[0] == SqlValue::Integer(1)));
}

#[test]
fn test_reload_is_idempotent() {
    let dir = TempDir::new().unwrap();
    seed_silver(dir.path());
    let mut loader = loader(dir.path());

    let first = loader.run().unwrap();
    let second = loader.run().unwrap();

    assert_eq!(first.rows_loaded, second.rows_loaded);
    let warehouse = loader.warehouse();
    assert_eq!(warehouse.row_count(GoldTable::OrderLineFact).unwrap(), 3);
    assert_eq!(warehouse.key_map(GoldTable::ProductDim).unwrap().get("P1"), Some(&1));
}

#[test]
fn test_empty_silver_folder_loads_default_calendar_only() {
    let dir = TempDir::new().unwrap();
    let mut loader = loader(dir.path());

    let report = loader.run().unwrap();

    assert_eq!(report.rows(GoldTable::DateDim), 366);
    assert_eq!(report.rows(GoldTable::OrderLineFact), 0);
    assert!(report.skipped.contains(&"order_line_fact".to_string()));
    assert_eq!(report.skipped.len(), 7);
}

#[test]
fn test_bronze_to_gold_end_to_end() {
    let zone = TempDir::new().unwrap();
    let bronze = zone.path().join("bronze_files");
    write_parquet(
        &RecordSet::from_columns(vec![
            ("Product_ID", text(&["P1"])),
            ("Product Name", text(&["Mug"])),
            ("Price", vec![Value::Float(2.0)]),
        ])
        .unwrap(),
        &bronze.join("business_product.parquet"),
    )
    .unwrap();
    write_parquet(
        &RecordSet::from_columns(vec![
            ("Order ID", text(&["O1"])),
            ("User ID", text(&["U1"])),
            ("Transaction Date", text(&["2022-02-02"])),
        ])
        .unwrap(),
        &bronze.join("operations_order_data.parquet"),
    )
    .unwrap();
    write_parquet(
        &RecordSet::from_columns(vec![
            ("order_id", text(&["O1"])),
            ("item_name", text(&["Mug"])),
            ("quantity", text(&["3x"])),
            ("price", vec![Value::Float(2.5)]),
        ])
        .unwrap(),
        &bronze.join("operations_line_item_data_products.parquet"),
    )
    .unwrap();

    let config = EtlConfig::default().with_data_zone(zone.path());
    let silver = SilverPipeline::new(config.clone()).run().unwrap();
    assert!(!silver.has_errors());

    let mut loader = loader(&config.silver_path());
    let report = loader.run().unwrap();

    assert_eq!(report.rows(GoldTable::OrderLineFact), 1);
    let fact = loader
        .warehouse()
        .query_rows(GoldTable::OrderLineFact, &["product_key", "order_date_key", "quantity", "line_amount"])
        .unwrap();
    assert_eq!(fact[0][0], SqlValue::Integer(1));
    assert_eq!(fact[0][1], SqlValue::Integer(20220202));
    assert_eq!(fact[0][2], SqlValue::Integer(3));
    assert_eq!(fact[0][3], SqlValue::Real(7.5));
}
