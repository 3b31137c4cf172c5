use std::fs;
use std::path::Path;

use shopzada_etl::config::EtlConfig;
use shopzada_etl::error::EtlError;
use shopzada_etl::pipeline::processing::RouteOutcome;
use shopzada_etl::pipeline::silver::SilverPipeline;
use shopzada_etl::table::parquet::{read_parquet, write_parquet};
use shopzada_etl::table::{RecordSet, Value};
use tempfile::TempDir;

fn text(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

fn bronze_file(zone: &Path, name: &str, records: RecordSet) {
    write_parquet(&records, &zone.join("bronze_files").join(name)).unwrap();
}

fn config(zone: &Path) -> EtlConfig {
    EtlConfig::default().with_data_zone(zone)
}

fn silver(zone: &Path, name: &str) -> RecordSet {
    read_parquet(&zone.join("silver_files").join(name)).unwrap()
}

fn quality_report(zone: &Path) -> String {
    fs::read_to_string(zone.join("_silver_quality_report.csv")).unwrap()
}

#[test]
fn test_product_nulls_and_duplicates_removed() {
    let zone = TempDir::new().unwrap();
    bronze_file(
        zone.path(),
        "Business Department_Product_Bronze.parquet",
        RecordSet::from_columns(vec![
            (
                "Product ID",
                vec!["P1".into(), "P2".into(), "P2".into(), Value::Null, "P3".into()],
            ),
            ("Product Name", text(&["Mug", "Pen", "Pen", "Cap", "Bag"])),
            (
                "Price",
                vec![Value::Float(3.5), Value::Float(1.0), Value::Float(1.0), Value::Float(9.0), Value::Float(12.0)],
            ),
        ])
        .unwrap(),
    );

    let report = SilverPipeline::new(config(zone.path())).run().unwrap();

    let products = silver(zone.path(), "business_product.parquet");
    assert_eq!(products.num_rows(), 3);
    assert_eq!(products.column("product_id").unwrap(), text(&["P1", "P2", "P3"]).as_slice());
    assert_eq!(report.tables.get("business_product.parquet"), Some(&3));

    let csv = quality_report(zone.path());
    assert!(csv.starts_with("timestamp,table,issue_type,details,severity"));
    assert!(csv.contains(",business_product,NULL_VALUES,"));
    assert!(csv.contains(",business_product,DUPLICATES,"));
    assert!(!report.has_errors());
}

#[test]
fn test_line_items_from_two_files_are_both_kept() {
    let zone = TempDir::new().unwrap();
    bronze_file(
        zone.path(),
        "operations_line_item_data_prices1.parquet",
        RecordSet::from_columns(vec![
            ("order_id", text(&["o1", "o2"])),
            ("qty", vec![Value::Int(1), Value::Int(2)]),
            ("price", vec![Value::Float(1.0), Value::Float(2.0)]),
        ])
        .unwrap(),
    );
    bronze_file(
        zone.path(),
        "operations_line_item_data_prices2.parquet",
        RecordSet::from_columns(vec![
            ("order_id", text(&["o3"])),
            ("quantity", text(&["3 pcs"])),
            ("unit_price", vec![Value::Float(4.0)]),
        ])
        .unwrap(),
    );

    let report = SilverPipeline::new(config(zone.path())).run().unwrap();

    let lines = silver(zone.path(), "operations_line_items.parquet");
    assert_eq!(lines.num_rows(), 3);
    assert_eq!(lines.column("product_id").unwrap(), text(&["o1_0", "o2_1", "o3_0"]).as_slice());
    assert_eq!(
        lines.column("quantity").unwrap(),
        &[Value::Int(1), Value::Int(2), Value::Int(3)]
    );
    assert_eq!(report.tables.get("operations_line_items.parquet"), Some(&3));
    assert!(report
        .files
        .iter()
        .all(|f| matches!(f.outcome, RouteOutcome::Buffered { .. })));
}

#[test]
fn test_line_items_resolve_products_whatever_the_file_name_casing() {
    let zone = TempDir::new().unwrap();
    bronze_file(
        zone.path(),
        "Operations Department_line_item_data_bronze.parquet",
        RecordSet::from_columns(vec![
            ("order_id", text(&["o1"])),
            ("item_name", text(&["widget"])),
            ("quantity", vec![Value::Int(2)]),
            ("price", vec![Value::Float(1.5)]),
        ])
        .unwrap(),
    );
    bronze_file(
        zone.path(),
        "business_product_bronze.parquet",
        RecordSet::from_columns(vec![
            ("Product ID", text(&["P1"])),
            ("Product Name", text(&["widget"])),
        ])
        .unwrap(),
    );

    let report = SilverPipeline::new(config(zone.path())).run().unwrap();

    assert_eq!(report.files[0].file, "business_product_bronze.parquet");
    let lines = silver(zone.path(), "operations_line_items.parquet");
    assert_eq!(lines.column("product_id").unwrap(), text(&["P1"]).as_slice());
    assert!(!quality_report(zone.path()).contains("PRODUCT_DIM_LOAD_ERROR"));
    assert!(!report.has_errors());
}

#[test]
fn test_campaign_discounts_normalized() {
    let zone = TempDir::new().unwrap();
    bronze_file(
        zone.path(),
        "marketing_campaign_data.parquet",
        RecordSet::from_columns(vec![
            ("campaign_id", text(&["C1", "C2"])),
            ("campaign_name", text(&["Spring", "Fall"])),
            ("discount", text(&["15pct", "N/A"])),
        ])
        .unwrap(),
    );

    SilverPipeline::new(config(zone.path())).run().unwrap();

    let campaigns = silver(zone.path(), "marketing_campaign.parquet");
    assert_eq!(
        campaigns.column("discount_normalized").unwrap(),
        &[Value::from("15%"), Value::Null]
    );
    assert_eq!(campaigns.column("discount").unwrap(), text(&["15pct", "N/A"]).as_slice());
}

#[test]
fn test_bad_files_do_not_stop_the_run() {
    let zone = TempDir::new().unwrap();
    let bronze = zone.path().join("bronze_files");
    fs::create_dir_all(&bronze).unwrap();
    fs::write(bronze.join("finance_ledger.parquet"), b"not read").unwrap();
    fs::write(bronze.join("operations_order_data.parquet"), b"corrupt").unwrap();
    bronze_file(
        zone.path(),
        "operations_order_delays.parquet",
        RecordSet::from_columns(vec![
            ("order_id", text(&["o1", "o1"])),
            ("delay_in_days", vec![Value::Int(2), Value::Int(2)]),
        ])
        .unwrap(),
    );

    let report = SilverPipeline::new(config(zone.path())).run().unwrap();

    assert_eq!(report.files.len(), 3);
    assert_eq!(report.files_skipped(), 1);
    assert_eq!(report.files_failed(), 1);
    assert_eq!(silver(zone.path(), "operations_order_delays.parquet").num_rows(), 1);

    let csv = quality_report(zone.path());
    assert!(csv.contains(",operations_order_data.parquet,PROCESSING_ERROR,"));
    assert!(!csv.contains("finance_ledger"));
    assert_eq!(report.errors, 1);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(zone.path().join("_silver_run_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["errors"], 1);
    assert_eq!(summary["files"].as_array().map(Vec::len), Some(3));
}

#[test]
fn test_enterprise_parts_written_separately_and_combined() {
    let zone = TempDir::new().unwrap();
    for (part, orders) in [(1, ["o1", "o2"]), (2, ["o3", "o4"])] {
        bronze_file(
            zone.path(),
            &format!("Enterprise Department_order_with_merchant_data_{}_bronze.parquet", part),
            RecordSet::from_columns(vec![
                ("OrderID", text(&orders)),
                ("MerchantID", text(&["m1", "m2"])),
                ("StaffID", text(&["s1", "s1"])),
            ])
            .unwrap(),
        );
    }

    let report = SilverPipeline::new(config(zone.path())).run().unwrap();

    assert_eq!(
        silver(zone.path(), "enterprise_order_with_merchant_data_1_tx.parquet").num_rows(),
        2
    );
    let combined = silver(zone.path(), "enterprise_order_merchant_tx.parquet");
    assert_eq!(combined.num_rows(), 4);
    assert_eq!(combined.column_names(), vec!["order_id", "merchant_id", "staff_id"]);
    assert_eq!(report.tables.get("enterprise_order_merchant_tx.parquet"), Some(&4));
}

#[test]
fn test_missing_bronze_folder_aborts() {
    let zone = TempDir::new().unwrap();
    let err = SilverPipeline::new(config(zone.path())).run().unwrap_err();
    assert!(matches!(err, EtlError::MissingInputDir(_)));
    assert!(!zone.path().join("_silver_quality_report.csv").exists());
}
