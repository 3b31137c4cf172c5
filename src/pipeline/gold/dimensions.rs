//! Dimension shaping: silver tables projected onto the gold dimension columns.

use tracing::{info, warn};

use super::warehouse::GoldTable;
use crate::error::Result;
use crate::table::{JoinKind, RecordSet, Value};
use crate::types::TableId;

/// How a silver value is stored in a dimension column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Text truncated to the declared width, null kept
    Text(usize),
    /// NOT NULL text: truncated, null stored as empty text
    RequiredText(usize),
    Timestamp,
    Date,
    /// Numeric with a fallback for missing values
    Decimal { default: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct DimColumn {
    pub name: &'static str,
    pub shape: Shape,
}

const fn col(name: &'static str, shape: Shape) -> DimColumn {
    DimColumn { name, shape }
}

/// Source-to-target mapping of one dimension. The first column is the natural key.
#[derive(Debug, Clone, Copy)]
pub struct DimensionSpec {
    pub table: GoldTable,
    pub source: TableId,
    pub renames: &'static [(&'static str, &'static str)],
    pub columns: &'static [DimColumn],
}

impl DimensionSpec {
    pub fn natural_key(&self) -> &'static str {
        self.columns[0].name
    }
}

pub const USER_DIM: DimensionSpec = DimensionSpec {
    table: GoldTable::UserDim,
    source: TableId::CustomerUser,
    renames: &[
        ("name", "user_name"),
        ("job_title", "user_job"),
        ("job_level", "user_job_lvl"),
    ],
    columns: &[
        col("user_id", Shape::RequiredText(64)),
        col("user_name", Shape::RequiredText(100)),
        col("user_job", Shape::Text(50)),
        col("user_job_lvl", Shape::Text(10)),
        col("creation_date", Shape::Timestamp),
        col("street", Shape::Text(100)),
        col("state", Shape::Text(50)),
        col("city", Shape::Text(50)),
        col("country", Shape::Text(50)),
        col("birthdate", Shape::Timestamp),
        col("gender", Shape::Text(10)),
        col("device_address", Shape::Text(100)),
        col("user_type", Shape::Text(30)),
    ],
};

pub const PRODUCT_DIM: DimensionSpec = DimensionSpec {
    table: GoldTable::ProductDim,
    source: TableId::BusinessProduct,
    renames: &[("price", "product_unit_price")],
    columns: &[
        col("product_id", Shape::RequiredText(64)),
        col("product_name", Shape::RequiredText(120)),
        col("product_type", Shape::Text(60)),
        col("product_unit_price", Shape::Decimal { default: 0 }),
    ],
};

pub const MERCHANT_DIM: DimensionSpec = DimensionSpec {
    table: GoldTable::MerchantDim,
    source: TableId::EnterpriseMerchant,
    renames: &[
        ("creation_date", "merchant_creation_date"),
        ("name", "merchant_name"),
        ("street", "merchant_street"),
        ("state", "merchant_state"),
        ("city", "merchant_city"),
        ("country", "merchant_country"),
        ("contact_number", "merchant_contact_no"),
    ],
    columns: &[
        col("merchant_id", Shape::RequiredText(64)),
        col("merchant_creation_date", Shape::Timestamp),
        col("merchant_name", Shape::RequiredText(120)),
        col("merchant_street", Shape::Text(100)),
        col("merchant_state", Shape::Text(50)),
        col("merchant_city", Shape::Text(50)),
        col("merchant_country", Shape::Text(50)),
        col("merchant_contact_no", Shape::Text(40)),
    ],
};

pub const STAFF_DIM: DimensionSpec = DimensionSpec {
    table: GoldTable::StaffDim,
    source: TableId::EnterpriseStaff,
    renames: &[
        ("name", "staff_name"),
        ("job_level", "staff_job_lvl"),
        ("creation_date", "staff_creation_date"),
        ("street", "staff_street"),
        ("state", "staff_state"),
        ("city", "staff_city"),
        ("country", "staff_country"),
        ("contact_number", "staff_contact_no"),
    ],
    columns: &[
        col("staff_id", Shape::RequiredText(64)),
        col("staff_name", Shape::RequiredText(100)),
        col("staff_job_lvl", Shape::Text(10)),
        col("staff_creation_date", Shape::Timestamp),
        col("staff_street", Shape::Text(100)),
        col("staff_state", Shape::Text(50)),
        col("staff_city", Shape::Text(50)),
        col("staff_country", Shape::Text(50)),
        col("staff_contact_no", Shape::Text(40)),
    ],
};

pub const CAMPAIGN_DIM: DimensionSpec = DimensionSpec {
    table: GoldTable::CampaignDim,
    source: TableId::MarketingCampaign,
    renames: &[],
    columns: &[
        col("campaign_id", Shape::RequiredText(64)),
        col("campaign_name", Shape::RequiredText(120)),
        col("campaign_description", Shape::Text(255)),
        col("campaign_discount", Shape::Text(10)),
    ],
};

pub const CREDIT_CARD_DIM: DimensionSpec = DimensionSpec {
    table: GoldTable::CreditCardDim,
    source: TableId::CustomerUserCreditCard,
    renames: &[],
    columns: &[
        col("credit_card_number", Shape::RequiredText(32)),
        col("user_id", Shape::RequiredText(64)),
        col("card_type", Shape::Text(30)),
        col("bank_name", Shape::Text(60)),
        col("expiry_date", Shape::Date),
    ],
};

/// Dimensions loaded from a silver table, in load order
pub const DIMENSIONS: [DimensionSpec; 6] = [
    USER_DIM,
    PRODUCT_DIM,
    MERCHANT_DIM,
    STAFF_DIM,
    CAMPAIGN_DIM,
    CREDIT_CARD_DIM,
];

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn shape_value(value: &Value, shape: Shape) -> Value {
    match shape {
        Shape::Text(width) => value
            .to_text()
            .map(|t| Value::Str(truncate(&t, width)))
            .unwrap_or(Value::Null),
        Shape::RequiredText(width) => Value::Str(truncate(&value.to_text().unwrap_or_default(), width)),
        Shape::Timestamp => value.coerce_datetime(),
        Shape::Date => value.to_date().map(Value::Date).unwrap_or(Value::Null),
        Shape::Decimal { default } => match value.coerce_numeric() {
            Value::Null => Value::Int(default),
            number => number,
        },
    }
}

/// Left join the job title and level of each user onto the user table
pub fn attach_user_jobs(users: &RecordSet, jobs: &RecordSet) -> Result<RecordSet> {
    if jobs.is_empty() || !jobs.has_column("user_id") || !users.has_column("user_id") {
        return Ok(users.clone());
    }
    let jobs = jobs.select(&["user_id", "job_title", "job_level"]);
    users.join(&jobs, "user_id", JoinKind::Left)
}

/// Campaign discount column: normalized label when present, raw discount otherwise
pub fn with_campaign_discount(mut campaigns: RecordSet) -> RecordSet {
    let source = if campaigns.has_column("discount_normalized") {
        Some("discount_normalized")
    } else if campaigns.has_column("discount") {
        Some("discount")
    } else {
        None
    };
    let values: Vec<Value> = match source.and_then(|s| campaigns.column(s)) {
        Some(values) => values.to_vec(),
        None => vec![Value::Null; campaigns.num_rows()],
    };
    campaigns.fill_column_with("campaign_discount", |row| values[row].clone());
    campaigns
}

/// Project a silver table onto the dimension columns.
///
/// Renames apply only when the target is absent; missing source columns load
/// as null. Text is cut to the column width except for the natural key. Rows without a natural key are dropped, then duplicates on the
/// natural key (first wins).
pub fn shape_dimension(spec: &DimensionSpec, mut records: RecordSet) -> Result<RecordSet> {
    for (from, to) in spec.renames {
        records.rename_column(from, to);
    }

    let rows = records.num_rows();
    let natural_key = spec.natural_key();
    let mut columns = Vec::with_capacity(spec.columns.len());
    for column in spec.columns {
        // The natural key is stored whole, since fact key lookups match the
        // full source id, and keeps nulls so those rows can be dropped below
        let shape = match column.shape {
            Shape::RequiredText(_) if column.name == natural_key => Shape::Text(usize::MAX),
            other => other,
        };
        let values: Vec<Value> = match records.column(column.name) {
            Some(values) => values.iter().map(|v| shape_value(v, shape)).collect(),
            None => {
                warn!(dimension = %spec.table, column = column.name, "source column missing, loading nulls");
                (0..rows).map(|_| shape_value(&Value::Null, shape)).collect()
            }
        };
        columns.push((column.name, values));
    }
    let mut shaped = RecordSet::from_columns(columns)?;

    let nulls = shaped.drop_nulls(&[natural_key]);
    if nulls > 0 {
        warn!(dimension = %spec.table, removed = nulls, "dropped rows without {}", natural_key);
    }
    let dupes = shaped.drop_duplicates(Some(&[natural_key][..]));
    if dupes > 0 {
        info!(dimension = %spec.table, removed = dupes, "dropped duplicate {}", natural_key);
    }
    Ok(shaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_truncates_and_fills() {
        let products = RecordSet::from_columns(vec![
            ("product_id", vec![Value::Int(7), Value::Int(7), Value::Null]),
            ("product_name", vec![Value::from("x".repeat(200).as_str()), "b".into(), "c".into()]),
            ("price", vec![Value::Null, Value::Float(2.0), Value::Float(3.0)]),
        ])
        .unwrap();

        let shaped = shape_dimension(&PRODUCT_DIM, products).unwrap();

        assert_eq!(shaped.num_rows(), 1);
        assert_eq!(shaped.column("product_id").unwrap()[0], Value::from("7"));
        assert_eq!(
            shaped.column("product_name").unwrap()[0].as_str().map(str::len),
            Some(120)
        );
        assert_eq!(shaped.column("product_type").unwrap()[0], Value::Null);
        assert_eq!(shaped.column("product_unit_price").unwrap()[0], Value::Int(0));
    }

    #[test]
    fn test_long_natural_key_not_truncated() {
        let long_id = "u".repeat(80);
        let users = RecordSet::from_columns(vec![
            ("user_id", vec![Value::from(long_id.as_str())]),
            ("name", vec![Value::from("n".repeat(150).as_str())]),
        ])
        .unwrap();
        let shaped = shape_dimension(&USER_DIM, users).unwrap();
        assert_eq!(shaped.column("user_id").unwrap()[0], Value::from(long_id.as_str()));
        assert_eq!(
            shaped.column("user_name").unwrap()[0].as_str().map(str::len),
            Some(100)
        );
    }

    #[test]
    fn test_required_text_never_null() {
        let merchants = RecordSet::from_columns(vec![("merchant_id", vec![Value::from("m1")])]).unwrap();
        let shaped = shape_dimension(&MERCHANT_DIM, merchants).unwrap();
        assert_eq!(shaped.column("merchant_name").unwrap()[0], Value::from(""));
        assert_eq!(shaped.column("merchant_street").unwrap()[0], Value::Null);
    }

    #[test]
    fn test_user_jobs_attached_and_renamed() {
        let users = RecordSet::from_columns(vec![
            ("user_id", vec![Value::from("U1"), Value::from("U2")]),
            ("name", vec![Value::from("Ana"), Value::from("Ben")]),
        ])
        .unwrap();
        let jobs = RecordSet::from_columns(vec![
            ("user_id", vec![Value::from("U2")]),
            ("job_title", vec![Value::from("Engineer")]),
            ("job_level", vec![Value::from("Senior")]),
            ("name", vec![Value::from("ignored")]),
        ])
        .unwrap();

        let merged = attach_user_jobs(&users, &jobs).unwrap();
        let shaped = shape_dimension(&USER_DIM, merged).unwrap();

        assert_eq!(shaped.column("user_name").unwrap()[1], Value::from("Ben"));
        assert_eq!(
            shaped.column("user_job").unwrap(),
            &[Value::Null, Value::from("Engineer")]
        );
        assert_eq!(shaped.column("user_job_lvl").unwrap()[1], Value::from("Senior"));
    }

    #[test]
    fn test_campaign_discount_prefers_normalized() {
        let campaigns = RecordSet::from_columns(vec![
            ("campaign_id", vec![Value::from("C1")]),
            ("discount", vec![Value::from("15pct")]),
            ("discount_normalized", vec![Value::from("15%")]),
        ])
        .unwrap();
        let shaped = shape_dimension(&CAMPAIGN_DIM, with_campaign_discount(campaigns)).unwrap();
        assert_eq!(shaped.column("campaign_discount").unwrap()[0], Value::from("15%"));
    }

    #[test]
    fn test_credit_card_expiry_as_date() {
        let cards = RecordSet::from_columns(vec![
            ("credit_card_number", vec![Value::Int(4111)]),
            ("user_id", vec![Value::from("U1")]),
            ("expiry_date", vec![Value::from("2027-03-01")]),
        ])
        .unwrap();
        let shaped = shape_dimension(&CREDIT_CARD_DIM, cards).unwrap();
        assert_eq!(
            shaped.column("expiry_date").unwrap()[0],
            Value::Date(chrono::NaiveDate::from_ymd_opt(2027, 3, 1).unwrap())
        );
    }
}
