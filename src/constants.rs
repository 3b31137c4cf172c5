/// Naming constants shared by the silver and gold stages.
/// Column aliases are matched after column standardization, so they are all
/// lower-case snake_case.

pub const PARQUET_EXTENSION: &str = "parquet";
pub const BRONZE_SUFFIX: &str = "_bronze";

// File-family prefixes, tested in this order by the router
pub const BUSINESS_PREFIX: &str = "business_";
pub const CUSTOMER_MANAGEMENT_PREFIX: &str = "customer_management_";
pub const CUSTOMER_PREFIX: &str = "customer_";
pub const ENTERPRISE_PREFIX: &str = "enterprise_";
pub const OPERATIONS_PREFIX: &str = "operations_";
pub const MARKETING_PREFIX: &str = "marketing_";

// Multi-part enterprise transaction extracts
pub const ENTERPRISE_TX_PART_PREFIX: &str = "enterprise_order_with_merchant_data";

// Aliases copied into `quantity` when it is absent, first match wins
pub const QUANTITY_ALIASES: &[&str] = &[
    "qty",
    "quantity_purchased",
    "order_quantity",
    "item_quantity",
];

// Aliases copied into `product_name` on line items
pub const PRODUCT_NAME_ALIASES: &[&str] = &["item_name", "product", "product_desc", "item_desc"];

// Raw -> canonical renames, applied only when the canonical column is absent
pub const PRODUCT_ID_RENAMES: &[(&str, &str)] = &[
    ("productid", "product_id"),
    ("prod_id", "product_id"),
    ("sku", "product_id"),
    ("item_id", "product_id"),
];
pub const CUSTOMER_RENAMES: &[(&str, &str)] = &[("userid", "user_id")];
pub const ENTERPRISE_RENAMES: &[(&str, &str)] = &[
    ("merchantid", "merchant_id"),
    ("staffid", "staff_id"),
    ("orderid", "order_id"),
];
pub const OPERATIONS_RENAMES: &[(&str, &str)] = &[
    ("orderid", "order_id"),
    ("productid", "product_id"),
    ("prod_id", "product_id"),
    ("sku", "product_id"),
    ("item_id", "product_id"),
    ("userid", "user_id"),
];
pub const MARKETING_RENAMES: &[(&str, &str)] = &[
    ("campaignid", "campaign_id"),
    ("orderid", "order_id"),
    ("userid", "user_id"),
];

/// Rows sampled per table when deriving the calendar span of the date dimension
pub const DATE_RANGE_SAMPLE_ROWS: usize = 50_000;
