use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::table::{RecordSet, Value};

/// Tables of the gold star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GoldTable {
    UserDim,
    ProductDim,
    MerchantDim,
    StaffDim,
    CampaignDim,
    CreditCardDim,
    DateDim,
    OrderLineFact,
}

impl GoldTable {
    pub const DIMENSIONS: [GoldTable; 7] = [
        GoldTable::UserDim,
        GoldTable::ProductDim,
        GoldTable::MerchantDim,
        GoldTable::StaffDim,
        GoldTable::CampaignDim,
        GoldTable::CreditCardDim,
        GoldTable::DateDim,
    ];

    /// Delete order: the fact first, then every dimension it references
    pub const TRUNCATE_ORDER: [GoldTable; 8] = [
        GoldTable::OrderLineFact,
        GoldTable::CreditCardDim,
        GoldTable::DateDim,
        GoldTable::UserDim,
        GoldTable::ProductDim,
        GoldTable::MerchantDim,
        GoldTable::StaffDim,
        GoldTable::CampaignDim,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GoldTable::UserDim => "user_dim",
            GoldTable::ProductDim => "product_dim",
            GoldTable::MerchantDim => "merchant_dim",
            GoldTable::StaffDim => "staff_dim",
            GoldTable::CampaignDim => "campaign_dim",
            GoldTable::CreditCardDim => "credit_card_dim",
            GoldTable::DateDim => "date_dim",
            GoldTable::OrderLineFact => "order_line_fact",
        }
    }

    /// `(surrogate key, natural key)` columns of a dimension
    pub fn key_columns(&self) -> Option<(&'static str, &'static str)> {
        match self {
            GoldTable::UserDim => Some(("user_key", "user_id")),
            GoldTable::ProductDim => Some(("product_key", "product_id")),
            GoldTable::MerchantDim => Some(("merchant_key", "merchant_id")),
            GoldTable::StaffDim => Some(("staff_key", "staff_id")),
            GoldTable::CampaignDim => Some(("campaign_key", "campaign_id")),
            GoldTable::CreditCardDim => Some(("credit_card_key", "credit_card_number")),
            GoldTable::DateDim => Some(("date_key", "full_date")),
            GoldTable::OrderLineFact => None,
        }
    }
}

impl fmt::Display for GoldTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Natural key text -> surrogate key
pub type KeyMap = HashMap<String, i64>;

/// Storage port for the gold layer
pub trait Warehouse {
    /// Create every table that does not exist yet
    fn provision(&mut self) -> Result<()>;

    /// Remove all rows, child tables first, and restart surrogate key counters
    fn truncate_all(&mut self) -> Result<()>;

    /// Bulk insert; column names of `rows` must match the table's columns.
    /// Returns the number of rows inserted.
    fn append(&mut self, table: GoldTable, rows: &RecordSet) -> Result<usize>;

    /// Natural key to surrogate key for a dimension, read from what is stored now
    fn key_map(&self, dimension: GoldTable) -> Result<KeyMap>;

    fn row_count(&self, table: GoldTable) -> Result<usize>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_dim (
    user_key        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         VARCHAR(64) UNIQUE NOT NULL,
    user_name       VARCHAR(100) NOT NULL,
    user_job        VARCHAR(50),
    user_job_lvl    VARCHAR(10),
    creation_date   TIMESTAMP,
    street          VARCHAR(100),
    state           VARCHAR(50),
    city            VARCHAR(50),
    country         VARCHAR(50),
    birthdate       TIMESTAMP,
    gender          VARCHAR(10),
    device_address  VARCHAR(100),
    user_type       VARCHAR(30)
);

CREATE TABLE IF NOT EXISTS product_dim (
    product_key         INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id          VARCHAR(64) UNIQUE NOT NULL,
    product_name        VARCHAR(120) NOT NULL,
    product_type        VARCHAR(60),
    product_unit_price  NUMERIC(12,2) NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS merchant_dim (
    merchant_key            INTEGER PRIMARY KEY AUTOINCREMENT,
    merchant_id             VARCHAR(64) UNIQUE NOT NULL,
    merchant_creation_date  TIMESTAMP,
    merchant_name           VARCHAR(120) NOT NULL,
    merchant_street         VARCHAR(100),
    merchant_state          VARCHAR(50),
    merchant_city           VARCHAR(50),
    merchant_country        VARCHAR(50),
    merchant_contact_no     VARCHAR(40)
);

CREATE TABLE IF NOT EXISTS staff_dim (
    staff_key            INTEGER PRIMARY KEY AUTOINCREMENT,
    staff_id             VARCHAR(64) UNIQUE NOT NULL,
    staff_name           VARCHAR(100) NOT NULL,
    staff_job_lvl        VARCHAR(10),
    staff_creation_date  TIMESTAMP,
    staff_street         VARCHAR(100),
    staff_state          VARCHAR(50),
    staff_city           VARCHAR(50),
    staff_country        VARCHAR(50),
    staff_contact_no     VARCHAR(40)
);

CREATE TABLE IF NOT EXISTS campaign_dim (
    campaign_key          INTEGER PRIMARY KEY AUTOINCREMENT,
    campaign_id           VARCHAR(64) UNIQUE NOT NULL,
    campaign_name         VARCHAR(120) NOT NULL,
    campaign_description  VARCHAR(255),
    campaign_discount     VARCHAR(10)
);

CREATE TABLE IF NOT EXISTS credit_card_dim (
    credit_card_key     INTEGER PRIMARY KEY AUTOINCREMENT,
    credit_card_number  VARCHAR(32) UNIQUE NOT NULL,
    user_id             VARCHAR(64) NOT NULL,
    card_type           VARCHAR(30),
    bank_name           VARCHAR(60),
    expiry_date         DATE
);

CREATE TABLE IF NOT EXISTS date_dim (
    date_key    INTEGER PRIMARY KEY,
    full_date   DATE NOT NULL,
    year        INTEGER NOT NULL,
    quarter     INTEGER NOT NULL,
    month       INTEGER NOT NULL,
    month_name  VARCHAR(15),
    day         INTEGER NOT NULL,
    day_name    VARCHAR(15),
    is_weekend  BOOLEAN
);

CREATE TABLE IF NOT EXISTS order_line_fact (
    order_line_key   INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id         VARCHAR(64),
    order_line_id    VARCHAR(64),
    user_key         INTEGER REFERENCES user_dim(user_key),
    product_key      INTEGER REFERENCES product_dim(product_key),
    merchant_key     INTEGER REFERENCES merchant_dim(merchant_key),
    staff_key        INTEGER REFERENCES staff_dim(staff_key),
    campaign_key     INTEGER REFERENCES campaign_dim(campaign_key),
    credit_card_key  INTEGER REFERENCES credit_card_dim(credit_card_key),
    order_date_key   INTEGER REFERENCES date_dim(date_key),
    quantity         NUMERIC(12,2),
    line_amount      NUMERIC(14,2)
);
"#;

/// Embedded SQLite warehouse, file backed or in memory
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!(path = %path.display(), "opened SQLite warehouse");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Read every row of `table` back, in insertion order. Used for inspection.
    pub fn query_rows(&self, table: GoldTable, columns: &[&str]) -> Result<Vec<Vec<SqlValue>>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            columns.join(", "),
            table.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            (0..columns.len())
                .map(|i| row.get::<_, SqlValue>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl Warehouse for SqliteWarehouse {
    fn provision(&mut self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        info!("gold schema provisioned");
        Ok(())
    }

    fn truncate_all(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in GoldTable::TRUNCATE_ORDER {
            tx.execute(&format!("DELETE FROM {}", table.name()), [])?;
        }
        // Restart AUTOINCREMENT counters
        tx.execute("DELETE FROM sqlite_sequence", [])?;
        tx.commit()?;
        info!("truncated all gold tables");
        Ok(())
    }

    fn append(&mut self, table: GoldTable, rows: &RecordSet) -> Result<usize> {
        let names = rows.column_names();
        if names.is_empty() {
            return Err(EtlError::Warehouse(format!("no columns to insert into {}", table)));
        }
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            names.join(", "),
            placeholders.join(", ")
        );

        let columns: Vec<&[Value]> = names.iter().filter_map(|n| rows.column(n)).collect();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in 0..rows.num_rows() {
                stmt.execute(params_from_iter(columns.iter().map(|c| &c[row])))?;
            }
        }
        tx.commit()?;
        debug!(table = %table, rows = rows.num_rows(), "appended rows");
        Ok(rows.num_rows())
    }

    fn key_map(&self, dimension: GoldTable) -> Result<KeyMap> {
        let (key, natural) = dimension.key_columns().ok_or_else(|| {
            EtlError::Warehouse(format!("{} has no natural key", dimension))
        })?;
        let sql = format!("SELECT {}, {} FROM {}", key, natural, dimension.name());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut map = KeyMap::new();
        while let Some(row) = rows.next()? {
            let surrogate: i64 = row.get(0)?;
            if let Some(text) = sql_text(row.get::<_, SqlValue>(1)?) {
                map.insert(text, surrogate);
            }
        }
        Ok(map)
    }

    fn row_count(&self, table: GoldTable) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Text form of a stored natural key, matching `Value::to_text`
fn sql_text(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Null => None,
        SqlValue::Integer(i) => Some(i.to_string()),
        SqlValue::Real(f) => Some(f.to_string()),
        SqlValue::Text(s) => Some(s),
        SqlValue::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Int(i) => SqlValue::Integer(*i),
            Value::Float(f) if f.is_nan() => SqlValue::Null,
            Value::Float(f) => SqlValue::Real(*f),
            other => SqlValue::Text(other.to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}
