use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Input directory not found: {}", .0.display())]
    MissingInputDir(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error in {table}: {message}")]
    Schema { table: String, message: String },

    #[error("Warehouse error: {0}")]
    Warehouse(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
