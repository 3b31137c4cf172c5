use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};

pub const DEFAULT_DATA_ZONE: &str = "/app/data_zone";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Runtime settings for one pipeline invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Root directory holding the bronze/silver folders and run artifacts
    pub data_zone: PathBuf,
    pub bronze_dir: String,
    pub silver_dir: String,
    /// Written into `data_zone`, next to the silver folder
    pub quality_report_file: String,
    pub run_summary_file: String,
    pub metrics_file: String,
    /// SQLite file for the gold layer, relative paths resolve against `data_zone`
    pub warehouse_path: PathBuf,
    /// Exit non-zero when the persisted quality log holds ERROR issues
    pub fail_on_error: bool,
    pub log_dir: PathBuf,
    pub metrics_snapshot: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            data_zone: PathBuf::from(DEFAULT_DATA_ZONE),
            bronze_dir: "bronze_files".to_string(),
            silver_dir: "silver_files".to_string(),
            quality_report_file: "_silver_quality_report.csv".to_string(),
            run_summary_file: "_silver_run_summary.json".to_string(),
            metrics_file: "_pipeline_metrics.prom".to_string(),
            warehouse_path: PathBuf::from("gold/warehouse.db"),
            fail_on_error: false,
            log_dir: PathBuf::from("logs"),
            metrics_snapshot: true,
        }
    }
}

impl EtlConfig {
    /// Load configuration: defaults, then the TOML file (if present), then environment.
    ///
    /// An explicitly requested file that does not exist is an error; the default
    /// `config.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EtlConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("ETL_DATA_ZONE") {
            if !v.trim().is_empty() {
                self.data_zone = PathBuf::from(v.trim());
            }
        }
        if let Ok(v) = std::env::var("ETL_WAREHOUSE_PATH") {
            if !v.trim().is_empty() {
                self.warehouse_path = PathBuf::from(v.trim());
            }
        }
        if let Ok(v) = std::env::var("ETL_LOG_DIR") {
            if !v.trim().is_empty() {
                self.log_dir = PathBuf::from(v.trim());
            }
        }
        if let Ok(v) = std::env::var("ETL_FAIL_ON_ERROR") {
            self.fail_on_error = parse_flag(&v).ok_or_else(|| {
                EtlError::Config(format!("ETL_FAIL_ON_ERROR must be a boolean, got '{}'", v))
            })?;
        }
        Ok(())
    }

    pub fn with_data_zone(mut self, data_zone: impl Into<PathBuf>) -> Self {
        self.data_zone = data_zone.into();
        self
    }

    pub fn bronze_path(&self) -> PathBuf {
        self.data_zone.join(&self.bronze_dir)
    }

    pub fn silver_path(&self) -> PathBuf {
        self.data_zone.join(&self.silver_dir)
    }

    pub fn quality_report_path(&self) -> PathBuf {
        self.data_zone.join(&self.quality_report_file)
    }

    pub fn run_summary_path(&self) -> PathBuf {
        self.data_zone.join(&self.run_summary_file)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.data_zone.join(&self.metrics_file)
    }

    pub fn warehouse_file(&self) -> PathBuf {
        if self.warehouse_path.is_absolute() {
            self.warehouse_path.clone()
        } else {
            self.data_zone.join(&self.warehouse_path)
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
