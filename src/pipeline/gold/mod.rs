//! Gold loader: builds the star schema from the silver tables.
//!
//! Loading is a full refresh. The schema is provisioned, every table truncated,
//! then dimensions load first so the fact can resolve surrogate keys against
//! what was just written.

pub mod date_dim;
pub mod dimensions;
pub mod fact;
pub mod warehouse;

pub use warehouse::{GoldTable, KeyMap, SqliteWarehouse, Warehouse};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::metrics::GoldMetrics;
use crate::table::parquet::read_parquet;
use crate::table::RecordSet;
use crate::types::TableId;
use dimensions::{attach_user_jobs, shape_dimension, with_campaign_discount, DimensionSpec, DIMENSIONS};
use fact::{build_fact, DimensionKeys, FactInputs};

/// Rows loaded per gold table
#[derive(Debug, Clone, Default, Serialize)]
pub struct GoldReport {
    pub rows_loaded: BTreeMap<String, usize>,
    /// Fact rows with at least one null dimension key
    pub unresolved_fact_rows: usize,
    /// Tables left empty because their silver input was missing or empty
    pub skipped: Vec<String>,
}

impl GoldReport {
    pub fn rows(&self, table: GoldTable) -> usize {
        self.rows_loaded.get(table.name()).copied().unwrap_or(0)
    }

    pub fn total_rows(&self) -> usize {
        self.rows_loaded.values().sum()
    }
}

pub struct GoldLoader<W: Warehouse> {
    silver_dir: PathBuf,
    warehouse: W,
}

impl<W: Warehouse> GoldLoader<W> {
    pub fn new(silver_dir: impl Into<PathBuf>, warehouse: W) -> Self {
        Self {
            silver_dir: silver_dir.into(),
            warehouse,
        }
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    pub fn into_warehouse(self) -> W {
        self.warehouse
    }

    pub fn silver_dir(&self) -> &Path {
        &self.silver_dir
    }

    /// Read a silver table; a missing or unreadable file yields an empty set
    fn read_silver(&self, table: TableId) -> RecordSet {
        let path = self.silver_dir.join(table.file_name());
        if !path.exists() {
            warn!(table = %table, "silver table not found");
            return RecordSet::new();
        }
        match read_parquet(&path) {
            Ok(records) => {
                info!(
                    table = %table,
                    rows = records.num_rows(),
                    columns = records.num_columns(),
                    "read silver table"
                );
                records
            }
            Err(e) => {
                error!(table = %table, "could not read silver table: {}", e);
                RecordSet::new()
            }
        }
    }

    fn append(&mut self, table: GoldTable, rows: &RecordSet, report: &mut GoldReport) -> Result<()> {
        let loaded = self.warehouse.append(table, rows)?;
        GoldMetrics::record_rows_loaded(table.name(), loaded);
        report.rows_loaded.insert(table.name().to_string(), loaded);
        info!(table = %table, rows = loaded, "✅ loaded");
        println!("   ✅ Loaded {} rows into {}", loaded, table);
        Ok(())
    }

    #[instrument(skip(self, report), fields(table = %spec.table))]
    fn load_dimension(&mut self, spec: &DimensionSpec, report: &mut GoldReport) -> Result<()> {
        let mut source = self.read_silver(spec.source);
        if source.is_empty() {
            warn!("{} is empty, skipping {}", spec.source, spec.table);
            report.skipped.push(spec.table.name().to_string());
            return Ok(());
        }
        match spec.table {
            GoldTable::UserDim => {
                let jobs = self.read_silver(TableId::CustomerUserJob);
                source = attach_user_jobs(&source, &jobs)?;
            }
            GoldTable::CampaignDim => source = with_campaign_discount(source),
            _ => {}
        }
        let shaped = shape_dimension(spec, source)?;
        self.append(spec.table, &shaped, report)
    }

    #[instrument(skip(self, report))]
    fn load_date_dim(&mut self, report: &mut GoldReport) -> Result<()> {
        let sources: Vec<RecordSet> = date_dim::DATE_SOURCES
            .iter()
            .map(|t| self.read_silver(*t))
            .collect();
        let (start, end) = date_dim::date_span(&sources).unwrap_or_else(|| {
            warn!("no dates found in silver tables, using default calendar span");
            date_dim::default_span()
        });
        info!(%start, %end, "date dimension span");
        let dates = date_dim::build_date_dim(start, end)?;
        self.append(GoldTable::DateDim, &dates, report)
    }

    #[instrument(skip(self, report))]
    fn load_fact(&mut self, report: &mut GoldReport) -> Result<()> {
        let inputs = FactInputs {
            orders: self.read_silver(TableId::OperationsOrders),
            lines: self.read_silver(TableId::OperationsLineItems),
            order_merchants: self.read_silver(TableId::EnterpriseOrderMerchantTx),
            campaign_transactions: self.read_silver(TableId::MarketingTransactionalCampaign),
        };

        let mut keys = DimensionKeys::default();
        for dimension in GoldTable::DIMENSIONS {
            keys.insert(dimension, self.warehouse.key_map(dimension)?);
        }

        let Some(build) = build_fact(inputs, &keys)? else {
            warn!("operations_orders or operations_line_items is empty, skipping order_line_fact");
            report.skipped.push(GoldTable::OrderLineFact.name().to_string());
            return Ok(());
        };
        if build.unresolved > 0 {
            warn!(
                rows = build.unresolved,
                total = build.records.num_rows(),
                "fact rows with unresolved dimension keys"
            );
            GoldMetrics::record_unresolved_fact_rows(build.unresolved);
        }
        report.unresolved_fact_rows = build.unresolved;
        self.append(GoldTable::OrderLineFact, &build.records, report)
    }

    /// Full refresh of the gold schema from the silver folder
    #[instrument(skip(self), fields(silver = %self.silver_dir.display()))]
    pub fn run(&mut self) -> Result<GoldReport> {
        let timer = Instant::now();
        info!("🚀 Starting gold load");
        println!("🚀 Starting gold load from {}", self.silver_dir.display());

        self.warehouse.provision()?;
        self.warehouse.truncate_all()?;

        let mut report = GoldReport::default();
        for spec in &DIMENSIONS {
            self.load_dimension(spec, &mut report)?;
        }
        self.load_date_dim(&mut report)?;
        self.load_fact(&mut report)?;

        GoldMetrics::record_load_duration(timer.elapsed().as_secs_f64());
        info!(
            tables = report.rows_loaded.len(),
            rows = report.total_rows(),
            "✅ Gold load complete"
        );
        println!(
            "✅ Gold load complete: {} tables, {} rows",
            report.rows_loaded.len(),
            report.total_rows()
        );
        Ok(report)
    }
}
