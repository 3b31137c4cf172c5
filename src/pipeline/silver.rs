//! Silver orchestrator: one sequential run over the bronze folder.
//!
//! The run walks a fixed sequence of states. Only a missing bronze folder stops
//! it; every per-file problem is recorded in the quality log and the run moves on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::EtlConfig;
use crate::constants::PARQUET_EXTENSION;
use crate::error::{EtlError, Result};
use crate::metrics::SilverMetrics;
use crate::pipeline::processing::cleaners::SourceFile;
use crate::pipeline::processing::combine::TransactionCombiner;
use crate::pipeline::processing::{
    CleanerRegistry, IssueKind, RouteOutcome, SilverContext, TableFamily,
};
use crate::types::TableId;

/// Stages of a silver run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SilverState {
    Init,
    DiscoverFiles,
    RouteAndClean,
    FlushLineItemBuffer,
    CombineMultiPart,
    PersistQualityReport,
    Done,
}

impl fmt::Display for SilverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SilverState::Init => "INIT",
            SilverState::DiscoverFiles => "DISCOVER_FILES",
            SilverState::RouteAndClean => "ROUTE_AND_CLEAN",
            SilverState::FlushLineItemBuffer => "FLUSH_LINE_ITEM_BUFFER",
            SilverState::CombineMultiPart => "COMBINE_MULTI_PART",
            SilverState::PersistQualityReport => "PERSIST_QUALITY_REPORT",
            SilverState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Outcome of a single bronze file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file: String,
    #[serde(flatten)]
    pub outcome: RouteOutcome,
}

/// Summary of a silver run, persisted as JSON next to the quality report
#[derive(Debug, Clone, Serialize)]
pub struct SilverReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files: Vec<FileOutcome>,
    /// Row counts of every output written this run, keyed by file name
    pub tables: BTreeMap<String, usize>,
    pub errors: usize,
    pub warnings: usize,
    pub quality_report: PathBuf,
}

impl SilverReport {
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn files_failed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, RouteOutcome::Failed { .. }))
            .count()
    }

    pub fn files_skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, RouteOutcome::Skipped { .. }))
            .count()
    }
}

pub struct SilverPipeline {
    config: EtlConfig,
    registry: CleanerRegistry,
    state: SilverState,
}

impl SilverPipeline {
    pub fn new(config: EtlConfig) -> Self {
        Self::with_registry(config, CleanerRegistry::new())
    }

    pub fn with_registry(config: EtlConfig, registry: CleanerRegistry) -> Self {
        Self {
            config,
            registry,
            state: SilverState::Init,
        }
    }

    pub fn state(&self) -> SilverState {
        self.state
    }

    fn enter(&mut self, state: SilverState) {
        info!(from = %self.state, to = %state, "silver state transition");
        self.state = state;
    }

    /// Bronze inputs: `*.parquet` files not starting with `_`, in routing order.
    ///
    /// Files are ordered by family, then by normalized file id, so casing or a
    /// "Department" marker in a name never changes which tables exist when a
    /// later family reads them. Unknown files go last.
    pub fn discover_files(bronze_dir: &Path) -> Result<Vec<PathBuf>> {
        if !bronze_dir.is_dir() {
            return Err(EtlError::MissingInputDir(bronze_dir.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = fs::read_dir(bronze_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension().and_then(|e| e.to_str()) == Some(PARQUET_EXTENSION)
                    && !path
                        .file_name()
                        .map(|n| n.to_string_lossy().starts_with('_'))
                        .unwrap_or(true)
            })
            .collect();
        files.sort_by_cached_key(|path| {
            let file_id = SourceFile::from_path(path).file_id;
            let family = TableFamily::detect(&file_id);
            (family.is_none(), family, file_id, path.clone())
        });
        Ok(files)
    }

    /// Run every stage once. A fresh quality log and line-item buffer are used
    /// for each call.
    #[instrument(skip(self), fields(data_zone = %self.config.data_zone.display()))]
    pub fn run(&mut self) -> Result<SilverReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        self.state = SilverState::Init;

        let bronze_dir = self.config.bronze_path();
        let silver_dir = self.config.silver_path();
        info!(%run_id, bronze = %bronze_dir.display(), silver = %silver_dir.display(), "🚀 Starting silver run");
        println!("🚀 Starting silver run {}", run_id);

        self.enter(SilverState::DiscoverFiles);
        let files = match Self::discover_files(&bronze_dir) {
            Ok(files) => files,
            Err(e) => {
                error!("❌ {}", e);
                return Err(e);
            }
        };
        fs::create_dir_all(&silver_dir)?;
        info!("📂 Found {} bronze files", files.len());
        println!("📂 Found {} bronze files", files.len());

        let mut ctx = SilverContext::new(&silver_dir);
        let mut outcomes = Vec::with_capacity(files.len());
        let mut tables = BTreeMap::new();

        self.enter(SilverState::RouteAndClean);
        for path in &files {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let outcome = self.registry.route(path, &mut ctx);
            match &outcome {
                RouteOutcome::Persisted { output, rows, .. } => {
                    println!("   ✅ {} -> {} ({} rows)", file, output, rows);
                    tables.insert(output.clone(), *rows);
                }
                RouteOutcome::Buffered { rows, .. } => {
                    println!("   📥 {} buffered ({} rows)", file, rows);
                }
                RouteOutcome::Skipped { reason } => {
                    println!("   ⏭️  {} skipped: {}", file, reason);
                }
                RouteOutcome::Failed { error } => {
                    println!("   ❌ {} failed: {}", file, error);
                }
            }
            outcomes.push(FileOutcome { file, outcome });
        }

        self.enter(SilverState::FlushLineItemBuffer);
        let line_item_table = TableId::OperationsLineItems;
        match ctx.line_items.flush(&silver_dir) {
            Ok(Some(rows)) => {
                SilverMetrics::record_rows_written(line_item_table.name(), rows);
                tables.insert(line_item_table.file_name(), rows);
            }
            Ok(None) => {}
            Err(e) => {
                error!("failed to write buffered line items: {}", e);
                ctx.quality
                    .error(line_item_table.name(), IssueKind::ProcessingError, e.to_string());
            }
        }

        self.enter(SilverState::CombineMultiPart);
        let combined_table = TableId::EnterpriseOrderMerchantTx;
        match TransactionCombiner::combine(&bronze_dir, &silver_dir, &mut ctx.quality) {
            Ok(Some(rows)) => {
                SilverMetrics::record_rows_written(combined_table.name(), rows);
                tables.insert(combined_table.file_name(), rows);
            }
            Ok(None) => {}
            Err(e) => {
                error!("failed to combine enterprise transaction parts: {}", e);
                ctx.quality
                    .error(combined_table.name(), IssueKind::ProcessingError, e.to_string());
            }
        }

        self.enter(SilverState::PersistQualityReport);
        let quality_report = self.config.quality_report_path();
        ctx.quality.save_report(&quality_report)?;
        let errors = ctx.quality.error_count();
        let warnings = ctx.quality.warning_count();
        if errors > 0 {
            warn!(errors, warnings, "silver run finished with ERROR issues");
        }

        let report = SilverReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            files: outcomes,
            tables,
            errors,
            warnings,
            quality_report,
        };
        let summary_path = self.config.run_summary_path();
        fs::write(&summary_path, serde_json::to_string_pretty(&report)?)?;

        SilverMetrics::record_run_duration(timer.elapsed().as_secs_f64());
        self.enter(SilverState::Done);
        info!(
            tables = report.tables.len(),
            errors, warnings, "✅ Silver run complete"
        );
        println!(
            "✅ Silver run complete: {} tables, {} errors, {} warnings",
            report.tables.len(),
            errors,
            warnings
        );
        Ok(report)
    }
}
