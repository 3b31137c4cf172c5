use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use shopzada_etl::config::EtlConfig;
use shopzada_etl::logging;
use shopzada_etl::metrics;
use shopzada_etl::pipeline::gold::{GoldLoader, SqliteWarehouse};
use shopzada_etl::pipeline::silver::{SilverPipeline, SilverReport};

#[derive(Parser)]
#[command(name = "shopzada_etl")]
#[command(about = "ShopZada bronze to silver to gold batch ETL")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML configuration file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root data directory holding the bronze and silver folders
    #[arg(long)]
    data_zone: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean bronze files into canonical silver tables
    Silver,
    /// Load the silver tables into the gold warehouse
    Gold,
    /// Run silver then gold
    Run,
}

fn run_silver(config: &EtlConfig) -> anyhow::Result<SilverReport> {
    println!("🔄 Running silver pipeline...");
    let report = SilverPipeline::new(config.clone())
        .run()
        .context("silver run failed")?;

    println!("\n📊 Silver Results:");
    println!("   Files: {}", report.files.len());
    println!("   Skipped: {}", report.files_skipped());
    println!("   Failed: {}", report.files_failed());
    for (table, rows) in &report.tables {
        println!("   {}: {} rows", table, rows);
    }
    println!("   Quality issues: {} errors, {} warnings", report.errors, report.warnings);
    println!("   Quality report: {}", report.quality_report.display());
    if report.has_errors() {
        warn!("{} ERROR issues in the quality report", report.errors);
    }
    Ok(report)
}

fn run_gold(config: &EtlConfig) -> anyhow::Result<()> {
    println!("🏗️  Running gold load...");
    let warehouse_path = config.warehouse_file();
    let warehouse = SqliteWarehouse::open(&warehouse_path)
        .with_context(|| format!("could not open warehouse at {}", warehouse_path.display()))?;
    let report = GoldLoader::new(config.silver_path(), warehouse)
        .run()
        .context("gold load failed")?;

    println!("\n📊 Gold Results:");
    for (table, rows) in &report.rows_loaded {
        println!("   {}: {} rows", table, rows);
    }
    for table in &report.skipped {
        println!("   ⚠️  {} skipped", table);
    }
    if report.unresolved_fact_rows > 0 {
        println!("   Fact rows with unresolved keys: {}", report.unresolved_fact_rows);
    }
    Ok(())
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = EtlConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(data_zone) = cli.data_zone {
        config = config.with_data_zone(data_zone);
    }

    let _guard = logging::init_logging(&config.log_dir);
    metrics::init_metrics();
    info!(data_zone = %config.data_zone.display(), "configuration loaded");

    let silver = match cli.command {
        Commands::Silver => Some(run_silver(&config)?),
        Commands::Gold => {
            run_gold(&config)?;
            None
        }
        Commands::Run => {
            let report = run_silver(&config)?;
            run_gold(&config)?;
            Some(report)
        }
    };

    if config.metrics_snapshot {
        if let Err(e) = metrics::write_snapshot(&config.metrics_path()) {
            warn!("could not write metrics snapshot: {}", e);
        }
    }

    if config.fail_on_error && silver.as_ref().is_some_and(SilverReport::has_errors) {
        error!("exiting with failure: quality report holds ERROR issues");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
