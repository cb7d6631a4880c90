//! CLI entry point for the retail ETL pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use retail_etl::{ArtifactWriter, EtlConfig, Pipeline, RunSummary, TableOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Retail ETL: clean raw customer, product and sales exports and load them",
    long_about = "Batch ETL for retail records.\n\n\
                  Reads customers_raw.csv, products_raw.csv and sales_raw.csv, cleans them,\n\
                  splits sales into orders and order items, writes orders.csv and\n\
                  order_items.csv, refreshes four tables in a SQLite database and writes\n\
                  a data quality report.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RETAIL_ETL_DATABASE   Database path used when --database is not given\n  \
                  RUST_LOG              Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Default layout: ./data in, ./output out\n  \
                  retail-etl\n\n  \
                  # Custom locations\n  \
                  retail-etl -d exports/2024-03 -o build --database build/retail.db\n\n  \
                  # Clean, export and report without touching the database\n  \
                  retail-etl --dry-run --json"
)]
struct Args {
    /// Directory holding the raw CSV sources
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Output directory for derived artifacts and the quality report
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// SQLite database file (default: <output>/retail.db)
    #[arg(long, env = "RETAIL_ETL_DATABASE")]
    database: Option<PathBuf>,

    /// Region used for phone numbers without a country code
    #[arg(long, default_value = "IN")]
    phone_region: String,

    /// Connection attempts per table before giving up
    #[arg(long, default_value = "1")]
    connect_attempts: u32,

    /// Pause between connection attempts, in milliseconds
    #[arg(long, default_value = "500")]
    connect_backoff_ms: u64,

    /// Run everything except the load; the database is never opened
    #[arg(long)]
    dry_run: bool,

    /// Do not write orders.csv and order_items.csv
    #[arg(long)]
    no_artifacts: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the run summary as JSON to stdout instead of a readable summary
    ///
    /// Disables all logs; only the final JSON is written.
    #[arg(long)]
    json: bool,

    /// Also write the run summary to <output>/run_summary.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // .env must be loaded before parsing so it can supply RETAIL_ETL_DATABASE
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(|update| {
            tracing::debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?;

    let summary = pipeline.run()?;

    if args.emit_report {
        let writer = ArtifactWriter::new(pipeline.config().output_dir.clone());
        let path = writer.write_json(&summary, "run_summary.json")?;
        info!("Run summary written to: {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_human_readable_summary(&summary, &args);
    }

    if summary.is_success() {
        Ok(())
    } else {
        error!("One or more tables failed to load");
        Err(anyhow!("Load finished with failures"))
    }
}

fn build_config(args: &Args) -> Result<EtlConfig> {
    let mut builder = EtlConfig::builder()
        .data_dir(&args.data_dir)
        .output_dir(&args.output)
        .phone_region(&args.phone_region)
        .connect_attempts(args.connect_attempts)
        .connect_backoff_ms(args.connect_backoff_ms)
        .write_artifacts(!args.no_artifacts)
        .dry_run(args.dry_run);

    if let Some(ref database) = args.database {
        builder = builder.database_path(database);
    }

    let config = builder.build()?;
    info!(
        "Configuration: data={}, output={}, database={}, region={}, retry={}x{:?}",
        config.data_dir.display(),
        config.output_dir.display(),
        config.database_path.display(),
        config.phone_region,
        config.connect_attempts,
        Duration::from_millis(config.connect_backoff_ms)
    );
    Ok(config)
}

/// Print a human-readable summary of the run.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_summary(summary: &RunSummary, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    if summary.is_success() {
        println!("ETL RUN COMPLETE");
    } else {
        println!("ETL RUN COMPLETE WITH FAILURES");
    }
    println!("{}", "=".repeat(80));
    println!();

    println!("Sources:  {}", args.data_dir.display());
    println!("Database: {}", summary.database);
    println!("Duration: {}ms", summary.duration_ms);
    println!();

    println!("{:<12} {:>8} {:>8}", "Entity", "Raw", "Cleaned");
    println!("{}", "-".repeat(30));
    println!(
        "{:<12} {:>8} {:>8}",
        "customers", summary.raw.customers, summary.cleaned.customers
    );
    println!(
        "{:<12} {:>8} {:>8}",
        "products", summary.raw.products, summary.cleaned.products
    );
    println!("{:<12} {:>8} {:>8}", "sales", summary.raw.sales, summary.cleaned.sales);
    println!(
        "Derived: {} orders, {} order items",
        summary.orders, summary.order_items
    );
    println!();

    println!("Load:");
    for table in &summary.load.tables {
        let outcome = match &table.outcome {
            TableOutcome::Loaded { inserted } => format!("loaded {inserted} rows"),
            TableOutcome::Skipped { reason } => format!("skipped ({reason})"),
            TableOutcome::Failed { error, .. } => format!("FAILED: {error}"),
            TableOutcome::NotAttempted => "not attempted".to_string(),
        };
        match table.rows_in_store {
            Some(count) => println!("  {:<12} {} [{} in store]", table.table.name(), outcome, count),
            None => println!("  {:<12} {}", table.table.name(), outcome),
        }
    }
    println!();

    if !summary.artifacts.is_empty() {
        println!("Artifacts:");
        for artifact in &summary.artifacts {
            println!("  {}", artifact);
        }
    }
    for report in &summary.report_files {
        println!("Report: {}", report);
    }
    println!();

    println!(
        "Diagnostics: {} info, {} warnings, {} errors",
        summary.diagnostics.info, summary.diagnostics.warnings, summary.diagnostics.errors
    );
    println!();
    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the run summary as JSON");
    println!("{}", "=".repeat(80));
}
