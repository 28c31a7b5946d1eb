//! **EDGAR pipeline CLI**
//!
//! Command-line orchestrator for the SEC EDGAR ingestion pipeline: fetch,
//! convert, segment, extract, stage, merge, chunk, normalize, and
//! reconcile, wired the way the teacher's `sec_crawler.rs` wires its own
//! subcommands around one long-lived client plus per-command async
//! handlers.

mod edgar_index;
mod orchestrator;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use edgar_core::config::AppConfig;
use edgar_fetcher::Fetcher;
use edgar_reconcile::{remove_duplicates, ReconciliationEngine};
use edgar_store::{StagingManager, Store};
use orchestrator::{ingest_filing, FilingRequest};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "edgar-pipeline")]
#[command(about = "SEC EDGAR filing ingestion pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a single filing: fetch, convert, segment, extract, merge,
    /// chunk, and normalize.
    Ingest {
        /// Company CIK (Central Index Key)
        #[arg(long)]
        cik: String,

        /// Accession number, e.g. 0000320193-24-000001
        #[arg(long)]
        accession: String,

        /// Ticker symbol
        #[arg(long)]
        ticker: String,

        /// Company name
        #[arg(long)]
        company_name: String,

        /// Form type, e.g. 10-K
        #[arg(long, default_value = "10-K")]
        form_type: String,

        /// Filing date (YYYY-MM-DD)
        #[arg(long)]
        filing_date: String,

        /// Period of report (YYYY-MM-DD)
        #[arg(long)]
        period_of_report: Option<String>,

        /// Industry code, used for industry-scoped concept mappings
        #[arg(long)]
        industry_code: Option<String>,
    },

    /// Run every reconciliation check and print the findings.
    Reconcile,

    /// Find and repair duplicate normalized-metric rows.
    RemoveDuplicates {
        /// Compute the repair plan without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Drop staging tables left behind by a crashed prior run.
    CleanupStaging {
        /// Run id to keep; every other staging run is dropped.
        #[arg(long)]
        keep_run_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edgar_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;

    match cli.command {
        Commands::Ingest {
            cik,
            accession,
            ticker,
            company_name,
            form_type,
            filing_date,
            period_of_report,
            industry_code,
        } => {
            ingest_command(
                &config,
                cik,
                accession,
                ticker,
                company_name,
                form_type,
                filing_date,
                period_of_report,
                industry_code,
            )
            .await
        }
        Commands::Reconcile => reconcile_command(&config),
        Commands::RemoveDuplicates { dry_run } => remove_duplicates_command(&config, dry_run),
        Commands::CleanupStaging { keep_run_id } => cleanup_staging_command(&config, &keep_run_id),
    }
}

#[allow(clippy::too_many_arguments)]
async fn ingest_command(
    config: &AppConfig,
    cik: String,
    accession: String,
    ticker: String,
    company_name: String,
    form_type: String,
    filing_date: String,
    period_of_report: Option<String>,
    industry_code: Option<String>,
) -> Result<()> {
    let filing_date = NaiveDate::parse_from_str(&filing_date, "%Y-%m-%d")
        .context("parsing --filing-date as YYYY-MM-DD")?;
    let period_of_report = period_of_report
        .map(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d"))
        .transpose()
        .context("parsing --period-of-report as YYYY-MM-DD")?;

    let request = FilingRequest {
        cik,
        accession: accession.clone(),
        ticker,
        company_name,
        form_type,
        filing_date,
        period_of_report,
        industry_code,
    };

    info!(accession = %accession, "starting filing ingest");
    let mut store = Store::open(&config.storage.database_path).context("opening store")?;
    let fetcher = Fetcher::new(&config.sec_api).context("building fetcher")?;
    let run_id = StagingManager::generate_run_id(&chrono::Utc::now().format("%Y%m%d_%H%M%S%.f").to_string());

    let outcome = ingest_filing(&mut store, &fetcher, config, &run_id, request).await?;

    println!("Ingest Results:");
    println!("  Accession: {}", outcome.accession_number);
    println!("  Download status: {}", outcome.download_status);
    println!(
        "  Documents fetched: {}/{}",
        outcome.documents_fetched, outcome.documents_attempted
    );
    println!("  Sections found: {}", outcome.sections_found);
    println!("  Facts extracted: {}", outcome.facts_extracted);
    println!("  Chunks written: {}", outcome.chunks_written);
    println!("  Normalized metrics written: {}", outcome.normalized_metrics_written);

    StagingManager::new(store.connection())
        .drop_staging_tables(&run_id)
        .context("dropping this run's staging tables")?;

    Ok(())
}

fn reconcile_command(config: &AppConfig) -> Result<()> {
    info!("running reconciliation checks");
    let store = Store::open(&config.storage.database_path).context("opening store")?;
    let engine = ReconciliationEngine::new(&store, config.reconciler.clone());
    let summary = engine.run_all_checks().context("running reconciliation checks")?;

    println!("Reconciliation Results:");
    println!("  Total issues: {}", summary.issues.len());
    for severity in [
        edgar_core::models::Severity::Critical,
        edgar_core::models::Severity::Error,
        edgar_core::models::Severity::Warning,
        edgar_core::models::Severity::Info,
    ] {
        let count = summary.count(severity);
        if count > 0 {
            println!("  {severity:?}: {count}");
        }
    }
    for issue in &summary.issues {
        println!(
            "    [{:?}] {} ({}) - {}",
            issue.severity,
            issue.issue_type,
            issue.accession_number.as_deref().unwrap_or("<aggregate>"),
            issue.description
        );
    }

    if config.reconciler.strict_mode && summary.count(edgar_core::models::Severity::Critical) > 0 {
        anyhow::bail!("strict mode: {} critical issues found", summary.count(edgar_core::models::Severity::Critical));
    }
    Ok(())
}

fn remove_duplicates_command(config: &AppConfig, dry_run: bool) -> Result<()> {
    info!(dry_run, "repairing duplicate normalized metrics");
    let mut store = Store::open(&config.storage.database_path).context("opening store")?;
    let plans = remove_duplicates(&mut store, dry_run).context("removing duplicates")?;

    println!("Duplicate Removal {}:", if dry_run { "Plan" } else { "Results" });
    println!("  Groups affected: {}", plans.len());
    for plan in &plans {
        println!(
            "    {} FY{}{} {} -> kept id {}, removed {:?}",
            plan.ticker,
            plan.fiscal_year,
            plan.fiscal_quarter.map(|q| format!("Q{q}")).unwrap_or_default(),
            plan.metric_id,
            plan.keeper_id,
            plan.removed_ids
        );
    }
    Ok(())
}

fn cleanup_staging_command(config: &AppConfig, keep_run_id: &str) -> Result<()> {
    let store = Store::open(&config.storage.database_path).context("opening store")?;
    let dropped = StagingManager::new(store.connection())
        .cleanup_orphaned_staging(keep_run_id)
        .context("cleaning up orphaned staging tables")?;
    println!("Dropped {dropped} orphaned staging run(s), keeping {keep_run_id}");
    Ok(())
}
