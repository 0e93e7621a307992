mod config;
mod db;
mod input;
mod models;
mod pipeline;
mod services;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use pipeline::{Pipeline, RowRange, RunMode};
use services::{
    engine::LookupEngine,
    fetcher::RegistryClient,
    proxy_pool::{PoolPolicy, ProxyPool},
};

/// Flag big Dutch companies by scraping the public registry aggregator.
#[derive(Debug, Parser)]
#[command(name = "kvk-branch-scan", version)]
struct Cli {
    /// Input CSV with kvk_number and company_name columns
    input: Option<PathBuf>,

    /// Re-process only records currently holding the failed sentinel
    #[arg(long)]
    retry_failed: bool,

    /// First input row to process (inclusive)
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Input row to stop before (exclusive)
    #[arg(long)]
    end: Option<usize>,

    /// Only process the first N rows of the selected window
    #[arg(long)]
    limit: Option<usize>,

    /// Override the result database connection string
    #[arg(long)]
    database_url: Option<String>,

    /// Override the proxy list path
    #[arg(long)]
    proxies: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    // Load configuration from environment, with CLI overrides on top
    let mut config = AppConfig::from_env().context("failed to load configuration")?;
    if let Some(database_url) = cli.database_url.clone() {
        config.database_url = database_url;
    }
    if let Some(proxies) = &cli.proxies {
        config.proxy_list = proxies.display().to_string();
    }

    tracing::info!("starting kvk-branch-scan");

    // Register pipeline metrics
    metrics::describe_counter!(
        "pipeline_jobs_processed_total",
        "Jobs the engine attempted this run"
    );
    metrics::describe_counter!(
        "pipeline_jobs_resolved_total",
        "Jobs that ended with a definitive branch result"
    );
    metrics::describe_counter!(
        "pipeline_jobs_failed_total",
        "Jobs recorded with the failed sentinel"
    );
    metrics::describe_counter!(
        "pipeline_jobs_skipped_total",
        "Jobs skipped because a definitive result already existed"
    );

    // Result store
    tracing::info!(database_url = %config.database_url, "connecting to result store");
    let store = db::init_pool(&config.database_url)
        .await
        .context("failed to connect to the result store")?;
    db::run_migrations(&store)
        .await
        .context("failed to run database migrations")?;

    // Egress pool
    let addresses = load_proxy_addresses(&config.proxy_list)?;
    if addresses.is_empty() {
        bail!(
            "proxy list {} contains no egress entries; the pool would be exhausted immediately",
            config.proxy_list
        );
    }
    let pool = Arc::new(ProxyPool::new(addresses, PoolPolicy::from(&config)));

    // Engine and orchestrator
    let fetcher = RegistryClient::new(Duration::from_secs(config.fetch_timeout_secs));
    let engine = LookupEngine::new(
        fetcher,
        Arc::clone(&pool),
        config.registry_base_url.clone(),
        config.max_proxy_rotations,
    );
    let pipeline = Pipeline::new(store, engine, Arc::clone(&pool));

    // Work selection
    let (mode, jobs) = if cli.retry_failed {
        (RunMode::RetryFailed, Vec::new())
    } else {
        let input = match &cli.input {
            Some(path) => path,
            None => bail!("an input CSV is required unless --retry-failed is given"),
        };
        let jobs = input::load_jobs(input)
            .with_context(|| format!("failed to read input file {}", input.display()))?;
        tracing::info!(input = %input.display(), rows = jobs.len(), "input loaded");
        (RunMode::Normal, jobs)
    };

    let mut range = RowRange {
        start: cli.start,
        end: cli.end,
    };
    if let Some(limit) = cli.limit {
        let capped = range.start + limit;
        range.end = Some(range.end.map_or(capped, |end| end.min(capped)));
    }

    // Ctrl-C finishes the in-flight job, then halts before the next one.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing the in-flight job");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let stats = pipeline
        .run(&jobs, mode, range, &stop)
        .await
        .context("pipeline run aborted")?;

    tracing::info!(
        processed = stats.processed,
        resolved = stats.resolved,
        failed = stats.failed,
        skipped = stats.skipped,
        elapsed_secs = stats.elapsed.as_secs(),
        "run complete"
    );

    Ok(())
}

/// Read the newline-delimited host:port proxy list.
fn load_proxy_addresses(path: &str) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read proxy list {path}"))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
