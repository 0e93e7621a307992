//! Pipeline orchestrator.
//!
//! Walks the job list, skips companies the store has already resolved,
//! drives the fetch-and-classify engine for the rest, and commits every
//! outcome. One company's failure never halts the remainder; losing the
//! store or the whole proxy pool does, because resumability cannot be
//! guaranteed past either.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::queries;
use crate::models::company::{BranchStatus, CompanyJob};
use crate::models::stats::PipelineRunStats;
use crate::services::engine::{EngineError, LookupEngine, LookupOutcome};
use crate::services::fetcher::PageFetcher;
use crate::services::proxy_pool::ProxyPool;

/// How the run selects its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Walk the input sequence, skipping already-resolved companies.
    Normal,
    /// Ignore the input sequence and re-resolve every record currently
    /// holding the failed sentinel.
    RetryFailed,
}

/// Half-open `[start, end)` window over input row indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl RowRange {
    pub fn contains(&self, row_index: usize) -> bool {
        row_index >= self.start && self.end.map_or(true, |end| row_index < end)
    }
}

/// Error type for a pipeline run. Both variants are fatal.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("persistence failure, aborting run: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct Pipeline<F: PageFetcher> {
    store: SqlitePool,
    engine: LookupEngine<F>,
    pool: Arc<ProxyPool>,
}

impl<F: PageFetcher> Pipeline<F> {
    pub fn new(store: SqlitePool, engine: LookupEngine<F>, pool: Arc<ProxyPool>) -> Self {
        Self {
            store,
            engine,
            pool,
        }
    }

    /// Run the pipeline to completion (or until `stop` is raised) and
    /// return the accumulated run statistics.
    ///
    /// `stop` is checked between jobs only: an in-flight job always
    /// finishes and commits before the run halts.
    pub async fn run(
        &self,
        jobs: &[CompanyJob],
        mode: RunMode,
        range: RowRange,
        stop: &AtomicBool,
    ) -> Result<PipelineRunStats, PipelineError> {
        let started = Instant::now();
        let mut stats = PipelineRunStats::default();

        let worklist = match mode {
            RunMode::Normal => jobs
                .iter()
                .filter(|job| range.contains(job.row_index))
                .cloned()
                .collect(),
            RunMode::RetryFailed => self.failed_worklist().await?,
        };

        info!(mode = ?mode, jobs = worklist.len(), "pipeline run starting");

        for job in &worklist {
            if stop.load(Ordering::SeqCst) {
                warn!("stop requested, halting before next job");
                break;
            }

            // Give rested dead egresses a chance back in before each job.
            self.pool.revalidate_dead();

            if mode == RunMode::Normal
                && queries::exists_resolved(&self.store, &job.registry_number).await?
            {
                debug!(kvk = %job.registry_number, "already resolved, skipping");
                stats.skipped += 1;
                metrics::counter!("pipeline_jobs_skipped_total").increment(1);
                continue;
            }

            let outcome = self.engine.resolve(job).await?;
            stats.processed += 1;
            metrics::counter!("pipeline_jobs_processed_total").increment(1);

            let status = match outcome {
                LookupOutcome::Resolved { has_branches, .. } => {
                    if has_branches {
                        BranchStatus::HasBranches
                    } else {
                        BranchStatus::NoBranches
                    }
                }
                LookupOutcome::ParseFailure | LookupOutcome::Exhausted => BranchStatus::Failed,
            };

            queries::upsert_result(&self.store, &job.registry_number, &job.name, status).await?;

            if status.is_resolved() {
                stats.resolved += 1;
                metrics::counter!("pipeline_jobs_resolved_total").increment(1);
            } else {
                stats.failed += 1;
                metrics::counter!("pipeline_jobs_failed_total").increment(1);
                warn!(kvk = %job.registry_number, name = %job.name, "job failed, sentinel recorded");
            }
        }

        stats.elapsed = started.elapsed();
        info!(
            processed = stats.processed,
            resolved = stats.resolved,
            failed = stats.failed,
            skipped = stats.skipped,
            elapsed_secs = stats.elapsed.as_secs(),
            "pipeline run finished"
        );

        Ok(stats)
    }

    /// Rebuild jobs from the failed-sentinel records in the store.
    async fn failed_worklist(&self) -> Result<Vec<CompanyJob>, PipelineError> {
        let records = queries::list_failed(&self.store).await?;
        Ok(records
            .into_iter()
            .enumerate()
            .map(|(row_index, record)| CompanyJob {
                registry_number: record.registry_number,
                name: record.name,
                row_index,
            })
            .collect())
    }
}
