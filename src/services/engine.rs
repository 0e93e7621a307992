//! Fetch-and-classify engine.
//!
//! Resolves one company at a time through a bounded retry state machine:
//! acquire an egress, fetch the registry page, classify it, report pool
//! feedback, and either terminate or rotate to a fresh egress. Each attempt
//! checks out its proxy only for the duration of that single fetch.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::company::CompanyJob;
use crate::models::proxy::FailureKind;
use crate::services::classify::{classify_page, BranchIndicator, PageClass};
use crate::services::fetcher::PageFetcher;
use crate::services::proxy_pool::{PoolError, ProxyPool};

/// Terminal outcome of one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The registry answered definitively.
    Resolved { has_branches: bool, branch_count: u32 },
    /// The page loaded but its structure did not match expectations; not a
    /// proxy problem, so not retried within this run.
    ParseFailure,
    /// The rotation budget ran out without a definitive answer.
    Exhausted,
}

/// Error type for engine operations. Pool exhaustion is the only condition
/// that escapes a lookup; everything else reduces to a [`LookupOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Pool(#[from] PoolError),
}

pub struct LookupEngine<F: PageFetcher> {
    fetcher: F,
    pool: Arc<ProxyPool>,
    base_url: String,
    max_rotations: u32,
}

impl<F: PageFetcher> LookupEngine<F> {
    pub fn new(fetcher: F, pool: Arc<ProxyPool>, base_url: String, max_rotations: u32) -> Self {
        Self {
            fetcher,
            pool,
            base_url,
            max_rotations: max_rotations.max(1),
        }
    }

    fn company_url(&self, registry_number: &str) -> String {
        format!("{}{}", self.base_url, registry_number)
    }

    /// Resolve the branch signal for one company.
    pub async fn resolve(&self, job: &CompanyJob) -> Result<LookupOutcome, EngineError> {
        let url = self.company_url(&job.registry_number);

        for attempt in 1..=self.max_rotations {
            let proxy = self.pool.acquire()?;
            debug!(
                kvk = %job.registry_number,
                attempt,
                egress = %proxy.address,
                "fetching registry page"
            );

            let html = match self.fetcher.fetch_rendered_page(&url, &proxy.address).await {
                Ok(html) => html,
                Err(err) => {
                    debug!(
                        kvk = %job.registry_number,
                        attempt,
                        egress = %proxy.address,
                        error = %err,
                        "fetch failed, rotating egress"
                    );
                    self.pool
                        .report_failure(&proxy.address, FailureKind::NetworkTransient);
                    continue;
                }
            };

            match classify_page(&html) {
                PageClass::RateLimited => {
                    info!(
                        kvk = %job.registry_number,
                        attempt,
                        egress = %proxy.address,
                        "rate limited, rotating egress"
                    );
                    self.pool
                        .report_failure(&proxy.address, FailureKind::RateLimited);
                }
                PageClass::Blocked => {
                    info!(
                        kvk = %job.registry_number,
                        attempt,
                        egress = %proxy.address,
                        "blocked, rotating egress"
                    );
                    self.pool
                        .report_failure(&proxy.address, FailureKind::Blocked);
                }
                PageClass::Company(BranchIndicator::Count(count)) => {
                    self.pool.report_success(&proxy.address);
                    info!(
                        kvk = %job.registry_number,
                        branch_count = count,
                        "company resolved"
                    );
                    return Ok(LookupOutcome::Resolved {
                        has_branches: count > 0,
                        branch_count: count,
                    });
                }
                PageClass::Company(indicator) => {
                    // The egress delivered a page; the layout mismatch is on
                    // our side, so the proxy still gets a success report.
                    self.pool.report_success(&proxy.address);
                    warn!(
                        kvk = %job.registry_number,
                        indicator = ?indicator,
                        "unexpected page structure, giving up on this job"
                    );
                    return Ok(LookupOutcome::ParseFailure);
                }
            }
        }

        warn!(
            kvk = %job.registry_number,
            rotations = self.max_rotations,
            "rotation budget exhausted without a definitive answer"
        );
        Ok(LookupOutcome::Exhausted)
    }
}
