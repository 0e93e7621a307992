//! Egress proxy pool.
//!
//! Maintains the set of outbound egress candidates, tracks their health and
//! usage, hands out the best available entry per fetch attempt, and retires
//! failing ones. Two recovery strategies are kept separate: endpoint
//! failures drive demotion down the health ladder (the endpoint needs
//! replacing), rate limits drive a cooldown (the endpoint needs patience).

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::models::proxy::{FailureKind, ProxyEntry, ProxyHealth};

/// Error type for proxy pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("proxy pool exhausted: no selectable egress entries")]
    Exhausted,
}

/// Policy constants governing demotion and pacing.
#[derive(Debug, Clone)]
pub struct PoolPolicy {
    /// Consecutive hard failures before one demotion step
    pub fail_threshold: u32,
    /// Cooldown applied after a rate-limit report
    pub rate_limit_cooldown: Duration,
    /// Rest period before a dead entry may be revalidated
    pub dead_retry_cooldown: Duration,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            fail_threshold: 3,
            rate_limit_cooldown: Duration::seconds(300),
            dead_retry_cooldown: Duration::seconds(1800),
        }
    }
}

impl From<&AppConfig> for PoolPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            fail_threshold: config.proxy_fail_threshold,
            rate_limit_cooldown: Duration::seconds(config.rate_limit_cooldown_secs),
            dead_retry_cooldown: Duration::seconds(config.dead_retry_cooldown_secs),
        }
    }
}

/// Shared pool of egress proxies.
///
/// Mutations lock the entry list for their whole duration; the lock is
/// never held across an await, so a parallelized orchestrator can share the
/// pool directly.
pub struct ProxyPool {
    entries: Mutex<Vec<ProxyEntry>>,
    policy: PoolPolicy,
}

impl ProxyPool {
    pub fn new(addresses: impl IntoIterator<Item = String>, policy: PoolPolicy) -> Self {
        let entries: Vec<ProxyEntry> = addresses.into_iter().map(ProxyEntry::new).collect();
        info!(entries = entries.len(), "proxy pool initialized");
        Self {
            entries: Mutex::new(entries),
            policy,
        }
    }

    /// Select the best available egress entry.
    ///
    /// Preference: healthy over untested over degraded, least-recently-used
    /// within a class. Dead entries and entries inside a cooldown window are
    /// never returned.
    pub fn acquire(&self) -> Result<ProxyEntry, PoolError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().expect("proxy pool lock");

        let best = entries
            .iter_mut()
            .filter(|e| e.selectable(now))
            // None sorts before Some, so never-used entries go first.
            .min_by_key(|e| (e.health.selection_rank(), e.last_used_at));

        match best {
            Some(entry) => {
                entry.last_used_at = Some(now);
                debug!(egress = %entry.address, health = %entry.health, "egress acquired");
                Ok(entry.clone())
            }
            None => Err(PoolError::Exhausted),
        }
    }

    /// A fetch through this egress worked: reset the failure counter and
    /// promote the entry to healthy.
    pub fn report_success(&self, address: &str) {
        let now = Utc::now();
        let mut entries = self.entries.lock().expect("proxy pool lock");
        if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
            entry.consecutive_failures = 0;
            entry.last_used_at = Some(now);
            entry.cooldown_until = None;
            if entry.health != ProxyHealth::Healthy {
                debug!(egress = %entry.address, from = %entry.health, "egress promoted to healthy");
                entry.health = ProxyHealth::Healthy;
            }
        }
    }

    /// A fetch through this egress failed.
    ///
    /// Rate limits only set the cooldown; they say nothing about the
    /// endpoint's validity and do not advance the demotion counter. Hard
    /// failures (network, blocked) count toward demotion: one health step
    /// down each time the threshold is crossed, eventually reaching dead.
    pub fn report_failure(&self, address: &str, kind: FailureKind) {
        let now = Utc::now();
        let mut entries = self.entries.lock().expect("proxy pool lock");
        let Some(entry) = entries.iter_mut().find(|e| e.address == address) else {
            return;
        };

        if kind == FailureKind::RateLimited {
            entry.cooldown_until = Some(now + self.policy.rate_limit_cooldown);
            debug!(
                egress = %entry.address,
                cooldown_secs = self.policy.rate_limit_cooldown.num_seconds(),
                "egress rate limited, cooling down"
            );
            return;
        }

        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= self.policy.fail_threshold {
            let demoted = entry.health.demoted();
            warn!(
                egress = %entry.address,
                kind = %kind,
                from = %entry.health,
                to = %demoted,
                "egress demoted"
            );
            entry.health = demoted;
            entry.consecutive_failures = 0;
        } else {
            debug!(
                egress = %entry.address,
                kind = %kind,
                failures = entry.consecutive_failures,
                "egress failure recorded"
            );
        }
    }

    /// Re-admit dead entries that have rested long enough, as untested.
    /// Gives transient outages a chance to recover instead of permanently
    /// shrinking the pool.
    pub fn revalidate_dead(&self) {
        let now = Utc::now();
        let mut entries = self.entries.lock().expect("proxy pool lock");
        for entry in entries.iter_mut() {
            let rested = entry
                .last_used_at
                .map_or(true, |used| now - used >= self.policy.dead_retry_cooldown);
            if entry.health == ProxyHealth::Dead && rested {
                info!(egress = %entry.address, "dead egress re-admitted as untested");
                entry.health = ProxyHealth::Untested;
                entry.consecutive_failures = 0;
                entry.cooldown_until = None;
            }
        }
    }

    /// Current state of every entry, for diagnostics and the audit trail.
    pub fn snapshot(&self) -> Vec<ProxyEntry> {
        self.entries.lock().expect("proxy pool lock").clone()
    }
}
