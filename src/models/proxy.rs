use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Health state of an egress proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProxyHealth {
    Untested,
    Healthy,
    Degraded,
    Dead,
}

impl ProxyHealth {
    /// Selection preference: healthy first, then untested, then degraded.
    /// Dead entries are never selected.
    pub fn selection_rank(self) -> u8 {
        match self {
            ProxyHealth::Healthy => 0,
            ProxyHealth::Untested => 1,
            ProxyHealth::Degraded => 2,
            ProxyHealth::Dead => 3,
        }
    }

    /// One demotion step down the health ladder.
    pub fn demoted(self) -> Self {
        match self {
            ProxyHealth::Healthy | ProxyHealth::Untested => ProxyHealth::Degraded,
            ProxyHealth::Degraded | ProxyHealth::Dead => ProxyHealth::Dead,
        }
    }
}

/// Kind of failure an attempt reports back to the pool.
///
/// Rate limiting is a pacing signal, not evidence the endpoint is broken,
/// so it drives a cooldown instead of the demotion counter. Blocked is kept
/// separate from rate-limited for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    NetworkTransient,
    RateLimited,
    Blocked,
}

/// One egress candidate.
///
/// Entries are never removed from the pool, only marked dead, so the full
/// health history of the run stays inspectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyEntry {
    /// host:port endpoint descriptor
    pub address: String,
    pub health: ProxyHealth,
    pub consecutive_failures: u32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl ProxyEntry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            health: ProxyHealth::Untested,
            consecutive_failures: 0,
            last_used_at: None,
            cooldown_until: None,
        }
    }

    /// Whether this entry may be handed out at `now`.
    pub fn selectable(&self, now: DateTime<Utc>) -> bool {
        self.health != ProxyHealth::Dead
            && self.cooldown_until.map_or(true, |until| until <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_demotion_ladder() {
        assert_eq!(ProxyHealth::Healthy.demoted(), ProxyHealth::Degraded);
        assert_eq!(ProxyHealth::Untested.demoted(), ProxyHealth::Degraded);
        assert_eq!(ProxyHealth::Degraded.demoted(), ProxyHealth::Dead);
        assert_eq!(ProxyHealth::Dead.demoted(), ProxyHealth::Dead);
    }

    #[test]
    fn test_selectable_respects_cooldown() {
        let now = Utc::now();
        let mut entry = ProxyEntry::new("10.0.0.1:8080");
        assert!(entry.selectable(now));

        entry.cooldown_until = Some(now + Duration::seconds(60));
        assert!(!entry.selectable(now));
        assert!(entry.selectable(now + Duration::seconds(61)));
    }

    #[test]
    fn test_dead_never_selectable() {
        let mut entry = ProxyEntry::new("10.0.0.1:8080");
        entry.health = ProxyHealth::Dead;
        assert!(!entry.selectable(Utc::now()));
    }
}
