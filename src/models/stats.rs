use serde::Serialize;
use std::time::Duration;

/// Process-wide counters for one pipeline run.
///
/// Ephemeral: reset at process start, never persisted. Accumulated
/// explicitly by the orchestrator and returned at run end; a snapshot is
/// what reporting collaborators consume.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineRunStats {
    /// Jobs the engine actually attempted this run
    pub processed: u64,
    /// Jobs that ended with a definitive has-branches / no-branches result
    pub resolved: u64,
    /// Jobs recorded with the failed sentinel
    pub failed: u64,
    /// Jobs skipped because a definitive result already existed
    pub skipped: u64,
    /// Wall-clock duration of the run
    #[serde(skip)]
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let stats = PipelineRunStats::default();
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.resolved, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.skipped, 0);
    }
}
