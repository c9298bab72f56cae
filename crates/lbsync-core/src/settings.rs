//! Engine tunables

use lbsync_cloud::TaskPollConfig;
use std::time::Duration;

/// Knobs of the reconciliation engine, injected at construction
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Lifetime of a cached remote read
    pub cache_ttl: Duration,

    /// Private IPs per instance query (remote filter-value limit)
    pub instance_chunk_size: usize,

    /// Targets per register/deregister call (remote per-call limit)
    pub target_batch_size: usize,

    pub task_poll: TaskPollConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            instance_chunk_size: 5,
            target_batch_size: 20,
            task_poll: TaskPollConfig::default(),
        }
    }
}
