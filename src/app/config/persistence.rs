//! Snapshot persistence configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfigToml {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    #[serde(default = "default_checkpoint_interval_secs")]
    pub checkpoint_interval_secs: u64,
    #[serde(default = "default_stale_order_max_age_secs")]
    pub stale_order_max_age_secs: i64,
    #[serde(default = "default_emergency_timeout_secs")]
    pub emergency_timeout_secs: i64,
}

fn default_snapshot_path() -> String {
    "shockfade-snapshot.json".into()
}

const fn default_checkpoint_interval_secs() -> u64 {
    30
}

const fn default_stale_order_max_age_secs() -> i64 {
    60
}

/// 10 minutes: the oldest open position in a cycle that hasn't hit its
/// take-profit by then is flattened unconditionally.
const fn default_emergency_timeout_secs() -> i64 {
    600
}

impl Default for PersistenceConfigToml {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            checkpoint_interval_secs: default_checkpoint_interval_secs(),
            stale_order_max_age_secs: default_stale_order_max_age_secs(),
            emergency_timeout_secs: default_emergency_timeout_secs(),
        }
    }
}
