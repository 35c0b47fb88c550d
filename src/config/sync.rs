use serde::{Deserialize, Serialize};

/// Queue flush triggers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Interval of the periodic flush while online.
    /// TOML: `sync.flush_interval_secs`. Default: `30`.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Tag used when requesting a deferred flush after an offline write.
    /// TOML: `sync.sync_tag`. Default: `sync-new-stories`.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Delay before a deferred flush registration fires.
    /// TOML: `sync.deferred_delay_secs`. Default: `5`.
    #[serde(default = "default_deferred_delay_secs")]
    pub deferred_delay_secs: u64,

    /// Interval of the connectivity probe against the API base URL.
    /// TOML: `sync.probe_interval_secs`. Default: `15`.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Attempt one flush as soon as the process starts.
    /// TOML: `sync.flush_on_startup`. Default: `true`.
    #[serde(default = "default_flush_on_startup")]
    pub flush_on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            sync_tag: default_sync_tag(),
            deferred_delay_secs: default_deferred_delay_secs(),
            probe_interval_secs: default_probe_interval_secs(),
            flush_on_startup: default_flush_on_startup(),
        }
    }
}

fn default_flush_interval_secs() -> u64 {
    30
}

fn default_sync_tag() -> String {
    "sync-new-stories".to_string()
}

fn default_deferred_delay_secs() -> u64 {
    5
}

fn default_probe_interval_secs() -> u64 {
    15
}

fn default_flush_on_startup() -> bool {
    true
}
