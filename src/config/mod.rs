mod api;
mod basic;
mod sync;

pub use api::ApiConfig;
pub use basic::BasicConfig;
pub use sync::SyncConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Local storage and logging (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Remote story API settings (see `api` table in config.toml).
    #[serde(default)]
    pub api: ApiConfig,

    /// Flush triggers (see `sync` table in config.toml).
    #[serde(default)]
    pub sync: SyncConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        Self::figment_from(PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Same as [`Config::figment`], reading the TOML file from `path` when it exists.
    pub fn figment_from(path: PathBuf) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment.merge(Toml::file(path))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }
}

/// Global, lazily-initialized configuration instance. Only the binary reads it;
/// library types take their configuration explicitly.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_story_api() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url.as_str(), "https://story-api.dicoding.dev/v1");
        assert_eq!(cfg.sync.flush_interval_secs, 30);
        assert_eq!(cfg.sync.sync_tag, "sync-new-stories");
        assert_eq!(cfg.basic.database_url, "sqlite://storysync.db");
        assert!(cfg.api.token.is_none());
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [api]
                base_url = "http://127.0.0.1:9000/v1"
                token = "abc"

                [sync]
                flush_interval_secs = 5
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(cfg.api.base_url.as_str(), "http://127.0.0.1:9000/v1");
        assert_eq!(cfg.api.token.as_deref(), Some("abc"));
        assert_eq!(cfg.sync.flush_interval_secs, 5);
        // untouched keys keep their defaults
        assert_eq!(cfg.sync.sync_tag, "sync-new-stories");
        assert_eq!(cfg.api.retry_max_times, 2);
    }

    #[test]
    fn stories_url_is_joined_under_base_path() {
        let cfg = ApiConfig::default();
        assert_eq!(
            cfg.stories_url().unwrap().as_str(),
            "https://story-api.dicoding.dev/v1/stories"
        );
    }
}
