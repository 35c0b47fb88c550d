use serde::{Deserialize, Serialize};
use url::Url;

/// Remote story API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the story REST API; endpoints are resolved beneath it.
    /// TOML: `api.base_url`. Default: `https://story-api.dicoding.dev/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Session bearer token attached to reads and writes. Unset means "not signed in".
    /// TOML: `api.token`.
    #[serde(default)]
    pub token: Option<String>,

    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `api.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `api.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,

    /// Max retry attempts for the story list fetch on transient errors.
    /// TOML: `api.retry_max_times`. Default: `2`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,

    /// Per-request timeout in seconds. Flushes have no batch timeout beyond this.
    /// TOML: `api.request_timeout_secs`. Default: `30`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            proxy: None,
            enable_multiplexing: false,
            retry_max_times: default_retry_max_times(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// `{base_url}/stories`, used for both the list fetch and new story uploads.
    pub fn stories_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/stories",
            self.base_url.as_str().trim_end_matches('/')
        ))
    }
}

fn default_base_url() -> Url {
    Url::parse("https://story-api.dicoding.dev/v1").expect("valid default story API URL")
}

fn default_retry_max_times() -> usize {
    2
}

fn default_request_timeout_secs() -> u64 {
    30
}
