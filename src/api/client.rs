use crate::api::retry::{get_with_retry, retry_policy};
use crate::api::session::Session;
use crate::config::ApiConfig;
use crate::error::StorySyncError;
use crate::queue::QueuedBody;
use crate::sync::body::build_request;
use crate::utils::logging::{body_preview, debug_json};
use backon::ExponentialBuilder;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONNECTION, HeaderMap, HeaderValue};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use storysync_schema::{ApiMessage, Story, StoryListResponse};
use tracing::{debug, info, warn};
use url::Url;

pub const STORYSYNC_USER_AGENT: &str = concat!("storysync/", env!("CARGO_PKG_VERSION"));

/// Build the shared reqwest client from API settings.
pub fn build_http_client(cfg: &ApiConfig) -> Result<reqwest::Client, StorySyncError> {
    let mut headers = HeaderMap::new();
    let mut builder = reqwest::Client::builder()
        .user_agent(STORYSYNC_USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)));

    if let Some(proxy_url) = cfg.proxy.as_ref() {
        let proxy = reqwest::Proxy::all(proxy_url.as_str())?;
        builder = builder.proxy(proxy);
    }

    if !cfg.enable_multiplexing {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    Ok(builder.default_headers(headers).build()?)
}

/// Thin client for the story endpoints.
#[derive(Clone)]
pub struct StoryApi {
    client: reqwest::Client,
    stories_url: Url,
    session: Session,
    retry_policy: ExponentialBuilder,
}

impl StoryApi {
    pub fn new(cfg: &ApiConfig, session: Session) -> Result<Self, StorySyncError> {
        let client = build_http_client(cfg)?;
        Self::with_client(cfg, session, client)
    }

    pub fn with_client(
        cfg: &ApiConfig,
        session: Session,
        client: reqwest::Client,
    ) -> Result<Self, StorySyncError> {
        Ok(Self {
            client,
            stories_url: cfg.stories_url()?,
            session,
            retry_policy: retry_policy(cfg.retry_max_times),
        })
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stories_url(&self) -> &Url {
        &self.stories_url
    }

    /// `GET /stories` with the session credential.
    pub async fn fetch_stories(&self) -> Result<Vec<Story>, StorySyncError> {
        let authorization = self
            .session
            .authorization()
            .await
            .ok_or(StorySyncError::Unauthenticated)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization).map_err(|e| StorySyncError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: e.to_string(),
            })?,
        );

        let start = Instant::now();
        let resp = get_with_retry(
            &self.client,
            &self.stories_url,
            headers,
            self.retry_policy,
        )
        .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            debug!(%status, body = %body_preview(&body), "Story list fetch rejected");
            return Err(StorySyncError::UpstreamStatus(status));
        }

        let envelope: StoryListResponse = resp.json().await?;
        if envelope.error {
            return Err(StorySyncError::ApiRejected(envelope.message));
        }

        info!(
            stories = envelope.list_story.len(),
            "[StoryApi] Fetched story list in {:?}",
            start.elapsed()
        );
        Ok(envelope.list_story)
    }

    /// Single `POST /stories` attempt; no retry, no queueing.
    pub async fn post_story(
        &self,
        authorization: &str,
        body: &QueuedBody,
    ) -> Result<ApiMessage, StorySyncError> {
        let mut headers = BTreeMap::new();
        headers.insert(AUTHORIZATION.to_string(), authorization.to_string());

        let resp = build_request(
            &self.client,
            "POST",
            self.stories_url.as_str(),
            &headers,
            body,
        )?
        .send()
        .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        let message = serde_json::from_slice::<ApiMessage>(&bytes).ok();

        match message.as_ref().and_then(debug_json) {
            Some(pretty) => debug!(%status, body = %pretty, "Story upload response"),
            None if !status.is_success() => {
                debug!(%status, body = %body_preview(&bytes), "Story upload response");
            }
            None => {}
        }

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StorySyncError::UpstreamStatus(status));
        }

        match message {
            Some(message) if !message.error && status.is_success() => Ok(message),
            Some(message) => {
                warn!(%status, message = %message.message, "Story upload rejected");
                Err(StorySyncError::ApiRejected(message.message))
            }
            None if status.is_success() => Ok(ApiMessage::default()),
            None => Err(StorySyncError::UpstreamStatus(status)),
        }
    }
}
