use crate::utils::logging::body_preview;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::HeaderMap;
use std::time::Duration;
use url::Url;

pub(crate) fn retry_policy(max_times: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(300))
        .with_max_times(max_times)
        .with_jitter()
}

/// GET with a short bounded retry on transport errors and 5xx responses.
/// Other statuses are returned to the caller untouched.
pub(crate) async fn get_with_retry(
    client: &reqwest::Client,
    url: &Url,
    headers: HeaderMap,
    policy: ExponentialBuilder,
) -> Result<reqwest::Response, reqwest::Error> {
    (|| {
        let client = client.clone();
        let url = url.clone();
        let headers = headers.clone();

        async move {
            let resp = client.get(url.clone()).headers(headers).send().await?;

            if resp.status().is_server_error() {
                let status = resp.status();
                let Some(err) = resp.error_for_status_ref().err() else {
                    return Ok(resp);
                };

                let preview = match resp.bytes().await {
                    Ok(bytes) => body_preview(&bytes),
                    Err(e) => format!("<failed to read body: {e}>"),
                };

                tracing::debug!(
                    %status,
                    url = %url,
                    body = %preview,
                    "Story API server error (will retry)"
                );

                return Err(err);
            }

            Ok(resp)
        }
    })
    .retry(policy)
    .notify(|err: &reqwest::Error, dur: Duration| {
        tracing::debug!("Story API retrying after error {} in {:?}", err, dur);
    })
    .await
}
