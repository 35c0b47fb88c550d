use serde::Serialize;

/// Upper bound on how much of an upstream response body ends up in a log line.
pub(crate) const BODY_PREVIEW_CHARS: usize = 300;

/// Lossy, truncated view of a response body for debug logs.
pub(crate) fn body_preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

/// Pretty JSON of `value`, rendered only when DEBUG is enabled.
pub(crate) fn debug_json<T: Serialize>(value: &T) -> Option<String> {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return None;
    }

    Some(
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>")),
    )
}
