//! Turning a stored [`QueuedBody`] back into an HTTP request body.

use crate::error::StorySyncError;
use crate::queue::{BodyField, FieldValue, QueuedBody};
use base64::Engine as _;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::warn;

pub(crate) enum PreparedBody {
    Empty,
    Multipart(Form),
    /// Fallback used when a multipart form cannot be assembled.
    Json(Value),
}

/// Multipart first; JSON when any part is rejected (e.g. an unparseable content type).
pub(crate) fn prepare(body: &QueuedBody) -> PreparedBody {
    if body.is_empty() {
        return PreparedBody::Empty;
    }

    match to_multipart(body) {
        Ok(form) => PreparedBody::Multipart(form),
        Err(e) => {
            warn!(error = %e, "Multipart reconstruction failed, falling back to JSON body");
            PreparedBody::Json(to_json(body))
        }
    }
}

pub(crate) fn to_multipart(body: &QueuedBody) -> Result<Form, reqwest::Error> {
    body.fields.iter().try_fold(Form::new(), |form, field| {
        let BodyField { name, value } = field;
        match value {
            FieldValue::Text(text) => Ok(form.text(name.clone(), text.clone())),
            FieldValue::Binary(part) => {
                let filename = part.filename.clone().unwrap_or_else(|| name.clone());
                let part = Part::bytes(part.bytes.clone())
                    .file_name(filename)
                    .mime_str(&part.content_type)?;
                Ok(form.part(name.clone(), part))
            }
        }
    })
}

/// Binary fields become `{ filename, contentType, base64 }` objects.
pub(crate) fn to_json(body: &QueuedBody) -> Value {
    let mut map = Map::new();
    for BodyField { name, value } in &body.fields {
        let value = match value {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Binary(part) => json!({
                "filename": part.filename.clone().unwrap_or_else(|| name.clone()),
                "contentType": part.content_type,
                "base64": base64::engine::general_purpose::STANDARD.encode(&part.bytes),
            }),
        };
        map.insert(name.clone(), value);
    }
    Value::Object(map)
}

pub(crate) fn parse_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, StorySyncError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| StorySyncError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| StorySyncError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Assemble a request from stored parts. A stored `Content-Type` is dropped for
/// multipart bodies so the transport can emit its own boundary.
pub(crate) fn build_request(
    client: &reqwest::Client,
    method: &str,
    url: &str,
    headers: &BTreeMap<String, String>,
    body: &QueuedBody,
) -> Result<RequestBuilder, StorySyncError> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| StorySyncError::InvalidMethod(method.to_string()))?;
    let url = url::Url::parse(url)?;
    let mut headers = parse_headers(headers)?;

    let request = client.request(method, url);
    let request = match prepare(body) {
        PreparedBody::Empty => request.headers(headers),
        PreparedBody::Multipart(form) => {
            headers.remove(CONTENT_TYPE);
            request.headers(headers).multipart(form)
        }
        PreparedBody::Json(value) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.headers(headers).body(value.to_string())
        }
    };
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::BinaryPart;

    fn photo(content_type: &str) -> BinaryPart {
        BinaryPart::new(vec![0xFF, 0xD8, 0xFF, 0xE0], content_type).with_filename("cat.jpg")
    }

    #[test]
    fn mixed_fields_build_a_multipart_form() {
        let body = QueuedBody::new()
            .text("description", "hello")
            .binary("photo", photo("image/jpeg"))
            .text("lat", "-6.2");

        assert!(matches!(prepare(&body), PreparedBody::Multipart(_)));
    }

    #[test]
    fn empty_body_sends_nothing() {
        assert!(matches!(prepare(&QueuedBody::new()), PreparedBody::Empty));
    }

    #[test]
    fn invalid_content_type_falls_back_to_json() {
        let body = QueuedBody::new()
            .text("description", "hello")
            .binary("photo", photo("not a content type"));

        let PreparedBody::Json(value) = prepare(&body) else {
            panic!("expected JSON fallback");
        };
        assert_eq!(value["description"], "hello");
        assert_eq!(value["photo"]["filename"], "cat.jpg");
        assert_eq!(value["photo"]["contentType"], "not a content type");
        assert_eq!(value["photo"]["base64"], "/9j/4A==");
    }

    #[test]
    fn binary_without_filename_uses_field_name_in_json() {
        let body = QueuedBody::new().binary("photo", BinaryPart::new(vec![1, 2, 3], "bogus"));
        let value = to_json(&body);
        assert_eq!(value["photo"]["filename"], "photo");
    }

    #[test]
    fn invalid_header_name_is_reported() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let err = parse_headers(&headers).unwrap_err();
        assert!(matches!(err, StorySyncError::InvalidHeader { .. }));
    }

    #[test]
    fn unknown_method_is_rejected_before_sending() {
        let client = reqwest::Client::new();
        let err = build_request(
            &client,
            "NOT A METHOD",
            "http://127.0.0.1/stories",
            &BTreeMap::new(),
            &QueuedBody::new(),
        )
        .unwrap_err();
        assert!(matches!(err, StorySyncError::InvalidMethod(_)));
    }

    #[test]
    fn multipart_request_drops_stored_content_type() {
        let client = reqwest::Client::new();
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Authorization".to_string(), "Bearer t".to_string());
        let body = QueuedBody::new().binary("photo", photo("image/jpeg"));

        let request = build_request(&client, "POST", "http://127.0.0.1/stories", &headers, &body)
            .unwrap()
            .build()
            .unwrap();

        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert_eq!(request.headers()["authorization"], "Bearer t");
    }
}
