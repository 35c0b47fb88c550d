use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Binary attachment kept as raw bytes, never flattened to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPart {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Original filename; the field name is used when absent.
    pub filename: Option<String>,
}

impl BinaryPart {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            filename: None,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Binary(BinaryPart),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyField {
    pub name: String,
    pub value: FieldValue,
}

/// Structured request payload: named fields in their original order.
/// Text and binary fields may be mixed freely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueuedBody {
    pub fields: Vec<BodyField>,
}

impl QueuedBody {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(BodyField {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        });
        self
    }

    #[must_use]
    pub fn binary(mut self, name: impl Into<String>, part: BinaryPart) -> Self {
        self.fields.push(BodyField {
            name: name.into(),
            value: FieldValue::Binary(part),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_binary(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f.value, FieldValue::Binary(_)))
    }
}

/// A write about to be captured; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQueueEntry {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: QueuedBody,
    pub created_at: DateTime<Utc>,
}

impl NewQueueEntry {
    pub fn post(url: impl Into<String>, body: QueuedBody) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers: BTreeMap::new(),
            body,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// A persisted deferred write. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: i64,
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: QueuedBody,
    /// Advisory only; ordering follows `id`.
    pub created_at: DateTime<Utc>,
}
