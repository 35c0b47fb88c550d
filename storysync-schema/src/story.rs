use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A story as returned by `GET /stories`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Story {
    /// Case-insensitive substring match against name and description.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Envelope returned by `GET /stories`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoryListResponse {
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub list_story: Vec<Story>,
}

/// Plain `{ error, message }` envelope used by write endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ApiMessage {
    pub error: bool,
    #[serde(default)]
    pub message: String,
}
