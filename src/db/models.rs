use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storysync_schema::Story;

use crate::queue::{BinaryPart, BodyField, FieldValue};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbQueueEntry {
    pub id: i64,
    pub url: String,
    pub method: String,
    /// JSON object of header name -> value.
    pub headers: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbQueueField {
    pub entry_id: i64,
    pub position: i64,
    pub name: String,
    pub text_value: Option<String>,
    pub bytes: Option<Vec<u8>>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl From<DbQueueField> for BodyField {
    fn from(row: DbQueueField) -> Self {
        let value = match row.bytes {
            Some(bytes) => FieldValue::Binary(BinaryPart {
                bytes,
                content_type: row
                    .content_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                filename: row.filename,
            }),
            None => FieldValue::Text(row.text_value.unwrap_or_default()),
        };
        BodyField {
            name: row.name,
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbStory {
    pub id: String,
    pub position: i64,
    pub name: String,
    pub description: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl From<DbStory> for Story {
    fn from(row: DbStory) -> Self {
        Story {
            id: row.id,
            name: row.name,
            description: row.description,
            photo_url: row.photo_url,
            created_at: row.created_at,
            lat: row.lat,
            lon: row.lon,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbFavorite {
    pub id: String,
    pub name: String,
    pub description: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub favorited_at: DateTime<Utc>,
}

impl From<DbFavorite> for Story {
    fn from(row: DbFavorite) -> Self {
        Story {
            id: row.id,
            name: row.name,
            description: row.description,
            photo_url: row.photo_url,
            created_at: row.created_at,
            lat: row.lat,
            lon: row.lon,
        }
    }
}
