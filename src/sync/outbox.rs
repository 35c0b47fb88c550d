use crate::api::StoryApi;
use crate::db::DbActorHandle;
use crate::error::{IsRetryable, StorySyncError};
use crate::queue::{BinaryPart, NewQueueEntry, QueuedBody};
use crate::sync::deferred::DeferredFlush;
use reqwest::header::AUTHORIZATION;
use std::sync::Arc;
use storysync_schema::ApiMessage;
use tracing::{error, info, warn};

/// A new story as submitted by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub description: String,
    pub photo: BinaryPart,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl NewStory {
    /// Multipart fields in the order the upload endpoint expects.
    pub fn to_body(&self) -> QueuedBody {
        let mut body = QueuedBody::new()
            .text("description", self.description.clone())
            .binary("photo", self.photo.clone());
        if let Some(lat) = self.lat {
            body = body.text("lat", lat.to_string());
        }
        if let Some(lon) = self.lon {
            body = body.text("lon", lon.to_string());
        }
        body
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddStoryOutcome {
    /// Accepted by the server right away.
    Sent(ApiMessage),
    /// Stored locally; it will be uploaded by a later flush.
    Queued { id: i64 },
}

/// Write path for new stories: try the network first, capture into the
/// queue when that attempt fails for any reason.
#[derive(Clone)]
pub struct StoryOutbox {
    api: StoryApi,
    db: DbActorHandle,
    deferred: Arc<dyn DeferredFlush>,
    sync_tag: String,
}

impl StoryOutbox {
    pub fn new(
        api: StoryApi,
        db: DbActorHandle,
        deferred: Arc<dyn DeferredFlush>,
        sync_tag: impl Into<String>,
    ) -> Self {
        Self {
            api,
            db,
            deferred,
            sync_tag: sync_tag.into(),
        }
    }

    pub async fn add_new_story(&self, story: NewStory) -> Result<AddStoryOutcome, StorySyncError> {
        let authorization = self
            .api
            .session()
            .authorization()
            .await
            .ok_or(StorySyncError::Unauthenticated)?;

        let body = story.to_body();
        let err = match self.api.post_story(&authorization, &body).await {
            Ok(message) => return Ok(AddStoryOutcome::Sent(message)),
            Err(e) => e,
        };

        // Rejections are queued too; the replay carries the stored credential.
        warn!(
            error = %err,
            retryable = err.is_retryable(),
            photo.bytes = story.photo.len(),
            "Story upload failed, queueing for background sync"
        );

        let entry = NewQueueEntry::post(self.api.stories_url().as_str(), body)
            .with_header(AUTHORIZATION.as_str(), authorization);
        let id = match self.db.enqueue(entry).await {
            Ok(id) => id,
            Err(queue_err) => {
                error!(error = %queue_err, "Failed to add story to the sync queue");
                return Err(err);
            }
        };

        if let Err(e) = self.deferred.request_deferred_flush(&self.sync_tag).await {
            warn!(sync.tag = %self.sync_tag, error = %e, "Background sync registration failed");
        }

        info!(queue.id = id, "Story saved locally and will be uploaded when online");
        Ok(AddStoryOutcome::Queued { id })
    }
}
