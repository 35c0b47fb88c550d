//! User-curated stories. Lives beside the mirror but is never touched by a
//! mirror refresh.

use crate::db::DbActorHandle;
use crate::error::StorySyncError;
use storysync_schema::Story;
use tracing::debug;

#[derive(Clone)]
pub struct Favorites {
    db: DbActorHandle,
}

impl Favorites {
    pub fn new(db: DbActorHandle) -> Self {
        Self { db }
    }

    pub async fn add(&self, story: Story) -> Result<(), StorySyncError> {
        if story.id.trim().is_empty() {
            return Err(StorySyncError::MissingStoryId);
        }
        debug!(story.id = %story.id, "Adding favorite");
        self.db.put_favorite(story).await
    }

    /// No-op when the story is not a favorite.
    pub async fn remove(&self, id: &str) -> Result<bool, StorySyncError> {
        debug!(story.id = %id, "Removing favorite");
        self.db.remove_favorite(id).await
    }

    /// Most recently added first.
    pub async fn list(&self) -> Result<Vec<Story>, StorySyncError> {
        self.db.list_favorites().await
    }

    pub async fn is_favorite(&self, id: &str) -> Result<bool, StorySyncError> {
        if id.is_empty() {
            return Ok(false);
        }
        self.db.is_favorite(id).await
    }

    /// Flip the favorite state; returns whether the story is now a favorite.
    pub async fn toggle(&self, story: Story) -> Result<bool, StorySyncError> {
        if self.is_favorite(&story.id).await? {
            self.remove(&story.id).await?;
            Ok(false)
        } else {
            self.add(story).await?;
            Ok(true)
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Story>, StorySyncError> {
        let favorites = self.list().await?;
        Ok(favorites
            .into_iter()
            .filter(|s| s.matches_query(query))
            .collect())
    }
}
