use crate::api::StoryApi;
use crate::db::DbActorHandle;
use crate::error::StorySyncError;
use storysync_schema::Story;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Network,
    /// Last-known-good local copy; the network was unavailable.
    Mirror,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub stories: Vec<Story>,
    pub source: FeedSource,
}

/// Network-first story list backed by the local mirror.
///
/// The mirror is never treated as authoritative while the API is reachable:
/// every successful fetch replaces it wholesale.
#[derive(Clone)]
pub struct ReadThroughCache {
    api: StoryApi,
    db: DbActorHandle,
}

impl ReadThroughCache {
    pub fn new(api: StoryApi, db: DbActorHandle) -> Self {
        Self { api, db }
    }

    pub async fn get_authoritative_list(&self) -> Result<Vec<Story>, StorySyncError> {
        Ok(self.get_feed().await?.stories)
    }

    /// Like [`Self::get_authoritative_list`], also reporting where the list came from.
    pub async fn get_feed(&self) -> Result<Feed, StorySyncError> {
        let err = match self.api.fetch_stories().await {
            Ok(stories) => {
                if let Err(e) = self.db.replace_mirror(stories.clone()).await {
                    warn!(error = %e, "Fetched stories but failed to refresh the local mirror");
                }
                return Ok(Feed {
                    stories,
                    source: FeedSource::Network,
                });
            }
            Err(StorySyncError::Unauthenticated) => return Err(StorySyncError::Unauthenticated),
            Err(e) => e,
        };

        warn!(error = %err, "API fetch failed, falling back to local mirror");
        let stories = self.db.list_mirror().await?;
        if stories.is_empty() {
            error!(error = %err, "Story fetch failed and the local mirror is empty");
            return Err(StorySyncError::NoOfflineData);
        }

        info!(stories = stories.len(), "Returning stories from local mirror");
        Ok(Feed {
            stories,
            source: FeedSource::Mirror,
        })
    }

    /// Search the mirror by name or description.
    pub async fn search_stories(&self, query: &str) -> Result<Vec<Story>, StorySyncError> {
        let stories = self.db.list_mirror().await?;
        Ok(stories
            .into_iter()
            .filter(|s| s.matches_query(query))
            .collect())
    }

    pub async fn get_story(&self, id: &str) -> Result<Option<Story>, StorySyncError> {
        self.db.get_story(id).await
    }
}
