pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod favorites;
pub mod queue;
pub mod sync;

mod utils;

pub use api::{Session, StoryApi};
pub use cache::{Feed, FeedSource, ReadThroughCache};
pub use db::DbActorHandle;
pub use error::StorySyncError;
pub use favorites::Favorites;
pub use queue::{BinaryPart, NewQueueEntry, QueueEntry, QueuedBody};
pub use sync::{
    AddStoryOutcome, AutoFlush, BackgroundSync, Connectivity, DeferredFlush, FlushReport,
    NewStory, NoopDeferredFlush, QueueFlusher, StoryOutbox,
};
pub use storysync_schema::Story;
