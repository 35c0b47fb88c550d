pub mod story;

pub use story::{ApiMessage, Story, StoryListResponse};
