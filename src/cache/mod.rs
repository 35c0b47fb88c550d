mod read_through;

pub use read_through::{Feed, FeedSource, ReadThroughCache};
