//! Offline synchronization: replaying captured writes and the triggers that
//! decide when to do it.

mod auto_flush;
pub(crate) mod body;
mod connectivity;
mod deferred;
mod flusher;
mod outbox;

pub use auto_flush::AutoFlush;
pub use connectivity::Connectivity;
pub use deferred::{BackgroundSync, DeferredFlush, NoopDeferredFlush};
pub use flusher::{FlushReport, QueueFlusher, is_replay_success};
pub use outbox::{AddStoryOutcome, NewStory, StoryOutbox};
