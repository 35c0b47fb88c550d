//! Deferred write operations captured while offline.
//!
//! The durable side lives in [`crate::db`]; this module only holds the entry model.

mod entry;

pub use entry::{BinaryPart, BodyField, FieldValue, NewQueueEntry, QueueEntry, QueuedBody};
