//! Database module: the client-local durable store.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `actor.rs`: the single owner of the pool; every operation is one message

pub mod actor;
pub mod models;
pub mod schema;

pub use models::{DbFavorite, DbQueueEntry, DbQueueField, DbStory};
pub use schema::SQLITE_INIT;

pub use actor::{DbActorHandle, spawn};
