//! HTTP access to the remote story API.

mod client;
mod retry;
mod session;

pub use client::{StoryApi, build_http_client};
pub use session::Session;
