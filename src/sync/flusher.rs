use crate::db::DbActorHandle;
use crate::error::StorySyncError;
use crate::queue::QueueEntry;
use crate::sync::body::build_request;
use reqwest::StatusCode;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Aggregate outcome of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Entries found in the queue at the start of the pass.
    pub attempted: usize,
    /// Entries accepted by the server and removed.
    pub flushed: usize,
}

impl FlushReport {
    /// Entries left queued for the next pass.
    pub fn failed(&self) -> usize {
        self.attempted - self.flushed
    }
}

/// Only 200 and 201 confirm a replayed write; every other status keeps the entry.
pub fn is_replay_success(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

/// Replays queued writes against the network.
///
/// Several flushers may run against the same store at once (periodic timer,
/// connectivity signal, deferred flush). Each enumerates the queue on its own
/// and removal is idempotent, so an entry may be sent more than once; the
/// remote write endpoint is assumed to tolerate that.
#[derive(Clone)]
pub struct QueueFlusher {
    db: DbActorHandle,
    client: reqwest::Client,
}

impl QueueFlusher {
    pub fn new(db: DbActorHandle, client: reqwest::Client) -> Self {
        Self { db, client }
    }

    /// Replay every queued entry once, in id order.
    ///
    /// Individual failures never abort the pass; only failing to read the
    /// queue itself is an error.
    pub async fn flush(&self) -> Result<FlushReport, StorySyncError> {
        let entries = self.db.list_queue().await?;
        if entries.is_empty() {
            return Ok(FlushReport::default());
        }

        let start = Instant::now();
        let mut report = FlushReport {
            attempted: entries.len(),
            flushed: 0,
        };

        for entry in entries {
            if self.replay_one(&entry).await {
                report.flushed += 1;
            }
        }

        info!(
            flush.attempted = report.attempted,
            flush.flushed = report.flushed,
            flush.failed = report.failed(),
            "[Sync] Queue flush finished in {:?}",
            start.elapsed()
        );
        Ok(report)
    }

    async fn replay_one(&self, entry: &QueueEntry) -> bool {
        let request = match build_request(
            &self.client,
            &entry.method,
            &entry.url,
            &entry.headers,
            &entry.body,
        ) {
            Ok(request) => request,
            Err(e) => {
                warn!(queue.id = entry.id, error = %e, "[Sync] Cannot rebuild queued request, keeping it");
                return false;
            }
        };

        let status = match request.send().await {
            Ok(resp) => resp.status(),
            Err(e) => {
                warn!(queue.id = entry.id, error = %e, "[Sync] Failed to send queued item");
                return false;
            }
        };

        if !is_replay_success(status) {
            warn!(queue.id = entry.id, url = %entry.url, %status, "[Sync] Server rejected queued item");
            return false;
        }

        match self.db.remove_queue_entry(entry.id).await {
            Ok(true) => {
                debug!(queue.id = entry.id, %status, "[Sync] Queued item delivered");
                true
            }
            Ok(false) => {
                debug!(queue.id = entry.id, "[Sync] Queued item delivered, already removed by another flush");
                true
            }
            Err(e) => {
                warn!(queue.id = entry.id, error = %e, "[Sync] Delivered item could not be removed; it will be resent");
                false
            }
        }
    }
}
