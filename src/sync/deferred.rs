use crate::error::StorySyncError;
use crate::sync::flusher::QueueFlusher;
use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info};

/// Host-provided "run a flush later" capability, requested after a write is
/// queued. Implementations may do nothing; the proactive triggers in
/// [`crate::sync::AutoFlush`] still drain the queue.
#[async_trait]
pub trait DeferredFlush: Send + Sync {
    async fn request_deferred_flush(&self, tag: &str) -> Result<(), StorySyncError>;
}

/// For hosts without any background execution facility.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDeferredFlush;

#[async_trait]
impl DeferredFlush for NoopDeferredFlush {
    async fn request_deferred_flush(&self, tag: &str) -> Result<(), StorySyncError> {
        debug!(sync.tag = tag, "Deferred flush not supported on this host");
        Ok(())
    }
}

#[derive(Debug)]
enum BackgroundSyncMessage {
    Register(String),
    Fire(String),
}

/// One-shot deferred flush registrations, coalesced per tag.
///
/// Registering a tag that is already pending is a no-op; once the delay
/// elapses the tag is cleared and a single flush runs.
#[derive(Clone)]
pub struct BackgroundSync {
    actor: ActorRef<BackgroundSyncMessage>,
}

impl BackgroundSync {
    pub async fn spawn(flusher: QueueFlusher, delay: Duration) -> Result<Self, StorySyncError> {
        let (actor, _jh) = Actor::spawn(None, BackgroundSyncActor, (flusher, delay))
            .await
            .map_err(|e| {
                StorySyncError::RactorError(format!("BackgroundSyncActor spawn failed: {e}"))
            })?;
        Ok(Self { actor })
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}

#[async_trait]
impl DeferredFlush for BackgroundSync {
    async fn request_deferred_flush(&self, tag: &str) -> Result<(), StorySyncError> {
        ractor::cast!(self.actor, BackgroundSyncMessage::Register(tag.to_string()))
            .map_err(|e| StorySyncError::DeferredFlushUnavailable(e.to_string()))
    }
}

struct BackgroundSyncState {
    flusher: QueueFlusher,
    delay: Duration,
    pending: HashSet<String>,
}

struct BackgroundSyncActor;

#[ractor::async_trait]
impl Actor for BackgroundSyncActor {
    type Msg = BackgroundSyncMessage;
    type State = BackgroundSyncState;
    type Arguments = (QueueFlusher, Duration);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (flusher, delay): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(BackgroundSyncState {
            flusher,
            delay,
            pending: HashSet::new(),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            BackgroundSyncMessage::Register(tag) => {
                if !state.pending.insert(tag.clone()) {
                    debug!(sync.tag = %tag, "Deferred flush already registered");
                    return Ok(());
                }

                debug!(sync.tag = %tag, delay = ?state.delay, "Deferred flush registered");
                let delay = state.delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // The actor may have been stopped meanwhile; nothing to do then.
                    let _ = ractor::cast!(myself, BackgroundSyncMessage::Fire(tag));
                });
            }
            BackgroundSyncMessage::Fire(tag) => {
                state.pending.remove(&tag);
                match state.flusher.flush().await {
                    Ok(report) => info!(
                        sync.tag = %tag,
                        flush.flushed = report.flushed,
                        flush.failed = report.failed(),
                        "Deferred flush completed"
                    ),
                    Err(e) => error!(sync.tag = %tag, error = %e, "Deferred flush failed"),
                }
            }
        }
        Ok(())
    }
}
