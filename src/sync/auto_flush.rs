use crate::sync::connectivity::Connectivity;
use crate::sync::flusher::QueueFlusher;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Proactive flush triggers while the process is running: an optional flush at
/// startup, a fixed interval while online, and every offline-to-online
/// transition. Tasks are aborted when this value is dropped.
pub struct AutoFlush {
    tasks: Vec<JoinHandle<()>>,
}

impl AutoFlush {
    pub fn spawn(
        flusher: QueueFlusher,
        connectivity: Connectivity,
        every: Duration,
        flush_on_startup: bool,
    ) -> Self {
        let periodic = {
            let flusher = flusher.clone();
            let connectivity = connectivity.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // first tick completes immediately
                ticker.tick().await;
                if flush_on_startup {
                    run_flush(&flusher, "startup").await;
                }
                loop {
                    ticker.tick().await;
                    if connectivity.is_online() {
                        run_flush(&flusher, "periodic").await;
                    }
                }
            })
        };

        let on_reconnect = tokio::spawn(async move {
            let mut rx = connectivity.subscribe();
            let mut was_online = *rx.borrow_and_update();
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    info!("Network online, attempting to flush queue");
                    run_flush(&flusher, "reconnect").await;
                }
                was_online = online;
            }
        });

        Self {
            tasks: vec![periodic, on_reconnect],
        }
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for AutoFlush {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn run_flush(flusher: &QueueFlusher, trigger: &'static str) {
    match flusher.flush().await {
        Ok(report) if report.flushed > 0 => {
            info!(trigger, flush.flushed = report.flushed, "Auto flush sent queued items");
        }
        Ok(_) => {}
        Err(e) => error!(trigger, error = %e, "Auto flush error"),
    }
}
