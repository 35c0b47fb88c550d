use mimalloc::MiMalloc;
use std::time::Duration;
use storysync::{
    AutoFlush, BackgroundSync, Connectivity, DeferredFlush, QueueFlusher, ReadThroughCache,
    Session, StoryApi,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &storysync::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        api_base_url = %cfg.api.base_url,
        api_proxy = %cfg.api.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        api_token = if cfg.api.token.is_some() { "<set>" } else { "<none>" },
        sync_tag = %cfg.sync.sync_tag,
        flush_interval_secs = cfg.sync.flush_interval_secs,
        "storysync starting"
    );

    let db = storysync::db::spawn(&cfg.basic.database_url).await?;
    let api = StoryApi::new(&cfg.api, Session::new(cfg.api.token.clone()))?;
    let flusher = QueueFlusher::new(db.clone(), api.http_client().clone());

    let background = BackgroundSync::spawn(
        flusher.clone(),
        Duration::from_secs(cfg.sync.deferred_delay_secs),
    )
    .await?;

    let connectivity = Connectivity::new(true);
    let probe = connectivity.spawn_probe(
        api.http_client().clone(),
        cfg.api.base_url.clone(),
        Duration::from_secs(cfg.sync.probe_interval_secs.max(1)),
    );

    let auto_flush = AutoFlush::spawn(
        flusher,
        connectivity,
        Duration::from_secs(cfg.sync.flush_interval_secs.max(1)),
        cfg.sync.flush_on_startup,
    );

    let cache = ReadThroughCache::new(api, db.clone());
    match cache.get_feed().await {
        Ok(feed) => info!(
            stories = feed.stories.len(),
            source = ?feed.source,
            "Story feed loaded"
        ),
        Err(e) => warn!(error = %e, "Story feed unavailable"),
    }

    let pending = db.count_queue().await?;
    info!(pending, "Sync queue ready");
    if pending > 0 {
        if let Err(e) = background.request_deferred_flush(&cfg.sync.sync_tag).await {
            warn!(error = %e, "Could not schedule a flush for pending writes");
        }
    }

    shutdown_signal().await;

    auto_flush.shutdown();
    probe.abort();
    background.stop();
    info!("storysync has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
