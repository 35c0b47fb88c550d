#![allow(dead_code)]

use axum::Router;
use chrono::{TimeZone, Utc};
use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use storysync::Story;
use storysync::config::ApiConfig;
use tokio::{fs, net::TcpListener};
use url::Url;

pub struct TempDb {
    pub url: String,
    pub path: PathBuf,
}

impl TempDb {
    pub fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();

        let mut path = std::env::temp_dir();
        path.push(format!(
            "storysync-{prefix}-{}-{}.sqlite",
            std::process::id(),
            nanos
        ));

        Self {
            url: format!("sqlite:{}", path.display()),
            path,
        }
    }

    pub async fn cleanup(self) {
        let wal_path = PathBuf::from(format!("{}-wal", self.path.to_string_lossy()));
        let shm_path = PathBuf::from(format!("{}-shm", self.path.to_string_lossy()));
        let _ = fs::remove_file(&wal_path).await;
        let _ = fs::remove_file(&shm_path).await;
        let _ = fs::remove_file(&self.path).await;
    }
}

pub async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

/// A base URL nothing listens on: bind an ephemeral port, then release it.
pub async fn unreachable_base() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    Url::parse(&format!("http://{}", addr)).expect("valid base url")
}

pub fn api_config(base: &Url, token: Option<&str>) -> ApiConfig {
    ApiConfig {
        base_url: base.join("/v1").expect("valid api base"),
        token: token.map(str::to_string),
        retry_max_times: 0,
        request_timeout_secs: 5,
        ..ApiConfig::default()
    }
}

pub fn story(id: &str, name: &str) -> Story {
    Story {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("description of {name}"),
        photo_url: format!("https://example.test/photos/{id}.jpg"),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        lat: Some(-6.2),
        lon: Some(106.8),
    }
}

pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("condition not met within 5s");
}
