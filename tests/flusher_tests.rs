mod common;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use common::{TempDb, spawn_test_server, unreachable_base};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use storysync::QueueFlusher;
use storysync::queue::{BinaryPart, NewQueueEntry, QueuedBody};
use url::Url;

#[derive(Debug, Clone)]
struct CapturedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    content_type: Option<String>,
    authorization: Option<String>,
    parts: Vec<CapturedPart>,
    raw: Vec<u8>,
}

#[derive(Clone, Default)]
struct Capture {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl Capture {
    fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn reply(status: u16) -> (StatusCode, Json<Value>) {
    (
        StatusCode::from_u16(status).unwrap(),
        Json(json!({ "error": status >= 400, "message": "recorded" })),
    )
}

async fn multipart_handler(
    State(capture): State<Capture>,
    Path(status): Path<u16>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        parts.push(CapturedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }

    capture.requests.lock().unwrap().push(CapturedRequest {
        content_type: header_str(&headers, header::CONTENT_TYPE),
        authorization: header_str(&headers, header::AUTHORIZATION),
        parts,
        raw: Vec::new(),
    });
    reply(status)
}

async fn raw_handler(
    State(capture): State<Capture>,
    Path(status): Path<u16>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    capture.requests.lock().unwrap().push(CapturedRequest {
        content_type: header_str(&headers, header::CONTENT_TYPE),
        authorization: header_str(&headers, header::AUTHORIZATION),
        parts: Vec::new(),
        raw: body.to_vec(),
    });
    reply(status)
}

async fn spawn_capture_server() -> (Url, Capture) {
    let capture = Capture::default();
    let app = Router::new()
        .route("/multipart/{status}", post(multipart_handler))
        .route("/raw/{status}", post(raw_handler))
        .with_state(capture.clone());
    (spawn_test_server(app).await, capture)
}

fn upload(base: &Url, path: &str, description: &str) -> NewQueueEntry {
    let body = QueuedBody::new().text("description", description).binary(
        "photo",
        BinaryPart::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg").with_filename("photo.jpg"),
    );
    NewQueueEntry::post(base.join(path).unwrap().as_str(), body)
        .with_header("Authorization", "Bearer token-1")
}

fn flusher(db: &storysync::DbActorHandle) -> QueueFlusher {
    QueueFlusher::new(db.clone(), reqwest::Client::new())
}

#[tokio::test]
async fn test_flush_empty_queue_sends_nothing() {
    let tmp = TempDb::new("flush-empty");
    let db = storysync::db::spawn(&tmp.url).await.unwrap();
    let (_base, capture) = spawn_capture_server().await;

    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(report.flushed, 0);
    assert!(capture.requests().is_empty());

    tmp.cleanup().await;
}

#[tokio::test]
async fn test_flush_keeps_only_failed_entries() {
    let tmp = TempDb::new("flush-partial");
    let db = storysync::db::spawn(&tmp.url).await.unwrap();
    let (base, capture) = spawn_capture_server().await;

    // 1. A succeeds with 201, B fails with 500
    let id_a = db.enqueue(upload(&base, "/multipart/201", "A")).await.unwrap();
    let id_b = db.enqueue(upload(&base, "/multipart/500", "B")).await.unwrap();
    let before = db.list_queue().await.unwrap();

    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.flushed, 1);
    assert_eq!(report.failed(), 1);

    // 2. Both were tried, in id order
    let descriptions: Vec<Vec<u8>> = capture
        .requests()
        .iter()
        .map(|r| r.parts[0].bytes.clone())
        .collect();
    assert_eq!(descriptions, vec![b"A".to_vec(), b"B".to_vec()]);

    // 3. Only B remains, byte-for-byte unchanged
    let after = db.list_queue().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, id_b);
    assert_eq!(after[0], before[1]);
    assert!(!after.iter().any(|e| e.id == id_a));

    // 4. The next pass retries B again
    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.flushed, 0);
    assert_eq!(capture.requests().len(), 3);

    tmp.cleanup().await;
}

#[tokio::test]
async fn test_flush_replays_binary_as_multipart() {
    let tmp = TempDb::new("flush-binary");
    let db = storysync::db::spawn(&tmp.url).await.unwrap();
    let (base, capture) = spawn_capture_server().await;

    let photo: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let body = QueuedBody::new()
        .text("description", "sunset")
        .binary(
            "photo",
            BinaryPart::new(photo.clone(), "image/jpeg").with_filename("sunset.jpg"),
        )
        .binary("thumb", BinaryPart::new(vec![1, 2, 3], "image/png"))
        .text("lat", "-6.2");
    let entry = NewQueueEntry::post(base.join("/multipart/201").unwrap().as_str(), body)
        .with_header("Authorization", "Bearer token-1")
        .with_header("Content-Type", "application/json");
    db.enqueue(entry).await.unwrap();

    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.flushed, 1);
    assert_eq!(db.count_queue().await.unwrap(), 0);

    let requests = capture.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    // Stored Content-Type is replaced by the multipart boundary header
    let content_type = request.content_type.as_deref().unwrap_or_default();
    assert!(
        content_type.starts_with("multipart/form-data; boundary="),
        "unexpected content type {content_type}"
    );
    assert_eq!(request.authorization.as_deref(), Some("Bearer token-1"));

    let names: Vec<&str> = request.parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["description", "photo", "thumb", "lat"]);

    let photo_part = &request.parts[1];
    assert_eq!(photo_part.bytes, photo);
    assert_eq!(photo_part.file_name.as_deref(), Some("sunset.jpg"));
    assert_eq!(photo_part.content_type.as_deref(), Some("image/jpeg"));

    // Without a stored filename the field name is used
    let thumb_part = &request.parts[2];
    assert_eq!(thumb_part.file_name.as_deref(), Some("thumb"));
    assert_eq!(thumb_part.bytes, vec![1, 2, 3]);

    assert_eq!(request.parts[3].bytes, b"-6.2".to_vec());

    tmp.cleanup().await;
}

#[tokio::test]
async fn test_flush_accepts_only_200_and_201() {
    let tmp = TempDb::new("flush-status");
    let db = storysync::db::spawn(&tmp.url).await.unwrap();
    let (base, _capture) = spawn_capture_server().await;

    db.enqueue(upload(&base, "/multipart/200", "ok")).await.unwrap();
    let id_no_content = db
        .enqueue(upload(&base, "/multipart/204", "no content"))
        .await
        .unwrap();
    let id_accepted = db
        .enqueue(upload(&base, "/multipart/202", "accepted"))
        .await
        .unwrap();
    let id_bad = db
        .enqueue(upload(&base, "/multipart/400", "bad"))
        .await
        .unwrap();

    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.attempted, 4);
    assert_eq!(report.flushed, 1);

    let remaining: Vec<i64> = db.list_queue().await.unwrap().iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec![id_no_content, id_accepted, id_bad]);

    tmp.cleanup().await;
}

#[tokio::test]
async fn test_flush_offline_keeps_everything() {
    let tmp = TempDb::new("flush-offline");
    let db = storysync::db::spawn(&tmp.url).await.unwrap();
    let offline = unreachable_base().await;

    db.enqueue(upload(&offline, "/v1/stories", "one")).await.unwrap();
    db.enqueue(upload(&offline, "/v1/stories", "two")).await.unwrap();
    let before = db.list_queue().await.unwrap();

    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.flushed, 0);
    assert_eq!(db.list_queue().await.unwrap(), before);

    tmp.cleanup().await;
}

#[tokio::test]
async fn test_flush_skips_unbuildable_entry_and_continues() {
    let tmp = TempDb::new("flush-unbuildable");
    let db = storysync::db::spawn(&tmp.url).await.unwrap();
    let (base, capture) = spawn_capture_server().await;

    let broken = db
        .enqueue(upload(&base, "/multipart/201", "broken").with_method("NOT A METHOD"))
        .await
        .unwrap();
    db.enqueue(upload(&base, "/multipart/201", "fine")).await.unwrap();

    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.flushed, 1);
    assert_eq!(capture.requests().len(), 1);

    let remaining = db.list_queue().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, broken);

    tmp.cleanup().await;
}

#[tokio::test]
async fn test_flush_falls_back_to_json_when_multipart_cannot_be_built() {
    let tmp = TempDb::new("flush-json");
    let db = storysync::db::spawn(&tmp.url).await.unwrap();
    let (base, capture) = spawn_capture_server().await;

    let body = QueuedBody::new().text("description", "fallback").binary(
        "photo",
        BinaryPart::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "not a mime type").with_filename("p.jpg"),
    );
    db.enqueue(NewQueueEntry::post(base.join("/raw/201").unwrap().as_str(), body))
        .await
        .unwrap();

    let report = flusher(&db).flush().await.unwrap();
    assert_eq!(report.flushed, 1);

    let requests = capture.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));

    let sent: Value = serde_json::from_slice(&requests[0].raw).unwrap();
    assert_eq!(sent["description"], "fallback");
    assert_eq!(sent["photo"]["filename"], "p.jpg");
    assert_eq!(sent["photo"]["contentType"], "not a mime type");
    assert_eq!(sent["photo"]["base64"], "/9j/4A==");

    tmp.cleanup().await;
}
