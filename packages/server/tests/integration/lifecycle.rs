use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};

use client::config::{ClientConfig, PollingConfig, ProviderEndpoint, ServerEndpoint};
use client::{ClientError, HttpBackend, UploadCoordinator, UploadForm, UploadStage, VideoFile};
use common::SignatureAlgorithm;
use common::signing::sign_upload;

use crate::common::{API_KEY, API_SECRET, ProviderMode, TestApp, routes};

/// Direct-upload endpoint of the fake provider. Uploads land in a `cartoons/`
/// folder, so public IDs carry a slash.
#[derive(Default)]
struct FakeStorage {
    reject: AtomicBool,
    uploads: AtomicU32,
}

async fn upload(
    State(storage): State<Arc<FakeStorage>>,
    Path(cloud): Path<String>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut fields = std::collections::HashMap::new();
    let mut file_len = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file_len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        } else {
            fields.insert(name, field.text().await.unwrap_or_default());
        }
    }

    let timestamp: i64 = fields["timestamp"].parse().unwrap_or_default();
    let expected = sign_upload(timestamp, API_SECRET, SignatureAlgorithm::Sha1);
    if storage.reject.load(Ordering::SeqCst)
        || fields["signature"] != expected
        || fields["api_key"] != API_KEY
        || file_len == 0
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": "Invalid Signature"}})),
        );
    }

    let n = storage.uploads.fetch_add(1, Ordering::SeqCst) + 1;
    (
        StatusCode::OK,
        Json(json!({
            "public_id": format!("cartoons/e2e-{n}"),
            "duration": 42.5,
            "secure_url": format!("https://res.example.com/{cloud}/video/upload/v1/cartoons/e2e-{n}.mp4"),
        })),
    )
}

async fn spawn_storage() -> (String, Arc<FakeStorage>) {
    let storage = Arc::new(FakeStorage::default());
    let app = axum::Router::new()
        .route("/v1_1/{cloud}/video/upload", post(upload))
        .with_state(storage.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), storage)
}

fn client_config(app: &TestApp, storage_url: String) -> ClientConfig {
    ClientConfig {
        server: ServerEndpoint { url: app.url("") },
        provider: ProviderEndpoint {
            api_base_url: storage_url,
            cloud_name: "demo".into(),
        },
        polling: PollingConfig {
            interval_ms: 100,
            max_attempts: None,
            error_backoff_max_ms: None,
        },
    }
}

fn form() -> UploadForm {
    UploadForm {
        title: "Ep1".into(),
        description: "Pilot episode".into(),
        file: Some(VideoFile {
            file_name: "ep1.mp4".into(),
            bytes: b"not really a video".to_vec(),
        }),
    }
}

#[tokio::test]
async fn upload_reaches_ready() {
    let app = TestApp::spawn_with(
        ProviderMode::AcceptAndNotify(Duration::from_millis(300)),
        |_| {},
    )
    .await;
    let (storage_url, storage) = spawn_storage().await;
    let config = client_config(&app, storage_url);

    let coordinator = UploadCoordinator::new(
        Arc::new(HttpBackend::new(&config)),
        config.polling.policy(),
    );
    let mut rx = coordinator.subscribe();

    let public_id = coordinator.submit(form()).await.expect("submit failed");
    assert_eq!(public_id, "cartoons/e2e-1");
    assert_eq!(coordinator.stage(), UploadStage::Processing);

    tokio::time::timeout(
        Duration::from_secs(10),
        rx.wait_for(|s| s.stage == UploadStage::Ready),
    )
    .await
    .expect("never became ready")
    .unwrap();

    assert_eq!(storage.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(app.video_count().await, 1);
    assert_eq!(app.provider.jobs().len(), 1);

    let res = app.get(&routes::video("cartoons/e2e-1")).await;
    let video = &res.body["video"];
    assert_eq!(video["status"], "ready");
    assert_eq!(video["title"], "Ep1");
    assert_eq!(video["duration"], 42.5);
    assert_eq!(
        video["thumbnailUrl"],
        "https://res.example.com/demo/video/upload/v1/cartoons/e2e-1.jpg"
    );

    coordinator.reset().unwrap();
    assert_eq!(coordinator.stage(), UploadStage::Idle);
}

#[tokio::test]
async fn rejected_upload_leaves_no_record() {
    let app = TestApp::spawn().await;
    let (storage_url, storage) = spawn_storage().await;
    storage.reject.store(true, Ordering::SeqCst);
    let config = client_config(&app, storage_url);

    let coordinator = UploadCoordinator::new(
        Arc::new(HttpBackend::new(&config)),
        config.polling.policy(),
    );

    let err = coordinator.submit(form()).await.unwrap_err();
    assert!(matches!(err, ClientError::Upload(_)), "{err}");

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.stage, UploadStage::Idle);
    assert!(snapshot.notice.unwrap().contains("Invalid Signature"));
    assert_eq!(app.video_count().await, 0);
    assert!(app.provider.jobs().is_empty());
}

#[tokio::test]
async fn missing_api_key_stops_before_upload() {
    let app = TestApp::spawn_with(ProviderMode::Accept, |c| {
        c.provider.api_key = None;
    })
    .await;
    let (storage_url, storage) = spawn_storage().await;
    let config = client_config(&app, storage_url);

    let coordinator = UploadCoordinator::new(
        Arc::new(HttpBackend::new(&config)),
        config.polling.policy(),
    );

    let err = coordinator.submit(form()).await.unwrap_err();
    assert!(matches!(err, ClientError::MissingApiKey));
    assert_eq!(storage.uploads.load(Ordering::SeqCst), 0);
    assert_eq!(app.video_count().await, 0);
}

#[tokio::test]
async fn trigger_failure_leaves_record_processing() {
    let app = TestApp::spawn_with(ProviderMode::Reject, |_| {}).await;
    let (storage_url, _storage) = spawn_storage().await;
    let config = client_config(&app, storage_url);

    let coordinator = UploadCoordinator::new(
        Arc::new(HttpBackend::new(&config)),
        config.polling.policy(),
    );

    let public_id = coordinator.submit(form()).await.unwrap();
    assert_eq!(coordinator.stage(), UploadStage::Processing);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let res = app.get(&routes::video_status(&public_id)).await;
    assert_eq!(res.body["status"], "processing");
    assert_eq!(coordinator.stage(), UploadStage::Processing);
}
