use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::{Value, json};
use tempfile::TempDir;

use common::{SignatureAlgorithm, VideoStatus};
use server::config::{
    AppConfig, CorsConfig, DatabaseConfig, ProviderConfig, ReconcileConfig, ServerConfig,
};
use server::entity::video;
use server::provider::{EagerTranscode, ProviderError, TranscodeProvider};
use server::state::AppState;

pub const API_SECRET: &str = "test-secret-for-integration-tests";
pub const API_KEY: &str = "test-api-key";

pub mod routes {
    pub const SIGNATURE: &str = "/api/v1/upload/signature";
    pub const VIDEOS: &str = "/api/v1/videos";
    pub const PROCESS: &str = "/api/v1/videos/process";
    pub const WEBHOOK: &str = "/api/v1/webhooks/transcode";

    pub fn video(public_id: &str) -> String {
        format!("/api/v1/videos/{}", segment(public_id))
    }

    pub fn video_status(public_id: &str) -> String {
        format!("/api/v1/videos/{}/status", segment(public_id))
    }

    /// Percent-encode a public ID as one path segment (`a/b` becomes `a%2Fb`).
    pub fn segment(public_id: &str) -> String {
        let mut url = reqwest::Url::parse("http://localhost/").unwrap();
        url.path_segments_mut().unwrap().clear().push(public_id);
        url.path()[1..].to_string()
    }
}

/// How the fake provider answers transcode requests.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Accept and stay silent; tests deliver notifications themselves.
    Accept,
    /// Accept, then post an `eager` notification to the callback after a delay.
    AcceptAndNotify(Duration),
    /// Reject every request.
    Reject,
}

/// In-process stand-in for the transcoding provider that records every job.
pub struct FakeProvider {
    mode: Mutex<ProviderMode>,
    jobs: Mutex<Vec<EagerTranscode>>,
    client: Client,
}

impl FakeProvider {
    pub fn new(mode: ProviderMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            jobs: Mutex::new(Vec::new()),
            client: Client::new(),
        }
    }

    pub fn set_mode(&self, mode: ProviderMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn jobs(&self) -> Vec<EagerTranscode> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscodeProvider for FakeProvider {
    async fn request_eager_transcode(&self, job: &EagerTranscode) -> Result<Value, ProviderError> {
        let mode = *self.mode.lock().unwrap();
        if mode == ProviderMode::Reject {
            return Err(ProviderError::Rejected {
                status: 400,
                message: "Resource not found".into(),
            });
        }
        self.jobs.lock().unwrap().push(job.clone());

        if let ProviderMode::AcceptAndNotify(delay) = mode {
            let client = self.client.clone();
            let url = job.notification_url.clone();
            let public_id = job.public_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = client
                    .post(url)
                    .json(&json!({"notification_type": "eager", "public_id": public_id}))
                    .send()
                    .await;
            });
        }

        Ok(json!({"status": "processing", "public_id": job.public_id}))
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub provider: Arc<FakeProvider>,
    pub config: AppConfig,
    _data_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub fn provider_config(public_app_url: String) -> ProviderConfig {
    ProviderConfig {
        cloud_name: "demo".into(),
        api_key: Some(API_KEY.into()),
        api_secret: Some(API_SECRET.into()),
        api_base_url: "http://127.0.0.1:9".into(),
        eager_profile: "sp_full_hd/f_m3u8".into(),
        public_app_url,
        signature_algorithm: SignatureAlgorithm::Sha1,
        verify_notifications: false,
        notification_max_age_secs: 7200,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(ProviderMode::Accept, |_| {}).await
    }

    /// Spawn with a provider mode and a hook to adjust the configuration.
    pub async fn spawn_with(mode: ProviderMode, configure: impl FnOnce(&mut AppConfig)) -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.path().join("catalog.db").display()
        );
        let db = server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        let mut app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            provider: provider_config(format!("http://{addr}")),
            reconcile: ReconcileConfig::default(),
        };
        configure(&mut app_config);

        let provider = Arc::new(FakeProvider::new(mode));
        let state = AppState {
            db: db.clone(),
            config: Arc::new(app_config.clone()),
            provider: provider.clone(),
        };

        let app = server::build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            provider,
            config: app_config,
            _data_dir: data_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    /// POST a raw body with extra headers, as the provider would.
    pub async fn post_raw(&self, path: &str, body: &str, headers: &[(&str, String)]) -> TestResponse {
        let mut req = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body.to_string());
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        let res = req.send().await.expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    /// Register a video through the API and return its response body.
    pub async fn create_video(&self, public_id: &str, title: &str) -> Value {
        let res = self
            .post(
                routes::VIDEOS,
                &json!({
                    "title": title,
                    "description": format!("{title} description"),
                    "publicId": public_id,
                    "duration": 125.0,
                    "thumbnailUrl": format!("https://cdn.example.com/{public_id}.jpg"),
                }),
            )
            .await;
        assert_eq!(res.status, 201, "create failed: {}", res.text);
        res.body
    }

    pub async fn send_eager_notification(&self, public_id: &str) -> TestResponse {
        self.post(
            routes::WEBHOOK,
            &json!({"notification_type": "eager", "public_id": public_id}),
        )
        .await
    }

    /// Insert a record directly, bypassing the API.
    pub async fn insert_video(
        &self,
        public_id: &str,
        status: VideoStatus,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> video::Model {
        video::ActiveModel {
            public_id: Set(public_id.to_string()),
            title: Set(public_id.to_string()),
            description: Set("seeded".to_string()),
            thumbnail_url: Set(None),
            duration: Set(None),
            status: Set(status),
            trigger_attempts: Set(0),
            last_triggered_at: Set(None),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert video")
    }

    pub async fn video_count(&self) -> u64 {
        video::Entity::find()
            .count(&self.db)
            .await
            .expect("Failed to count videos")
    }
}
