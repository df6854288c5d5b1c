#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use video_ingest_backend::api::error::AppError;
use video_ingest_backend::config::AppConfig;
use video_ingest_backend::infrastructure::database;
use video_ingest_backend::models::{ContainerFormat, StorageReference};
use video_ingest_backend::services::classifier::MediaClassifier;
use video_ingest_backend::services::media::{MediaProbe, Remuxer, StreamDimensions};
use video_ingest_backend::services::optimizer::StreamOptimizer;
use video_ingest_backend::services::pipeline::IngestPipeline;
use video_ingest_backend::services::publisher::Publisher;
use video_ingest_backend::services::record_store::{SeaOrmVideoStore, VideoRecordStore};
use video_ingest_backend::services::signer::UrlSigner;
use video_ingest_backend::services::stager::IngestStager;
use video_ingest_backend::services::storage::StorageService;
use video_ingest_backend::utils::auth::create_jwt;
use video_ingest_backend::{AppState, create_app};

pub const TEST_SECRET: &str = "test_secret";
pub const TEST_BUCKET: &str = "test-videos";
pub const REMUX_MARKER: &[u8] = b"faststart:";

#[derive(Default)]
pub struct MockStorageService {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub presign_calls: AtomicUsize,
    pub fail_put: bool,
}

impl MockStorageService {
    pub fn object(&self, reference: &StorageReference) -> Option<(Vec<u8>, String)> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{}/{}", reference.bucket, reference.key))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn presign_count(&self) -> usize {
        self.presign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn put_file(
        &self,
        reference: &StorageReference,
        path: &Path,
        content_type: &str,
    ) -> anyhow::Result<()> {
        if self.fail_put {
            anyhow::bail!("simulated storage outage");
        }
        let data = tokio::fs::read(path).await?;
        self.objects.lock().unwrap().insert(
            format!("{}/{}", reference.bucket, reference.key),
            (data, content_type.to_string()),
        );
        Ok(())
    }

    async fn presign_get(&self, reference: &StorageReference, ttl: Duration) -> anyhow::Result<String> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "http://mock-s3/{}/{}?X-Amz-Expires={}",
            reference.bucket,
            reference.key,
            ttl.as_secs()
        ))
    }

    async fn delete_object(&self, reference: &StorageReference) -> anyhow::Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&format!("{}/{}", reference.bucket, reference.key));
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> anyhow::Result<bool> {
        Ok(bucket == TEST_BUCKET)
    }
}

/// Reports a fixed list of streams for every file.
pub struct FakeProbe {
    pub streams: Vec<StreamDimensions>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self::with_streams(vec![StreamDimensions { width, height }])
    }

    pub fn with_streams(streams: Vec<StreamDimensions>) -> Self {
        Self {
            streams,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, _path: &Path) -> Result<Vec<StreamDimensions>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.streams.clone())
    }
}

/// Writes the input behind a marker so tests can tell the optimized copy was
/// the one that got published.
pub struct MarkingRemuxer;

#[async_trait]
impl Remuxer for MarkingRemuxer {
    async fn remux(
        &self,
        input: &Path,
        output: &Path,
        _format: &ContainerFormat,
    ) -> Result<(), AppError> {
        let mut data = REMUX_MARKER.to_vec();
        data.extend(
            tokio::fs::read(input)
                .await
                .map_err(|e| AppError::OptimizationFailure(e.to_string()))?,
        );
        tokio::fs::write(output, data)
            .await
            .map_err(|e| AppError::OptimizationFailure(e.to_string()))
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub storage: Arc<MockStorageService>,
    pub probe: Arc<FakeProbe>,
    pub staging: TempDir,
}

impl TestApp {
    pub async fn new(probe: FakeProbe) -> Self {
        Self::build(probe, MockStorageService::default(), |_| {}).await
    }

    pub async fn build(
        probe: FakeProbe,
        storage: MockStorageService,
        configure: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let staging = tempfile::tempdir().unwrap();

        let mut config = AppConfig {
            s3_bucket: TEST_BUCKET.to_string(),
            jwt_secret: TEST_SECRET.to_string(),
            staging_dir: Some(staging.path().to_path_buf()),
            ..AppConfig::default()
        };
        configure(&mut config);

        let db = Database::connect("sqlite::memory:").await.unwrap();
        database::run_migrations(&db).await.unwrap();

        let records: Arc<dyn VideoRecordStore> = Arc::new(SeaOrmVideoStore::new(db));
        let storage = Arc::new(storage);
        let probe = Arc::new(probe);

        let pipeline = Arc::new(IngestPipeline::new(
            records.clone(),
            IngestStager::new(
                config.staging_dir(),
                config.max_upload_size as u64,
                config.allowed_content_types.clone(),
            ),
            MediaClassifier::new(probe.clone()),
            StreamOptimizer::new(Arc::new(MarkingRemuxer), config.staging_dir()),
            Publisher::new(storage.clone(), records.clone(), config.s3_bucket.clone()),
        ));

        let state = AppState {
            records,
            storage: storage.clone(),
            pipeline,
            signer: Arc::new(UrlSigner::new(storage.clone(), config.presign_ttl())),
            config,
        };

        Self {
            app: create_app(state.clone()),
            state,
            storage,
            probe,
            staging,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Creates a record owned by `user` through the API and returns its id.
    pub async fn create_video(&self, user: &str, title: &str) -> String {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/videos")
                    .header("Authorization", bearer(user))
                    .header("Content-Type", "application/json")
                    .body(Body::from(format!(r#"{{"title": "{}"}}"#, title)))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        body_json(response).await["id"].as_str().unwrap().to_string()
    }

    pub fn staging_file_count(&self) -> usize {
        std::fs::read_dir(self.staging.path()).unwrap().count()
    }
}

pub fn bearer(user: &str) -> String {
    format!("Bearer {}", create_jwt(user, TEST_SECRET).unwrap())
}

pub const BOUNDARY: &str = "---------------------------video-ingest-test";

pub fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> Body {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"clip.bin\"\r\n\
        Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

pub fn upload_request(video_id: &str, user: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/video_upload/{}", video_id))
        .header("Authorization", bearer(user))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(multipart_body("video", content_type, data))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
