//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hopper_core::config::{AppConfig, StorageConfig, SweepConfig};
use hopper_server::{AppState, create_router};
use hopper_store::{ChunkStore, FilesystemStore};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with temporary storage.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub storage_root: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    ///
    /// The storage path always points at the temp directory; modifiers
    /// should only touch server and sweep settings.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_root = temp_dir.path().join("storage");
        std::fs::create_dir_all(&storage_root).expect("Failed to create storage directory");

        let store: Arc<dyn ChunkStore> = Arc::new(
            FilesystemStore::new(&storage_root)
                .await
                .expect("Failed to create storage backend"),
        );

        // The sweeper stays off so tests drive reclamation explicitly.
        let mut config = AppConfig {
            storage: StorageConfig::Filesystem {
                path: storage_root.clone(),
            },
            sweep: SweepConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        modifier(&mut config);

        let state = AppState::new(config, store);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            storage_root,
            _temp_dir: temp_dir,
        }
    }

    /// Directory holding a session's stored chunks.
    pub fn chunk_dir(&self, file_name: &str) -> PathBuf {
        self.storage_root.join("chunks").join(file_name)
    }

    /// Path a published artifact lands at.
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.storage_root.join("artifacts").join(file_name)
    }

    /// POST /upload with a raw chunk payload.
    pub async fn upload_chunk(
        &self,
        file_name: &str,
        index: u32,
        payload: Vec<u8>,
    ) -> (StatusCode, Value) {
        let uri = format!("/upload?file_name={file_name}&chunk_index={index}");
        self.request("POST", &uri, Body::from(payload)).await
    }

    /// POST /finalize-upload.
    pub async fn finalize(&self, file_name: &str, total_chunks: u32) -> (StatusCode, Value) {
        let body = json!({ "file_name": file_name, "total_chunks": total_chunks });
        self.request(
            "POST",
            "/finalize-upload",
            Body::from(serde_json::to_vec(&body).unwrap()),
        )
        .await
    }

    /// POST /cancel-upload.
    pub async fn cancel(&self, file_name: &str) -> (StatusCode, Value) {
        let body = json!({ "file_name": file_name });
        self.request(
            "POST",
            "/cancel-upload",
            Body::from(serde_json::to_vec(&body).unwrap()),
        )
        .await
    }

    /// GET an arbitrary path.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Body::empty()).await
    }

    /// Fire a request at the router and decode the JSON response body.
    pub async fn request(&self, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Fetch a non-JSON endpoint as text.
    pub async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }
}
