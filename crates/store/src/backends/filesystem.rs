//! Local filesystem storage backend.

use crate::error::{StoreError, StoreResult};
use crate::traits::{ArtifactSink, ChunkStore};
use async_trait::async_trait;
use bytes::Bytes;
use hopper_core::SessionId;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Directory for chunk payloads, one subdirectory per session.
const CHUNKS_DIR: &str = "chunks";

/// Directory for published artifacts.
const ARTIFACTS_DIR: &str = "artifacts";

/// Local filesystem chunk store.
///
/// Layout under the root:
/// - `chunks/<session>/<index>` holds individual chunk payloads
/// - `artifacts/<session>` holds the reassembled file
///
/// Session ids are validated at the boundary, and the store validates them
/// again before any path join so even an id that bypassed parsing cannot
/// escape the root. Every write goes through a uniquely named temp file,
/// fsync, then rename so readers only ever observe complete payloads.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    /// Create a new filesystem store rooted at the given directory.
    pub async fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(CHUNKS_DIR)).await?;
        fs::create_dir_all(root.join(ARTIFACTS_DIR)).await?;
        Ok(Self { root })
    }

    fn session_dir(&self, session: &SessionId) -> StoreResult<PathBuf> {
        Ok(self.root.join(CHUNKS_DIR).join(checked_key(session.as_str())?))
    }

    fn chunk_path(&self, session: &SessionId, index: u32) -> StoreResult<PathBuf> {
        Ok(self.session_dir(session)?.join(index.to_string()))
    }

    fn artifact_path(&self, session: &SessionId) -> StoreResult<PathBuf> {
        Ok(self
            .root
            .join(ARTIFACTS_DIR)
            .join(checked_key(session.as_str())?))
    }

    /// Write data to a unique temp sibling, fsync, then rename into place.
    async fn write_atomic(path: &Path, data: &Bytes) -> StoreResult<()> {
        let temp_path = temp_sibling(path);
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            // Ensure data is flushed to disk before rename
            file.sync_all().await?;
        }
        fs::rename(&temp_path, path).await?;
        Ok(())
    }
}

/// Reject any session key that is not a single plain path component.
///
/// Catches separators, `..`, absolute paths, and `.`-prefixed names (which
/// would collide with the temp-file namespace) even when the key did not
/// come through the usual parsing path.
fn checked_key(key: &str) -> StoreResult<&str> {
    if key.is_empty() || key.starts_with('.') || key.contains('\\') {
        return Err(StoreError::InvalidKey(format!(
            "unsafe session key: {key}"
        )));
    }
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(key),
        _ => Err(StoreError::InvalidKey(format!(
            "session key is not a single path component: {key}"
        ))),
    }
}

/// Build a uniquely named temp path next to the final path, so the rename
/// stays within one filesystem and concurrent writers never collide.
fn temp_sibling(path: &Path) -> PathBuf {
    let temp_name = format!(".tmp.{}", Uuid::new_v4());
    path.with_file_name(
        path.file_name()
            .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
            .unwrap_or_else(|| temp_name.clone()),
    )
}

/// Map NotFound IO errors to `StoreError::NotFound` for the given key.
fn not_found_as(key: String) -> impl FnOnce(std::io::Error) -> StoreError {
    move |e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(key)
        } else {
            StoreError::Io(e)
        }
    }
}

#[async_trait]
impl ChunkStore for FilesystemStore {
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put_chunk(&self, session: &SessionId, index: u32, data: Bytes) -> StoreResult<()> {
        let path = self.chunk_path(session, index)?;
        fs::create_dir_all(self.session_dir(session)?).await?;
        Self::write_atomic(&path, &data).await
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_chunk(&self, session: &SessionId, index: u32) -> StoreResult<Bytes> {
        let path = self.chunk_path(session, index)?;
        let data = fs::read(&path)
            .await
            .map_err(not_found_as(format!("{session}/{index}")))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn remove_chunk(&self, session: &SessionId, index: u32) -> StoreResult<()> {
        let path = self.chunk_path(session, index)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn remove_session(&self, session: &SessionId) -> StoreResult<u64> {
        let dir = self.session_dir(session)?;

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut removed = 0u64;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                removed += 1;
            }
        }

        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(removed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(removed),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn open_artifact(&self, session: &SessionId) -> StoreResult<Box<dyn ArtifactSink>> {
        let final_path = self.artifact_path(session)?;
        let temp_path = temp_sibling(&final_path);
        let file = fs::File::create(&temp_path).await?;

        Ok(Box::new(FilesystemArtifact {
            file,
            temp_path,
            final_path,
            bytes_written: 0,
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn remove_artifact(&self, session: &SessionId) -> StoreResult<()> {
        let path = self.artifact_path(session)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn artifact_exists(&self, session: &SessionId) -> StoreResult<bool> {
        let path = self.artifact_path(session)?;
        fs::try_exists(&path).await.map_err(StoreError::Io)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StoreResult<()> {
        for dir in [self.root.join(CHUNKS_DIR), self.root.join(ARTIFACTS_DIR)] {
            let metadata = fs::metadata(&dir).await.map_err(|e| {
                StoreError::Io(std::io::Error::new(
                    e.kind(),
                    format!("storage directory not accessible: {e}"),
                ))
            })?;
            if !metadata.is_dir() {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    format!("storage path is not a directory: {dir:?}"),
                )));
            }
        }
        Ok(())
    }
}

/// Streaming artifact sink writing through a temp file.
struct FilesystemArtifact {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

#[async_trait]
impl ArtifactSink for FilesystemArtifact {
    async fn write(&mut self, data: Bytes) -> StoreResult<()> {
        self.file.write_all(&data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> StoreResult<u64> {
        // Flush to disk before the rename publishes the artifact
        self.file.sync_all().await?;
        drop(self.file);
        fs::rename(&self.temp_path, &self.final_path).await?;
        Ok(self.bytes_written)
    }

    async fn abort(self: Box<Self>) -> StoreResult<()> {
        drop(self.file);
        let _ = fs::remove_file(&self.temp_path).await;
        Ok(())
    }
}
