//! Object storage access.
//!
//! The queue treats storage as opaque: download a source by URL, upload a
//! result under a key, propagate failures. The trait seam keeps the queue
//! testable against a filesystem-backed store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use recast_common::{RecastError, RecastResult};

/// Opaque object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `url` into the local file `dest`.
    async fn download(&self, url: &str, dest: &Path) -> RecastResult<()>;

    /// Upload `local` under `key`; returns the public reference.
    async fn upload(&self, local: &Path, key: &str) -> RecastResult<String>;
}

/// HTTP-backed store: GET for downloads, PUT under a base URL for uploads.
pub struct HttpStore {
    client: reqwest::Client,
    upload_base: String,
}

impl HttpStore {
    pub fn new(upload_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_base: upload_base.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn download(&self, url: &str, dest: &Path) -> RecastResult<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RecastError::storage(format!("GET {url} failed: {e}")))?;

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RecastError::storage(format!("Download of {url} interrupted: {e}")))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn upload(&self, local: &Path, key: &str) -> RecastResult<String> {
        let file = tokio::fs::File::open(local).await?;
        let length = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));

        let url = format!("{}/{}", self.upload_base.trim_end_matches('/'), key);
        self.client
            .put(&url)
            .header(reqwest::header::CONTENT_LENGTH, length)
            .body(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RecastError::storage(format!("PUT {url} failed: {e}")))?;

        Ok(url)
    }
}

/// Filesystem-backed store for local runs and tests. Downloads treat the
/// URL as a path (with an optional `file://` prefix); uploads copy under
/// the store root.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn download(&self, url: &str, dest: &Path) -> RecastResult<()> {
        let source = url.strip_prefix("file://").unwrap_or(url);
        tokio::fs::copy(source, dest)
            .await
            .map_err(|e| RecastError::storage(format!("Copy from {source} failed: {e}")))?;
        Ok(())
    }

    async fn upload(&self, local: &Path, key: &str) -> RecastResult<String> {
        let dest = self.root.join(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, &dest)
            .await
            .map_err(|e| RecastError::storage(format!("Copy to {} failed: {e}", dest.display())))?;
        Ok(format!("file://{}", dest.display()))
    }
}
