//! Filesystem-backed object storage.
//!
//! Objects are written under `{root}/{key}` and exposed at
//! `{public_base_url}/{key}`; the HTTP server serves `root` under `/media`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::ports::ObjectStorage;
use crate::{Error, Result};

/// Object storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL for a key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key.trim_start_matches('/'))
    }

    /// Resolve a key to a path inside the root, rejecting traversal.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        let safe = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(Error::Validation(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, bytes: Bytes, key: &str, content_type: &str) -> Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage_write(key, e))?;
        }

        // Write to a sibling temp name first so readers never see partial files.
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::storage_write(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::storage_write(key, e))?;

        tracing::debug!(key, content_type, size = bytes.len(), "Stored object");
        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io { source: e }),
        }
    }
}
