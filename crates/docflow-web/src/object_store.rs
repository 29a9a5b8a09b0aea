//! Object storage is an external collaborator with a contract only (spec
//! §1 Non-goals): files are opaque blobs referenced by a storage key. This
//! module defines that boundary trait plus a local-filesystem stand-in so
//! the ingest path has something real to call in tests and local dev; a
//! production deployment swaps in an S3/GCS-backed implementation without
//! touching `routes::upload`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Datelike;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object storage write failed: {0}")]
    Write(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` and returns the opaque key it can later be retrieved
    /// by. `filename` is used only to derive a human-legible suffix —
    /// callers must not assume anything about the key's shape.
    async fn put(&self, bytes: Bytes, filename: &str) -> Result<String, ObjectStoreError>;
}

/// Builds the `YYYY/<uuid>-<slug>.<ext>` storage key shape used throughout
/// spec §8 scenario S1.
pub fn storage_key_for(filename: &str) -> String {
    let year = chrono::Utc::now().year();
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext.to_lowercase()),
        None => (filename, String::new()),
    };
    let slug = slugify(stem);
    let id = Uuid::new_v4();
    if ext.is_empty() {
        format!("{year}/{id}-{slug}")
    } else {
        format!("{year}/{id}-{slug}.{ext}")
    }
}

fn slugify(s: &str) -> String {
    let slug: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "file".to_string()
    } else {
        slug
    }
}

/// Local-filesystem object store. Production deployments replace this with
/// a real object storage client; the trait boundary is what the core
/// depends on.
pub struct LocalObjectStore {
    base_dir: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bytes: Bytes, filename: &str) -> Result<String, ObjectStoreError> {
        let key = storage_key_for(filename);
        let path = self.base_dir.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ObjectStoreError::Write(err.to_string()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|err| ObjectStoreError::Write(err.to_string()))?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_matches_year_uuid_slug_ext_shape() {
        let key = storage_key_for("Roadmap.pdf");
        let year = chrono::Utc::now().year().to_string();
        assert!(key.starts_with(&format!("{year}/")));
        assert!(key.ends_with("-roadmap.pdf"));
    }

    #[test]
    fn slugify_strips_non_alphanumeric() {
        assert_eq!(slugify("Q3 Report (Final)!"), "q3-report--final");
    }

    #[tokio::test]
    async fn local_store_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let key = store
            .put(Bytes::from_static(b"hello"), "notes.txt")
            .await
            .unwrap();
        let path = dir.path().join(&key);
        assert_eq!(tokio::fs::read(path).await.unwrap(), b"hello");
    }
}
