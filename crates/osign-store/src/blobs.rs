//! In-memory `BlobStore`.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use osign_contracts::error::{OsignError, OsignResult};
use osign_core::traits::BlobStore;

#[derive(Default)]
struct Objects {
    bytes: HashMap<String, Vec<u8>>,
    /// Upload count per path, including overwrites.
    uploads: HashMap<String, usize>,
}

/// Object storage in a map, with a switch to simulate an outage.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<Objects>,
    unavailable: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `Blob`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// How many times `path` was written.
    pub async fn upload_count(&self, path: &str) -> usize {
        self.objects.lock().await.uploads.get(path).copied().unwrap_or(0)
    }

    /// Paths currently stored, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().await.bytes.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn check_available(&self) -> OsignResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OsignError::Blob {
                reason: "blob store unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> OsignResult<()> {
        self.check_available()?;
        let mut objects = self.objects.lock().await;
        objects.bytes.insert(path.to_string(), bytes);
        *objects.uploads.entry(path.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn download(&self, path: &str) -> OsignResult<Option<Vec<u8>>> {
        self.check_available()?;
        Ok(self.objects.lock().await.bytes.get(path).cloned())
    }

    async fn exists(&self, path: &str) -> OsignResult<bool> {
        self.check_available()?;
        Ok(self.objects.lock().await.bytes.contains_key(path))
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> OsignResult<Option<String>> {
        self.check_available()?;
        if !self.objects.lock().await.bytes.contains_key(path) {
            return Ok(None);
        }
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(Some(format!("memory://{}?expires={}", path, expires)))
    }

    async fn remove(&self, path: &str) -> OsignResult<bool> {
        self.check_available()?;
        Ok(self.objects.lock().await.bytes.remove(path).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_overwrites_and_counts() {
        let blobs = InMemoryBlobStore::new();
        blobs.upload("a/b.pdf", b"one".to_vec()).await.unwrap();
        blobs.upload("a/b.pdf", b"two".to_vec()).await.unwrap();

        assert_eq!(blobs.download("a/b.pdf").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(blobs.upload_count("a/b.pdf").await, 2);
        assert_eq!(blobs.paths().await, vec!["a/b.pdf".to_string()]);
    }

    #[tokio::test]
    async fn missing_objects_are_not_errors() {
        let blobs = InMemoryBlobStore::new();
        assert_eq!(blobs.download("nope").await.unwrap(), None);
        assert!(!blobs.exists("nope").await.unwrap());
        assert_eq!(blobs.signed_url("nope", Duration::from_secs(60)).await.unwrap(), None);
        assert!(!blobs.remove("nope").await.unwrap());
    }

    #[tokio::test]
    async fn signed_url_names_the_path() {
        let blobs = InMemoryBlobStore::new();
        blobs.upload("orders/1/x.pdf", vec![1]).await.unwrap();
        let url = blobs
            .signed_url("orders/1/x.pdf", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        assert!(url.starts_with("memory://orders/1/x.pdf?expires="));
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let blobs = InMemoryBlobStore::new();
        blobs.set_unavailable(true);
        assert!(matches!(blobs.upload("x", vec![]).await, Err(OsignError::Blob { .. })));
        assert!(blobs.download("x").await.is_err());
        blobs.set_unavailable(false);
        assert!(blobs.upload("x", vec![]).await.is_ok());
    }
}
