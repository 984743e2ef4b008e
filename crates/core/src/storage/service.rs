//! Document store backed by Apache OpenDAL.

use opendal::{services, ErrorKind, Operator};
use uuid::Uuid;

use super::error::StorageError;

/// Filesystem store for receipts, AMLO PDFs, and EOD summaries.
///
/// Writes are atomic: content lands in a sibling temp key first and is
/// renamed over the final key, so a concurrent reader never observes a
/// half-written PDF.
pub struct DocumentStore {
    operator: Operator,
}

impl DocumentStore {
    /// Opens a store rooted at the given directory.
    pub fn open(root: &str) -> Result<Self, StorageError> {
        let builder = services::Fs::default().root(root);
        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();
        Ok(Self { operator })
    }

    /// Writes `bytes` to `key` atomically, overwriting any previous file.
    pub async fn write_atomic(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let temp_key = format!("{key}.{}.tmp", Uuid::now_v7());
        self.operator.write(&temp_key, bytes).await?;
        match self.operator.rename(&temp_key, key).await {
            Ok(()) => {
                tracing::debug!(key, "document written");
                Ok(())
            }
            Err(err) => {
                // Leave no temp file behind on a failed rename.
                let _ = self.operator.delete(&temp_key).await;
                Err(err.into())
            }
        }
    }

    /// Reads the full content at `key`.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let buffer = self.operator.read(key).await?;
        Ok(buffer.to_vec())
    }

    /// True when a file exists at `key`.
    pub async fn exists(&self, key: &str) -> bool {
        match self.operator.stat(key).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(_) => false,
        }
    }

    /// Deletes the file at `key`.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().to_str().unwrap()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let (_dir, store) = temp_store();
        store
            .write_atomic("receipts/2026/08/T1.pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap();
        assert_eq!(store.read("receipts/2026/08/T1.pdf").await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let (_dir, store) = temp_store();
        store.write_atomic("a.pdf", b"one".to_vec()).await.unwrap();
        store.write_atomic("a.pdf", b"two".to_vec()).await.unwrap();
        assert_eq!(store.read("a.pdf").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (_dir, store) = temp_store();
        assert!(!store.exists("missing.pdf").await);
        store.write_atomic("x.pdf", b"x".to_vec()).await.unwrap();
        assert!(store.exists("x.pdf").await);
        store.delete("x.pdf").await.unwrap();
        assert!(!store.exists("x.pdf").await);
    }
}
