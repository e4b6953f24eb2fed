//! Row store backends.
//!
//! A backend holds the single row store that links a spreadsheet upload to the
//! later preview and submit steps.
//!
//! `FileRowStore` keeps it in one file at a fixed path. It is not
//! multi-tenant: a second ingest overwrites the file, and nothing locks it
//! between an ingest and a submit. Callers must serialize those operations.
//! The daemon uses the session cache in [`crate::session`] instead.

use crate::error::StoreError;
use crate::row_store::RowStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage for the row store handed from ingestion to orchestration.
#[async_trait]
pub trait RowStoreBackend: Send + Sync {
    /// Discard any persisted rows and leave an empty store in place.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Persist `store`, replacing whatever was there.
    async fn save(&self, store: &RowStore) -> Result<(), StoreError>;

    /// Load the persisted store. `Ok(None)` when nothing is persisted.
    async fn load(&self) -> Result<Option<RowStore>, StoreError>;

    /// Delete the persisted store.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Row store persisted as INI text at a fixed path.
#[derive(Debug, Clone)]
pub struct FileRowStore {
    path: PathBuf,
}

impl FileRowStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RowStoreBackend for FileRowStore {
    async fn reset(&self) -> Result<(), StoreError> {
        self.ensure_parent().await?;
        self.clear().await?;
        tokio::fs::write(&self.path, "").await?;
        debug!("Row store reset at {}", self.path.display());
        Ok(())
    }

    async fn save(&self, store: &RowStore) -> Result<(), StoreError> {
        self.ensure_parent().await?;
        tokio::fs::write(&self.path, store.encode()).await?;
        info!("Saved {} row(s) to {}", store.len(), self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<RowStore>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let store = RowStore::decode(&text)?;
        debug!("Loaded {} row(s) from {}", store.len(), self.path.display());
        Ok(Some(store))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_store::Row;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileRowStore {
        FileRowStore::new(dir.path().join("nested").join("rows.ini"))
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let backend = store_in(&dir);
        let mut store = RowStore::new();
        store.insert(2, Row::from_pairs([("a", "Maria")]));

        backend.save(&store).await.unwrap();
        assert_eq!(backend.load().await.unwrap(), Some(store));
    }

    #[tokio::test]
    async fn test_reset_discards_previous_rows() {
        let dir = TempDir::new().unwrap();
        let backend = store_in(&dir);
        let mut store = RowStore::new();
        store.insert(1, Row::from_pairs([("a", "stale")]));
        backend.save(&store).await.unwrap();

        backend.reset().await.unwrap();
        let loaded = backend.load().await.unwrap().unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let backend = store_in(&dir);
        backend.reset().await.unwrap();
        backend.clear().await.unwrap();
        backend.clear().await.unwrap();
        assert!(!backend.path().exists());
    }

    #[tokio::test]
    async fn test_load_reports_format_errors() {
        let dir = TempDir::new().unwrap();
        let backend = store_in(&dir);
        backend.reset().await.unwrap();
        tokio::fs::write(backend.path(), "a = orphan\n").await.unwrap();
        assert!(matches!(backend.load().await, Err(StoreError::Format(_))));
    }
}
