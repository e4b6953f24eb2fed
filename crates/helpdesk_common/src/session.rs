//! Session-scoped row stores with expiry.
//!
//! Each upload session owns its own row store, held in memory under a UUID.
//! Entries older than the TTL read as absent and are dropped by
//! [`SessionCache::purge_expired`]. Sessions are isolated from each other;
//! operations on the same session are last-write-wins.

use crate::backend::RowStoreBackend;
use crate::error::StoreError;
use crate::row_store::RowStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

pub type SessionId = Uuid;

struct Entry {
    store: RowStore,
    touched: Instant,
}

/// Keyed, lock-guarded table of row stores.
pub struct SessionCache {
    entries: RwLock<HashMap<SessionId, Entry>>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a new session holding an empty store.
    pub async fn create(&self) -> SessionId {
        let id = Uuid::new_v4();
        self.put(id, RowStore::new()).await;
        debug!("Session {} created", id);
        id
    }

    /// Backend view of one session.
    pub fn slot(self: &Arc<Self>, id: SessionId) -> SessionSlot {
        SessionSlot {
            cache: Arc::clone(self),
            id,
        }
    }

    /// Whether the session exists and has not expired.
    pub async fn contains(&self, id: SessionId) -> bool {
        let entries = self.entries.read().await;
        entries.get(&id).is_some_and(|e| !self.expired(e))
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: SessionId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    /// Number of live sessions.
    pub async fn active(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !self.expired(e)).count()
    }

    /// Remove expired sessions, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, e| e.touched.elapsed() < ttl);
        let dropped = before - entries.len();
        if dropped > 0 {
            info!("Purged {} expired session(s)", dropped);
        }
        dropped
    }

    async fn put(&self, id: SessionId, store: RowStore) {
        self.entries.write().await.insert(
            id,
            Entry {
                store,
                touched: Instant::now(),
            },
        );
    }

    async fn get(&self, id: SessionId) -> Option<RowStore> {
        let entries = self.entries.read().await;
        entries
            .get(&id)
            .filter(|e| !self.expired(e))
            .map(|e| e.store.clone())
    }

    fn expired(&self, entry: &Entry) -> bool {
        entry.touched.elapsed() >= self.ttl
    }
}

/// One session's row store, usable wherever a [`RowStoreBackend`] is needed.
#[derive(Clone)]
pub struct SessionSlot {
    cache: Arc<SessionCache>,
    id: SessionId,
}

impl SessionSlot {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

#[async_trait]
impl RowStoreBackend for SessionSlot {
    async fn reset(&self) -> Result<(), StoreError> {
        self.cache.put(self.id, RowStore::new()).await;
        Ok(())
    }

    async fn save(&self, store: &RowStore) -> Result<(), StoreError> {
        self.cache.put(self.id, store.clone()).await;
        debug!("Session {} holds {} row(s)", self.id, store.len());
        Ok(())
    }

    async fn load(&self) -> Result<Option<RowStore>, StoreError> {
        Ok(self.cache.get(self.id).await)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.cache.remove(self.id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_store::Row;

    fn one_row() -> RowStore {
        let mut store = RowStore::new();
        store.insert(2, Row::from_pairs([("a", "Maria")]));
        store
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let cache = Arc::new(SessionCache::new(Duration::from_secs(60)));
        let first = cache.slot(cache.create().await);
        let second = cache.slot(cache.create().await);

        first.save(&one_row()).await.unwrap();

        assert_eq!(first.load().await.unwrap(), Some(one_row()));
        assert_eq!(second.load().await.unwrap(), Some(RowStore::new()));
        assert_eq!(cache.active().await, 2);
    }

    #[tokio::test]
    async fn test_clear_removes_session() {
        let cache = Arc::new(SessionCache::new(Duration::from_secs(60)));
        let slot = cache.slot(cache.create().await);
        slot.save(&one_row()).await.unwrap();

        slot.clear().await.unwrap();
        assert!(slot.load().await.unwrap().is_none());
        assert!(!cache.contains(slot.id()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_sessions_read_as_absent() {
        let cache = Arc::new(SessionCache::new(Duration::from_secs(30)));
        let slot = cache.slot(cache.create().await);
        slot.save(&one_row()).await.unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(slot.load().await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(slot.load().await.unwrap().is_none());
        assert_eq!(cache.active().await, 0);
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_refreshes_expiry() {
        let cache = Arc::new(SessionCache::new(Duration::from_secs(30)));
        let slot = cache.slot(cache.create().await);

        tokio::time::advance(Duration::from_secs(20)).await;
        slot.save(&one_row()).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert!(slot.load().await.unwrap().is_some());
    }
}
