use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use wayfare_core::{CacheBackend, CacheEntry, CacheLookup, WayfareError};

/// In-process cache storage.
///
/// Rows are kept in insertion order and duplicates are allowed, mirroring a
/// plain table without a unique constraint on the lookup key.
pub struct InMemoryBackend {
    entries: RwLock<Vec<CacheEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored rows, including expired rows not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Copy of every stored row.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().await.clone()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn find_valid(
        &self,
        lookup: &CacheLookup,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, WayfareError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.matches(lookup) && !e.is_expired_at(now))
            .max_by_key(|e| e.created_at)
            .cloned())
    }

    async fn insert(&self, entry: &CacheEntry) -> Result<(), WayfareError> {
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, WayfareError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !e.is_expired_at(now));
        Ok((before - entries.len()) as u64)
    }

    async fn delete_scope(&self, scope: Option<&str>) -> Result<u64, WayfareError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.scope.as_deref() != scope);
        Ok((before - entries.len()) as u64)
    }
}
