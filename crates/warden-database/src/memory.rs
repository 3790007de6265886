//! Generic in-memory entity store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use warden_core::result::AppResult;
use warden_core::traits::{Identifiable, Repository};
use warden_core::AppError;

/// Keyed entity map shared behind an async reader/writer lock.
pub struct MemoryStore<E: Identifiable> {
    entries: Arc<RwLock<HashMap<E::Id, E>>>,
}

impl<E: Identifiable> fmt::Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl<E: Identifiable> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<E: Identifiable> Default for MemoryStore<E> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<E> MemoryStore<E>
where
    E: Identifiable + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// First entity matching `predicate`.
    pub async fn find(&self, predicate: impl Fn(&E) -> bool) -> Option<E> {
        self.entries
            .read()
            .await
            .values()
            .find(|e| predicate(e))
            .cloned()
    }

    /// Store `entity` unless `conflict` reports a clash with another stored
    /// entity. The check and the write happen under one lock.
    ///
    /// `conflict(existing, candidate)` returns a message describing the
    /// clash. The entity being replaced (same id) is never checked.
    pub async fn put_unique<F>(&self, entity: E, conflict: F) -> AppResult<E>
    where
        F: Fn(&E, &E) -> Option<String>,
    {
        let mut entries = self.entries.write().await;
        let id = entity.id();
        if let Some(message) = entries
            .values()
            .filter(|existing| existing.id() != id)
            .find_map(|existing| conflict(existing, &entity))
        {
            debug!(reason = %message, "Rejected conflicting write");
            return Err(AppError::conflict(message));
        }
        entries.insert(id, entity.clone());
        Ok(entity)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<E> Repository<E> for MemoryStore<E>
where
    E: Identifiable + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &E::Id) -> AppResult<Option<E>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<E>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn put(&self, entity: E) -> AppResult<E> {
        self.entries
            .write()
            .await
            .insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &E::Id) -> AppResult<Option<E>> {
        Ok(self.entries.write().await.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ErrorKind;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    impl Identifiable for Item {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn item(id: u32, name: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
        }
    }

    fn same_name(existing: &Item, candidate: &Item) -> Option<String> {
        (existing.name == candidate.name).then(|| format!("name '{}' taken", candidate.name))
    }

    #[tokio::test]
    async fn test_crud() {
        let store: MemoryStore<Item> = MemoryStore::new();
        store.put(item(1, "a")).await.unwrap();
        assert_eq!(store.get(&1).await.unwrap(), Some(item(1, "a")));
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.delete(&1).await.unwrap(), Some(item(1, "a")));
        assert!(store.get(&1).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_unique_rejects_clash() {
        let store: MemoryStore<Item> = MemoryStore::new();
        store.put_unique(item(1, "a"), same_name).await.unwrap();
        let err = store.put_unique(item(2, "a"), same_name).await.unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_unique_allows_replacing_self() {
        let store: MemoryStore<Item> = MemoryStore::new();
        store.put_unique(item(1, "a"), same_name).await.unwrap();
        store.put_unique(item(1, "a"), same_name).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store: MemoryStore<Item> = MemoryStore::new();
        let other = store.clone();
        store.put(item(7, "x")).await.unwrap();
        assert!(other.find(|i: &Item| i.name == "x").await.is_some());
    }
}
