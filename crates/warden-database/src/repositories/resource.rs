//! Resource repository.

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_core::traits::Repository;
use warden_entity::resource::Resource;

use crate::memory::MemoryStore;

#[derive(Debug, Clone, Default)]
pub struct ResourceRepository {
    store: MemoryStore<Resource>,
}

impl ResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<Resource> for ResourceRepository {
    async fn get(&self, id: &Uuid) -> AppResult<Option<Resource>> {
        self.store.get(id).await
    }

    /// Oldest first.
    async fn list(&self) -> AppResult<Vec<Resource>> {
        let mut resources = self.store.list().await?;
        resources.sort_by_key(|r| r.created_at);
        Ok(resources)
    }

    async fn put(&self, resource: Resource) -> AppResult<Resource> {
        self.store.put(resource).await
    }

    async fn delete(&self, id: &Uuid) -> AppResult<Option<Resource>> {
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    #[tokio::test]
    async fn test_put_and_list() {
        let repo = ResourceRepository::new();
        let mut attrs = Map::new();
        attrs.insert("name".into(), Value::from("report"));
        let stored = repo.put(Resource::new("manager_user", attrs)).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, stored.id);
        assert_eq!(all[0].created_by, "manager_user");
    }
}
