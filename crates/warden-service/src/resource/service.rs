//! Free-form resource storage.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use warden_core::AppResult;
use warden_core::traits::Repository;
use warden_database::repositories::ResourceRepository;
use warden_entity::resource::Resource;

use crate::context::RequestContext;

#[derive(Debug, Clone)]
pub struct ResourceService {
    resource_repo: Arc<ResourceRepository>,
}

impl ResourceService {
    pub fn new(resource_repo: Arc<ResourceRepository>) -> Self {
        Self { resource_repo }
    }

    pub async fn list_resources(&self) -> AppResult<Vec<Resource>> {
        self.resource_repo.list().await
    }

    /// Store a resource stamped with a fresh id and the caller's username.
    pub async fn create_resource(
        &self,
        ctx: &RequestContext,
        attributes: Map<String, Value>,
    ) -> AppResult<Resource> {
        let resource = self
            .resource_repo
            .put(Resource::new(ctx.username.clone(), attributes))
            .await?;
        info!(resource_id = %resource.id, created_by = %resource.created_by, "Resource created");
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_create_stamps_creator() {
        let service = ResourceService::new(Arc::new(ResourceRepository::new()));
        let ctx = RequestContext::new(Uuid::new_v4(), "manager_user");
        let mut attrs = Map::new();
        attrs.insert("title".into(), Value::from("Q3 plan"));

        let created = service.create_resource(&ctx, attrs).await.unwrap();
        assert_eq!(created.created_by, "manager_user");
        assert_eq!(service.list_resources().await.unwrap().len(), 1);
    }
}
