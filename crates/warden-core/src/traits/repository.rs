//! Generic repository trait for entity storage.

use async_trait::async_trait;

use crate::result::AppResult;

/// An entity with a stable primary key.
pub trait Identifiable {
    /// The primary key type.
    type Id: Clone + Eq + std::hash::Hash + Send + Sync + 'static;

    /// Returns the entity's primary key.
    fn id(&self) -> Self::Id;
}

/// Generic storage repository.
///
/// Handlers and services receive a repository through injection rather than
/// importing shared module state. Entity-specific queries live on the
/// concrete repository structs.
#[async_trait]
pub trait Repository<Entity>: Send + Sync + 'static
where
    Entity: Identifiable + Clone + Send + Sync + 'static,
{
    /// Find an entity by its primary key.
    async fn get(&self, id: &Entity::Id) -> AppResult<Option<Entity>>;

    /// List every stored entity.
    async fn list(&self) -> AppResult<Vec<Entity>>;

    /// Insert or replace an entity, returning the stored value.
    async fn put(&self, entity: Entity) -> AppResult<Entity>;

    /// Delete an entity by its primary key, returning it if it existed.
    async fn delete(&self, id: &Entity::Id) -> AppResult<Option<Entity>>;
}
