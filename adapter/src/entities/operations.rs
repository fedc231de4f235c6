use crate::common::DataApiResult;
use crate::model::{ModelType, Record, Where};
use async_trait::async_trait;
use std::sync::Arc;

/// Per-entity persistence operations consumed by the bulk orchestrator.
///
/// Each built-in model (user, session, verification token, account) gets one
/// handler. For verification tokens the identifier passed to `delete` is the
/// token value, since tokens are addressed by value rather than by id.
///
/// # Examples
///
/// ```no_run
/// use dataapi::entities::EntityOperations;
/// use dataapi::model::where_eq;
///
/// async fn sessions_for(ops: &dyn EntityOperations, user_id: &str) -> usize {
///     ops.count(&where_eq("userId", user_id)).await.unwrap_or(0)
/// }
/// ```
#[async_trait]
pub trait EntityOperations: Send + Sync {
    /// The model this handler serves.
    fn model(&self) -> ModelType;

    async fn find_by_id(&self, id: &str) -> DataApiResult<Option<Record>>;

    /// Looks a record up by its natural key (email, session token, token).
    async fn find_by_natural_key(&self, key: &str) -> DataApiResult<Option<Record>>;

    async fn find_many(&self, filter: &Where) -> DataApiResult<Vec<Record>>;

    async fn create(&self, data: Record) -> DataApiResult<Record>;

    async fn update(&self, id: &str, patch: &Record) -> DataApiResult<Record>;

    async fn delete(&self, id: &str) -> DataApiResult<()>;

    /// Counts matching records. The default fetches and counts them.
    async fn count(&self, filter: &Where) -> DataApiResult<usize> {
        Ok(self.find_many(filter).await?.len())
    }
}

pub type SharedEntityOperations = Arc<dyn EntityOperations>;
