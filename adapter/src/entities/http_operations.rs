use super::mapper::EntityMapper;
use super::normalizer::{normalize_array_response, normalize_single_response};
use super::operations::EntityOperations;
use crate::common::{DataApiError, DataApiResult, ErrorKind};
use crate::http::{SharedTransport, resource_url, with_query};
use crate::model::{ModelType, Record, Where, where_eq};
use async_trait::async_trait;
use std::sync::Arc;

/// [`EntityOperations`] for any model, speaking plain REST against
/// `{base_url}/{api_path}[/{id}]`.
pub struct HttpEntityOperations {
    model: ModelType,
    base_url: String,
    transport: SharedTransport,
    mapper: Arc<EntityMapper>,
}

impl HttpEntityOperations {
    pub fn new(
        model: ModelType,
        base_url: impl Into<String>,
        transport: SharedTransport,
        mapper: Arc<EntityMapper>,
    ) -> Self {
        Self {
            model,
            base_url: base_url.into(),
            transport,
            mapper,
        }
    }

    fn url(&self, id: Option<&str>) -> String {
        resource_url(&self.base_url, &self.mapper.api_path(&self.model), id)
    }

    fn single(&self, body: &serde_json::Value, operation: &str) -> DataApiResult<Record> {
        normalize_single_response(body)
            .map(|record| self.mapper.transform_inbound(&self.model, &record))
            .ok_or_else(|| {
                DataApiError::unknown(format!(
                    "Empty response from {operation} on {}",
                    self.model
                ))
                .with_operation(operation)
            })
    }
}

#[async_trait]
impl EntityOperations for HttpEntityOperations {
    fn model(&self) -> ModelType {
        self.model.clone()
    }

    async fn find_by_id(&self, id: &str) -> DataApiResult<Option<Record>> {
        match self.transport.get(&self.url(Some(id))).await {
            Ok(response) => Ok(normalize_single_response(&response.body)
                .map(|record| self.mapper.transform_inbound(&self.model, &record))),
            Err(e) if e.kind == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.with_operation("findById")),
        }
    }

    async fn find_by_natural_key(&self, key: &str) -> DataApiResult<Option<Record>> {
        let Some(field) = self.model.natural_key() else {
            return self.find_by_id(key).await;
        };

        let mut matches = self.find_many(&where_eq(field, key)).await?;
        // Some APIs ignore unknown filters; keep only exact matches
        matches.retain(|record| record.get(field).and_then(|v| v.as_str()) == Some(key));
        Ok(matches.into_iter().next())
    }

    async fn find_many(&self, filter: &Where) -> DataApiResult<Vec<Record>> {
        let api_filter = self.mapper.transform_filter(&self.model, filter);
        let url = with_query(&self.url(None), &api_filter);

        match self.transport.get(&url).await {
            Ok(response) => Ok(normalize_array_response(&response.body)
                .iter()
                .map(|record| self.mapper.transform_inbound(&self.model, record))
                .collect()),
            Err(e) if e.kind == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.with_operation("findMany")),
        }
    }

    async fn create(&self, data: Record) -> DataApiResult<Record> {
        let payload = self.mapper.transform_outbound(&self.model, &data);
        let response = self
            .transport
            .post(&self.url(None), payload)
            .await
            .map_err(|e| e.with_operation("create"))?;
        self.single(&response.body, "create")
    }

    async fn update(&self, id: &str, patch: &Record) -> DataApiResult<Record> {
        let payload = self.mapper.transform_outbound(&self.model, patch);
        let response = self
            .transport
            .patch(&self.url(Some(id)), payload)
            .await
            .map_err(|e| e.with_operation("update"))?;
        self.single(&response.body, "update")
    }

    async fn delete(&self, id: &str) -> DataApiResult<()> {
        self.transport
            .delete(&self.url(Some(id)))
            .await
            .map_err(|e| e.with_operation("delete"))?;
        Ok(())
    }
}
