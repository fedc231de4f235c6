//! In-memory entity operations shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dataapi::bulk_operations::BulkOperations;
use dataapi::common::{DataApiError, DataApiResult, RetryExecutor};
use dataapi::config::BulkDefaults;
use dataapi::entities::{EntityMapper, EntityOperations};
use dataapi::model::{ModelType, Record, Where, matches_where, merge_records, record_field, record_id};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

/// Entity store with per-operation failure injection.
pub struct MemoryStore {
    model: ModelType,
    records: Mutex<Vec<Record>>,
    next_id: AtomicUsize,
    pub fail_update_ids: Mutex<Vec<String>>,
    pub fail_delete_ids: Mutex<Vec<String>>,
    /// `find_many` fails when the filter contains this field/value pair
    pub fail_find_on: Mutex<Option<(String, Value)>>,
    /// `find_many` sleeps this long when the filter contains the field
    pub slow_find_on: Mutex<Option<(String, Duration)>>,
    pub fail_natural_key_lookups: Mutex<bool>,
    pub create_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(model: ModelType, records: Vec<Record>) -> Arc<Self> {
        Arc::new(Self {
            model,
            records: Mutex::new(records),
            next_id: AtomicUsize::new(1),
            fail_update_ids: Mutex::new(Vec::new()),
            fail_delete_ids: Mutex::new(Vec::new()),
            fail_find_on: Mutex::new(None),
            slow_find_on: Mutex::new(None),
            fail_natural_key_lookups: Mutex::new(false),
            create_calls: AtomicUsize::new(0),
        })
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records().iter().filter_map(record_id).collect()
    }

    fn key_field(&self) -> &'static str {
        match self.model {
            ModelType::VerificationToken => "token",
            _ => "id",
        }
    }
}

#[async_trait]
impl EntityOperations for MemoryStore {
    fn model(&self) -> ModelType {
        self.model.clone()
    }

    async fn find_by_id(&self, id: &str) -> DataApiResult<Option<Record>> {
        Ok(self
            .records()
            .into_iter()
            .find(|r| record_id(r).as_deref() == Some(id)))
    }

    async fn find_by_natural_key(&self, key: &str) -> DataApiResult<Option<Record>> {
        if *self.fail_natural_key_lookups.lock().unwrap() {
            return Err(DataApiError::network("ECONNREFUSED while probing"));
        }
        let field = self.model.natural_key().unwrap_or("id");
        Ok(self
            .records()
            .into_iter()
            .find(|r| record_field(r, field).as_deref() == Some(key)))
    }

    async fn find_many(&self, filter: &Where) -> DataApiResult<Vec<Record>> {
        let delay = self
            .slow_find_on
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(field, _)| filter.contains_key(field))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((field, value)) = self.fail_find_on.lock().unwrap().as_ref() {
            if filter.get(field) == Some(value) {
                return Err(DataApiError::from_status(503, "lookup unavailable"));
            }
        }
        Ok(self
            .records()
            .into_iter()
            .filter(|r| matches_where(r, filter))
            .collect())
    }

    async fn create(&self, data: Record) -> DataApiResult<Record> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut created = data;
        if !created.contains_key("id") {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            created.insert("id".to_string(), Value::String(format!("gen-{id}")));
        }
        self.records.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &Record) -> DataApiResult<Record> {
        if self.fail_update_ids.lock().unwrap().iter().any(|f| f == id) {
            return Err(DataApiError::from_status(500, "internal server error"));
        }
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| record_id(r).as_deref() == Some(id))
            .ok_or_else(|| DataApiError::from_status(404, format!("{id} not found")))?;
        *existing = merge_records(existing, patch);
        Ok(existing.clone())
    }

    async fn delete(&self, id: &str) -> DataApiResult<()> {
        if self.fail_delete_ids.lock().unwrap().iter().any(|f| f == id) {
            return Err(DataApiError::from_status(409, "record is locked"));
        }
        let field = self.key_field();
        self.records
            .lock()
            .unwrap()
            .retain(|r| record_field(r, field).as_deref() != Some(id));
        Ok(())
    }
}

pub fn bulk_with(defaults: BulkDefaults) -> BulkOperations {
    BulkOperations::new(
        Arc::new(EntityMapper::default()),
        RetryExecutor::default(),
        defaults,
    )
}

pub fn users(count: usize) -> Vec<Record> {
    (1..=count)
        .map(|i| {
            record(serde_json::json!({
                "id": format!("u{i}"),
                "email": format!("user{i}@example.com"),
                "emailVerified": false
            }))
        })
        .collect()
}
