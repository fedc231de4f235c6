//! Options, configuration and result types for bulk operations.

use super::processor::{BatchConfig, ProgressCallback};
use crate::common::{DataApiError, DataApiResult};
use crate::config::BulkDefaults;
use crate::model::{ModelType, Record, Where};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BULK_BATCH_SIZE: usize = 50;
pub const DEFAULT_BULK_CONCURRENCY: usize = 3;
pub const DEFAULT_MEMORY_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

/// Effective settings for one bulk call.
///
/// Each field resolves as call override, then adapter default, then the
/// hard default.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperationConfig {
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub delay_between_batches: Duration,
    pub skip_failures: bool,
    pub enable_progress: bool,
    pub memory_threshold_bytes: u64,
}

impl Default for BulkOperationConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BULK_BATCH_SIZE,
            max_concurrency: DEFAULT_BULK_CONCURRENCY,
            delay_between_batches: Duration::ZERO,
            skip_failures: true,
            enable_progress: true,
            memory_threshold_bytes: DEFAULT_MEMORY_THRESHOLD_BYTES,
        }
    }
}

impl BulkOperationConfig {
    pub fn resolve(
        batch_size: Option<usize>,
        max_concurrency: Option<usize>,
        defaults: &BulkDefaults,
    ) -> Self {
        let hard = Self::default();
        Self {
            batch_size: batch_size
                .or(defaults.batch_size)
                .unwrap_or(hard.batch_size),
            max_concurrency: max_concurrency
                .or(defaults.max_concurrency)
                .unwrap_or(hard.max_concurrency),
            delay_between_batches: defaults
                .delay_between_batches
                .unwrap_or(hard.delay_between_batches),
            skip_failures: defaults.skip_failures.unwrap_or(hard.skip_failures),
            enable_progress: defaults.enable_progress.unwrap_or(hard.enable_progress),
            memory_threshold_bytes: defaults
                .memory_threshold_bytes
                .unwrap_or(hard.memory_threshold_bytes),
        }
    }

    /// # Errors
    ///
    /// A `VALIDATION_ERROR` when a zero batch size or concurrency was requested.
    pub fn batch_config(&self) -> DataApiResult<BatchConfig> {
        BatchConfig::new(
            self.batch_size,
            self.max_concurrency,
            self.delay_between_batches,
        )
    }
}

/// Estimated size of the payload returned to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub estimated_bytes: u64,
    pub threshold_bytes: u64,
    pub exceeded_threshold: bool,
}

impl MemoryUsage {
    pub fn estimate(records: Option<&[Record]>, threshold_bytes: u64) -> Self {
        let estimated_bytes = records
            .unwrap_or_default()
            .iter()
            .map(|record| {
                serde_json::to_vec(record)
                    .map(|bytes| bytes.len() as u64)
                    .unwrap_or_default()
            })
            .sum();

        Self {
            estimated_bytes,
            threshold_bytes,
            exceeded_threshold: estimated_bytes > threshold_bytes,
        }
    }
}

/// One failed item in a bulk call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationError {
    /// Position in the caller's input or in the resolved record set
    pub index: usize,
    pub item: Record,
    #[serde(serialize_with = "serialize_error")]
    pub error: DataApiError,
    pub retryable: bool,
    pub operation: String,
}

fn serialize_error<S: serde::Serializer>(
    error: &DataApiError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Outcome of a bulk call. `count == success + failures`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResult {
    pub count: usize,
    pub success: usize,
    pub failures: usize,
    /// Items dropped before processing by validation or duplicate screening
    pub skipped: usize,
    pub errors: Vec<BulkOperationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Record>>,
    pub duration: Duration,
    pub memory_usage: MemoryUsage,
    /// Remaining chunks were not attempted
    pub cancelled: bool,
}

impl BulkOperationResult {
    pub fn empty(duration: Duration) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures == 0 && !self.cancelled
    }

    /// Items of every retryable failure, ready for a second pass.
    pub fn retryable_items(&self) -> Vec<Record> {
        self.errors
            .iter()
            .filter(|e| e.retryable)
            .map(|e| e.item.clone())
            .collect()
    }
}

/// Per-candidate outcome of duplicate screening in `create_many`.
#[derive(Debug, Clone, PartialEq)]
pub enum Screening {
    /// Confirmed absent
    Include,
    Exclude { reason: String },
    /// The probe failed; the candidate is inserted anyway
    CheckFailed { error: DataApiError },
}

impl Screening {
    pub fn should_insert(&self) -> bool {
        !matches!(self, Screening::Exclude { .. })
    }
}

/// Call-site overrides shared by every bulk operation.
#[derive(Clone, Default)]
pub struct BulkCallOptions {
    pub batch_size: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub on_progress: Option<ProgressCallback>,
    /// Caller-chosen id usable with `cancel_operation`; generated when absent
    pub operation_id: Option<String>,
}

macro_rules! bulk_call_builders {
    ($options:ty) => {
        impl $options {
            pub fn with_batch_size(mut self, batch_size: usize) -> Self {
                self.call.batch_size = Some(batch_size);
                self
            }

            pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
                self.call.max_concurrency = Some(max_concurrency);
                self
            }

            pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
                self.call.on_progress = Some(on_progress);
                self
            }

            pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
                self.call.operation_id = Some(operation_id.into());
                self
            }
        }
    };
}

#[derive(Clone)]
pub struct UpdateManyOptions {
    pub model: ModelType,
    pub filter: Where,
    pub update: Record,
    pub return_results: bool,
    pub call: BulkCallOptions,
}

impl UpdateManyOptions {
    pub fn new(model: ModelType, filter: Where, update: Record) -> Self {
        Self {
            model,
            filter,
            update,
            return_results: false,
            call: BulkCallOptions::default(),
        }
    }

    pub fn with_return_results(mut self, return_results: bool) -> Self {
        self.return_results = return_results;
        self
    }
}

#[derive(Clone)]
pub struct DeleteManyOptions {
    pub model: ModelType,
    pub filter: Where,
    /// Delete each matched user's sessions first
    pub cascade_delete: bool,
    pub return_deleted: bool,
    pub call: BulkCallOptions,
}

impl DeleteManyOptions {
    pub fn new(model: ModelType, filter: Where) -> Self {
        Self {
            model,
            filter,
            cascade_delete: false,
            return_deleted: false,
            call: BulkCallOptions::default(),
        }
    }

    pub fn with_cascade_delete(mut self, cascade_delete: bool) -> Self {
        self.cascade_delete = cascade_delete;
        self
    }

    pub fn with_return_deleted(mut self, return_deleted: bool) -> Self {
        self.return_deleted = return_deleted;
        self
    }
}

#[derive(Clone)]
pub struct CreateManyOptions {
    pub model: ModelType,
    pub data: Vec<Record>,
    pub skip_duplicates: bool,
    pub validate_before_insert: bool,
    pub call: BulkCallOptions,
}

impl CreateManyOptions {
    pub fn new(model: ModelType, data: Vec<Record>) -> Self {
        Self {
            model,
            data,
            skip_duplicates: false,
            validate_before_insert: false,
            call: BulkCallOptions::default(),
        }
    }

    pub fn with_skip_duplicates(mut self, skip_duplicates: bool) -> Self {
        self.skip_duplicates = skip_duplicates;
        self
    }

    pub fn with_validate_before_insert(mut self, validate: bool) -> Self {
        self.validate_before_insert = validate;
        self
    }
}

bulk_call_builders!(UpdateManyOptions);
bulk_call_builders!(DeleteManyOptions);
bulk_call_builders!(CreateManyOptions);
