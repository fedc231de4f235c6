//! Bulk create, update and delete over entity collections.
//!
//! - `processor`: chunked, concurrency-bounded execution ([`BatchProcessor`])
//! - `types`: options, effective configuration and results
//! - `resource_guard`: registry of running operations for cancellation
//! - `handler`: the [`BulkOperations`] orchestrator and error mapping

pub mod handler;
pub mod processor;
pub mod resource_guard;
pub mod types;

pub use handler::{BulkOperations, map_bulk_error};
pub use processor::{
    BatchConfig, BatchError, BatchProcessor, BatchProgress, BatchResult, ProgressCallback,
};
pub use resource_guard::{ActiveOperations, OperationGuard};
pub use types::{
    BulkCallOptions, BulkOperationConfig, BulkOperationError, BulkOperationResult,
    CreateManyOptions, DeleteManyOptions, MemoryUsage, Screening, UpdateManyOptions,
};
