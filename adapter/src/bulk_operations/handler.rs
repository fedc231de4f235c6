use super::processor::{BatchError, BatchProcessor, BatchProgress, BatchResult, ProgressCallback};
use super::resource_guard::ActiveOperations;
use super::types::*;
use crate::common::{DataApiError, DataApiResult, ErrorKind, RetryExecutor};
use crate::config::BulkDefaults;
use crate::entities::{EntityMapper, EntityOperations, HttpEntityOperations, SharedEntityOperations};
use crate::http::SharedTransport;
use crate::model::{ModelType, Record, Where, merge_records, record_field, record_id, where_eq};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Generic REST route used for models without registered operations.
struct HttpFallback {
    base_url: String,
    transport: SharedTransport,
}

/// Whole-collection mutations built on [`BatchProcessor`].
///
/// Every call resolves its target set first; a failure there fails the whole
/// call. Once processing starts, per-record failures are collected into the
/// result and never abort the call.
///
/// # Examples
///
/// ```no_run
/// use dataapi::bulk_operations::{BulkOperations, UpdateManyOptions};
/// use dataapi::model::{ModelType, where_eq};
/// use serde_json::json;
///
/// # async fn run(bulk: BulkOperations) -> Result<(), dataapi::common::DataApiError> {
/// let update = json!({"emailVerified": true}).as_object().cloned().unwrap_or_default();
/// let result = bulk
///     .update_many(UpdateManyOptions::new(
///         ModelType::User,
///         where_eq("emailVerified", false),
///         update,
///     ))
///     .await?;
///
/// println!("{} of {} users updated", result.success, result.count);
/// # Ok(())
/// # }
/// ```
pub struct BulkOperations {
    operations: HashMap<ModelType, SharedEntityOperations>,
    fallback: Option<HttpFallback>,
    mapper: Arc<EntityMapper>,
    retry: RetryExecutor,
    defaults: BulkDefaults,
    active: ActiveOperations,
}

impl BulkOperations {
    pub fn new(mapper: Arc<EntityMapper>, retry: RetryExecutor, defaults: BulkDefaults) -> Self {
        Self {
            operations: HashMap::new(),
            fallback: None,
            mapper,
            retry,
            defaults,
            active: ActiveOperations::default(),
        }
    }

    /// Registers `operations` for the model it reports.
    pub fn with_operations(mut self, operations: SharedEntityOperations) -> Self {
        self.operations.insert(operations.model(), operations);
        self
    }

    pub fn with_user_operations(self, operations: SharedEntityOperations) -> Self {
        self.with_model_operations(ModelType::User, operations)
    }

    pub fn with_session_operations(self, operations: SharedEntityOperations) -> Self {
        self.with_model_operations(ModelType::Session, operations)
    }

    pub fn with_verification_token_operations(self, operations: SharedEntityOperations) -> Self {
        self.with_model_operations(ModelType::VerificationToken, operations)
    }

    fn with_model_operations(mut self, model: ModelType, operations: SharedEntityOperations) -> Self {
        self.operations.insert(model, operations);
        self
    }

    /// Routes models without registered operations to
    /// `{base_url}/{api_path}[/{id}]`.
    pub fn with_http_fallback(mut self, base_url: impl Into<String>, transport: SharedTransport) -> Self {
        self.fallback = Some(HttpFallback {
            base_url: base_url.into(),
            transport,
        });
        self
    }

    pub fn defaults(&self) -> &BulkDefaults {
        &self.defaults
    }

    /// Requests cancellation of a running bulk call. Chunks already in flight
    /// settle; later chunks are not started. Returns false for unknown ids.
    pub fn cancel_operation(&self, operation_id: &str) -> bool {
        self.active.cancel(operation_id)
    }

    pub fn is_operation_active(&self, operation_id: &str) -> bool {
        self.active.is_active(operation_id)
    }

    fn operations_for(&self, model: &ModelType) -> DataApiResult<SharedEntityOperations> {
        if let Some(operations) = self.operations.get(model) {
            return Ok(operations.clone());
        }

        match &self.fallback {
            Some(fallback) => Ok(Arc::new(HttpEntityOperations::new(
                model.clone(),
                fallback.base_url.clone(),
                fallback.transport.clone(),
                self.mapper.clone(),
            ))),
            None => Err(
                DataApiError::validation(format!("No operations available for model '{model}'"))
                    .permanent(),
            ),
        }
    }

    /// Resolves the records of `model` matching `filter`.
    ///
    /// # Errors
    ///
    /// Propagates the lookup failure, tagged with the model.
    pub async fn find_matching_records(
        &self,
        model: &ModelType,
        filter: &Where,
    ) -> DataApiResult<Vec<Record>> {
        let operations = self.operations_for(model)?;
        operations.find_many(filter).await.map_err(|e| {
            log::error!("Failed to resolve {model} records for bulk operation: {e}");
            e.context(format!("Failed to resolve {model} records"))
        })
    }

    /// Applies `options.update` to every record matching `options.filter`.
    ///
    /// # Errors
    ///
    /// Only when the batch settings are invalid or the matching records
    /// cannot be resolved.
    pub async fn update_many(&self, options: UpdateManyOptions) -> DataApiResult<BulkOperationResult> {
        const OPERATION: &str = "updateMany";
        let started = Instant::now();
        let config = self.resolve_config(&options.call);
        let guard = self.active.register(operation_id(&options.call));
        let model = &options.model;

        log::info!(
            "Starting bulk update on {model} (operation {})",
            guard.operation_id()
        );

        let operations = self.operations_for(model)?;
        let records = self.find_matching_records(model, &options.filter).await?;
        if records.is_empty() {
            log::info!("No {model} records matched for bulk update");
            return Ok(BulkOperationResult::empty(started.elapsed()));
        }

        let operations = operations.as_ref();
        let update = &options.update;
        let batch = self
            .run_batch(
                &config,
                records,
                |record: Record, _| async move {
                    update_record(operations, model, &record, update).await
                },
                options.call.on_progress.as_ref(),
                guard.token(),
            )
            .await?;

        Ok(self.assemble(OPERATION, batch, options.return_results, None, 0, &config, started))
    }

    /// Deletes every record matching `options.filter`.
    ///
    /// With `cascade_delete` on users, each user's sessions are deleted right
    /// before the user itself, inside the same batch item. Users left
    /// unprocessed by cancellation or a failure stop keep their sessions.
    /// Cascade failures are logged and never block the user deletion.
    ///
    /// # Errors
    ///
    /// Only when the batch settings are invalid or the matching records
    /// cannot be resolved.
    pub async fn delete_many(&self, options: DeleteManyOptions) -> DataApiResult<BulkOperationResult> {
        const OPERATION: &str = "deleteMany";
        let started = Instant::now();
        let config = self.resolve_config(&options.call);
        let guard = self.active.register(operation_id(&options.call));
        let model = &options.model;

        log::info!(
            "Starting bulk delete on {model} (operation {}, cascade: {})",
            guard.operation_id(),
            options.cascade_delete
        );

        let operations = self.operations_for(model)?;
        let records = self.find_matching_records(model, &options.filter).await?;
        if records.is_empty() {
            log::info!("No {model} records matched for bulk delete");
            return Ok(BulkOperationResult::empty(started.elapsed()));
        }

        let sessions = if *model == ModelType::User && options.cascade_delete {
            match self.operations_for(&ModelType::Session) {
                Ok(sessions) => Some(sessions),
                Err(e) => {
                    log::warn!("Skipping session cascade: {e}");
                    None
                }
            }
        } else {
            None
        };

        let operations = operations.as_ref();
        let sessions = sessions.as_deref();
        let cascade_config = &config;
        let batch = self
            .run_batch(
                &config,
                records,
                |record: Record, _| async move {
                    if let Some(sessions) = sessions {
                        self.cascade_sessions(sessions, &record, cascade_config).await;
                    }
                    delete_record(operations, model, &record).await?;
                    Ok(record)
                },
                options.call.on_progress.as_ref(),
                guard.token(),
            )
            .await?;

        Ok(self.assemble(OPERATION, batch, options.return_deleted, None, 0, &config, started))
    }

    /// Inserts `options.data`, optionally dropping invalid candidates and
    /// candidates whose natural key already exists. Created records are
    /// always returned.
    ///
    /// # Errors
    ///
    /// Only when the batch settings are invalid or the model has no route.
    pub async fn create_many(&self, options: CreateManyOptions) -> DataApiResult<BulkOperationResult> {
        const OPERATION: &str = "createMany";
        let started = Instant::now();
        let config = self.resolve_config(&options.call);
        let model = &options.model;

        if options.data.is_empty() {
            log::info!("No {model} records supplied for bulk create");
            return Ok(BulkOperationResult::empty(started.elapsed()));
        }

        let guard = self.active.register(operation_id(&options.call));
        let requested = options.data.len();
        log::info!(
            "Starting bulk create of {requested} {model} records (operation {})",
            guard.operation_id()
        );

        let operations = self.operations_for(model)?;
        let mut candidates: Vec<(usize, Record)> = options.data.into_iter().enumerate().collect();

        if options.validate_before_insert {
            candidates.retain(|(index, record)| {
                let outcome = self.mapper.validate(model, record);
                if !outcome.valid {
                    log::warn!(
                        "Skipping invalid {model} at index {index}: {}",
                        outcome.errors.join(", ")
                    );
                }
                outcome.valid
            });
        }

        if options.skip_duplicates {
            let mut unique = Vec::with_capacity(candidates.len());
            for (index, record) in candidates {
                match screen(operations.as_ref(), model, &record).await {
                    Screening::Include => unique.push((index, record)),
                    Screening::CheckFailed { error } => {
                        log::warn!(
                            "Duplicate check failed for {model} at index {index}, inserting anyway: {error}"
                        );
                        unique.push((index, record));
                    }
                    Screening::Exclude { reason } => {
                        log::info!("Skipping {model} at index {index}: {reason}");
                    }
                }
            }
            candidates = unique;
        }

        let skipped = requested - candidates.len();
        let (positions, records): (Vec<usize>, Vec<Record>) = candidates.into_iter().unzip();

        if records.is_empty() {
            log::info!("All {requested} {model} candidates were skipped");
            let mut result = BulkOperationResult::empty(started.elapsed());
            result.skipped = skipped;
            result.results = Some(Vec::new());
            return Ok(result);
        }

        let operations = operations.as_ref();
        let batch = self
            .run_batch(
                &config,
                records,
                |record: Record, _| operations.create(record),
                options.call.on_progress.as_ref(),
                guard.token(),
            )
            .await?;

        Ok(self.assemble(
            OPERATION,
            batch,
            true,
            Some(&positions),
            skipped,
            &config,
            started,
        ))
    }

    /// Probes for an existing record sharing the candidate's natural key.
    pub async fn screen_duplicate(&self, model: &ModelType, record: &Record) -> Screening {
        match self.operations_for(model) {
            Ok(operations) => screen(operations.as_ref(), model, record).await,
            Err(error) => Screening::CheckFailed { error },
        }
    }

    fn resolve_config(&self, call: &BulkCallOptions) -> BulkOperationConfig {
        BulkOperationConfig::resolve(call.batch_size, call.max_concurrency, &self.defaults)
    }

    async fn run_batch<F, Fut>(
        &self,
        config: &BulkOperationConfig,
        records: Vec<Record>,
        processor: F,
        on_progress: Option<&ProgressCallback>,
        token: &CancellationToken,
    ) -> DataApiResult<BatchResult<Record, Record>>
    where
        F: Fn(Record, usize) -> Fut,
        Fut: Future<Output = DataApiResult<Record>>,
    {
        let batch_processor = BatchProcessor::new(config.batch_config()?);
        // Failure stops stay local to this call; cancel_operation still reaches it
        let token = token.child_token();
        let progress = progress_hook(config, on_progress, &token);

        Ok(batch_processor
            .process_batch_cancellable(records, processor, progress.as_ref(), &token)
            .await)
    }

    /// Deletes the sessions owned by `user`.
    async fn cascade_sessions(
        &self,
        sessions: &dyn EntityOperations,
        user: &Record,
        config: &BulkOperationConfig,
    ) {
        let Some(user_id) = record_id(user) else {
            log::warn!("Skipping session cascade for a user record without id");
            return;
        };

        match self
            .delete_matching(sessions, &where_eq("userId", user_id.as_str()), config)
            .await
        {
            Ok(count) => log::debug!("Session cascade removed {count} sessions for user {user_id}"),
            Err(e) => log::warn!("Session cascade failed for user {user_id}: {e}"),
        }
    }

    /// Finds and deletes every record matching `filter`, returning how many
    /// were deleted. Individual delete failures are logged.
    async fn delete_matching(
        &self,
        operations: &dyn EntityOperations,
        filter: &Where,
        config: &BulkOperationConfig,
    ) -> DataApiResult<usize> {
        let model = operations.model();
        let records = operations.find_many(filter).await?;
        if records.is_empty() {
            return Ok(0);
        }

        let batch = BatchProcessor::new(config.batch_config()?)
            .process_batch(
                records,
                |record: Record, _| {
                    let model = &model;
                    async move { delete_record(operations, model, &record).await }
                },
                None,
            )
            .await;

        for failure in &batch.failed {
            log::warn!(
                "Failed to delete {model} at index {}: {}",
                failure.index,
                failure.error
            );
        }

        Ok(batch.successful.len())
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        operation: &str,
        batch: BatchResult<Record, Record>,
        include_results: bool,
        positions: Option<&[usize]>,
        skipped: usize,
        config: &BulkOperationConfig,
        started: Instant,
    ) -> BulkOperationResult {
        let success = batch.successful.len();
        let failures = batch.failed.len();

        let errors: Vec<BulkOperationError> = batch
            .failed
            .into_iter()
            .map(|failure| self.to_bulk_error(operation, failure, positions))
            .collect();

        let results = include_results.then_some(batch.successful);
        let memory_usage = MemoryUsage::estimate(results.as_deref(), config.memory_threshold_bytes);
        if memory_usage.exceeded_threshold {
            log::warn!(
                "{operation} result payload of ~{} bytes exceeds the {} byte threshold",
                memory_usage.estimated_bytes,
                memory_usage.threshold_bytes
            );
        }

        let duration = started.elapsed();
        log::info!(
            "Bulk {operation} completed: {success} successful, {failures} failed, {skipped} skipped in {duration:?}"
        );
        if batch.cancelled {
            log::warn!(
                "Bulk {operation} stopped early after {} records",
                success + failures
            );
        }

        BulkOperationResult {
            count: success + failures,
            success,
            failures,
            skipped,
            errors,
            results,
            duration,
            memory_usage,
            cancelled: batch.cancelled,
        }
    }

    fn to_bulk_error(
        &self,
        operation: &str,
        failure: BatchError<Record>,
        positions: Option<&[usize]>,
    ) -> BulkOperationError {
        let BatchError { index, item, error } = failure;
        let index = positions
            .and_then(|positions| positions.get(index).copied())
            .unwrap_or(index);

        let error = if error.kind == ErrorKind::Unknown {
            let mut mapped = map_bulk_error(error.status, error.code.as_deref(), &error.message);
            mapped.operation = error.operation.clone();
            if error.permanent {
                mapped = mapped.permanent();
            }
            mapped
        } else {
            error
        };

        let retryable = !error.permanent
            && (self.retry.is_retryable(&error)
                || (error.status.is_none() && error.kind.is_retryable()));

        BulkOperationError {
            index,
            item,
            error,
            retryable,
            operation: operation.to_string(),
        }
    }
}

fn operation_id(call: &BulkCallOptions) -> String {
    call.operation_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Wraps the caller's progress callback with the bulk policy: suppressed when
/// progress is disabled, and stopping further chunks after the first failure
/// when failures are not skipped.
fn progress_hook(
    config: &BulkOperationConfig,
    on_progress: Option<&ProgressCallback>,
    token: &CancellationToken,
) -> Option<ProgressCallback> {
    let caller = on_progress.filter(|_| config.enable_progress).cloned();
    let stop_on_failure = !config.skip_failures;

    if caller.is_none() && !stop_on_failure {
        return None;
    }

    let token = token.clone();
    Some(Arc::new(move |progress: BatchProgress| {
        if let Some(callback) = &caller {
            callback(progress);
        }
        if stop_on_failure && progress.failed > 0 && !token.is_cancelled() {
            log::warn!(
                "Stopping bulk operation after {} failures; skipping failures is disabled",
                progress.failed
            );
            token.cancel();
        }
    }))
}

async fn screen(operations: &dyn EntityOperations, model: &ModelType, record: &Record) -> Screening {
    let Some(field) = model.natural_key() else {
        return Screening::Include;
    };
    let Some(key) = record_field(record, field) else {
        return Screening::Include;
    };

    match operations.find_by_natural_key(&key).await {
        Ok(Some(_)) => Screening::Exclude {
            reason: format!("{model} with {field} '{key}' already exists"),
        },
        Ok(None) => Screening::Include,
        Err(error) => Screening::CheckFailed { error },
    }
}

/// Verification tokens cannot be patched; they are replaced instead.
async fn update_record(
    operations: &dyn EntityOperations,
    model: &ModelType,
    record: &Record,
    patch: &Record,
) -> DataApiResult<Record> {
    match model {
        ModelType::VerificationToken => {
            let token = record_field(record, "token").ok_or_else(|| {
                DataApiError::validation("Verification token record has no token").permanent()
            })?;
            operations.delete(&token).await?;
            operations.create(merge_records(record, patch)).await
        }
        _ => {
            let id = record_id(record).ok_or_else(|| {
                DataApiError::validation(format!("{model} record has no id")).permanent()
            })?;
            operations.update(&id, patch).await
        }
    }
}

async fn delete_record(
    operations: &dyn EntityOperations,
    model: &ModelType,
    record: &Record,
) -> DataApiResult<()> {
    let key = match model {
        ModelType::VerificationToken => record_field(record, "token"),
        _ => record_id(record),
    };
    let key = key.ok_or_else(|| {
        DataApiError::validation(format!("{model} record has no identifier")).permanent()
    })?;
    operations.delete(&key).await
}

/// Classifies a raw failure into the error taxonomy.
///
/// A status code wins; otherwise a recognized network code; otherwise the
/// message is matched against known timeout and connection patterns.
pub fn map_bulk_error(status: Option<u16>, code: Option<&str>, message: &str) -> DataApiError {
    if let Some(status) = status {
        let error = DataApiError::from_status(status, message);
        return match code {
            Some(code) => error.with_code(code),
            None => error,
        };
    }

    if let Some(code) = code {
        if ErrorKind::from_network_code(code).is_some() {
            return DataApiError::from_network_code(code, message);
        }
    }

    let error = DataApiError::unknown(message);
    let mapped = if error.is_timeout_message() {
        DataApiError::timeout(message)
    } else if error.is_network_message() {
        DataApiError::network(message)
    } else {
        error
    };

    match code {
        Some(code) => mapped.with_code(code),
        None => mapped,
    }
}
