//! Chunked, concurrency-bounded execution of a fallible async transform.

use crate::common::{DataApiError, DataApiResult};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Chunking and admission settings for a [`BatchProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    batch_size: usize,
    concurrency: usize,
    delay_between_batches: Duration,
}

impl BatchConfig {
    /// # Errors
    ///
    /// A `VALIDATION_ERROR` when `batch_size` or `concurrency` is zero.
    pub fn new(
        batch_size: usize,
        concurrency: usize,
        delay_between_batches: Duration,
    ) -> DataApiResult<Self> {
        if batch_size == 0 {
            return Err(DataApiError::validation("batchSize must be at least 1").permanent());
        }
        if concurrency == 0 {
            return Err(DataApiError::validation("concurrency must be at least 1").permanent());
        }
        Ok(Self {
            batch_size,
            concurrency,
            delay_between_batches,
        })
    }

    /// Large chunks, wide window, no pause between chunks.
    pub fn fast() -> Self {
        Self {
            batch_size: 100,
            concurrency: 10,
            delay_between_batches: Duration::ZERO,
        }
    }

    /// One request at a time in small chunks with a long pause.
    pub fn conservative() -> Self {
        Self {
            batch_size: 10,
            concurrency: 1,
            delay_between_batches: Duration::from_millis(500),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn delay_between_batches(&self) -> Duration {
        self.delay_between_batches
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            concurrency: 3,
            delay_between_batches: Duration::from_millis(100),
        }
    }
}

/// Cumulative counts reported after each chunk settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// A failed item, addressed by its position in the original input.
#[derive(Debug, Clone)]
pub struct BatchError<T> {
    pub index: usize,
    pub item: T,
    pub error: DataApiError,
}

#[derive(Debug, Clone)]
pub struct BatchResult<R, T> {
    /// Successful outputs in completion order
    pub successful: Vec<R>,
    pub failed: Vec<BatchError<T>>,
    pub total_processed: usize,
    /// Set when cancellation stopped the run before every chunk was attempted
    pub cancelled: bool,
}

impl<R, T> BatchResult<R, T> {
    pub fn empty() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
            total_processed: 0,
            cancelled: false,
        }
    }

    fn progress(&self, total: usize) -> BatchProgress {
        BatchProgress {
            completed: self.total_processed,
            total,
            successful: self.successful.len(),
            failed: self.failed.len(),
        }
    }
}

/// Runs a processor over items in consecutive chunks.
///
/// Chunks run strictly one after another. Inside a chunk at most
/// `concurrency` processor calls are in flight; the rest wait on a
/// semaphore permit. A failing item is recorded and never affects its
/// siblings. Items are driven on the calling task, nothing is spawned.
///
/// # Examples
///
/// ```no_run
/// use dataapi::bulk_operations::{BatchConfig, BatchProcessor};
/// use dataapi::common::DataApiError;
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), DataApiError> {
/// let processor = BatchProcessor::new(BatchConfig::new(2, 2, Duration::ZERO)?);
/// let result = processor
///     .process_batch(vec![1, 2, 3, 4, 5], |x: i32, _index| async move {
///         if x == 3 {
///             Err(DataApiError::unknown("boom"))
///         } else {
///             Ok(x * 2)
///         }
///     }, None)
///     .await;
///
/// assert_eq!(result.failed[0].index, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor {
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn process_batch<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        processor: F,
        on_progress: Option<&ProgressCallback>,
    ) -> BatchResult<R, T>
    where
        T: Clone,
        F: Fn(T, usize) -> Fut,
        Fut: Future<Output = DataApiResult<R>>,
    {
        self.process_batch_cancellable(items, processor, on_progress, &CancellationToken::new())
            .await
    }

    /// Like [`process_batch`](Self::process_batch), but stops scheduling new
    /// chunks once `cancel` fires. Items already in flight always settle.
    pub async fn process_batch_cancellable<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        processor: F,
        on_progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> BatchResult<R, T>
    where
        T: Clone,
        F: Fn(T, usize) -> Fut,
        Fut: Future<Output = DataApiResult<R>>,
    {
        let mut result = BatchResult::empty();
        let total = items.len();
        if total == 0 {
            return result;
        }

        let batch_size = self.config.batch_size;
        let chunk_count = total.div_ceil(batch_size);
        let semaphore = Semaphore::new(self.config.concurrency);

        log::debug!(
            "Processing {total} items in {chunk_count} chunks (batch size {batch_size}, concurrency {})",
            self.config.concurrency
        );

        for (chunk_index, chunk) in items.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                log::info!(
                    "Batch run cancelled before chunk {}/{chunk_count}; {} of {total} items processed",
                    chunk_index + 1,
                    result.total_processed
                );
                result.cancelled = true;
                break;
            }

            let offset = chunk_index * batch_size;
            let semaphore = &semaphore;
            let processor = &processor;

            let mut in_flight: FuturesUnordered<_> = chunk
                .iter()
                .cloned()
                .enumerate()
                .map(|(position, item)| {
                    let index = offset + position;
                    async move {
                        let outcome = match semaphore.acquire().await {
                            Ok(_permit) => processor(item.clone(), index).await,
                            Err(_) => Err(DataApiError::unknown("Batch admission closed")),
                        };
                        (index, item, outcome)
                    }
                })
                .collect();

            while let Some((index, item, outcome)) = in_flight.next().await {
                match outcome {
                    Ok(output) => result.successful.push(output),
                    Err(error) => {
                        log::debug!("Item {index} failed: {error}");
                        result.failed.push(BatchError { index, item, error });
                    }
                }
                result.total_processed += 1;
            }

            if let Some(callback) = on_progress {
                callback(result.progress(total));
            }

            let is_last = chunk_index + 1 == chunk_count;
            if !is_last && !self.config.delay_between_batches.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(self.config.delay_between_batches) => {}
                    () = cancel.cancelled() => {}
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(batch_size: usize, concurrency: usize) -> BatchConfig {
        BatchConfig::new(batch_size, concurrency, Duration::ZERO).unwrap()
    }

    #[test]
    fn test_config_rejects_zero_values() {
        assert!(BatchConfig::new(0, 1, Duration::ZERO).is_err());
        assert!(BatchConfig::new(1, 0, Duration::ZERO).is_err());
    }

    #[test]
    fn test_presets() {
        let default = BatchConfig::default();
        assert_eq!(
            (default.batch_size(), default.concurrency()),
            (50, 3)
        );
        assert_eq!(default.delay_between_batches(), Duration::from_millis(100));
        assert_eq!(BatchConfig::fast().batch_size(), 100);
        assert_eq!(BatchConfig::fast().concurrency(), 10);
        assert_eq!(BatchConfig::conservative().concurrency(), 1);
        assert_eq!(
            BatchConfig::conservative().delay_between_batches(),
            Duration::from_millis(500)
        );
    }

    #[tokio::test]
    async fn test_failures_keep_global_index() {
        let processor = BatchProcessor::new(config(2, 2));
        let result = processor
            .process_batch(
                vec![1, 2, 3, 4, 5],
                |x: i32, _| async move {
                    if x == 3 {
                        Err(DataApiError::unknown("boom"))
                    } else {
                        Ok(x * 2)
                    }
                },
                None,
            )
            .await;

        let mut successful = result.successful.clone();
        successful.sort();
        assert_eq!(successful, vec![2, 4, 8, 10]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].index, 2);
        assert_eq!(result.failed[0].item, 3);
        assert_eq!(result.total_processed, 5);
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_empty_input_skips_processor_and_progress() {
        let calls = AtomicUsize::new(0);
        let progress_calls = Arc::new(AtomicUsize::new(0));
        let counter = progress_calls.clone();
        let on_progress: ProgressCallback = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = BatchProcessor::default()
            .process_batch(
                Vec::<u32>::new(),
                |x, _| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, DataApiError>(x) }
                },
                Some(&on_progress),
            )
            .await;

        assert!(result.successful.is_empty());
        assert!(result.failed.is_empty());
        assert_eq!(result.total_processed, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(progress_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_once_per_chunk() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_progress: ProgressCallback = Arc::new(move |progress| {
            sink.lock().unwrap().push(progress);
        });

        BatchProcessor::new(config(3, 2))
            .process_batch(
                (0..7).collect(),
                |x: u32, _| async move {
                    if x % 2 == 0 {
                        Ok(x)
                    } else {
                        Err(DataApiError::unknown("odd"))
                    }
                },
                Some(&on_progress),
            )
            .await;

        let seen = seen.lock().unwrap();
        let completed: Vec<usize> = seen.iter().map(|p| p.completed).collect();
        assert_eq!(completed, vec![3, 6, 7]);
        let last = seen.last().unwrap();
        assert_eq!(last.total, 7);
        assert_eq!((last.successful, last.failed), (4, 3));
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_concurrency() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let result = BatchProcessor::new(config(10, 3))
            .process_batch(
                (0..25).collect(),
                |x: u32, _| {
                    let in_flight = &in_flight;
                    let peak = &peak;
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, DataApiError>(x)
                    }
                },
                None,
            )
            .await;

        assert_eq!(result.successful.len(), 25);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_cancellation_between_chunks() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let on_progress: ProgressCallback = Arc::new(move |progress| {
            if progress.completed >= 2 {
                trigger.cancel();
            }
        });

        let result = BatchProcessor::new(config(2, 2))
            .process_batch_cancellable(
                (0..6).collect(),
                |x: u32, _| async move { Ok::<_, DataApiError>(x) },
                Some(&on_progress),
                &token,
            )
            .await;

        assert!(result.cancelled);
        assert_eq!(result.total_processed, 2);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_delay() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let on_progress: ProgressCallback = Arc::new(move |_| trigger.cancel());

        let processor =
            BatchProcessor::new(BatchConfig::new(1, 1, Duration::from_secs(3600)).unwrap());
        let started = std::time::Instant::now();
        let result = processor
            .process_batch_cancellable(
                vec![1, 2],
                |x: u32, _| async move { Ok::<_, DataApiError>(x) },
                Some(&on_progress),
                &token,
            )
            .await;

        assert!(result.cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
