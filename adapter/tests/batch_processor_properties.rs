use dataapi::bulk_operations::{BatchConfig, BatchProcessor, BatchProgress, ProgressCallback};
use dataapi::common::{DataApiError, RetryConfig, RetryExecutor};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn processor(batch_size: usize, concurrency: usize) -> BatchProcessor {
    BatchProcessor::new(BatchConfig::new(batch_size, concurrency, Duration::ZERO).unwrap())
}

mod batch_processor_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn test_every_item_settles_exactly_once(
            failing in prop::collection::vec(any::<bool>(), 0..120),
            batch_size in 1usize..20,
            concurrency in 1usize..8
        ) {
            let total = failing.len();
            let expected_failures: BTreeSet<usize> = failing
                .iter()
                .enumerate()
                .filter_map(|(i, fail)| fail.then_some(i))
                .collect();

            let result = runtime().block_on(async {
                let items: Vec<usize> = (0..total).collect();
                let failing = &failing;
                processor(batch_size, concurrency)
                    .process_batch(
                        items,
                        |item: usize, index| async move {
                            if failing[index] {
                                Err(DataApiError::from_status(500, format!("item {item}")))
                            } else {
                                Ok(item * 2)
                            }
                        },
                        None,
                    )
                    .await
            });

            // Property: successes and failures partition the input
            prop_assert_eq!(result.successful.len() + result.failed.len(), total);
            prop_assert_eq!(result.total_processed, total);
            prop_assert!(!result.cancelled);

            // Property: failures carry the original index and item
            let failed: BTreeSet<usize> = result.failed.iter().map(|f| f.index).collect();
            prop_assert_eq!(failed, expected_failures);
            for failure in &result.failed {
                prop_assert_eq!(failure.item, failure.index);
            }
        }

        #[test]
        fn test_progress_is_monotonic_and_complete(
            total in 1usize..100,
            batch_size in 1usize..25
        ) {
            let seen: Arc<Mutex<Vec<BatchProgress>>> = Arc::default();
            let sink = seen.clone();
            let on_progress: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));

            runtime().block_on(async {
                processor(batch_size, 3)
                    .process_batch(
                        (0..total).collect::<Vec<_>>(),
                        |item: usize, _| async move { Ok::<_, DataApiError>(item) },
                        Some(&on_progress),
                    )
                    .await
            });

            let seen = seen.lock().unwrap();
            prop_assert_eq!(seen.len(), total.div_ceil(batch_size));
            prop_assert!(seen.windows(2).all(|w| w[0].completed <= w[1].completed));
            prop_assert!(seen.iter().all(|p| p.total == total));
            prop_assert_eq!(seen.last().map(|p| p.completed), Some(total));
        }

        #[test]
        fn test_concurrency_never_exceeds_limit(
            total in 1usize..60,
            batch_size in 1usize..30,
            concurrency in 1usize..6
        ) {
            let running = AtomicUsize::new(0);
            let peak = AtomicUsize::new(0);

            runtime().block_on(async {
                let running = &running;
                let peak = &peak;
                processor(batch_size, concurrency)
                    .process_batch(
                        (0..total).collect::<Vec<_>>(),
                        |item: usize, _| async move {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(1)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, DataApiError>(item)
                        },
                        None,
                    )
                    .await
            });

            prop_assert!(peak.load(Ordering::SeqCst) <= concurrency);
            prop_assert!(peak.load(Ordering::SeqCst) >= 1);
        }
    }
}

mod retry_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn test_attempts_never_exceed_ceiling(
            max_retries in 0u32..4,
            failures_before_success in 0u32..7
        ) {
            let executor = RetryExecutor::new(RetryConfig::new(
                max_retries,
                Duration::from_millis(1),
                Duration::from_millis(2),
            ));
            let attempts = AtomicUsize::new(0);

            let outcome = runtime().block_on(async {
                let attempts = &attempts;
                executor
                    .execute_with_retry("flaky call", || async move {
                        let attempt = attempts.fetch_add(1, Ordering::SeqCst) as u32;
                        if attempt < failures_before_success {
                            Err(DataApiError::from_status(503, "unavailable"))
                        } else {
                            Ok(attempt)
                        }
                    })
                    .await
            });

            let ceiling = max_retries + 1;
            let made = attempts.load(Ordering::SeqCst) as u32;
            prop_assert!(made <= ceiling);
            prop_assert_eq!(made, (failures_before_success + 1).min(ceiling));
            prop_assert_eq!(outcome.is_ok(), failures_before_success < ceiling);
        }

        #[test]
        fn test_non_retryable_errors_fail_fast(
            max_retries in 0u32..5,
            status in prop::sample::select(vec![400u16, 401, 403, 404, 409, 422])
        ) {
            let executor = RetryExecutor::new(RetryConfig::new(
                max_retries,
                Duration::from_millis(1),
                Duration::from_millis(2),
            ));
            let attempts = AtomicUsize::new(0);

            let outcome = runtime().block_on(async {
                let attempts = &attempts;
                executor
                    .execute_with_retry("rejected call", || async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(DataApiError::from_status(status, "rejected"))
                    })
                    .await
            });

            prop_assert!(outcome.is_err());
            prop_assert_eq!(attempts.load(Ordering::SeqCst), 1);
        }
    }
}
