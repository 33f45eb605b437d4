// crates/resilience/tests/resilience_tests.rs
//! Integration tests for request scheduling

use semnet_resilience::{with_retry, RequestLoader, ResilienceError, RetryPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_loader_with_retry_inside_action() {
    let _ = env_logger::builder().is_test(true).try_init();
    let loader: RequestLoader<Result<u32, String>> = RequestLoader::new(2);
    let attempts = Arc::new(AtomicUsize::new(0));
    let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(1));

    let counter = Arc::clone(&attempts);
    let result = loader
        .schedule("https://api.example.com/flaky", move || async move {
            with_retry(&policy, |_| true, || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err("503".to_string())
                    } else {
                        Ok(200)
                    }
                }
            })
            .await
        })
        .await;

    assert_eq!(result, Ok(Ok(200)));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_loader_caps_parallel_reads() {
    let loader: RequestLoader<()> = RequestLoader::new(3);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let reads: Vec<_> = (0..10)
        .map(|i| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            loader.schedule(format!("https://api.example.com/{}", i), move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
        })
        .collect();

    let results = futures::future::join_all(reads).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(loader.pending(), 0);
}

#[tokio::test]
async fn test_loader_usable_after_clear_all() {
    let loader: RequestLoader<u32> = RequestLoader::new(1);
    let stuck = tokio::spawn(loader.schedule("stuck", || futures::future::pending::<u32>()));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(loader.clear_all(), Ok(1));
    assert_eq!(stuck.await.unwrap(), Err(ResilienceError::Cancelled));

    let value = loader.schedule("stuck", || async { 5 }).await;
    assert_eq!(value, Ok(5));
}
