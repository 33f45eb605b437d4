// crates/resilience/src/limiter.rs
//! Bounded-concurrency limiter with abort support

use crate::error::{ResilienceError, ResilienceResult};
use futures::future::{AbortHandle, Abortable};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

#[derive(Debug)]
struct LimiterState {
    semaphore: Arc<Semaphore>,
    handles: HashMap<u64, AbortHandle>,
    next_id: u64,
    generation: u64,
}

/// Runs futures with at most `max_concurrent` of them executing at once
///
/// Every queued or running operation is registered with an abort handle so
/// that [`ConcurrencyLimiter::stop`] can reject all of them at once.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    max_concurrent: usize,
    state: Arc<Mutex<LimiterState>>,
}

/// Removes an operation's abort handle once it finishes or is dropped
struct Registration<'a> {
    limiter: &'a ConcurrencyLimiter,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.limiter.state.lock() {
            state.handles.remove(&self.id);
        }
    }
}

impl ConcurrencyLimiter {
    /// Creates a new limiter; `0` means unbounded
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            state: Arc::new(Mutex::new(LimiterState {
                semaphore: Arc::new(Semaphore::new(Self::permits(max_concurrent))),
                handles: HashMap::new(),
                next_id: 0,
                generation: 0,
            })),
        }
    }

    fn permits(max_concurrent: usize) -> usize {
        if max_concurrent == 0 {
            Semaphore::MAX_PERMITS
        } else {
            max_concurrent
        }
    }

    fn lock(&self) -> ResilienceResult<MutexGuard<'_, LimiterState>> {
        self.state
            .lock()
            .map_err(|_| ResilienceError::Custom("Lock poisoned".to_string()))
    }

    /// Gets the configured concurrency
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns the number of operations queued or running
    pub fn pending(&self) -> usize {
        self.state.lock().map(|s| s.handles.len()).unwrap_or(0)
    }

    /// Returns how many times the limiter has been stopped and rebuilt
    pub fn generation(&self) -> u64 {
        self.state.lock().map(|s| s.generation).unwrap_or(0)
    }

    /// Runs an operation once a slot is free
    ///
    /// Resolves to `Err(Cancelled)` if [`stop`](Self::stop) is called while the
    /// operation is queued or running.
    pub async fn run<F, T>(&self, operation: F) -> ResilienceResult<T>
    where
        F: Future<Output = T>,
    {
        let (handle, abort_registration) = AbortHandle::new_pair();
        let (id, semaphore) = {
            let mut state = self.lock()?;
            let id = state.next_id;
            state.next_id += 1;
            state.handles.insert(id, handle);
            (id, Arc::clone(&state.semaphore))
        };
        let _registration = Registration { limiter: self, id };

        let gated = async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| ResilienceError::Cancelled)?;
            Ok(operation.await)
        };

        match Abortable::new(gated, abort_registration).await {
            Ok(result) => result,
            Err(_aborted) => Err(ResilienceError::Cancelled),
        }
    }

    /// Aborts every queued and running operation and installs a fresh
    /// semaphore with the same concurrency
    ///
    /// Returns the number of operations that were aborted.
    pub fn stop(&self) -> ResilienceResult<usize> {
        let mut state = self.lock()?;
        let aborted = state.handles.len();
        for (_, handle) in state.handles.drain() {
            handle.abort();
        }
        state.semaphore.close();
        state.semaphore = Arc::new(Semaphore::new(Self::permits(self.max_concurrent)));
        state.generation += 1;
        Ok(aborted)
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_limiter_runs_operation() {
        let limiter = ConcurrencyLimiter::new(2);
        let result = limiter.run(async { 42 }).await;
        assert_eq!(result, Ok(42));
        assert_eq!(limiter.pending(), 0);
    }

    #[tokio::test]
    async fn test_limiter_bounds_concurrency() {
        let limiter = ConcurrencyLimiter::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let operations = (0..6).map(|_| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            limiter.run(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
        });

        let results = futures::future::join_all(operations).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_stop_aborts_running_operation() {
        let limiter = ConcurrencyLimiter::new(1);
        let background = limiter.clone();
        let task = tokio::spawn(async move {
            background
                .run(futures::future::pending::<u32>())
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(limiter.pending(), 1);

        let aborted = limiter.stop().unwrap();
        assert_eq!(aborted, 1);
        assert_eq!(limiter.generation(), 1);

        let result = task.await.unwrap();
        assert_eq!(result, Err(ResilienceError::Cancelled));

        // The rebuilt limiter keeps working
        assert_eq!(limiter.run(async { 7 }).await, Ok(7));
    }

    #[test]
    fn test_zero_means_unbounded() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.max_concurrent(), 0);
        assert_eq!(limiter.pending(), 0);
    }
}
