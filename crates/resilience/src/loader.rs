// crates/resilience/src/loader.rs
//! Request loader: in-flight deduplication over a bounded-concurrency limiter

use crate::error::{ResilienceError, ResilienceResult};
use crate::limiter::ConcurrencyLimiter;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

type InFlight<T> = Shared<BoxFuture<'static, ResilienceResult<T>>>;

struct InFlightEntry<T: Clone> {
    ticket: u64,
    request: InFlight<T>,
}

struct InFlightTable<T: Clone> {
    entries: HashMap<String, InFlightEntry<T>>,
    next_ticket: u64,
}

/// Deduplicates and rate-limits outbound calls
///
/// Reads go through [`schedule`](Self::schedule), which collapses concurrent
/// calls sharing an id onto one underlying request. Writes go through
/// [`submit`](Self::submit), which never collapses.
pub struct RequestLoader<T: Clone> {
    limiter: ConcurrencyLimiter,
    in_flight: Arc<Mutex<InFlightTable<T>>>,
}

impl<T> RequestLoader<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a loader allowing `max_concurrent` requests at once (`0` = unbounded)
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            limiter: ConcurrencyLimiter::new(max_concurrent),
            in_flight: Arc::new(Mutex::new(InFlightTable {
                entries: HashMap::new(),
                next_ticket: 0,
            })),
        }
    }

    /// Starts `action` for `id`, or joins the request already in flight for `id`
    ///
    /// `action` is only invoked when no request for `id` is in flight. The
    /// entry is removed as soon as the request settles, so a later call with
    /// the same id starts a fresh request.
    pub fn schedule<F, Fut>(
        &self,
        id: impl Into<String>,
        action: F,
    ) -> BoxFuture<'static, ResilienceResult<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let id = id.into();
        let mut table = match self.in_flight.lock() {
            Ok(table) => table,
            Err(_) => {
                return future::ready(Err(ResilienceError::Custom("Lock poisoned".to_string())))
                    .boxed()
            }
        };

        if let Some(entry) = table.entries.get(&id) {
            log::debug!("Joining in-flight request for {}", id);
            return entry.request.clone().boxed();
        }

        let ticket = table.next_ticket;
        table.next_ticket += 1;

        let limiter = self.limiter.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let key = id.clone();
        let operation = action();

        let request = async move {
            let outcome = limiter.run(operation).await;
            if let Ok(mut table) = in_flight.lock() {
                let settled = table
                    .entries
                    .get(&key)
                    .is_some_and(|entry| entry.ticket == ticket);
                if settled {
                    table.entries.remove(&key);
                }
            }
            outcome
        }
        .boxed()
        .shared();

        log::debug!("Scheduling request for {}", id);
        table.entries.insert(
            id,
            InFlightEntry {
                ticket,
                request: request.clone(),
            },
        );
        request.boxed()
    }

    /// Runs a write without deduplication
    pub async fn submit<F, Fut, R>(&self, action: F) -> ResilienceResult<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        self.limiter.run(action()).await
    }

    /// Aborts everything queued or running and rebuilds the limiter
    ///
    /// A no-op when nothing is queued. Returns the number of aborted requests.
    pub fn clear_all(&self) -> ResilienceResult<usize> {
        if self.limiter.pending() == 0 {
            return Ok(0);
        }

        let aborted = self.limiter.stop()?;
        self.in_flight
            .lock()
            .map_err(|_| ResilienceError::Custom("Lock poisoned".to_string()))?
            .entries
            .clear();

        log::info!("Cleared request loader, aborted {} request(s)", aborted);
        Ok(aborted)
    }

    /// Returns true if a request for `id` is currently in flight
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|t| t.entries.contains_key(id))
            .unwrap_or(false)
    }

    /// Returns the number of distinct ids in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|t| t.entries.len()).unwrap_or(0)
    }

    /// Returns the number of requests queued or running, reads and writes alike
    pub fn pending(&self) -> usize {
        self.limiter.pending()
    }

    /// Gets the configured concurrency
    pub fn max_concurrent(&self) -> usize {
        self.limiter.max_concurrent()
    }
}

impl<T> Default for RequestLoader<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(ConcurrencyLimiter::default().max_concurrent())
    }
}
