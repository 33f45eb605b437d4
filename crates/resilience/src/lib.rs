// crates/resilience/src/lib.rs
//! Request scheduling for outbound calls
//!
//! This crate provides:
//! - A bounded-concurrency limiter whose queue can be aborted wholesale
//! - A request loader that collapses concurrent reads of the same resource
//! - Retry with exponential backoff
//!
//! # Example
//!
//! ```rust
//! use semnet_resilience::{RequestLoader, RetryPolicy};
//! use std::time::Duration;
//!
//! let loader: RequestLoader<u32> = RequestLoader::new(4);
//! assert_eq!(loader.max_concurrent(), 4);
//!
//! let policy = RetryPolicy::new(3)
//!     .with_initial_delay(Duration::from_millis(100));
//! assert_eq!(policy.max_attempts(), 3);
//! ```

mod error;
mod limiter;
mod loader;
mod retry;

pub use error::{ResilienceError, ResilienceResult};
pub use limiter::ConcurrencyLimiter;
pub use loader::RequestLoader;
pub use retry::{with_retry, RetryPolicy};
