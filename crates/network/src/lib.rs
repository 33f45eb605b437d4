// crates/network/src/lib.rs
//! Transports for semnet
//!
//! [`HttpTransport`] speaks JSON over HTTP with reqwest. [`MockTransport`]
//! answers from scripted responses and records every call.

mod client;
mod error;
mod mock;

pub use client::{ClientConfig, HttpTransport};
pub use error::{NetworkError, NetworkResult};
pub use mock::{MockTransport, RecordedCall};
