// crates/core/src/lib.rs
//! Core resource model for semnet
//!
//! This crate provides:
//! - Hypermedia resources (singleton, collection, form) and typed links
//! - The per-resource lifecycle state and freshness rules
//! - Sparse and pooled resource construction
//! - Collection reconciliation primitives
//! - The transport contract the engine calls through

pub mod error;
pub mod freshness;
pub mod headers;
pub mod link;
pub mod merger;
pub mod pool;
pub mod resource;
pub mod sparse;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use headers::{CacheControl, Headers};
pub use link::Link;
pub use merger::{CollectionMerger, MergeOptions};
pub use pool::Pool;
pub use resource::{
    Body, FeedItem, FormField, Payload, Resource, ResourceKind, ResourceRef, Tracked,
};
pub use sparse::{
    FreshMakeStrategy, MakeOptions, MakeSparseStrategy, PooledCollectionMakeStrategy,
    PooledSingletonMakeStrategy, SparseRepresentationFactory,
};
pub use state::{State, Status};
pub use transport::{
    HttpResponse, Method, Transport, TransportError, TransportErrorKind, TransportResult,
};
