// crates/sync-engine/src/lib.rs
//! Tracked resources and document synchronization
//!
//! This crate provides:
//! - Load, create, update and delete over a [`semnet_core::Transport`], with
//!   state tracking and identity-preserving merges
//! - Document to live URI mapping and named resource pools
//! - Collection differencing and form-aware edit bodies
//! - A sync driver that walks a strategy tree level by level
//!
//! # Example
//!
//! ```rust,no_run
//! use semnet_core::{MakeOptions, ResourceKind};
//! use semnet_network::HttpTransport;
//! use semnet_sync_engine::{Strategy, SyncEngine, TrackedRepresentationFactory};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new()?);
//! let tracked = Arc::new(TrackedRepresentationFactory::new(transport));
//! let engine = SyncEngine::new(Arc::clone(&tracked));
//!
//! let survey = tracked.sparse().make(MakeOptions::location(
//!     "https://api.example.com/survey/1",
//!     ResourceKind::Singleton,
//! ))?;
//! let document = serde_json::json!({
//!     "name": "Onboarding",
//!     "questions": [{ "links": [], "name": "Why?" }]
//! });
//!
//! let strategy = Strategy::root().with_child(Strategy::named("questions"));
//! let report = engine.sync_document(&survey, &document, &strategy).await?;
//! println!("{} change(s)", report.stats.changes());
//! # Ok(())
//! # }
//! ```

mod differencer;
mod engine;
mod error;
mod merge;
mod options;
mod pooled;
mod resolver;
mod strategy;
mod tracked;
mod types;

pub use differencer::{CollectionDiff, Differencer};
pub use engine::SyncEngine;
pub use error::{EngineError, EngineResult};
pub use merge::{AttributeMergeStrategy, EditMergeStrategy};
pub use options::{ResourceOptions, SyncOptions};
pub use pooled::PooledResource;
pub use resolver::UriMappingResolver;
pub use strategy::{Strategy, SyncMode};
pub use tracked::{Created, TrackedRepresentationFactory};
pub use types::{SyncAction, SyncInfo, SyncReport, SyncStats};

#[cfg(test)]
mod tests {
    use super::*;
    use semnet_network::MockTransport;
    use std::sync::Arc;

    #[test]
    fn test_all_exports_accessible() {
        let tracked = Arc::new(TrackedRepresentationFactory::new(Arc::new(
            MockTransport::new(),
        )));
        let engine = SyncEngine::new(tracked);
        let _: &UriMappingResolver = engine.resolver();
        let _: SyncOptions = SyncOptions::default();
        let _: Strategy = Strategy::root();
        let _: SyncStats = SyncStats::default();
    }
}
