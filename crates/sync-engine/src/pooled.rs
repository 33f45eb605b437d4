// crates/sync-engine/src/pooled.rs
//! Named resource pools consulted before creating during a sync

use crate::resolver::UriMappingResolver;
use parking_lot::RwLock;
use semnet_core::{CoreResult, Pool, ResourceRef};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of named pools
///
/// A strategy that names a pool gets existing resources from it instead of
/// POSTing duplicates. Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct PooledResource {
    pools: Arc<RwLock<HashMap<String, Pool>>>,
}

impl PooledResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pool` under `name`, replacing any earlier pool
    pub fn register(&self, name: impl Into<String>, pool: Pool) {
        let name = name.into();
        log::debug!("Registering pool '{}'", name);
        self.pools.write().insert(name, pool);
    }

    /// The pool registered under `name`
    pub fn pool(&self, name: &str) -> Option<Pool> {
        self.pools.read().get(name).cloned()
    }

    /// Finds the pooled counterpart of a document resource
    ///
    /// Tries the document's URI (through `resolver`) first, then an equal
    /// value of `match_attribute`.
    pub fn find(
        &self,
        name: &str,
        document: &ResourceRef,
        resolver: &UriMappingResolver,
        match_attribute: Option<&str>,
    ) -> Option<ResourceRef> {
        let pool = self.pool(name)?;

        if let Some(uri) = document.canonical_uri() {
            if let Some(found) = pool.find(&resolver.resolve(&uri)) {
                return Some(found);
            }
        }

        let attribute = match_attribute?;
        let wanted = document.attribute(attribute)?;
        pool.collection()
            .items()
            .into_iter()
            .find(|item| item.attribute(attribute).as_ref() == Some(&wanted))
    }

    /// Adds `item` to the pool registered under `name`
    ///
    /// Returns the pooled resource, or `None` when no such pool exists.
    pub fn insert(&self, name: &str, item: ResourceRef) -> CoreResult<Option<ResourceRef>> {
        match self.pool(name) {
            Some(pool) => pool.insert(item).map(Some),
            None => Ok(None),
        }
    }
}
