// crates/core/src/pool.rs
//! Identity-keyed resource pools

use crate::error::{CoreError, CoreResult};
use crate::resource::{Resource, ResourceKind, ResourceRef, Tracked};
use crate::state::{State, Status};
use std::sync::Arc;

/// A collection used as an identity cache
///
/// The same logical resource (by canonical-or-self URI) is never
/// materialized twice in one pool. Pools are cheap to clone; clones share
/// the underlying collection.
#[derive(Debug, Clone)]
pub struct Pool {
    collection: ResourceRef,
}

impl Pool {
    /// Creates a pool backed by a new collection, located at `uri` if given
    pub fn new(uri: Option<&str>) -> Self {
        let (resource, status) = match uri {
            Some(uri) => (
                Resource::located(ResourceKind::Collection, uri),
                Status::LocationOnly,
            ),
            None => (Resource::new(ResourceKind::Collection), Status::Virtual),
        };
        Self {
            collection: Tracked::new(resource, State::new(status)),
        }
    }

    /// Uses an existing collection as the pool
    pub fn from_collection(collection: ResourceRef) -> CoreResult<Self> {
        let found = collection.kind();
        if found != ResourceKind::Collection {
            return Err(CoreError::KindMismatch {
                expected: ResourceKind::Collection,
                found,
            });
        }
        Ok(Self { collection })
    }

    /// The backing collection
    pub fn collection(&self) -> &ResourceRef {
        &self.collection
    }

    /// Looks a resource up by identity URI
    pub fn find(&self, uri: &str) -> Option<ResourceRef> {
        let resource = self.collection.read();
        resource
            .items()?
            .iter()
            .find(|item| item.canonical_uri().as_deref() == Some(uri))
            .cloned()
    }

    /// Returns the pooled resource for `uri`, creating it with `make` if absent
    ///
    /// New resources are inserted at the head of the pool. `make` must not
    /// touch this pool.
    pub fn get_or_insert_with<F>(&self, uri: &str, make: F) -> CoreResult<ResourceRef>
    where
        F: FnOnce() -> CoreResult<ResourceRef>,
    {
        let mut resource = self.collection.write();
        let found = resource.kind();
        let items = resource.items_mut().ok_or(CoreError::KindMismatch {
            expected: ResourceKind::Collection,
            found,
        })?;

        if let Some(existing) = items
            .iter()
            .find(|item| item.canonical_uri().as_deref() == Some(uri))
        {
            log::debug!("Pool hit for {}", uri);
            return Ok(Arc::clone(existing));
        }

        let created = make()?;
        items.insert(0, Arc::clone(&created));
        Ok(created)
    }

    /// Adds `item` at the head unless a resource with its identity is pooled
    ///
    /// Returns the pooled resource, which is `item` only if it was inserted.
    pub fn insert(&self, item: ResourceRef) -> CoreResult<ResourceRef> {
        match item.canonical_uri() {
            Some(uri) => self.get_or_insert_with(&uri, || Ok(item)),
            None => Err(CoreError::invalid("pooled resources need a URI")),
        }
    }

    pub fn len(&self) -> usize {
        self.collection.read().items().map_or(0, <[ResourceRef]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(uri: &str) -> ResourceRef {
        Tracked::new(
            Resource::located(ResourceKind::Singleton, uri),
            State::new(Status::LocationOnly),
        )
    }

    #[test]
    fn test_get_or_insert_returns_same_object() {
        let pool = Pool::new(None);
        let first = pool
            .get_or_insert_with("https://api.example.com/q/1", || Ok(item("https://api.example.com/q/1")))
            .unwrap();
        let second = pool
            .get_or_insert_with("https://api.example.com/q/1", || Ok(item("https://api.example.com/q/1")))
            .unwrap();

        assert!(Tracked::same(&first, &second));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_new_items_go_to_head() {
        let pool = Pool::new(Some("https://api.example.com/pool"));
        pool.insert(item("https://api.example.com/q/1")).unwrap();
        pool.insert(item("https://api.example.com/q/2")).unwrap();

        let items = pool.collection().items();
        assert_eq!(
            items[0].canonical_uri().as_deref(),
            Some("https://api.example.com/q/2")
        );
        assert!(pool.find("https://api.example.com/q/1").is_some());
        assert!(pool.find("https://api.example.com/q/3").is_none());
    }

    #[test]
    fn test_insert_duplicate_keeps_original() {
        let pool = Pool::new(None);
        let original = pool.insert(item("https://api.example.com/q/1")).unwrap();
        let pooled = pool.insert(item("https://api.example.com/q/1")).unwrap();
        assert!(Tracked::same(&original, &pooled));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_pool_requires_collection() {
        assert!(Pool::from_collection(item("https://api.example.com/q/1")).is_err());
        assert!(Pool::new(None).is_empty());
    }
}
