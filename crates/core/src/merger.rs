// crates/core/src/merger.rs
//! Set reconciliation between two collections
//!
//! The primitives are generic over the item type so the same code merges
//! incoming feeds and backs the sync differencer. Existing left-hand items
//! are always kept rather than replaced, which is what keeps item object
//! identity stable across reloads.

use crate::resource::{ResourceRef, Tracked};
use crate::state::Status;
use std::fmt;
use std::sync::Arc;

/// Removes from `lvalue` every item with no match in `rvalue`
///
/// Removal walks indices in descending order so earlier indices stay valid.
pub fn omit_items<T, F>(lvalue: &mut Vec<T>, rvalue: &[T], matches: F)
where
    F: Fn(&T, &T) -> bool,
{
    for index in (0..lvalue.len()).rev() {
        if !rvalue.iter().any(|r| matches(&lvalue[index], r)) {
            lvalue.remove(index);
        }
    }
}

/// Appends to `lvalue` every `rvalue` item with no match in `lvalue`, in `rvalue` order
pub fn extract_items<T, F>(lvalue: &mut Vec<T>, rvalue: &[T], matches: F)
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    for r in rvalue {
        if !lvalue.iter().any(|l| matches(l, r)) {
            lvalue.push(r.clone());
        }
    }
}

/// `omit_items` followed by `extract_items`
pub fn merge_items<T, F>(lvalue: &mut Vec<T>, rvalue: &[T], matches: F)
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    omit_items(lvalue, rvalue, &matches);
    extract_items(lvalue, rvalue, &matches);
}

/// Default identity rule: same object, or equal canonical-or-self URIs
pub fn canonical_or_self_matches(a: &ResourceRef, b: &ResourceRef) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    match (a.canonical_uri(), b.canonical_uri()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Pluggable identity comparison between two resources
pub type Matcher = Arc<dyn Fn(&ResourceRef, &ResourceRef) -> bool + Send + Sync>;

/// Options for [`CollectionMerger::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Replace the left links with the right links
    pub replace_links: bool,
    /// Copy the right tracked headers onto the left
    pub copy_headers: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            replace_links: true,
            copy_headers: true,
        }
    }
}

/// Merges collection resources in place
#[derive(Clone)]
pub struct CollectionMerger {
    matcher: Matcher,
}

impl CollectionMerger {
    /// Creates a merger with a custom identity rule
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    /// Identity comparison used by this merger
    pub fn matches(&self, a: &ResourceRef, b: &ResourceRef) -> bool {
        (self.matcher)(a, b)
    }

    /// Removes left items absent from the right collection
    pub fn omit(&self, lvalue: &Tracked, rvalue: &Tracked) {
        if std::ptr::eq(lvalue, rvalue) {
            return;
        }
        let incoming = rvalue.items();
        if let Some(items) = lvalue.write().items_mut() {
            omit_items(items, &incoming, |l, r| self.matches(l, r));
        }
    }

    /// Appends right items absent from the left collection
    pub fn extract(&self, lvalue: &Tracked, rvalue: &Tracked) {
        if std::ptr::eq(lvalue, rvalue) {
            return;
        }
        let incoming = rvalue.items();
        if let Some(items) = lvalue.write().items_mut() {
            extract_items(items, &incoming, |l, r| self.matches(l, r));
        }
    }

    /// Makes the left collection hold exactly the right identities
    ///
    /// Retained left items absorb the feed headers of their right match; a
    /// retained hydrated item whose feed ETag differs from its own is marked
    /// `staleFromETag`.
    pub fn merge(&self, lvalue: &Tracked, rvalue: &Tracked, options: MergeOptions) {
        if std::ptr::eq(lvalue, rvalue) {
            return;
        }

        if options.replace_links {
            let links = rvalue.read().links.clone();
            lvalue.write().links = links;
        }
        if options.copy_headers {
            let headers = rvalue.state().headers.clone();
            lvalue.state_mut().headers.merge(&headers);
        }

        let incoming = rvalue.items();
        let mut resource = lvalue.write();
        let Some(items) = resource.items_mut() else {
            return;
        };

        omit_items(items, &incoming, |l, r| self.matches(l, r));
        for kept in items.iter() {
            if let Some(fresh) = incoming.iter().find(|r| self.matches(kept, r)) {
                absorb_feed_headers(kept, fresh);
            }
        }
        extract_items(items, &incoming, |l, r| self.matches(l, r));
    }
}

impl Default for CollectionMerger {
    fn default() -> Self {
        Self::new(Arc::new(canonical_or_self_matches))
    }
}

impl fmt::Debug for CollectionMerger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionMerger").finish_non_exhaustive()
    }
}

fn absorb_feed_headers(kept: &ResourceRef, fresh: &ResourceRef) {
    if Arc::ptr_eq(kept, fresh) {
        return;
    }
    let incoming = fresh.state().feed_headers.clone();
    if incoming.is_empty() {
        return;
    }

    let mut state = kept.state_mut();
    let changed = match (incoming.etag(), state.headers.etag()) {
        (Some(feed), Some(held)) => feed != held,
        (Some(_), None) => true,
        _ => false,
    };
    if changed && state.status() == Status::Hydrated {
        log::debug!("Feed reports a newer ETag, marking item stale");
        state.set_status(Status::StaleFromETag);
    }
    state.feed_headers = incoming;
}
