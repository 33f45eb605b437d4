// crates/sync-engine/src/differencer.rs
//! Pairs live collection items with document items
//!
//! Pairing is by resolved URI first and by a configurable attribute second.
//! Every live item is paired at most once, so duplicates in the document
//! produce creates rather than double updates.

use crate::resolver::UriMappingResolver;
use semnet_core::{ResourceRef, Status};
use std::sync::Arc;

/// Outcome of comparing a live collection with a document collection
#[derive(Debug, Default)]
pub struct CollectionDiff {
    /// Document items with no live counterpart, in document order
    pub create: Vec<ResourceRef>,
    /// Matched `(live, document)` pairs, in document order
    pub update: Vec<(ResourceRef, ResourceRef)>,
    /// Live items with no document counterpart, in live order
    pub delete: Vec<ResourceRef>,
}

impl CollectionDiff {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Computes a [`CollectionDiff`]
#[derive(Debug, Clone, Default)]
pub struct Differencer {
    match_attribute: Option<String>,
}

impl Differencer {
    /// Creates a differencer; `match_attribute` enables attribute pairing
    pub fn new(match_attribute: Option<&str>) -> Self {
        Self {
            match_attribute: match_attribute.map(str::to_owned),
        }
    }

    pub fn match_attribute(&self) -> Option<&str> {
        self.match_attribute.as_deref()
    }

    /// Diffs `documents` against the `live` items
    pub fn diff(
        &self,
        live: &[ResourceRef],
        documents: &[ResourceRef],
        resolver: &UriMappingResolver,
    ) -> CollectionDiff {
        let mut claimed = vec![false; live.len()];
        let mut pairs: Vec<Option<usize>> = vec![None; documents.len()];

        for (doc_index, document) in documents.iter().enumerate() {
            let Some(uri) = document.canonical_uri() else {
                continue;
            };
            let resolved = resolver.resolve(&uri);
            let found = live.iter().enumerate().position(|(index, item)| {
                !claimed[index]
                    && item
                        .canonical_uri()
                        .is_some_and(|live_uri| live_uri == resolved || live_uri == uri)
            });
            if let Some(index) = found {
                claimed[index] = true;
                pairs[doc_index] = Some(index);
            }
        }

        if let Some(attribute) = self.match_attribute.as_deref() {
            for (doc_index, document) in documents.iter().enumerate() {
                if pairs[doc_index].is_some() {
                    continue;
                }
                let Some(wanted) = document.attribute(attribute) else {
                    continue;
                };
                let found = live.iter().enumerate().position(|(index, item)| {
                    !claimed[index] && item.attribute(attribute).as_ref() == Some(&wanted)
                });
                if let Some(index) = found {
                    claimed[index] = true;
                    pairs[doc_index] = Some(index);
                }
            }
        }

        let mut diff = CollectionDiff::default();
        for (document, pair) in documents.iter().zip(pairs) {
            match pair {
                Some(index) => diff
                    .update
                    .push((Arc::clone(&live[index]), Arc::clone(document))),
                None => diff.create.push(Arc::clone(document)),
            }
        }
        diff.delete = live
            .iter()
            .zip(claimed)
            .filter(|(_, claimed)| !claimed)
            .map(|(item, _)| Arc::clone(item))
            .collect();

        log::debug!(
            "Collection diff: {} create, {} update, {} delete",
            diff.create.len(),
            diff.update.len(),
            diff.delete.len()
        );
        diff
    }

    /// True when attribute pairing needs live items that are not hydrated yet
    ///
    /// Only the case when some document has no URI match at all; URI
    /// pairing never needs item attributes.
    pub fn wants_hydrated(
        &self,
        live: &[ResourceRef],
        documents: &[ResourceRef],
        resolver: &UriMappingResolver,
    ) -> bool {
        if self.match_attribute.is_none() {
            return false;
        }
        if !live.iter().any(|item| item.status() != Status::Hydrated) {
            return false;
        }
        documents.iter().any(|document| {
            let Some(uri) = document.canonical_uri() else {
                return true;
            };
            let resolved = resolver.resolve(&uri);
            !live.iter().any(|item| {
                item.canonical_uri()
                    .is_some_and(|live_uri| live_uri == resolved || live_uri == uri)
            })
        })
    }
}
