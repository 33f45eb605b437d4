// crates/sync-engine/src/resolver.rs
//! Document URI to live URI mapping

use parking_lot::RwLock;
use std::collections::HashMap;

/// Records which live resource each document resource turned into
///
/// Documents can refer to each other by their own URIs. Once a sync pass
/// has matched or created the live counterpart, later payloads are
/// rewritten through this map so they point at the live URIs instead.
#[derive(Debug, Default)]
pub struct UriMappingResolver {
    mappings: RwLock<HashMap<String, String>>,
}

impl UriMappingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `document` to `live` unless it is already mapped
    ///
    /// Returns true if the mapping was recorded.
    pub fn add(&self, document: impl Into<String>, live: impl Into<String>) -> bool {
        let mut mappings = self.mappings.write();
        let document = document.into();
        if mappings.contains_key(&document) {
            return false;
        }
        mappings.insert(document, live.into());
        true
    }

    /// Maps `document` to `live`, replacing any earlier mapping
    pub fn update(&self, document: impl Into<String>, live: impl Into<String>) {
        self.mappings.write().insert(document.into(), live.into());
    }

    /// Forgets the mapping for `document`
    pub fn remove(&self, document: &str) -> Option<String> {
        self.mappings.write().remove(document)
    }

    /// Forgets every mapping that points at `live`
    pub fn forget_live(&self, live: &str) -> usize {
        let mut mappings = self.mappings.write();
        let before = mappings.len();
        mappings.retain(|_, target| target != live);
        before - mappings.len()
    }

    /// The live URI mapped for `uri`, if any
    pub fn get(&self, uri: &str) -> Option<String> {
        self.mappings.read().get(uri).cloned()
    }

    /// The live URI mapped for `uri`, or `uri` itself
    pub fn resolve(&self, uri: &str) -> String {
        self.get(uri).unwrap_or_else(|| uri.to_string())
    }

    pub fn len(&self) -> usize {
        self.mappings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.read().is_empty()
    }

    pub fn clear(&self) {
        self.mappings.write().clear();
    }

    /// A copy of every mapping
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.mappings.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_first_mapping() {
        let resolver = UriMappingResolver::new();
        assert!(resolver.add("doc:a", "https://api.example.com/a/1"));
        assert!(!resolver.add("doc:a", "https://api.example.com/a/2"));
        assert_eq!(
            resolver.get("doc:a").as_deref(),
            Some("https://api.example.com/a/1")
        );
    }

    #[test]
    fn test_update_overwrites() {
        let resolver = UriMappingResolver::new();
        resolver.add("doc:a", "https://api.example.com/a/1");
        resolver.update("doc:a", "https://api.example.com/a/2");
        assert_eq!(resolver.resolve("doc:a"), "https://api.example.com/a/2");
    }

    #[test]
    fn test_resolve_falls_back_to_input() {
        let resolver = UriMappingResolver::new();
        assert_eq!(resolver.resolve("doc:unmapped"), "doc:unmapped");
        assert!(resolver.get("doc:unmapped").is_none());
    }

    #[test]
    fn test_forget_live() {
        let resolver = UriMappingResolver::new();
        resolver.add("doc:a", "https://api.example.com/x");
        resolver.add("doc:b", "https://api.example.com/x");
        resolver.add("doc:c", "https://api.example.com/y");

        assert_eq!(resolver.forget_live("https://api.example.com/x"), 2);
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.remove("doc:c").as_deref(), Some("https://api.example.com/y"));
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_snapshot_and_clear() {
        let resolver = UriMappingResolver::new();
        resolver.add("doc:a", "live:a");
        let snapshot = resolver.snapshot();
        resolver.clear();

        assert_eq!(snapshot.get("doc:a").map(String::as_str), Some("live:a"));
        assert!(resolver.is_empty());
    }
}
