// crates/sync-engine/src/merge.rs
//! Builds PUT and POST bodies from document resources

use crate::resolver::UriMappingResolver;
use semnet_core::ResourceRef;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Turns a document resource into request bodies for its live counterpart
pub trait EditMergeStrategy: Send + Sync + fmt::Debug {
    /// Body for updating `live` to match `document`, or `None` when nothing differs
    fn make_put(
        &self,
        live: &ResourceRef,
        document: &ResourceRef,
        form: Option<&ResourceRef>,
        resolver: &UriMappingResolver,
    ) -> Option<Value>;

    /// Body for creating the live counterpart of `document`
    fn make_create(
        &self,
        document: &ResourceRef,
        form: Option<&ResourceRef>,
        resolver: &UriMappingResolver,
    ) -> Value;
}

/// Copies document attributes, limited to the form's fields when a form has any
///
/// String values (also inside arrays) that are mapped document URIs are
/// rewritten to the live URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeMergeStrategy;

impl AttributeMergeStrategy {
    fn fields(
        &self,
        document: &ResourceRef,
        form: Option<&ResourceRef>,
        resolver: &UriMappingResolver,
    ) -> Map<String, Value> {
        let allowed: Option<HashSet<String>> = form
            .map(|form| form.fields().into_iter().map(|f| f.name).collect::<HashSet<_>>())
            .filter(|names| !names.is_empty());

        document
            .attributes()
            .into_iter()
            .filter(|(name, _)| allowed.as_ref().map_or(true, |names| names.contains(name)))
            .map(|(name, value)| (name, rewrite(value, resolver)))
            .collect()
    }
}

impl EditMergeStrategy for AttributeMergeStrategy {
    fn make_put(
        &self,
        live: &ResourceRef,
        document: &ResourceRef,
        form: Option<&ResourceRef>,
        resolver: &UriMappingResolver,
    ) -> Option<Value> {
        let fields = self.fields(document, form, resolver);
        let mut merged = live.attributes();

        let changed = fields
            .iter()
            .any(|(name, value)| merged.get(name) != Some(value));
        if !changed {
            return None;
        }

        merged.extend(fields);
        Some(Value::Object(merged))
    }

    fn make_create(
        &self,
        document: &ResourceRef,
        form: Option<&ResourceRef>,
        resolver: &UriMappingResolver,
    ) -> Value {
        Value::Object(self.fields(document, form, resolver))
    }
}

fn rewrite(value: Value, resolver: &UriMappingResolver) -> Value {
    match value {
        Value::String(text) => match resolver.get(&text) {
            Some(live) => Value::String(live),
            None => Value::String(text),
        },
        Value::Array(values) => {
            Value::Array(values.into_iter().map(|v| rewrite(v, resolver)).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semnet_core::{Body, FormField, Resource, ResourceKind, State, Status, Tracked};
    use serde_json::json;

    fn resource(attributes: Value, status: Status) -> ResourceRef {
        let mut resource = Resource::located(ResourceKind::Singleton, "https://api.example.com/a");
        if let Value::Object(map) = attributes {
            resource.attributes = map;
        }
        Tracked::new(resource, State::new(status))
    }

    fn form(names: &[&str]) -> ResourceRef {
        let mut resource = Resource::new(ResourceKind::Form);
        resource.body = Body::Form(names.iter().map(|n| FormField::new("text", *n)).collect());
        Tracked::new(resource, State::new(Status::Hydrated))
    }

    #[test]
    fn test_put_is_none_when_equal() {
        let live = resource(json!({"name": "a", "order": 1}), Status::Hydrated);
        let document = resource(json!({"name": "a"}), Status::Virtual);

        let put = AttributeMergeStrategy.make_put(&live, &document, None, &UriMappingResolver::new());
        assert!(put.is_none());
    }

    #[test]
    fn test_put_overlays_live_attributes() {
        let live = resource(json!({"name": "a", "order": 1}), Status::Hydrated);
        let document = resource(json!({"name": "b"}), Status::Virtual);

        let put = AttributeMergeStrategy
            .make_put(&live, &document, None, &UriMappingResolver::new())
            .unwrap();
        assert_eq!(put, json!({"name": "b", "order": 1}));
    }

    #[test]
    fn test_form_limits_fields() {
        let live = resource(json!({"name": "a"}), Status::Hydrated);
        let document = resource(json!({"name": "a", "secret": "x"}), Status::Virtual);
        let edit = form(&["name"]);

        let put = AttributeMergeStrategy.make_put(
            &live,
            &document,
            Some(&edit),
            &UriMappingResolver::new(),
        );
        assert!(put.is_none());

        let create = AttributeMergeStrategy.make_create(&document, Some(&edit), &UriMappingResolver::new());
        assert_eq!(create, json!({"name": "a"}));
    }

    #[test]
    fn test_empty_form_allows_everything() {
        let document = resource(json!({"name": "a", "order": 2}), Status::Virtual);
        let create = AttributeMergeStrategy.make_create(&document, Some(&form(&[])), &UriMappingResolver::new());
        assert_eq!(create, json!({"name": "a", "order": 2}));
    }

    #[test]
    fn test_mapped_uris_are_rewritten() {
        let resolver = UriMappingResolver::new();
        resolver.add("doc:q1", "https://api.example.com/q/1");
        let document = resource(
            json!({"question": "doc:q1", "related": ["doc:q1", "doc:other"], "order": 3}),
            Status::Virtual,
        );

        let create = AttributeMergeStrategy.make_create(&document, None, &resolver);
        assert_eq!(
            create,
            json!({
                "question": "https://api.example.com/q/1",
                "related": ["https://api.example.com/q/1", "doc:other"],
                "order": 3
            })
        );
    }
}
