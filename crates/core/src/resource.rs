// crates/core/src/resource.rs
//! Hypermedia resources and their tracked, shared handles
//!
//! A [`Resource`] is the data: links, attributes and a body that is either
//! a singleton, an ordered collection of child resources, or a form. A
//! [`Tracked`] pairs a resource with its [`State`]; resources are shared
//! through [`ResourceRef`] so that every holder observes in-place updates.

use crate::error::{CoreError, CoreResult};
use crate::link::{self, Link};
use crate::state::{State, Status};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a tracked resource; identity is the allocation
pub type ResourceRef = Arc<Tracked>;

/// The shape of a resource, decided when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Singleton,
    Collection,
    Form,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "singleton"),
            Self::Collection => write!(f, "collection"),
            Self::Form => write!(f, "form"),
        }
    }
}

/// A form field descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<FormField>>,
}

impl FormField {
    pub fn new(field_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            name: name.into(),
            label: None,
            required: None,
            items: None,
        }
    }
}

/// A compact collection entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "eTag", default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(
        rename = "lastModified",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<String>,
}

/// Kind-specific content
#[derive(Debug, Clone)]
pub enum Body {
    Singleton,
    Collection(Vec<ResourceRef>),
    Form(Vec<FormField>),
}

impl Body {
    /// An empty body of the given kind
    pub fn empty(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Singleton => Body::Singleton,
            ResourceKind::Collection => Body::Collection(Vec::new()),
            ResourceKind::Form => Body::Form(Vec::new()),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Body::Singleton => ResourceKind::Singleton,
            Body::Collection(_) => ResourceKind::Collection,
            Body::Form(_) => ResourceKind::Form,
        }
    }
}

/// A hypermedia resource
#[derive(Debug, Clone)]
pub struct Resource {
    pub links: Vec<Link>,
    pub attributes: Map<String, Value>,
    pub body: Body,
    /// Sub-resources attached under a relation name
    pub related: BTreeMap<String, ResourceRef>,
}

impl Resource {
    /// Creates an empty resource of the given kind
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            links: Vec::new(),
            attributes: Map::new(),
            body: Body::empty(kind),
            related: BTreeMap::new(),
        }
    }

    /// Creates an empty resource identified by a `self` link
    pub fn located(kind: ResourceKind, uri: impl Into<String>) -> Self {
        let mut resource = Self::new(kind);
        resource.links.push(Link::self_link(uri));
        resource
    }

    pub fn kind(&self) -> ResourceKind {
        self.body.kind()
    }

    /// URI of the first link carrying `relation`
    pub fn uri(&self, relation: &str) -> Option<&str> {
        link::get_uri(&self.links, relation)
    }

    /// Identity URI (canonical, else self)
    pub fn canonical_uri(&self) -> Option<&str> {
        link::canonical_or_self(&self.links)
    }

    pub fn items(&self) -> Option<&[ResourceRef]> {
        match &self.body {
            Body::Collection(items) => Some(items),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<ResourceRef>> {
        match &mut self.body {
            Body::Collection(items) => Some(items),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[FormField]> {
        match &self.body {
            Body::Form(fields) => Some(fields),
            _ => None,
        }
    }

    /// Serializes to the wire shape: `links`, attributes, then `items`
    ///
    /// Attached sub-resources are written under their relation name.
    pub fn to_value(&self) -> Value {
        let mut object = self.attributes.clone();
        object.insert(
            "links".to_string(),
            serde_json::to_value(&self.links).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        match &self.body {
            Body::Singleton => {}
            Body::Collection(items) => {
                let items = items.iter().map(|item| item.to_value()).collect();
                object.insert("items".to_string(), Value::Array(items));
            }
            Body::Form(fields) => {
                object.insert(
                    "items".to_string(),
                    serde_json::to_value(fields).unwrap_or_else(|_| Value::Array(Vec::new())),
                );
            }
        }
        for (name, child) in &self.related {
            object.insert(name.clone(), child.to_value());
        }
        Value::Object(object)
    }
}

/// A wire representation split into its parts
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub links: Vec<Link>,
    pub attributes: Map<String, Value>,
    /// Raw `items`, if the payload had an array there
    pub items: Option<Vec<Value>>,
}

impl Payload {
    /// Splits a JSON object into links, attributes and items
    pub fn parse(value: &Value) -> CoreResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| CoreError::invalid("representation must be a JSON object"))?;

        let mut payload = Payload::default();
        for (name, field) in object {
            match name.as_str() {
                "links" => payload.links = serde_json::from_value(field.clone())?,
                "items" => match field {
                    Value::Array(items) => payload.items = Some(items.clone()),
                    _ => return Err(CoreError::invalid("'items' must be an array")),
                },
                _ => {
                    payload.attributes.insert(name.clone(), field.clone());
                }
            }
        }
        Ok(payload)
    }

    /// Kind this payload hydrates into, given the kind the caller expects
    ///
    /// Forms are never inferred; an `items` array otherwise means collection.
    pub fn kind(&self, hint: ResourceKind) -> ResourceKind {
        match (hint, &self.items) {
            (ResourceKind::Form, _) => ResourceKind::Form,
            (_, Some(_)) => ResourceKind::Collection,
            (hint, None) => hint,
        }
    }
}

/// A resource together with its lifecycle state
pub struct Tracked {
    resource: RwLock<Resource>,
    state: RwLock<State>,
}

impl Tracked {
    /// Wraps a resource and state in a shared handle
    pub fn new(resource: Resource, state: State) -> ResourceRef {
        Arc::new(Self {
            resource: RwLock::new(resource),
            state: RwLock::new(state),
        })
    }

    /// Wraps an untracked resource with `unknown` status
    pub fn untracked(resource: Resource) -> ResourceRef {
        Self::new(resource, State::new(Status::Unknown))
    }

    /// Returns true if both handles point at the same in-memory resource
    pub fn same(a: &ResourceRef, b: &ResourceRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Resource> {
        self.resource.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Resource> {
        self.resource.write()
    }

    pub fn state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read()
    }

    pub fn state_mut(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write()
    }

    pub fn status(&self) -> Status {
        self.state.read().status()
    }

    pub fn previous_status(&self) -> Option<Status> {
        self.state.read().previous_status()
    }

    pub fn set_status(&self, status: Status) {
        self.state.write().set_status(status);
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.read().kind()
    }

    pub fn uri(&self, relation: &str) -> Option<String> {
        self.resource.read().uri(relation).map(str::to_owned)
    }

    pub fn canonical_uri(&self) -> Option<String> {
        self.resource.read().canonical_uri().map(str::to_owned)
    }

    /// Snapshot of the collection items; empty for other kinds
    pub fn items(&self) -> Vec<ResourceRef> {
        self.resource
            .read()
            .items()
            .map(<[ResourceRef]>::to_vec)
            .unwrap_or_default()
    }

    /// Snapshot of the form fields; empty for other kinds
    pub fn fields(&self) -> Vec<FormField> {
        self.resource
            .read()
            .fields()
            .map(<[FormField]>::to_vec)
            .unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.resource.read().attributes.get(name).cloned()
    }

    pub fn attributes(&self) -> Map<String, Value> {
        self.resource.read().attributes.clone()
    }

    pub fn related(&self, name: &str) -> Option<ResourceRef> {
        self.resource.read().related.get(name).cloned()
    }

    /// Attaches `child` under `name` and records it in the state
    pub fn attach(&self, name: &str, child: ResourceRef) {
        let kind = child.kind();
        self.resource.write().related.insert(name.to_string(), child);
        let mut state = self.state.write();
        match kind {
            ResourceKind::Collection => state.collection.insert(name.to_string()),
            _ => state.singleton.insert(name.to_string()),
        };
    }

    /// Appends `item` to a collection unless the same object is already there
    pub fn push_item(&self, item: ResourceRef) -> CoreResult<()> {
        let mut resource = self.resource.write();
        let found = resource.kind();
        let items = resource.items_mut().ok_or(CoreError::KindMismatch {
            expected: ResourceKind::Collection,
            found,
        })?;
        if !items.iter().any(|existing| Arc::ptr_eq(existing, &item)) {
            items.push(item);
        }
        Ok(())
    }

    /// Removes `item` from a collection, returning true if it was present
    pub fn detach_item(&self, item: &ResourceRef) -> bool {
        let mut resource = self.resource.write();
        match resource.items_mut() {
            Some(items) => {
                let before = items.len();
                items.retain(|existing| !Arc::ptr_eq(existing, item));
                items.len() != before
            }
            None => false,
        }
    }

    /// Serializes the resource to its wire shape
    pub fn to_value(&self) -> Value {
        self.resource.read().to_value()
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resource = self.resource.read();
        f.debug_struct("Tracked")
            .field("uri", &resource.canonical_uri())
            .field("kind", &resource.kind())
            .field("status", &self.state.read().status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_splits_links_attributes_items() {
        let payload = Payload::parse(&json!({
            "links": [{"rel": "self", "href": "https://api.example.com/c"}],
            "name": "c",
            "items": ["https://api.example.com/c/1"]
        }))
        .unwrap();

        assert_eq!(payload.links.len(), 1);
        assert_eq!(payload.attributes.get("name"), Some(&json!("c")));
        assert_eq!(payload.items.as_ref().map(Vec::len), Some(1));
        assert_eq!(payload.kind(ResourceKind::Singleton), ResourceKind::Collection);
        assert_eq!(payload.kind(ResourceKind::Form), ResourceKind::Form);
    }

    #[test]
    fn test_payload_rejects_non_object() {
        assert!(Payload::parse(&json!([1, 2])).is_err());
        assert!(Payload::parse(&json!({"items": "nope"})).is_err());
    }

    #[test]
    fn test_feed_item_wire_names() {
        let item: FeedItem = serde_json::from_value(json!({
            "id": "https://api.example.com/c/1",
            "title": "one",
            "eTag": "\"v1\"",
            "lastModified": "Wed, 21 Oct 2015 07:28:00 GMT"
        }))
        .unwrap();
        assert_eq!(item.e_tag.as_deref(), Some("\"v1\""));
        assert!(item.last_modified.is_some());
    }

    #[test]
    fn test_push_and_detach_item() {
        let collection = Tracked::new(
            Resource::located(ResourceKind::Collection, "https://api.example.com/c"),
            State::new(Status::Hydrated),
        );
        let item = Tracked::new(
            Resource::located(ResourceKind::Singleton, "https://api.example.com/c/1"),
            State::new(Status::LocationOnly),
        );

        collection.push_item(Arc::clone(&item)).unwrap();
        collection.push_item(Arc::clone(&item)).unwrap();
        assert_eq!(collection.items().len(), 1);

        assert!(collection.detach_item(&item));
        assert!(collection.items().is_empty());
        assert!(!collection.detach_item(&item));
    }

    #[test]
    fn test_push_item_onto_singleton_fails() {
        let singleton = Tracked::untracked(Resource::new(ResourceKind::Singleton));
        let item = Tracked::untracked(Resource::new(ResourceKind::Singleton));
        assert!(matches!(
            singleton.push_item(item),
            Err(CoreError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_attach_records_relation_in_state() {
        let parent = Tracked::untracked(Resource::new(ResourceKind::Singleton));
        let steps = Tracked::untracked(Resource::new(ResourceKind::Collection));
        parent.attach("steps", Arc::clone(&steps));

        assert!(parent.state().collection.contains("steps"));
        assert!(parent.state().is_tracked("steps"));
        assert!(Tracked::same(&parent.related("steps").unwrap(), &steps));
    }

    #[test]
    fn test_to_value_writes_wire_shape() {
        let mut resource = Resource::located(ResourceKind::Collection, "https://api.example.com/c");
        resource.attributes.insert("name".to_string(), json!("c"));
        let item = Tracked::new(
            Resource::located(ResourceKind::Singleton, "https://api.example.com/c/1"),
            State::new(Status::LocationOnly),
        );
        resource.items_mut().unwrap().push(item);

        let value = Tracked::new(resource, State::new(Status::Virtual)).to_value();
        assert_eq!(value["name"], json!("c"));
        assert_eq!(value["links"][0]["href"], json!("https://api.example.com/c"));
        assert_eq!(
            value["items"][0]["links"][0]["href"],
            json!("https://api.example.com/c/1")
        );
    }
}
