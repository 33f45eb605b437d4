// crates/core/src/sparse.rs
//! Construction of resource stubs, sparse or hydrated, fresh or pooled
//!
//! Every tracked resource is born here. [`SparseRepresentationFactory::make`]
//! builds a fresh resource; a [`MakeSparseStrategy`] can route creation
//! through a [`Pool`] so one logical resource is only materialized once.

use crate::error::{CoreError, CoreResult};
use crate::headers::{Headers, ETAG, LAST_MODIFIED};
use crate::link::{self, Link};
use crate::pool::Pool;
use crate::resource::{Body, FeedItem, Payload, Resource, ResourceKind, ResourceRef, Tracked};
use crate::state::{State, Status};
use serde_json::Value;
use std::fmt;

/// Attribute that feed titles are written to unless configured otherwise
pub const DEFAULT_TITLE_ATTRIBUTE: &str = "name";

/// Everything needed to make one resource
#[derive(Debug, Clone, PartialEq)]
pub struct MakeOptions {
    pub uri: Option<String>,
    pub kind: ResourceKind,
    /// Overrides the status the resource is born with
    pub status: Option<Status>,
    /// Feed title, written to the factory's title attribute
    pub title: Option<String>,
    pub feed_headers: Headers,
    /// Seed data; when present the resource is built hydrated
    pub add_state_on: Option<Value>,
}

impl MakeOptions {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            uri: None,
            kind,
            status: None,
            title: None,
            feed_headers: Headers::new(),
            add_state_on: None,
        }
    }

    /// Options for a resource known by URI
    pub fn location(uri: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::new(kind)
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_feed_headers(mut self, headers: Headers) -> Self {
        self.feed_headers = headers;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.add_state_on = Some(data);
        self
    }
}

/// Decides where a newly requested resource comes from
pub trait MakeSparseStrategy: Send + Sync + fmt::Debug {
    /// Returns the resource described by `options`, new or shared
    fn make(
        &self,
        factory: &SparseRepresentationFactory,
        options: MakeOptions,
    ) -> CoreResult<ResourceRef>;
}

/// Always builds a new resource
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshMakeStrategy;

impl MakeSparseStrategy for FreshMakeStrategy {
    fn make(
        &self,
        factory: &SparseRepresentationFactory,
        options: MakeOptions,
    ) -> CoreResult<ResourceRef> {
        factory.make_fresh(options, self)
    }
}

/// Builds collections fresh but takes their items from a pool
#[derive(Debug, Clone)]
pub struct PooledCollectionMakeStrategy {
    pool: Pool,
}

impl PooledCollectionMakeStrategy {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl MakeSparseStrategy for PooledCollectionMakeStrategy {
    fn make(
        &self,
        factory: &SparseRepresentationFactory,
        options: MakeOptions,
    ) -> CoreResult<ResourceRef> {
        let kind = options.kind;
        match (kind, options.uri.clone()) {
            (ResourceKind::Collection, _) | (_, None) => factory.make_fresh(options, self),
            (_, Some(uri)) => self
                .pool
                .get_or_insert_with(&uri, || factory.make_fresh(options, &FreshMakeStrategy)),
        }
    }
}

/// Takes every located resource from a pool
#[derive(Debug, Clone)]
pub struct PooledSingletonMakeStrategy {
    pool: Pool,
}

impl PooledSingletonMakeStrategy {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl MakeSparseStrategy for PooledSingletonMakeStrategy {
    fn make(
        &self,
        factory: &SparseRepresentationFactory,
        options: MakeOptions,
    ) -> CoreResult<ResourceRef> {
        match options.uri.clone() {
            Some(uri) => self
                .pool
                .get_or_insert_with(&uri, || factory.make_fresh(options, &FreshMakeStrategy)),
            None => factory.make_fresh(options, &FreshMakeStrategy),
        }
    }
}

/// Factory for resource stubs
#[derive(Debug, Clone)]
pub struct SparseRepresentationFactory {
    title_attribute: String,
}

impl SparseRepresentationFactory {
    pub fn new() -> Self {
        Self {
            title_attribute: DEFAULT_TITLE_ATTRIBUTE.to_string(),
        }
    }

    /// Sets the attribute feed titles are mapped onto
    pub fn with_title_attribute(mut self, name: impl Into<String>) -> Self {
        self.title_attribute = name.into();
        self
    }

    pub fn title_attribute(&self) -> &str {
        &self.title_attribute
    }

    /// Makes a resource with the default (fresh) strategy
    pub fn make(&self, options: MakeOptions) -> CoreResult<ResourceRef> {
        FreshMakeStrategy.make(self, options)
    }

    /// Makes a resource with the given strategy
    pub fn make_with(
        &self,
        strategy: &dyn MakeSparseStrategy,
        options: MakeOptions,
    ) -> CoreResult<ResourceRef> {
        strategy.make(self, options)
    }

    /// Builds a new resource; collection items go through `strategy`
    ///
    /// With seed data the resource is hydrated. Without it the resource is
    /// `locationOnly` when a URI is given and `virtual` otherwise.
    pub fn make_fresh(
        &self,
        options: MakeOptions,
        strategy: &dyn MakeSparseStrategy,
    ) -> CoreResult<ResourceRef> {
        let MakeOptions {
            uri,
            kind,
            status,
            title,
            feed_headers,
            add_state_on,
        } = options;

        let (mut resource, default_status) = match add_state_on {
            Some(data) => {
                let mut resource = self.resource_from_value(&data, kind, strategy)?;
                if let Some(uri) = &uri {
                    if resource.canonical_uri().is_none() {
                        resource.links.push(Link::self_link(uri.as_str()));
                    }
                }
                (resource, Status::Hydrated)
            }
            None => match &uri {
                Some(uri) => (Resource::located(kind, uri.as_str()), Status::LocationOnly),
                None => (Resource::new(kind), Status::Virtual),
            },
        };

        if let Some(title) = title {
            resource
                .attributes
                .insert(self.title_attribute.clone(), Value::String(title));
        }

        let mut state = State::new(status.unwrap_or(default_status));
        state.feed_headers = feed_headers;
        Ok(Tracked::new(resource, state))
    }

    /// Options for the stub of a compact feed entry
    pub fn feed_item_options(&self, entry: FeedItem) -> MakeOptions {
        let mut headers = Headers::new();
        if let Some(e_tag) = entry.e_tag {
            headers.insert(ETAG, e_tag);
        }
        if let Some(last_modified) = entry.last_modified {
            headers.insert(LAST_MODIFIED, last_modified);
        }

        let mut options = MakeOptions::location(entry.id, ResourceKind::Singleton)
            .with_status(Status::FeedOnly)
            .with_feed_headers(headers);
        options.title = entry.title;
        options
    }

    /// Returns the pooled sparse resource for `uri`, creating it on first use
    pub fn make_sparse_pooled(
        &self,
        pool: &Pool,
        uri: &str,
        kind: ResourceKind,
    ) -> CoreResult<ResourceRef> {
        pool.get_or_insert_with(uri, || self.make(MakeOptions::location(uri, kind)))
    }

    /// Returns the pooled singleton for `uri`, hydrated from `data`
    ///
    /// An existing pooled object is returned as is when already hydrated,
    /// otherwise it is hydrated in place.
    pub fn make_hydrated_pool_singleton(
        &self,
        pool: &Pool,
        uri: &str,
        data: &Value,
    ) -> CoreResult<ResourceRef> {
        let pooled = pool.get_or_insert_with(uri, || {
            self.make(MakeOptions::location(uri, ResourceKind::Singleton).with_data(data.clone()))
        })?;
        if pooled.status() != Status::Hydrated {
            self.hydrate(&pooled, data, &FreshMakeStrategy)?;
        }
        Ok(pooled)
    }

    /// Replaces the content of `target` with `data` and marks it hydrated
    pub fn hydrate(
        &self,
        target: &Tracked,
        data: &Value,
        strategy: &dyn MakeSparseStrategy,
    ) -> CoreResult<()> {
        let incoming = self.resource_from_value(data, target.kind(), strategy)?;
        {
            let mut resource = target.write();
            if !incoming.links.is_empty() {
                resource.links = incoming.links;
            }
            resource.attributes = incoming.attributes;
            resource.body = incoming.body;
        }
        target.set_status(Status::Hydrated);
        Ok(())
    }

    /// Parses a wire representation; collection items go through `strategy`
    pub fn resource_from_value(
        &self,
        value: &Value,
        hint: ResourceKind,
        strategy: &dyn MakeSparseStrategy,
    ) -> CoreResult<Resource> {
        let payload = Payload::parse(value)?;
        let kind = payload.kind(hint);
        let Payload {
            links,
            attributes,
            items,
        } = payload;

        let body = match kind {
            ResourceKind::Singleton => Body::Singleton,
            ResourceKind::Collection => {
                Body::Collection(self.make_items(items.as_deref().unwrap_or(&[]), strategy)?)
            }
            ResourceKind::Form => Body::Form(match items {
                Some(fields) => serde_json::from_value(Value::Array(fields))?,
                None => Vec::new(),
            }),
        };

        let mut resource = Resource::new(kind);
        resource.links = links;
        resource.attributes = attributes;
        resource.body = body;
        Ok(resource)
    }

    /// Makes the item stubs of a collection
    ///
    /// Items may be bare URIs (`locationOnly`), compact feed entries
    /// (`feedOnly`) or embedded resources (hydrated).
    pub fn make_items(
        &self,
        raw: &[Value],
        strategy: &dyn MakeSparseStrategy,
    ) -> CoreResult<Vec<ResourceRef>> {
        raw.iter().map(|item| self.make_item(item, strategy)).collect()
    }

    fn make_item(&self, raw: &Value, strategy: &dyn MakeSparseStrategy) -> CoreResult<ResourceRef> {
        match raw {
            Value::String(uri) => {
                strategy.make(self, MakeOptions::location(uri.as_str(), ResourceKind::Singleton))
            }
            Value::Object(object) if object.contains_key("links") => {
                let links: Vec<Link> = serde_json::from_value(object["links"].clone())?;
                let mut options = MakeOptions::new(ResourceKind::Singleton).with_data(raw.clone());
                options.uri = link::canonical_or_self(&links).map(str::to_owned);
                strategy.make(self, options)
            }
            Value::Object(object) if object.contains_key("id") => {
                let entry: FeedItem = serde_json::from_value(raw.clone())?;
                strategy.make(self, self.feed_item_options(entry))
            }
            _ => Err(CoreError::invalid(
                "collection items must be URIs, feed entries or resources",
            )),
        }
    }

    /// Turns an authored JSON document into a graph of `virtual` resources
    ///
    /// Nested objects with `links` (and arrays of them) become named related
    /// resources, `items` become collection items and string items become
    /// link-only stubs.
    pub fn make_document(&self, value: &Value) -> CoreResult<ResourceRef> {
        let payload = Payload::parse(value)?;
        let kind = payload.kind(ResourceKind::Singleton);

        let mut resource = Resource::new(kind);
        resource.links = payload.links;

        let mut related = Vec::new();
        for (name, field) in payload.attributes {
            if is_resource_object(&field) {
                related.push((name, self.make_document(&field)?));
            } else if is_resource_array(&field) {
                related.push((name, self.make_document_collection(&field)?));
            } else {
                resource.attributes.insert(name, field);
            }
        }

        if let (Some(items), Some(slot)) = (payload.items, resource.items_mut()) {
            *slot = self.make_document_items(&items)?;
        }

        let document = Tracked::new(resource, State::new(Status::Virtual));
        for (name, child) in related {
            document.attach(&name, child);
        }
        Ok(document)
    }

    fn make_document_collection(&self, value: &Value) -> CoreResult<ResourceRef> {
        let mut resource = Resource::new(ResourceKind::Collection);
        if let (Value::Array(items), Some(slot)) = (value, resource.items_mut()) {
            *slot = self.make_document_items(items)?;
        }
        Ok(Tracked::new(resource, State::new(Status::Virtual)))
    }

    fn make_document_items(&self, items: &[Value]) -> CoreResult<Vec<ResourceRef>> {
        items
            .iter()
            .map(|item| match item {
                Value::String(uri) => Ok(Tracked::new(
                    Resource::located(ResourceKind::Singleton, uri.as_str()),
                    State::new(Status::Virtual),
                )),
                other => self.make_document(other),
            })
            .collect()
    }
}

impl Default for SparseRepresentationFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn is_resource_object(value: &Value) -> bool {
    value.as_object().is_some_and(|o| o.contains_key("links"))
}

fn is_resource_array(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| !items.is_empty() && items.iter().all(is_resource_object))
}
