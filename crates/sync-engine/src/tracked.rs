// crates/sync-engine/src/tracked.rs
//! Load, create, update and delete for tracked resources
//!
//! Every operation resolves its URI through the configured relation, skips
//! inert resources, goes through the request loader and then folds the
//! outcome into the resource's state. Server payloads are merged into the
//! existing object so other holders of a reference observe the update and
//! unchanged collection items keep their identity.

use crate::error::{EngineError, EngineResult};
use crate::options::ResourceOptions;
use chrono::Utc;
use futures::future::join_all;
use semnet_config::Config;
use semnet_core::headers::{CACHE_CONTROL, IF_NONE_MATCH, PRAGMA};
use semnet_core::link::rel;
use semnet_core::{
    freshness, CollectionMerger, Headers, HttpResponse, MakeOptions, MakeSparseStrategy,
    MergeOptions, Resource, ResourceKind, ResourceRef, SparseRepresentationFactory, State, Status,
    Tracked, Transport, TransportError, TransportErrorKind, TransportResult,
};
use semnet_resilience::RequestLoader;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Drives the lifecycle of tracked resources against a [`Transport`]
pub struct TrackedRepresentationFactory {
    transport: Arc<dyn Transport>,
    loader: RequestLoader<TransportResult>,
    sparse: SparseRepresentationFactory,
    merger: CollectionMerger,
}

/// A resource the server just created, not yet loaded
///
/// The resource is `locationOnly` until [`Created::hydrate`] runs its
/// follow-up GET.
#[must_use = "the created resource is not loaded until hydrated"]
pub struct Created<'a> {
    factory: &'a TrackedRepresentationFactory,
    resource: ResourceRef,
    options: ResourceOptions,
}

impl Created<'_> {
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Gives up the follow-up load and keeps the sparse resource
    pub fn into_resource(self) -> ResourceRef {
        self.resource
    }

    /// Loads the created resource and returns it
    pub async fn hydrate(self) -> EngineResult<ResourceRef> {
        self.factory.load_single(&self.resource, &self.options).await
    }
}

impl fmt::Debug for Created<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Created")
            .field("resource", &self.resource)
            .finish()
    }
}

impl TrackedRepresentationFactory {
    /// Creates a factory with a default loader
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_loader(transport, RequestLoader::default())
    }

    /// Creates a factory around an existing loader
    pub fn with_loader(transport: Arc<dyn Transport>, loader: RequestLoader<TransportResult>) -> Self {
        Self {
            transport,
            loader,
            sparse: SparseRepresentationFactory::default(),
            merger: CollectionMerger::default(),
        }
    }

    /// Creates a factory from the `[loader]` and `[sync]` config sections
    pub fn from_config(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self::with_loader(transport, RequestLoader::new(config.loader.max_concurrent))
            .with_sparse(
                SparseRepresentationFactory::new()
                    .with_title_attribute(config.sync.title_attribute.as_str()),
            )
    }

    pub fn with_sparse(mut self, sparse: SparseRepresentationFactory) -> Self {
        self.sparse = sparse;
        self
    }

    /// Replaces the identity rule used when reloaded feeds are merged
    pub fn with_merger(mut self, merger: CollectionMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn sparse(&self) -> &SparseRepresentationFactory {
        &self.sparse
    }

    pub fn loader(&self) -> &RequestLoader<TransportResult> {
        &self.loader
    }

    pub fn merger(&self) -> &CollectionMerger {
        &self.merger
    }

    /// Starts tracking a plain resource with `unknown` status
    pub fn track(&self, resource: Resource) -> ResourceRef {
        Tracked::untracked(resource)
    }

    /// Aborts every queued or running request
    pub fn cancel_all(&self) -> EngineResult<usize> {
        Ok(self.loader.clear_all()?)
    }

    /// Loads a resource and, with `include_items`, the items of a collection
    ///
    /// Returns the same handle that was passed in. Items are walked even
    /// when the collection itself is fresh.
    pub async fn load(
        &self,
        resource: &ResourceRef,
        options: &ResourceOptions,
    ) -> EngineResult<ResourceRef> {
        let loaded = self.load_single(resource, options).await?;
        if options.include_items && loaded.kind() == ResourceKind::Collection {
            self.load_items(&loaded, options).await?;
        }
        Ok(loaded)
    }

    /// Hydrates every item of a collection through its own `self` link
    pub async fn load_items(
        &self,
        collection: &ResourceRef,
        options: &ResourceOptions,
    ) -> EngineResult<()> {
        let items = collection.items();
        let item_options = options.for_item();

        if options.batch_size == 0 {
            let loads = items
                .iter()
                .map(|item| self.load_single(item, &item_options));
            for result in join_all(loads).await {
                result?;
            }
        } else {
            for item in &items {
                self.load_single(item, &item_options).await?;
            }
        }
        Ok(())
    }

    /// Loads one resource, ignoring its items
    pub async fn load_single(
        &self,
        resource: &ResourceRef,
        options: &ResourceOptions,
    ) -> EngineResult<ResourceRef> {
        let status = resource.status();
        if status.is_inert() {
            log::debug!("Not loading {:?}, status is {}", resource, status);
            return Ok(Arc::clone(resource));
        }

        let uri = resolve_uri(resource, &options.rel)?;
        if status == Status::Unknown {
            resource.set_status(Status::LocationOnly);
        }

        let (stale, request_headers) = {
            let state = resource.state();
            (
                freshness::needs_fetch(&state, options.force_load, Utc::now()),
                request_headers(&state, options.force_load),
            )
        };
        if !stale {
            return Ok(Arc::clone(resource));
        }

        let transport = Arc::clone(&self.transport);
        let target = uri.clone();
        let outcome = self
            .loader
            .schedule(uri.as_str(), move || async move {
                transport.get(&target, &request_headers).await
            })
            .await?;

        match outcome {
            Ok(response) => self.apply_load(resource, &response, options.strategy())?,
            Err(error) => record_failure(resource, &uri, error, options.throw_on_load_error)?,
        }
        Ok(Arc::clone(resource))
    }

    /// POSTs `body` to a collection
    ///
    /// A `201` with a `Location` yields the new resource as `locationOnly`,
    /// already appended to `context`; its follow-up GET runs when the
    /// returned [`Created`] is hydrated. Any other answer creates nothing and
    /// leaves `context` untouched.
    pub async fn create(
        &self,
        context: &ResourceRef,
        body: &Value,
        options: &ResourceOptions,
    ) -> EngineResult<Option<Created<'_>>> {
        let uri = resolve_uri(context, &options.rel)?;
        let outcome = self
            .loader
            .submit(|| self.transport.post(&uri, body))
            .await?;

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                log::warn!("Create in {} failed: {}", uri, error);
                return match options.throw_on_create_error {
                    true => Err(EngineError::Transport(error)),
                    false => Ok(None),
                };
            }
        };

        let location = match (response.status, response.headers.location()) {
            (201, Some(location)) => location.to_string(),
            (201, None) => {
                log::warn!("Create in {} returned 201 without a Location", uri);
                return Ok(None);
            }
            (status, _) => {
                log::info!("Create in {} answered {}, nothing to process", uri, status);
                return Ok(None);
            }
        };

        log::info!("Created {} in {}", location, uri);
        let created = self.sparse.make_with(
            options.strategy(),
            MakeOptions::location(location, ResourceKind::Singleton),
        )?;
        if context.kind() == ResourceKind::Collection {
            context.push_item(Arc::clone(&created))?;
        }
        Ok(Some(Created {
            factory: self,
            resource: created,
            options: options.for_item(),
        }))
    }

    /// PUTs `body` to a resource
    ///
    /// A response body is merged like a load; an empty `2xx` merges the
    /// submitted fields into the attributes.
    pub async fn update(
        &self,
        resource: &ResourceRef,
        body: &Value,
        options: &ResourceOptions,
    ) -> EngineResult<ResourceRef> {
        let status = resource.status();
        if status.is_inert() {
            log::debug!("Not updating {:?}, status is {}", resource, status);
            return Ok(Arc::clone(resource));
        }

        let uri = resolve_uri(resource, &options.rel)?;
        let outcome = self
            .loader
            .submit(|| self.transport.put(&uri, body))
            .await?;

        match outcome {
            Ok(response) => {
                match &response.body {
                    Some(value) => self.merge_representation(resource, value, options.strategy())?,
                    None => merge_fields(resource, body),
                }
                resource
                    .state_mut()
                    .mark_retrieved(&response.headers, Utc::now());
                log::info!("Updated {}", uri);
            }
            Err(error) => record_failure(resource, &uri, error, options.throw_on_update_error)?,
        }
        Ok(Arc::clone(resource))
    }

    /// DELETEs a resource
    ///
    /// The resource is `deleteInProgress` while the request runs and
    /// `deleted` once the server confirms.
    pub async fn delete(
        &self,
        resource: &ResourceRef,
        options: &ResourceOptions,
    ) -> EngineResult<ResourceRef> {
        let status = resource.status();
        if status.is_inert() {
            log::debug!("Not deleting {:?}, status is {}", resource, status);
            return Ok(Arc::clone(resource));
        }

        let uri = resolve_uri(resource, &options.rel)?;
        resource.set_status(Status::DeleteInProgress);

        let outcome = match self
            .loader
            .submit(|| self.transport.delete(&uri, None))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                resource.set_status(status);
                return Err(e.into());
            }
        };

        match outcome {
            Ok(_) => {
                resource.set_status(Status::Deleted);
                log::info!("Deleted {}", uri);
            }
            Err(error) => record_failure(resource, &uri, error, options.throw_on_delete_error)?,
        }
        Ok(Arc::clone(resource))
    }

    /// Removes `item` from a collection on the server without deleting it
    ///
    /// Sends `DELETE <collection>` with the item's link as the body. Returns
    /// true once the item has been removed locally as well.
    pub async fn delete_from(
        &self,
        context: &ResourceRef,
        item: &ResourceRef,
        options: &ResourceOptions,
    ) -> EngineResult<bool> {
        let uri = resolve_uri(context, &options.rel)?;
        let body = membership_body(item)?;

        let outcome = self
            .loader
            .submit(|| self.transport.delete(&uri, Some(&body)))
            .await?;

        match outcome {
            Ok(_) => {
                log::info!("Removed {:?} from {}", item, uri);
                Ok(self.remove_item(context, item))
            }
            Err(error) => {
                log::warn!("Removing {:?} from {} failed: {}", item, uri, error);
                match options.throw_on_delete_error {
                    true => Err(EngineError::Transport(error)),
                    false => Ok(false),
                }
            }
        }
    }

    /// Adds an existing resource to a collection on the server
    ///
    /// Sends `POST <collection>` with the item's link as the body and
    /// appends the item locally on success.
    pub async fn contribute(
        &self,
        context: &ResourceRef,
        item: &ResourceRef,
        options: &ResourceOptions,
    ) -> EngineResult<bool> {
        let uri = resolve_uri(context, &options.rel)?;
        let body = membership_body(item)?;

        let outcome = self
            .loader
            .submit(|| self.transport.post(&uri, &body))
            .await?;

        match outcome {
            Ok(_) => {
                context.push_item(Arc::clone(item))?;
                log::info!("Added {:?} to {}", item, uri);
                Ok(true)
            }
            Err(error) => {
                log::warn!("Adding {:?} to {} failed: {}", item, uri, error);
                match options.throw_on_create_error {
                    true => Err(EngineError::Transport(error)),
                    false => Ok(false),
                }
            }
        }
    }

    /// Detaches `item` from `context` and marks it `stale`
    ///
    /// Membership changed, but the item itself may still exist elsewhere.
    pub fn remove_item(&self, context: &ResourceRef, item: &ResourceRef) -> bool {
        let removed = context.detach_item(item);
        if removed {
            item.set_status(Status::Stale);
        }
        removed
    }

    /// Follows a link relation to a loaded sub-resource
    ///
    /// The parent is loaded first. The child is attached under `relation`
    /// on first use and reused afterwards. Returns `None` when the parent
    /// has no such link.
    pub async fn get_related(
        &self,
        resource: &ResourceRef,
        relation: &str,
        kind: ResourceKind,
        options: &ResourceOptions,
    ) -> EngineResult<Option<ResourceRef>> {
        self.load_single(resource, &options.for_item()).await?;

        let child = match resource.related(relation) {
            Some(child) => child,
            None => {
                let Some(uri) = resource.uri(relation) else {
                    return Ok(None);
                };
                let child = self
                    .sparse
                    .make_with(options.strategy(), MakeOptions::location(uri, kind))?;
                resource.attach(relation, Arc::clone(&child));
                child
            }
        };

        let child_options = ResourceOptions {
            rel: rel::SELF.to_string(),
            ..options.clone()
        };
        Ok(Some(self.load(&child, &child_options).await?))
    }

    /// Loads the form behind `relation`, typically `edit-form` or `create-form`
    pub async fn get_form(
        &self,
        resource: &ResourceRef,
        relation: &str,
        options: &ResourceOptions,
    ) -> EngineResult<Option<ResourceRef>> {
        let form_options = options.for_item();
        self.get_related(resource, relation, ResourceKind::Form, &form_options)
            .await
    }

    fn apply_load(
        &self,
        resource: &ResourceRef,
        response: &HttpResponse,
        strategy: &dyn MakeSparseStrategy,
    ) -> EngineResult<()> {
        let now = Utc::now();
        if response.is_not_modified() {
            log::debug!("{:?} not modified", resource);
            resource.state_mut().mark_retrieved(&response.headers, now);
            return Ok(());
        }

        if let Some(body) = &response.body {
            self.merge_representation(resource, body, strategy)?;
        }
        resource.state_mut().mark_retrieved(&response.headers, now);
        log::debug!("Loaded {:?}", resource);
        Ok(())
    }

    fn merge_representation(
        &self,
        resource: &ResourceRef,
        value: &Value,
        strategy: &dyn MakeSparseStrategy,
    ) -> EngineResult<()> {
        let current = resource.kind();
        let mut incoming = self.sparse.resource_from_value(value, current, strategy)?;
        let found = incoming.kind();

        if current == ResourceKind::Collection && found == ResourceKind::Collection {
            let attributes = std::mem::take(&mut incoming.attributes);
            let replace_links = !incoming.links.is_empty();
            let staged = Tracked::untracked(incoming);
            self.merger.merge(
                resource,
                &staged,
                MergeOptions {
                    replace_links,
                    copy_headers: false,
                },
            );
            resource.write().attributes = attributes;
            return Ok(());
        }

        if current != found {
            log::debug!("{:?} is now a {}", resource, found);
        }
        let mut target = resource.write();
        if !incoming.links.is_empty() {
            target.links = incoming.links;
        }
        target.attributes = incoming.attributes;
        target.body = incoming.body;
        Ok(())
    }
}

fn resolve_uri(resource: &ResourceRef, relation: &str) -> EngineResult<String> {
    resource.uri(relation).ok_or_else(|| {
        EngineError::configuration(format!(
            "no '{}' link to operate on for {:?}",
            relation, resource
        ))
    })
}

fn request_headers(state: &State, force_load: bool) -> Headers {
    let mut headers = Headers::new();
    if state.status() == Status::StaleFromETag {
        if let Some(etag) = state.headers.etag() {
            headers.insert(IF_NONE_MATCH, etag);
        }
        headers.insert(CACHE_CONTROL, "no-cache");
        headers.insert(PRAGMA, "no-cache");
    } else if force_load {
        headers.insert(CACHE_CONTROL, "no-cache");
    }
    headers
}

/// Folds a transport failure into the resource state
///
/// Only returns an error when `throw` is set.
fn record_failure(
    resource: &ResourceRef,
    uri: &str,
    error: TransportError,
    throw: bool,
) -> EngineResult<()> {
    let kind = error.kind();
    let status = match kind {
        TransportErrorKind::Forbidden => Status::Forbidden,
        TransportErrorKind::Gone => Status::Deleted,
        _ => Status::Unknown,
    };

    match kind {
        TransportErrorKind::Unclassified => log::error!("Request to {} failed: {}", uri, error),
        _ => log::warn!("Request to {} failed: {}, now {}", uri, error, status),
    }

    resource.state_mut().mark_failed(status, error.clone());
    match throw {
        true => Err(EngineError::Transport(error)),
        false => Ok(()),
    }
}

fn merge_fields(resource: &ResourceRef, body: &Value) {
    if let Value::Object(fields) = body {
        let mut target = resource.write();
        for (name, value) in fields {
            if name != "links" && name != "items" {
                target.attributes.insert(name.clone(), value.clone());
            }
        }
    }
}

fn membership_body(item: &ResourceRef) -> EngineResult<Value> {
    let uri = item.canonical_uri().ok_or_else(|| {
        EngineError::configuration(format!("{:?} has no URI to reference", item))
    })?;
    Ok(json!({ "links": [{ "rel": rel::SELF, "href": uri }] }))
}
