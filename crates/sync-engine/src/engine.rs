// crates/sync-engine/src/engine.rs
//! Sync driver
//!
//! A pass walks a [`Strategy`] tree breadth first. Each level is a list of
//! tasks pairing a live resource with a document resource; running a task
//! applies the differences and yields [`SyncInfo`]s, and each info spawns
//! one task per child strategy on the next level. All writes of a level
//! finish before the next level starts.

use crate::differencer::{CollectionDiff, Differencer};
use crate::error::{EngineError, EngineResult};
use crate::merge::{AttributeMergeStrategy, EditMergeStrategy};
use crate::options::SyncOptions;
use crate::pooled::PooledResource;
use crate::resolver::UriMappingResolver;
use crate::strategy::{Strategy, SyncMode};
use crate::tracked::TrackedRepresentationFactory;
use crate::types::{SyncAction, SyncInfo, SyncReport, SyncStats};
use futures::future::join_all;
use semnet_config::Config;
use semnet_core::link::rel;
use semnet_core::{MakeOptions, Pool, ResourceKind, ResourceRef, Status, Transport};
use serde_json::Value;
use std::sync::Arc;

/// One live/document pair to reconcile under a strategy
struct Task<'a> {
    resource: ResourceRef,
    document: ResourceRef,
    strategy: &'a Strategy,
}

#[derive(Default)]
struct Outcome {
    infos: Vec<SyncInfo>,
    stats: SyncStats,
}

impl Outcome {
    fn info(&mut self, resource: &ResourceRef, document: &ResourceRef, action: SyncAction) {
        self.infos.push(SyncInfo {
            resource: Arc::clone(resource),
            document: Arc::clone(document),
            action,
        });
    }
}

/// Reconciles live resources with authored documents
pub struct SyncEngine {
    tracked: Arc<TrackedRepresentationFactory>,
    merge: Arc<dyn EditMergeStrategy>,
    resolver: Arc<UriMappingResolver>,
    pools: PooledResource,
    options: SyncOptions,
}

impl SyncEngine {
    /// Creates an engine with default options and attribute merging
    pub fn new(tracked: Arc<TrackedRepresentationFactory>) -> Self {
        Self {
            tracked,
            merge: Arc::new(AttributeMergeStrategy),
            resolver: Arc::new(UriMappingResolver::new()),
            pools: PooledResource::new(),
            options: SyncOptions::default(),
        }
    }

    /// Creates an engine and its tracked factory from configuration
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let tracked = TrackedRepresentationFactory::from_config(transport, config);
        Self::new(Arc::new(tracked)).with_options(SyncOptions::from_config(&config.sync))
    }

    pub fn with_merge_strategy(mut self, merge: Arc<dyn EditMergeStrategy>) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Shares a resolver with other engines or passes
    pub fn with_resolver(mut self, resolver: Arc<UriMappingResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Makes `pool` available to strategies naming `name`
    pub fn register_pool(&self, name: impl Into<String>, pool: Pool) {
        self.pools.register(name, pool);
    }

    pub fn tracked(&self) -> &TrackedRepresentationFactory {
        &self.tracked
    }

    pub fn resolver(&self) -> &UriMappingResolver {
        &self.resolver
    }

    pub fn pools(&self) -> &PooledResource {
        &self.pools
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Syncs `resource` to match `document` with the engine's options
    pub async fn sync(
        &self,
        resource: &ResourceRef,
        document: &ResourceRef,
        strategy: &Strategy,
    ) -> EngineResult<SyncReport> {
        self.sync_with(resource, document, strategy, &self.options).await
    }

    /// Syncs `resource` to match an authored JSON document
    pub async fn sync_document(
        &self,
        resource: &ResourceRef,
        document: &Value,
        strategy: &Strategy,
    ) -> EngineResult<SyncReport> {
        let document = self.tracked.sparse().make_document(document)?;
        self.sync(resource, &document, strategy).await
    }

    /// Syncs `resource` to match `document` with explicit options
    pub async fn sync_with(
        &self,
        resource: &ResourceRef,
        document: &ResourceRef,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> EngineResult<SyncReport> {
        let mut report = SyncReport::default();
        let mut level = vec![Task {
            resource: Arc::clone(resource),
            document: Arc::clone(document),
            strategy,
        }];
        let mut depth = 0;

        while !level.is_empty() {
            log::debug!("Sync level {}: {} task(s)", depth, level.len());
            let outcomes = self.run_level(&level, options).await?;

            let mut next = Vec::new();
            for (task, outcome) in level.iter().zip(outcomes) {
                report.stats.absorb(&outcome.stats);
                for info in &outcome.infos {
                    for child in &task.strategy.children {
                        next.push(Task {
                            resource: Arc::clone(&info.resource),
                            document: Arc::clone(&info.document),
                            strategy: child,
                        });
                    }
                }
                if depth == 0 {
                    report.infos.extend(outcome.infos);
                }
            }

            level = next;
            depth += 1;
        }

        log::info!(
            "Sync finished: {} created, {} updated, {} deleted, {} skipped",
            report.stats.created,
            report.stats.updated,
            report.stats.deleted,
            report.stats.skipped
        );
        Ok(report)
    }

    async fn run_level(
        &self,
        level: &[Task<'_>],
        options: &SyncOptions,
    ) -> EngineResult<Vec<Outcome>> {
        if options.is_sequential() {
            let mut outcomes = Vec::with_capacity(level.len());
            for task in level {
                outcomes.push(self.run_task(task, options).await?);
            }
            return Ok(outcomes);
        }

        join_all(level.iter().map(|task| self.run_task(task, options)))
            .await
            .into_iter()
            .collect()
    }

    async fn run_task(&self, task: &Task<'_>, options: &SyncOptions) -> EngineResult<Outcome> {
        let strategy = task.strategy;

        let mut outcome = match &strategy.rel {
            None if strategy.rel_on_document.is_some() => {
                return Err(EngineError::configuration(
                    "sync of a named resource must have a rel specified",
                ));
            }
            None => {
                let live = self.tracked.load(&task.resource, &options.resource).await?;
                self.dispatch(&live, &task.document, strategy, options).await?
            }
            Some(relation) => self.run_named(task, relation, options).await?,
        };

        outcome.stats.tasks += 1;
        Ok(outcome)
    }

    async fn run_named(
        &self,
        task: &Task<'_>,
        relation: &str,
        options: &SyncOptions,
    ) -> EngineResult<Outcome> {
        let document_rel = task.strategy.document_rel().unwrap_or(relation);
        let Some(document) = task.document.related(document_rel) else {
            log::debug!("Document has no '{}', nothing to sync", document_rel);
            return Ok(Outcome::default());
        };

        let live = self
            .tracked
            .get_related(&task.resource, relation, document.kind(), &options.resource)
            .await?;
        match live {
            Some(live) => self.dispatch(&live, &document, task.strategy, options).await,
            None => {
                log::warn!("{:?} has no '{}' link, skipping", task.resource, relation);
                let mut outcome = Outcome::default();
                outcome.stats.skipped += 1;
                Ok(outcome)
            }
        }
    }

    /// Picks the reconciliation for a loaded live resource
    async fn dispatch(
        &self,
        live: &ResourceRef,
        document: &ResourceRef,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> EngineResult<Outcome> {
        if document.kind() == ResourceKind::Collection && live.kind() != ResourceKind::Collection {
            return Err(EngineError::configuration(
                "cannot sync a document collection onto a singleton resource",
            ));
        }

        if live.status() != Status::Hydrated {
            log::warn!("{:?} could not be loaded, skipping", live);
            let mut outcome = Outcome::default();
            outcome.stats.skipped += 1;
            return Ok(outcome);
        }

        match (document.kind(), live.kind()) {
            (ResourceKind::Collection, _) => {
                self.sync_collection(live, &document.items(), strategy, options, true)
                    .await
            }
            (_, ResourceKind::Collection) => {
                let documents = [Arc::clone(document)];
                self.sync_collection(live, &documents, strategy, options, false)
                    .await
            }
            _ => self.sync_singleton(live, document, strategy, options).await,
        }
    }

    async fn sync_singleton(
        &self,
        live: &ResourceRef,
        document: &ResourceRef,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> EngineResult<Outcome> {
        let mut outcome = Outcome::default();

        if strategy.mode != SyncMode::Normal {
            self.remember(document, live);
            outcome.stats.unchanged += 1;
            outcome.info(live, document, SyncAction::Update);
            return Ok(outcome);
        }

        if self.edit(live, document, options, &mut outcome.stats).await? {
            self.remember(document, live);
            outcome.info(live, document, SyncAction::Update);
        }
        Ok(outcome)
    }

    async fn sync_collection(
        &self,
        live: &ResourceRef,
        documents: &[ResourceRef],
        strategy: &Strategy,
        options: &SyncOptions,
        with_deletes: bool,
    ) -> EngineResult<Outcome> {
        let differencer = Differencer::new(options.match_attribute.as_deref());
        let items = live.items();
        if differencer.wants_hydrated(&items, documents, &self.resolver) {
            self.tracked.load_items(live, &options.resource).await?;
        }

        let mut diff = differencer.diff(&items, documents, &self.resolver);
        if !with_deletes {
            diff.delete.clear();
        }

        match strategy.mode {
            SyncMode::Normal => self.apply_normal(live, diff, strategy, options).await,
            SyncMode::ReadOnly => Ok(self.apply_read_only(diff, strategy, options)),
            SyncMode::ContributeOnly => {
                self.apply_contribute_only(live, diff, strategy, options)
                    .await
            }
        }
    }

    async fn apply_normal(
        &self,
        live: &ResourceRef,
        diff: CollectionDiff,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> EngineResult<Outcome> {
        let mut outcome = Outcome::default();
        let mut create_form: Option<Option<ResourceRef>> = None;

        for document in &diff.create {
            if let Some(pooled) = self.find_pooled(document, strategy, options) {
                live.push_item(Arc::clone(&pooled))?;
                self.remember(document, &pooled);
                outcome.stats.unchanged += 1;
                outcome.info(&pooled, document, SyncAction::Update);
                continue;
            }

            let form = match &create_form {
                Some(form) => form.clone(),
                None => {
                    let form = self
                        .tracked
                        .get_form(live, rel::CREATE_FORM, &options.resource)
                        .await?;
                    create_form = Some(form.clone());
                    form
                }
            };

            let body = self.merge.make_create(document, form.as_ref(), &self.resolver);
            let created = self
                .tracked
                .create(live, &body, &options.resource.for_item())
                .await?;
            match created {
                Some(created) => {
                    let resource = Arc::clone(created.resource());
                    self.record_created(document, &resource);
                    if let Some(pool) = &strategy.pool {
                        self.pools.insert(pool, Arc::clone(&resource))?;
                    }
                    created.hydrate().await?;
                    outcome.stats.created += 1;
                    outcome.info(&resource, document, SyncAction::Create);
                }
                None => {
                    log::warn!("Nothing was created for {:?}", document);
                    outcome.stats.skipped += 1;
                }
            }
        }

        for (item, document) in &diff.update {
            let item = self
                .tracked
                .load_single(item, &options.resource.for_item())
                .await?;
            if item.status() != Status::Hydrated {
                log::warn!("{:?} could not be loaded, not updating", item);
                outcome.stats.skipped += 1;
                continue;
            }
            if self.edit(&item, document, options, &mut outcome.stats).await? {
                self.remember(document, &item);
                outcome.info(&item, document, SyncAction::Update);
            }
        }

        for item in &diff.delete {
            let deleted = self
                .tracked
                .delete(item, &options.resource.for_item())
                .await?;
            if deleted.status() == Status::Deleted {
                live.detach_item(item);
                self.forget(item);
                outcome.stats.deleted += 1;
            } else {
                log::warn!("{:?} was not deleted", item);
                outcome.stats.skipped += 1;
            }
        }

        Ok(outcome)
    }

    fn apply_read_only(
        &self,
        diff: CollectionDiff,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> Outcome {
        let mut outcome = Outcome::default();

        for document in &diff.create {
            match self.find_pooled(document, strategy, options) {
                Some(pooled) => {
                    self.remember(document, &pooled);
                    outcome.stats.unchanged += 1;
                    outcome.info(&pooled, document, SyncAction::Update);
                }
                None => {
                    log::debug!("Read-only, not creating {:?}", document);
                    outcome.stats.skipped += 1;
                }
            }
        }

        for (item, document) in &diff.update {
            self.remember(document, item);
            outcome.stats.unchanged += 1;
            outcome.info(item, document, SyncAction::Update);
        }

        if !diff.delete.is_empty() {
            log::debug!("Read-only, not deleting {} item(s)", diff.delete.len());
            outcome.stats.skipped += diff.delete.len();
        }
        outcome
    }

    async fn apply_contribute_only(
        &self,
        live: &ResourceRef,
        diff: CollectionDiff,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> EngineResult<Outcome> {
        let mut outcome = Outcome::default();

        for document in &diff.create {
            let Some(candidate) = self.contribution_for(document, strategy, options).await? else {
                log::warn!("No resource to contribute for {:?}", document);
                outcome.stats.skipped += 1;
                continue;
            };

            if self
                .tracked
                .contribute(live, &candidate, &options.resource.for_item())
                .await?
            {
                self.record_created(document, &candidate);
                outcome.stats.created += 1;
                outcome.info(&candidate, document, SyncAction::Create);
            } else {
                outcome.stats.skipped += 1;
            }
        }

        for (item, document) in &diff.update {
            self.remember(document, item);
            outcome.stats.unchanged += 1;
            outcome.info(item, document, SyncAction::Update);
        }

        for item in &diff.delete {
            if self
                .tracked
                .delete_from(live, item, &options.resource.for_item())
                .await?
            {
                self.forget(item);
                outcome.stats.deleted += 1;
            } else {
                outcome.stats.skipped += 1;
            }
        }

        Ok(outcome)
    }

    /// The existing resource a contribute-only collection should reference
    ///
    /// The pool is asked first, then a new resource is created in the pool
    /// collection, and finally the document's (resolved) URI is used as is.
    async fn contribution_for(
        &self,
        document: &ResourceRef,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> EngineResult<Option<ResourceRef>> {
        if let Some(pooled) = self.find_pooled(document, strategy, options) {
            return Ok(Some(pooled));
        }

        let pool = strategy.pool.as_deref().and_then(|name| self.pools.pool(name));
        if let Some(pool) = pool {
            let collection = pool.collection();
            if collection.uri(rel::SELF).is_some() {
                let body = self.merge.make_create(document, None, &self.resolver);
                let created = self
                    .tracked
                    .create(collection, &body, &options.resource.for_item())
                    .await?;
                return match created {
                    Some(created) => created.hydrate().await.map(Some),
                    None => Ok(None),
                };
            }
        }

        let Some(uri) = document.canonical_uri() else {
            return Ok(None);
        };
        let target = self.resolver.resolve(&uri);
        let sparse = self.tracked.sparse().make_with(
            options.resource.strategy(),
            MakeOptions::location(target, ResourceKind::Singleton),
        )?;
        Ok(Some(sparse))
    }

    /// PUTs the document's differences onto `live`
    ///
    /// Returns false when a wanted update failed.
    async fn edit(
        &self,
        live: &ResourceRef,
        document: &ResourceRef,
        options: &SyncOptions,
        stats: &mut SyncStats,
    ) -> EngineResult<bool> {
        let form = self
            .tracked
            .get_form(live, rel::EDIT_FORM, &options.resource)
            .await?;

        let Some(body) = self
            .merge
            .make_put(live, document, form.as_ref(), &self.resolver)
        else {
            stats.unchanged += 1;
            return Ok(true);
        };

        let updated = self
            .tracked
            .update(live, &body, &options.resource.for_item())
            .await?;
        if updated.status() == Status::Hydrated {
            stats.updated += 1;
            Ok(true)
        } else {
            log::warn!("Update of {:?} failed, leaving it unmapped", updated);
            stats.skipped += 1;
            Ok(false)
        }
    }

    fn find_pooled(
        &self,
        document: &ResourceRef,
        strategy: &Strategy,
        options: &SyncOptions,
    ) -> Option<ResourceRef> {
        let name = strategy.pool.as_deref()?;
        self.pools.find(
            name,
            document,
            &self.resolver,
            options.match_attribute.as_deref(),
        )
    }

    fn remember(&self, document: &ResourceRef, live: &ResourceRef) {
        if let (Some(from), Some(to)) = (document.canonical_uri(), live.canonical_uri()) {
            self.resolver.update(from, to);
        }
    }

    fn record_created(&self, document: &ResourceRef, live: &ResourceRef) {
        if let (Some(from), Some(to)) = (document.canonical_uri(), live.canonical_uri()) {
            self.resolver.add(from, to);
        }
    }

    fn forget(&self, live: &ResourceRef) {
        if let Some(uri) = live.canonical_uri() {
            self.resolver.forget_live(&uri);
        }
    }
}
