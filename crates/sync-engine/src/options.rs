// crates/sync-engine/src/options.rs
//! Per-call options for tracked resource operations and sync passes

use semnet_config::SyncConfig;
use semnet_core::link::rel;
use semnet_core::{FreshMakeStrategy, MakeSparseStrategy};
use std::sync::Arc;

/// Options for load, create, update and delete
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    /// Link relation whose URI the operation targets
    pub rel: String,
    /// Fetch even when the cached representation is fresh
    pub force_load: bool,
    /// Also hydrate the items of a collection
    pub include_items: bool,
    /// 0 hydrates items in parallel, anything else one at a time
    pub batch_size: usize,
    pub throw_on_load_error: bool,
    pub throw_on_create_error: bool,
    pub throw_on_update_error: bool,
    pub throw_on_delete_error: bool,
    /// Where new item stubs come from; fresh when unset
    pub make_sparse_strategy: Option<Arc<dyn MakeSparseStrategy>>,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            rel: rel::SELF.to_string(),
            force_load: false,
            include_items: false,
            batch_size: 0,
            throw_on_load_error: false,
            throw_on_create_error: false,
            throw_on_update_error: false,
            throw_on_delete_error: false,
            make_sparse_strategy: None,
        }
    }
}

impl ResourceOptions {
    /// Builds options from the `[sync]` config section
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            throw_on_load_error: config.throw_on_load_error,
            throw_on_create_error: config.throw_on_create_error,
            throw_on_update_error: config.throw_on_update_error,
            throw_on_delete_error: config.throw_on_delete_error,
            ..Self::default()
        }
    }

    pub fn with_rel(mut self, relation: impl Into<String>) -> Self {
        self.rel = relation.into();
        self
    }

    pub fn with_force_load(mut self, force_load: bool) -> Self {
        self.force_load = force_load;
        self
    }

    pub fn with_include_items(mut self, include_items: bool) -> Self {
        self.include_items = include_items;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_make_sparse_strategy(mut self, strategy: Arc<dyn MakeSparseStrategy>) -> Self {
        self.make_sparse_strategy = Some(strategy);
        self
    }

    /// Options for acting on a resource through its own `self` link
    ///
    /// Error flags and the make strategy carry over; relation, forcing and
    /// item hydration do not.
    pub fn for_item(&self) -> Self {
        Self {
            rel: rel::SELF.to_string(),
            force_load: false,
            include_items: false,
            ..self.clone()
        }
    }

    /// The make strategy in effect
    pub fn strategy(&self) -> &dyn MakeSparseStrategy {
        match &self.make_sparse_strategy {
            Some(strategy) => strategy.as_ref(),
            None => &FreshMakeStrategy,
        }
    }
}

/// Options for one sync pass
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// 0 runs sibling strategies in parallel, anything else sequentially
    pub strategy_batch_size: usize,
    /// Attribute used to pair document and live items that share no URI
    pub match_attribute: Option<String>,
    /// Options for every tracked operation the pass issues
    pub resource: ResourceOptions,
}

impl SyncOptions {
    /// Builds options from the `[sync]` config section
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            strategy_batch_size: config.strategy_batch_size,
            match_attribute: config.match_attribute().map(str::to_owned),
            resource: ResourceOptions::from_config(config),
        }
    }

    pub fn with_strategy_batch_size(mut self, size: usize) -> Self {
        self.strategy_batch_size = size;
        self
    }

    pub fn with_match_attribute(mut self, name: Option<&str>) -> Self {
        self.match_attribute = name.map(str::to_owned);
        self
    }

    pub fn with_resource_options(mut self, options: ResourceOptions) -> Self {
        self.resource = options;
        self
    }

    /// True when sibling strategies must run one after another
    pub fn is_sequential(&self) -> bool {
        self.strategy_batch_size > 0
    }
}
