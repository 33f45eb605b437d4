// crates/sync-engine/src/strategy.rs
//! Declarative description of what a sync pass walks

/// How differences between document and live resources are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Create, update and delete live resources to match the document
    #[default]
    Normal,
    /// Only record document to live mappings, never write
    ReadOnly,
    /// Change collection membership only; resources are never edited or deleted
    ContributeOnly,
}

/// One step of a sync tree
///
/// The root strategy has no `rel` and syncs the resource passed in. A
/// child with a `rel` follows that link on the live resource and the same
/// named resource on the document (or `rel_on_document` when the document
/// names it differently).
#[derive(Debug, Clone, Default)]
pub struct Strategy {
    pub rel: Option<String>,
    pub rel_on_document: Option<String>,
    pub mode: SyncMode,
    /// Named pool consulted before creating a resource
    pub pool: Option<String>,
    pub children: Vec<Strategy>,
}

impl Strategy {
    /// A root strategy syncing the resource it is given
    pub fn root() -> Self {
        Self::default()
    }

    /// A strategy following `rel` on both sides
    pub fn named(rel: impl Into<String>) -> Self {
        Self {
            rel: Some(rel.into()),
            ..Self::default()
        }
    }

    pub fn with_rel_on_document(mut self, rel: impl Into<String>) -> Self {
        self.rel_on_document = Some(rel.into());
        self
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn read_only(self) -> Self {
        self.with_mode(SyncMode::ReadOnly)
    }

    pub fn contribute_only(self) -> Self {
        self.with_mode(SyncMode::ContributeOnly)
    }

    pub fn with_pool(mut self, name: impl Into<String>) -> Self {
        self.pool = Some(name.into());
        self
    }

    pub fn with_child(mut self, child: Strategy) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Strategy>) -> Self {
        self.children.extend(children);
        self
    }

    /// Relation to follow on the document
    pub fn document_rel(&self) -> Option<&str> {
        self.rel_on_document.as_deref().or(self.rel.as_deref())
    }
}
