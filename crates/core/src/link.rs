// crates/core/src/link.rs
//! Typed links and the identity rules built on them

use serde::{Deserialize, Serialize};

/// Well-known link relation names
pub mod rel {
    pub const SELF: &str = "self";
    pub const CANONICAL: &str = "canonical";
    pub const EDIT_FORM: &str = "edit-form";
    pub const CREATE_FORM: &str = "create-form";
    pub const SEARCH: &str = "search";
    pub const UP: &str = "up";
}

/// A typed navigational link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Relation type; may hold several space-separated relations
    pub rel: String,
    /// Target URI
    pub href: String,
    /// Optional human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional media type hint
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Link {
    /// Creates a link
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            title: None,
            media_type: None,
        }
    }

    /// Creates a `self` link
    pub fn self_link(href: impl Into<String>) -> Self {
        Self::new(rel::SELF, href)
    }

    /// Sets the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns true if this link carries `relation` (case-insensitive)
    pub fn has_rel(&self, relation: &str) -> bool {
        self.rel
            .split_whitespace()
            .any(|r| r.eq_ignore_ascii_case(relation))
    }
}

/// Finds the first link carrying `relation`
pub fn find<'a>(links: &'a [Link], relation: &str) -> Option<&'a Link> {
    links.iter().find(|link| link.has_rel(relation))
}

/// Gets the URI of the first link carrying `relation`
pub fn get_uri<'a>(links: &'a [Link], relation: &str) -> Option<&'a str> {
    find(links, relation).map(|link| link.href.as_str())
}

/// Gets the title of the first link carrying `relation`
pub fn get_title<'a>(links: &'a [Link], relation: &str) -> Option<&'a str> {
    find(links, relation).and_then(|link| link.title.as_deref())
}

/// Identity URI: the `canonical` link if present, otherwise `self`
pub fn canonical_or_self(links: &[Link]) -> Option<&str> {
    get_uri(links, rel::CANONICAL).or_else(|| get_uri(links, rel::SELF))
}
