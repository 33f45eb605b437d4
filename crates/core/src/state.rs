// crates/core/src/state.rs
//! Per-resource lifecycle record

use crate::headers::Headers;
use crate::transport::TransportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What is currently known about a tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// Wanted but not located
    Unknown,
    /// URI known, no attributes
    LocationOnly,
    /// Collection item known only from its compact feed entry
    FeedOnly,
    /// Attributes retrieved and current
    Hydrated,
    /// Delete request in flight
    DeleteInProgress,
    /// Removal confirmed by the server
    Deleted,
    /// Access denied
    Forbidden,
    /// Client-only placeholder, never fetched
    Virtual,
    /// Explicitly invalidated
    Stale,
    /// A feed reported a newer ETag; the next fetch must bypass caches
    StaleFromETag,
}

impl Status {
    /// Statuses for which a load is a no-op
    pub fn is_inert(&self) -> bool {
        matches!(
            self,
            Status::Virtual | Status::Forbidden | Status::Deleted | Status::DeleteInProgress
        )
    }

    /// Statuses that have to be re-fetched before the data is read
    pub fn is_stale(&self) -> bool {
        matches!(self, Status::Stale | Status::StaleFromETag)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Unknown => "unknown",
            Status::LocationOnly => "locationOnly",
            Status::FeedOnly => "feedOnly",
            Status::Hydrated => "hydrated",
            Status::DeleteInProgress => "deleteInProgress",
            Status::Deleted => "deleted",
            Status::Forbidden => "forbidden",
            Status::Virtual => "virtual",
            Status::Stale => "stale",
            Status::StaleFromETag => "staleFromETag",
        };
        write!(f, "{}", name)
    }
}

/// State carried by every tracked resource
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    status: Status,
    previous_status: Option<Status>,
    /// Last transport error
    pub error: Option<TransportError>,
    /// Response headers, merged across fetches
    pub headers: Headers,
    /// Headers surfaced inline by a feed; cleared on the next fetch
    pub feed_headers: Headers,
    /// Time of the last successful fetch
    pub retrieved: Option<DateTime<Utc>>,
    /// Names of attached singleton sub-resources
    pub singleton: BTreeSet<String>,
    /// Names of attached collection sub-resources
    pub collection: BTreeSet<String>,
}

impl State {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            previous_status: None,
            error: None,
            headers: Headers::new(),
            feed_headers: Headers::new(),
            retrieved: None,
            singleton: BTreeSet::new(),
            collection: BTreeSet::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn previous_status(&self) -> Option<Status> {
        self.previous_status
    }

    /// Moves to `status`, remembering the status being left
    pub fn set_status(&mut self, status: Status) {
        self.previous_status = Some(self.status);
        self.status = status;
    }

    /// Records a successful fetch at `now`
    pub fn mark_retrieved(&mut self, headers: &Headers, now: DateTime<Utc>) {
        self.set_status(Status::Hydrated);
        self.headers.merge(headers);
        self.feed_headers.clear();
        self.retrieved = Some(now);
        self.error = None;
    }

    /// Records a failure and moves to `status`
    pub fn mark_failed(&mut self, status: Status, error: TransportError) {
        self.set_status(status);
        self.error = Some(error);
    }

    /// Returns true if `name` is attached as a tracked sub-resource
    pub fn is_tracked(&self, name: &str) -> bool {
        self.singleton.contains(name) || self.collection.contains(name)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(Status::Unknown)
    }
}
