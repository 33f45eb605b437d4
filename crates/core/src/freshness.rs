// crates/core/src/freshness.rs
//! Decides whether a tracked resource has to be re-fetched
//!
//! Two independent predicates: one over the lifecycle status, one over the
//! cached HTTP freshness headers. A fetch is required if either is true.

use crate::headers::{parse_http_date, Headers};
use crate::state::{State, Status};
use chrono::{DateTime, TimeDelta, Utc};

/// True when the status alone demands a fetch
///
/// `unknown` is not handled here; the tracked factory resets it to
/// `locationOnly` first.
pub fn needs_fetch_from_state(state: &State, force_load: bool) -> bool {
    match state.status() {
        Status::LocationOnly | Status::FeedOnly | Status::Stale | Status::StaleFromETag => true,
        Status::Hydrated => force_load,
        _ => false,
    }
}

/// True when the cached response headers are no longer fresh at `now`
///
/// `max-age` counts from the response `Date`, or from `retrieved` when the
/// server sent none. An age too large to represent never expires.
pub fn needs_fetch_from_headers(
    headers: &Headers,
    retrieved: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let cache_control = headers.cache_control();
    if cache_control.no_cache || cache_control.no_store || cache_control.max_age == Some(0) {
        return true;
    }

    let date = headers.date();

    if let Some(raw) = headers.expires() {
        // Unparsable Expires (commonly "0" or "-1") means already expired
        let Some(expires) = parse_http_date(raw) else {
            return true;
        };
        if expires <= now {
            return true;
        }
        if date.is_some_and(|date| expires < date) {
            return true;
        }
    }

    if let (Some(max_age), Some(origin)) = (cache_control.max_age, date.or(retrieved)) {
        let expiry = TimeDelta::try_seconds(max_age)
            .and_then(|max_age| origin.checked_add_signed(max_age));
        if expiry.is_some_and(|expiry| now >= expiry) {
            return true;
        }
    }

    false
}

/// Combined decision for a load at `now`
///
/// Header freshness only applies to hydrated resources; inert and
/// placeholder statuses never fetch.
pub fn needs_fetch(state: &State, force_load: bool, now: DateTime<Utc>) -> bool {
    needs_fetch_from_state(state, force_load)
        || (state.status() == Status::Hydrated
            && needs_fetch_from_headers(&state.headers, state.retrieved, now))
}
