//! Refresh policy for cached responses.
//!
//! The policy is asymmetric: responses that came back 2xx are trusted for
//! a long window, failures are retried soon. A failure never displaces a
//! previously good response, so a transient outage cannot erase content
//! that downstream consumers depend on.

use chrono::{DateTime, Duration, Utc};

use crate::response::CachedResponse;

/// How long a successful (2xx) response is trusted before a re-fetch.
pub const SUCCESS_TTL_HOURS: i64 = 12;

/// How long a failed fetch outcome stands before the next attempt.
pub const FAILURE_TTL_HOURS: i64 = 1;

/// What a refresh will persist: the effective response and its new expiry.
#[derive(Debug, Clone)]
pub struct RefreshPlan {
    pub response: CachedResponse,
    pub expires_at: DateTime<Utc>,
}

/// Decide what a refresh stores, given the prior stored response and the
/// outcome of a live fetch.
///
/// A 2xx outcome always replaces the stored response and earns the long
/// TTL. Anything else earns the short TTL and may only replace the stored
/// response when there was none, or it was itself a failure; a previously
/// good response is preserved verbatim.
pub fn plan_refresh(prior: Option<CachedResponse>, fetched: CachedResponse, now: DateTime<Utc>) -> RefreshPlan {
    if fetched.is_success() {
        return RefreshPlan { response: fetched, expires_at: now + Duration::hours(SUCCESS_TTL_HOURS) };
    }

    let response = match prior {
        Some(prev) if prev.is_success() => prev,
        _ => fetched,
    };

    RefreshPlan { response, expires_at: now + Duration::hours(FAILURE_TTL_HOURS) }
}
