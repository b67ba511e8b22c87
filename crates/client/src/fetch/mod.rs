//! The caching fetch coordinator.
//!
//! `Fetcher::get` is the single public operation: consult the response
//! store, return the stored response while it is fresh, otherwise perform
//! a live fetch, apply the refresh policy, and persist the result inside
//! one store transaction.
//!
//! Transport faults (connect, timeout, body read) are recorded as a
//! synthesized 502 failure outcome rather than propagated, so they get the
//! short retry TTL and cannot displace previously good data. The one
//! exception is an oversized response body, which fails the whole
//! operation without writing anything.

pub mod transport;

pub use transport::{HttpTransport, Transport, TransportConfig, TransportError};

use chrono::Utc;
use kontext_core::{CachedResponse, Error, StoreDb, plan_refresh};

/// Status recorded for a synthesized transport-fault outcome.
const TRANSPORT_FAULT_STATUS: u16 = 502;

/// Coordinates the response store, the transport, and the refresh policy.
pub struct Fetcher<T: Transport> {
    store: StoreDb,
    transport: T,
}

impl<T: Transport> Fetcher<T> {
    /// Create a coordinator over a store and a transport.
    pub fn new(store: StoreDb, transport: T) -> Self {
        Self { store, transport }
    }

    /// Get reference to the underlying store.
    pub fn store(&self) -> &StoreDb {
        &self.store
    }

    /// Fetch `url`, serving from the store while the entry is fresh.
    ///
    /// On a stale or absent entry this performs one live fetch, applies
    /// the asymmetric-TTL policy transactionally, and returns the
    /// effective response, which is the prior stored response whenever the
    /// policy preserved it.
    ///
    /// # Errors
    ///
    /// Storage faults and oversized upstream bodies propagate; nothing is
    /// persisted in either case. All other transport faults are folded
    /// into a cacheable failure outcome.
    pub async fn get(&self, url: &str) -> Result<CachedResponse, Error> {
        let now = Utc::now();

        if let Some(entry) = self.store.get_entry(url).await?
            && entry.is_fresh(now)
            && let Some(response) = entry.response
        {
            tracing::debug!(url, status = response.status, "cache hit");
            return Ok(response);
        }

        tracing::debug!(url, "cache miss, fetching live");

        let fetched = match self.transport.http_get(url).await {
            Ok(response) => response,
            Err(TransportError::TooLarge { got, limit }) => {
                return Err(Error::FetchTooLarge(format!("{got} bytes exceeds {limit}")));
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "transport fault, recording failure outcome");
                CachedResponse {
                    status: TRANSPORT_FAULT_STATUS,
                    headers: Vec::new(),
                    body: e.to_string().into_bytes(),
                }
            }
        };

        if !fetched.is_success() {
            tracing::warn!(url, status = fetched.status, "failed to fetch");
        }

        let entry = self
            .store
            .refresh_entry(url, now, move |prior| plan_refresh(prior, fetched, now))
            .await?;

        // refresh_entry always persists a response; a bare row here means
        // the store handed back something it could not have written.
        entry.response.ok_or_else(|| Error::CorruptEntry {
            url: url.to_string(),
            reason: "refreshed entry has no response".into(),
        })
    }
}
