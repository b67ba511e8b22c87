//! Cache entry persistence.
//!
//! Provides lookup and upsert for stored entries, plus the transactional
//! refresh that re-reads the prior row, applies the refresh policy, and
//! writes the result as one atomic unit.

use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::StoreDb;
use crate::Error;
use crate::policy::RefreshPlan;
use crate::response::CachedResponse;

/// A stored cache entry for one URL.
///
/// The response is absent only for an entry that has never completed a
/// fetch attempt; every write path that persists a row sets both the
/// response and its expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub url: String,
    /// When the last fetch attempt for this URL was recorded.
    pub fetched_at: DateTime<Utc>,
    /// The entry is fresh while the current time is strictly before this.
    pub expires_at: DateTime<Utc>,
    pub response: Option<CachedResponse>,
}

impl CacheEntry {
    /// Whether the entry is still fresh at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

type EntryRow = (String, String, String, Option<i64>, Option<String>, Option<Vec<u8>>);

fn query_entry(conn: &rusqlite::Connection, url: &str) -> Result<Option<CacheEntry>, Error> {
    let mut stmt = conn.prepare(
        "SELECT url, fetched_at, expires_at, status_code, headers_json, body
         FROM entries WHERE url = ?1",
    )?;

    let result = stmt.query_row(params![url], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
    });

    match result {
        Ok(row) => decode_entry(row).map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn decode_entry(row: EntryRow) -> Result<CacheEntry, Error> {
    let (url, fetched_at, expires_at, status_code, headers_json, body) = row;

    let fetched_at = parse_timestamp(&url, &fetched_at)?;
    let expires_at = parse_timestamp(&url, &expires_at)?;

    let response = match status_code {
        Some(status) => {
            let status = u16::try_from(status).map_err(|_| Error::CorruptEntry {
                url: url.clone(),
                reason: format!("status code {status} out of range"),
            })?;
            let headers = match headers_json {
                Some(json) => serde_json::from_str(&json).map_err(|e| Error::CorruptEntry {
                    url: url.clone(),
                    reason: format!("bad headers_json: {e}"),
                })?,
                None => Vec::new(),
            };
            Some(CachedResponse { status, headers, body: body.unwrap_or_default() })
        }
        None => None,
    };

    Ok(CacheEntry { url, fetched_at, expires_at, response })
}

fn parse_timestamp(url: &str, value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry { url: url.to_string(), reason: format!("bad timestamp {value:?}: {e}") })
}

fn write_entry(conn: &rusqlite::Connection, entry: &CacheEntry) -> Result<(), Error> {
    let (status_code, headers_json, body) = match &entry.response {
        Some(resp) => (
            Some(resp.status as i64),
            serde_json::to_string(&resp.headers).ok(),
            Some(resp.body.clone()),
        ),
        None => (None, None, None),
    };

    conn.execute(
        "INSERT INTO entries (url, fetched_at, expires_at, status_code, headers_json, body)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(url) DO UPDATE SET
            fetched_at = excluded.fetched_at,
            expires_at = excluded.expires_at,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body",
        params![
            entry.url,
            entry.fetched_at.to_rfc3339(),
            entry.expires_at.to_rfc3339(),
            status_code,
            headers_json,
            body,
        ],
    )?;

    Ok(())
}

impl StoreDb {
    /// Look up the stored entry for a URL.
    ///
    /// Returns None if the URL has never been seen. No writes.
    pub async fn get_entry(&self, url: &str) -> Result<Option<CacheEntry>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> { query_entry(conn, &url) })
            .await
            .map_err(Error::from)
    }

    /// Insert or update a stored entry.
    ///
    /// Uses UPSERT semantics: inserts if the URL doesn't exist, updates
    /// all fields if it does.
    pub async fn upsert_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { write_entry(conn, &entry) })
            .await
            .map_err(Error::from)
    }

    /// Apply a refresh for `url` inside a single transaction.
    ///
    /// Re-reads the stored entry, hands its prior response to `plan`, and
    /// upserts whatever the plan decides to keep. The transaction commits
    /// only if every step succeeded; on any error the open transaction is
    /// dropped and rolled back, so a partially-applied refresh never
    /// reaches durable storage. Re-reading inside the transaction also
    /// means a concurrent refresh that raced us cannot cause a stored good
    /// response to be displaced by a failure.
    pub async fn refresh_entry<F>(&self, url: &str, now: DateTime<Utc>, plan: F) -> Result<CacheEntry, Error>
    where
        F: FnOnce(Option<CachedResponse>) -> RefreshPlan + Send + 'static,
    {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<CacheEntry, Error> {
                let tx = conn.transaction().map_err(Error::from)?;

                let prior = query_entry(&tx, &url)?.and_then(|entry| entry.response);
                let update = plan(prior);

                let entry = CacheEntry {
                    url,
                    fetched_at: now,
                    expires_at: update.expires_at,
                    response: Some(update.response),
                };

                write_entry(&tx, &entry)?;
                tx.commit().map_err(Error::from)?;

                Ok(entry)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::plan_refresh;
    use chrono::{Duration, TimeZone};

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 21, 12, 0, 0).unwrap()
    }

    fn html_response(status: u16, body: &str) -> CachedResponse {
        CachedResponse {
            status,
            headers: vec![("content-type".into(), "text/html".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    fn make_entry(url: &str, response: Option<CachedResponse>, expires_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry { url: url.to_string(), fetched_at: at_noon(), expires_at, response }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let entry = make_entry(
            "https://example.com/post",
            Some(html_response(200, "<html>hi</html>")),
            at_noon() + Duration::hours(12),
        );

        db.upsert_entry(&entry).await.unwrap();

        let retrieved = db.get_entry("https://example.com/post").await.unwrap().unwrap();
        assert_eq!(retrieved, entry);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let result = db.get_entry("https://never-seen.example").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let url = "https://example.com/post";

        db.upsert_entry(&make_entry(url, Some(html_response(200, "first")), at_noon()))
            .await
            .unwrap();
        db.upsert_entry(&make_entry(url, Some(html_response(200, "second")), at_noon()))
            .await
            .unwrap();

        let retrieved = db.get_entry(url).await.unwrap().unwrap();
        assert_eq!(retrieved.response.unwrap().body, b"second");

        let count: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_entry_without_response_roundtrips() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://example.com/empty", None, at_noon());

        db.upsert_entry(&entry).await.unwrap();

        let retrieved = db.get_entry("https://example.com/empty").await.unwrap().unwrap();
        assert!(retrieved.response.is_none());
        assert_eq!(retrieved.expires_at, at_noon());
    }

    #[tokio::test]
    async fn test_refresh_creates_entry() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let now = at_noon();

        let entry = db
            .refresh_entry("https://example.com/new", now, move |prior| {
                assert!(prior.is_none());
                plan_refresh(prior, html_response(200, "fresh"), now)
            })
            .await
            .unwrap();

        assert_eq!(entry.expires_at, now + Duration::hours(12));

        let stored = db.get_entry("https://example.com/new").await.unwrap().unwrap();
        assert_eq!(stored.response.unwrap().body, b"fresh");
    }

    #[tokio::test]
    async fn test_refresh_failure_preserves_good_response() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let url = "https://example.com/flaky";
        let now = at_noon();
        let good = html_response(200, "<html>good</html>");

        db.upsert_entry(&make_entry(url, Some(good.clone()), now - Duration::hours(1)))
            .await
            .unwrap();

        let entry = db
            .refresh_entry(url, now, move |prior| plan_refresh(prior, html_response(503, "down"), now))
            .await
            .unwrap();

        assert_eq!(entry.response, Some(good.clone()));
        assert_eq!(entry.expires_at, now + Duration::hours(1));

        let stored = db.get_entry(url).await.unwrap().unwrap();
        assert_eq!(stored.response, Some(good));
        assert_eq!(stored.expires_at, now + Duration::hours(1));
    }

    #[tokio::test]
    async fn test_refresh_rolls_back_when_write_fails() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let url = "https://example.com/readonly";
        let now = at_noon();
        let good = html_response(200, "keep me");
        let original_expiry = now - Duration::minutes(5);

        db.upsert_entry(&make_entry(url, Some(good.clone()), original_expiry))
            .await
            .unwrap();

        db.conn
            .call(|conn| conn.execute_batch("PRAGMA query_only=ON;"))
            .await
            .unwrap();

        let result = db
            .refresh_entry(url, now, move |prior| plan_refresh(prior, html_response(503, "down"), now))
            .await;
        assert!(result.is_err());

        db.conn
            .call(|conn| conn.execute_batch("PRAGMA query_only=OFF;"))
            .await
            .unwrap();

        let stored = db.get_entry(url).await.unwrap().unwrap();
        assert_eq!(stored.response, Some(good));
        assert_eq!(stored.expires_at, original_expiry);
    }

    #[tokio::test]
    async fn test_refresh_rejects_overlong_url() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let url = format!("https://example.com/{}", "a".repeat(1200));
        let now = at_noon();

        let result = db
            .refresh_entry(&url, now, move |prior| plan_refresh(prior, html_response(200, "body"), now))
            .await;
        assert!(result.is_err());

        assert!(db.get_entry(&url).await.unwrap().is_none());
    }
}
