//! The context-fetch route.
//!
//! `GET /` takes a required `url` query parameter and an optional
//! `callback` for JSONP framing. The URL is rewritten through the proxy
//! rule when credentials are configured, fetched through the caching
//! coordinator, and the body is handed to the microformat parser; the
//! result is `{"data": entry}` or `{}`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use kontext_client::{ContextParser, Fetcher, ProxyCreds, Transport, maybe_proxy};
use kontext_core::Error;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::ApiError;

/// Explicit service context: everything a request needs, no globals.
pub struct AppState<T: Transport> {
    pub fetcher: Fetcher<T>,
    pub parser: Box<dyn ContextParser>,
    pub proxy_creds: Option<ProxyCreds>,
}

/// Query parameters of the context-fetch route.
#[derive(Debug, Default, Deserialize)]
pub struct ContextQuery {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub callback: Option<String>,
}

/// Build the application router.
pub fn router<T: Transport + 'static>(state: Arc<AppState<T>>) -> Router {
    Router::new().route("/", get(fetch_context::<T>)).with_state(state)
}

/// `GET /` — fetch a URL's reply context.
pub async fn fetch_context<T: Transport>(
    State(state): State<Arc<AppState<T>>>, Query(params): Query<ContextQuery>,
) -> Result<Response, ApiError> {
    let url = match params.url.as_deref() {
        Some(u) if !u.is_empty() => u,
        _ => return Err(ApiError::MissingUrl),
    };

    let effective = maybe_proxy(url, state.proxy_creds.as_ref());

    let response = match state.fetcher.get(&effective).await {
        Ok(response) => response,
        Err(Error::FetchTooLarge(msg)) => {
            return Err(ApiError::FetchFailed { url: effective, code: 502, body: msg });
        }
        Err(e) => return Err(ApiError::Storage(e)),
    };

    if !response.is_success() {
        return Err(ApiError::FetchFailed {
            code: response.status,
            body: response.body_text().into_owned(),
            url: effective,
        });
    }

    let entry = Url::parse(&effective)
        .ok()
        .and_then(|base| state.parser.parse(&response.body, &base));

    let blob = match entry {
        Some(entry) => json!({ "data": entry }),
        None => json!({}),
    };

    if let Some(callback) = params.callback.as_deref().filter(|c| !c.is_empty()) {
        let payload = format!("{callback}({blob})");
        return Ok((
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            payload,
        )
            .into_response());
    }

    Ok(Json(blob).into_response())
}
