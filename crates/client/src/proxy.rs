//! Twitter permalink proxy rewriting.
//!
//! Twitter serves permalink pages without the microformats the parser
//! needs, so when activitystreams proxy credentials are configured,
//! status permalinks are rewritten to the proxy endpoint before fetching.
//! The rewritten URL is the effective URL for fetching, caching, and
//! parsing alike.

use std::sync::LazyLock;

use regex::Regex;

static TWITTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|mobile\.)?twitter\.com/(\w+)/status(?:es)?/(\w+)").expect("invalid regex")
});

/// Access token pair for the twitter activitystreams proxy.
#[derive(Debug, Clone)]
pub struct ProxyCreds {
    pub key: String,
    pub secret: String,
}

/// Rewrite a twitter status permalink to the activitystreams proxy
/// endpoint, carrying the configured credentials.
///
/// Returns the URL unchanged when no credentials are configured or the
/// URL is not a twitter status permalink.
pub fn maybe_proxy(url: &str, creds: Option<&ProxyCreds>) -> String {
    let Some(creds) = creds else {
        return url.to_string();
    };
    let Some(caps) = TWITTER_RE.captures(url) else {
        return url.to_string();
    };

    let status_id = &caps[2];
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("format", "html")
        .append_pair("access_token_key", &creds.key)
        .append_pair("access_token_secret", &creds.secret)
        .finish();

    let proxied = format!("https://twitter-activitystreams.appspot.com/@me/@all/@app/{status_id}?{query}");
    tracing::debug!(url, proxied, "rewrote twitter permalink to proxy endpoint");
    proxied
}
