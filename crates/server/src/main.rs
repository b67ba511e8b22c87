//! kontextd entry point.
//!
//! Boots the response store, the HTTP transport, and the axum front end
//! from layered configuration, then serves until ctrl-c.

use std::sync::Arc;

use anyhow::Result;
use kontext_client::{Fetcher, HttpTransport, Mf2Parser, ProxyCreds, TransportConfig};
use kontext_core::{AppConfig, StoreDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;

use handler::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;

    let store = StoreDb::open(&config.db_path).await?;
    tracing::info!(db_path = %config.db_path.display(), "response store ready");

    let transport = HttpTransport::new(TransportConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
        max_redirects: config.max_redirects,
        max_bytes: config.max_bytes,
    })?;

    let proxy_creds = config
        .twitter_credentials()
        .map(|(key, secret)| ProxyCreds { key: key.to_string(), secret: secret.to_string() });

    let state = Arc::new(AppState {
        fetcher: Fetcher::new(store, transport),
        parser: Box::new(Mf2Parser),
        proxy_creds,
    });

    let app = handler::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "kontextd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
