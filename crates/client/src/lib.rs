//! Client code for kontext.
//!
//! This crate provides the caching fetch coordinator, the outbound HTTP
//! transport, the twitter proxy URL rewriter, and the microformat parser
//! boundary consumed by the server.

pub mod fetch;
pub mod mf2;
pub mod proxy;

pub use fetch::{Fetcher, HttpTransport, Transport, TransportConfig, TransportError};
pub use mf2::{Card, ContextParser, Entry, Mf2Parser};
pub use proxy::{ProxyCreds, maybe_proxy};
