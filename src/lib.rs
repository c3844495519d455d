//! Switchyard - a rule-driven HTTP request forwarding engine.
//!
//! Switchyard sits in front of an axum router as middleware. Every inbound request is
//! checked against an ordered list of [`ProxyRule`]s; the first rule whose matcher accepts
//! the request URI takes over: the request is rewritten by the rule, forwarded to the
//! backend over a shared pooled client, and the backend response is relayed to the caller.
//! Requests that match no rule continue down the router unchanged. Every request produces
//! exactly one [`ProxyResult`] which is handed to a pluggable [`Reporter`].
//!
//! # Features
//! - First-match-wins rule list with per-rule authentication gate
//! - Synchronous request modifiers and async response modifiers
//! - Declarative rules (path prefix / host / target / header actions) from YAML, JSON or TOML
//! - Redirect following and gzip / deflate decompression on the shared transport
//! - Structured request/response recording (headers, bodies, timing) via `tracing`
//!
//! # Quick Example
//! ```no_run
//! use axum::{Router, middleware};
//! use switchyard::{ForwardingEngine, ProxyOptions, ProxyRule, TracingReporter};
//! use switchyard::adapters::forward_middleware;
//!
//! # fn main() -> eyre::Result<()> {
//! let health = ProxyRule::builder(|uri| uri.path() == "/health")
//!     .request_modifier(|request, _caller| {
//!         request.uri = "http://backend:9000/healthz".parse()?;
//!         Ok(())
//!     })
//!     .build();
//!
//! let engine = ForwardingEngine::new(ProxyOptions::new(vec![health], TracingReporter::default()))?;
//! let app: Router = Router::new().layer(middleware::from_fn_with_state(engine, forward_middleware));
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! the forwarding logic inside `core`. The HTTP transport and the result sink are both
//! ports, so tests and embedders can swap them.
//!
//! # Error Handling
//! Library errors are typed (`ForwardError`, `HttpClientError`, `ValidationError`,
//! `CompileError`); rule modifiers return `eyre::Result`. A backend that cannot be reached
//! is not an error: the caller receives `503 Service Unavailable` and the result is still
//! reported.
pub mod config;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

// Re-export the types most embedders need
pub use crate::{
    adapters::{ChannelReporter, HttpClientAdapter, TracingReporter},
    core::{
        CallerIdentity, ForwardError, ForwardingEngine, Identity, ProxyOptions, ProxyResult,
        ProxyRule, ProxyStatus,
    },
    ports::{http_client::HttpClient, reporter::Reporter},
};
