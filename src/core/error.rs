use http::Uri;
use thiserror::Error;

use crate::ports::http_client::HttpClientError;

/// Errors that abort handling of a single request.
///
/// None of these are routing outcomes: an unreachable backend is recovered
/// inside the engine (503) and never shows up here. What remains is either
/// misconfiguration (a modifier failing, a target without a host), a broken
/// inbound request, or a caller that went away.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ForwardError {
    /// The canonical request URI could not be assembled
    #[error("Cannot reconstruct request URI: {0}")]
    RequestUri(#[from] http::Error),

    /// Neither the request URI nor the Host header names an authority
    #[error("Inbound request carries no host")]
    MissingHost,

    /// The (possibly rewritten) outbound target is not absolute
    #[error("Outbound target has no host: {0}")]
    MissingTargetHost(Uri),

    /// The transport refused the outbound request before sending it
    #[error("Outbound request is invalid: {0}")]
    InvalidTarget(#[source] HttpClientError),

    /// A rule's request modifier returned an error
    #[error("Request modifier failed: {0:#}")]
    RequestModifier(eyre::Report),

    /// A rule's response modifier returned an error
    #[error("Response modifier failed: {0:#}")]
    ResponseModifier(eyre::Report),

    /// Reading the inbound request body failed
    #[error("Failed to read inbound request body: {0}")]
    RequestBody(#[source] axum::Error),

    /// The inbound caller disconnected before forwarding completed
    #[error("Inbound request was cancelled")]
    Cancelled,
}

/// Result type alias for forwarding operations
pub type ForwardResult<T> = Result<T, ForwardError>;
