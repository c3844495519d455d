use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use http::{Request, Response};
use thiserror::Error;

/// Custom error type for HTTP client operations
///
/// The engine answers transport-level failures with `503 Service Unavailable`.
/// `InvalidRequest` means the request could not be sent at all (bad scheme,
/// unparsable target) and is propagated as a forwarding error instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to backend fails (DNS, connect, TLS handshake)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when request times out
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error while reading the backend response body
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for sending requests to backends
///
/// One instance is shared by every request; implementations hold pooled
/// connections and fixed transport settings.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an HTTP request to a backend server
    ///
    /// # Arguments
    /// * `req` - The fully buffered outbound request
    ///
    /// # Returns
    /// A future that resolves once the response head has arrived. The body
    /// is streamed separately. Dropping the future aborts the exchange.
    async fn send_request(&self, req: Request<Bytes>) -> HttpClientResult<Response<AxumBody>>;
}
