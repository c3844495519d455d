use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use http::{Request, Response, header};
use reqwest::{Client, redirect::Policy};
use tracing::Instrument;

use crate::{
    config::models::TransportConfig,
    core::request::method_carries_body,
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
};

/// HTTP client adapter built on a single pooled `reqwest` client.
///
/// Responsibilities:
/// * Redirect following (bounded) and gzip / deflate decompression, both fixed
///   at construction
/// * Optional overall and connect timeouts
/// * Returns as soon as the response head arrives; the body is exposed as a
///   stream
/// * Maps transport failures onto [`HttpClientError`]
///
/// No retries happen here: every call is a single attempt.
#[derive(Clone)]
pub struct HttpClientAdapter {
    client: Client,
    follow_redirects: bool,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new(config: &TransportConfig) -> HttpClientResult<Self> {
        let redirect = if config.follow_redirects {
            Policy::limited(config.max_redirects)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .redirect(redirect)
            .gzip(config.decompression)
            .deflate(config.decompression);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        let client = builder.build().map_err(|e| {
            HttpClientError::InvalidRequest(format!("Failed to build HTTP client: {e}"))
        })?;

        tracing::info!(
            follow_redirects = config.follow_redirects,
            decompression = config.decompression,
            "Created shared HTTP client"
        );
        Ok(Self {
            client,
            follow_redirects: config.follow_redirects,
        })
    }

    fn classify(error: reqwest::Error, target: &str) -> HttpClientError {
        if error.is_timeout() {
            HttpClientError::Timeout(format!("Request to {target} timed out: {error}"))
        } else if error.is_builder() {
            HttpClientError::InvalidRequest(format!("Request to {target} is invalid: {error}"))
        } else {
            HttpClientError::ConnectionError(format!("Request to {target} failed: {error}"))
        }
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(&self, req: Request<Bytes>) -> HttpClientResult<Response<AxumBody>> {
        let (parts, body) = req.into_parts();
        let target = parts.uri.to_string();

        let url = reqwest::Url::parse(&target)
            .map_err(|e| HttpClientError::InvalidRequest(format!("{target}: {e}")))?;
        let mut request = reqwest::Request::new(parts.method.clone(), url);
        *request.headers_mut() = parts.headers;
        if self.follow_redirects {
            // reqwest replays the header map on every hop; leaving Host out
            // lets each hop derive it from its own URL.
            request.headers_mut().remove(header::HOST);
        }
        if method_carries_body(&parts.method) || !body.is_empty() {
            *request.body_mut() = Some(body.into());
        }

        let span = tracing::info_span!(
            "backend_request",
            backend.url = %target,
            http.method = %parts.method,
            http.status_code = tracing::field::Empty,
        );

        tracing::debug!(parent: &span, headers = ?request.headers(), "Sending request");

        let mut response = self
            .client
            .execute(request)
            .instrument(span.clone())
            .await
            .map_err(|e| {
                span.record("http.status_code", 599u16);
                tracing::error!(parent: &span, error = %e, "Backend request failed");
                Self::classify(e, &target)
            })?;

        span.record("http.status_code", response.status().as_u16());

        let status = response.status();
        let version = response.version();
        let headers = std::mem::take(response.headers_mut());

        let mut relayed = Response::new(AxumBody::from_stream(response.bytes_stream()));
        *relayed.status_mut() = status;
        *relayed.version_mut() = version;
        *relayed.headers_mut() = headers;
        Ok(relayed)
    }
}
