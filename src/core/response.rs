//! Backend responses as seen by the engine and the response relayed back to
//! the caller.
use axum::body::Body;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode, Version, header, request::Parts};
use http_body_util::BodyExt;

use crate::{
    core::identity::CallerIdentity,
    ports::http_client::{HttpClientError, HttpClientResult},
};

#[derive(Debug)]
enum UpstreamBody {
    Streaming(Body),
    Buffered(Bytes),
}

/// Response received from a backend.
///
/// Headers are available as soon as the transport returns; the body is read
/// on first access and cached, so it can be relayed, handed to a response
/// modifier and recorded without being consumed.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    body: UpstreamBody,
}

impl UpstreamResponse {
    pub fn new(response: Response<Body>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body: UpstreamBody::Streaming(body),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.body, UpstreamBody::Buffered(_))
    }

    /// Full body, buffering it on first call.
    pub async fn bytes(&mut self) -> HttpClientResult<Bytes> {
        let bytes = match &mut self.body {
            UpstreamBody::Buffered(bytes) => return Ok(bytes.clone()),
            UpstreamBody::Streaming(body) => std::mem::take(body)
                .collect()
                .await
                .map_err(|e| HttpClientError::Body(e.to_string()))?
                .to_bytes(),
        };
        self.body = UpstreamBody::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Body decoded as (lossy) UTF-8.
    pub async fn text(&mut self) -> HttpClientResult<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// The response written back to the original caller.
#[derive(Debug)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BytesMut,
}

impl Default for RelayedResponse {
    fn default() -> Self {
        Self::with_status(StatusCode::OK)
    }
}

impl RelayedResponse {
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
        }
    }

    /// Copy status and every header from the backend response. Headers
    /// present on both sides take the backend's values. Transfer-Encoding is
    /// dropped: the transport already removed the chunked framing.
    pub fn copy_head_from(&mut self, upstream: &UpstreamResponse) {
        self.status = upstream.status;
        for name in upstream.headers.keys() {
            self.headers.remove(name);
            for value in upstream.headers.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
        self.headers.remove(header::TRANSFER_ENCODING);
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// What a response modifier may look at and write to.
pub struct ResponseContext<'a> {
    /// Head of the original inbound request.
    pub request: &'a Parts,
    pub caller: &'a CallerIdentity,
    /// Response that will be relayed to the caller.
    pub response: &'a mut RelayedResponse,
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn upstream(status: StatusCode, body: &'static str) -> UpstreamResponse {
        let response = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain")
            .header(header::TRANSFER_ENCODING, "chunked")
            .header(header::SET_COOKIE, "a=1")
            .header(header::SET_COOKIE, "b=2")
            .body(Body::from(body))
            .unwrap();
        UpstreamResponse::new(response)
    }

    #[tokio::test]
    async fn test_body_is_cached_after_first_read() {
        let mut upstream = upstream(StatusCode::OK, "hello");
        assert!(!upstream.is_buffered());

        assert_eq!(upstream.bytes().await.unwrap(), Bytes::from_static(b"hello"));
        assert!(upstream.is_buffered());
        assert_eq!(upstream.text().await.unwrap(), "hello");
    }

    #[test]
    fn test_copy_head_strips_transfer_encoding() {
        let upstream = upstream(StatusCode::CREATED, "");
        let mut relayed = RelayedResponse::default();
        relayed
            .headers
            .insert(header::SET_COOKIE, HeaderValue::from_static("stale=1"));

        relayed.copy_head_from(&upstream);

        assert_eq!(relayed.status, StatusCode::CREATED);
        assert_eq!(relayed.headers[header::CONTENT_TYPE], "text/plain");
        assert!(!relayed.headers.contains_key(header::TRANSFER_ENCODING));
        let cookies: Vec<_> = relayed.headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[tokio::test]
    async fn test_into_response() {
        let mut relayed = RelayedResponse::with_status(StatusCode::ACCEPTED);
        relayed.write(b"ok");
        let response = relayed.into_response();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"ok");
    }
}
