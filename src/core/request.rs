//! Inbound request URI reconstruction and the outbound request model.
//!
//! [`OutboundRequest`] mirrors the split most HTTP stacks make between
//! request headers and *content* headers (those describing the body). A
//! content header can only live next to a body; on a bodiless request it has
//! nowhere to go and is dropped.
use axum::{body::Body, extract::OriginalUri};
use bytes::Bytes;
use http::{
    HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, header,
    request::Parts,
    uri::{Authority, PathAndQuery, Scheme},
};
use http_body_util::BodyExt;

use crate::core::error::{ForwardError, ForwardResult};

/// Rebuild `scheme://host{path-base}{path}{query}` for an inbound request.
///
/// Server-side requests usually carry an origin-form URI, so the authority
/// falls back to the Host header and the scheme to `default_scheme`. When the
/// request was routed through a nested axum router the stripped path-base is
/// recovered from [`OriginalUri`].
pub fn request_uri(parts: &Parts, default_scheme: &Scheme) -> ForwardResult<Uri> {
    let scheme = parts
        .uri
        .scheme()
        .cloned()
        .unwrap_or_else(|| default_scheme.clone());

    let authority = match parts.uri.authority() {
        Some(authority) => authority.clone(),
        None => parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .and_then(|host| host.parse::<Authority>().ok())
            .ok_or(ForwardError::MissingHost)?,
    };

    let path_and_query = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    Ok(Uri::builder()
        .scheme(scheme)
        .authority(authority)
        .path_and_query(path_and_query)
        .build()?)
}

/// GET, HEAD and TRACE never carry a body upstream, whatever the caller sent.
pub fn method_carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD && method != Method::TRACE
}

/// Headers that describe the body rather than the request.
pub fn is_content_header(name: &HeaderName) -> bool {
    name == header::ALLOW
        || name == header::CONTENT_DISPOSITION
        || name == header::CONTENT_ENCODING
        || name == header::CONTENT_LANGUAGE
        || name == header::CONTENT_LENGTH
        || name == header::CONTENT_LOCATION
        || name == header::CONTENT_RANGE
        || name == header::CONTENT_TYPE
        || name == header::EXPIRES
        || name == header::LAST_MODIFIED
        || name.as_str() == "content-md5"
}

/// Body of an outbound request together with its content headers.
#[derive(Debug, Default)]
pub struct OutboundContent {
    pub headers: HeaderMap,
    pub body: Body,
}

impl OutboundContent {
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Request about to be sent to a backend. Request modifiers get full
/// mutable access to every field.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub content: Option<OutboundContent>,
}

impl OutboundRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            content: None,
        }
    }

    /// Build the outbound copy of an inbound request aimed at `target`.
    ///
    /// The body is attached before headers are copied so content headers
    /// have somewhere to land.
    pub fn from_inbound(parts: &Parts, target: Uri, body: Body) -> Self {
        let mut outbound = Self::new(parts.method.clone(), target);
        if method_carries_body(&parts.method) {
            outbound.content = Some(OutboundContent::new(body));
        }
        outbound.copy_headers(&parts.headers);
        outbound
    }

    /// Copy every header, multi-valued ones included.
    pub fn copy_headers(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            if !self.try_add_header(name.clone(), value.clone()) {
                tracing::debug!(header = %name, "Dropping content header on bodiless request");
            }
        }
    }

    /// Append a header wherever it is legal. Returns `false` when the header
    /// was dropped because it is a content header and there is no content.
    pub fn try_add_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if !is_content_header(&name) {
            self.headers.append(name, value);
            return true;
        }
        match self.content.as_mut() {
            Some(content) => {
                content.headers.append(name, value);
                true
            }
            None => false,
        }
    }

    /// Host (with explicit port, if any) of the target URI.
    pub fn target_host(&self) -> Option<String> {
        self.uri.authority().map(|authority| match authority.port() {
            Some(port) => format!("{}:{}", authority.host(), port),
            None => authority.host().to_string(),
        })
    }

    /// Point the Host header at the current target, replacing whatever was
    /// copied from the inbound request or set by a modifier.
    pub fn set_host_header(&mut self) -> ForwardResult<()> {
        let host = self
            .target_host()
            .ok_or_else(|| ForwardError::MissingTargetHost(self.uri.clone()))?;
        let value = HeaderValue::from_str(&host)
            .map_err(|_| ForwardError::MissingTargetHost(self.uri.clone()))?;
        self.headers.insert(header::HOST, value);
        Ok(())
    }

    /// Read the whole body into memory so it can be recorded and replayed on
    /// redirects. Framing headers are recomputed for the buffered body.
    pub async fn buffer(self) -> ForwardResult<BufferedRequest> {
        let Self {
            method,
            uri,
            mut headers,
            content,
        } = self;

        headers.remove(header::TRANSFER_ENCODING);

        let content = match content {
            Some(OutboundContent { mut headers, body }) => {
                let body = body
                    .collect()
                    .await
                    .map_err(ForwardError::RequestBody)?
                    .to_bytes();
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
                tracing::debug!(bytes = body.len(), "Buffered outbound request body");
                Some(BufferedContent { headers, body })
            }
            None => None,
        };

        Ok(BufferedRequest {
            method,
            uri,
            headers,
            content,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BufferedContent {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Outbound request with its body fully in memory.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub content: Option<BufferedContent>,
}

impl BufferedRequest {
    /// Request headers followed by content headers.
    pub fn all_headers(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers
            .iter()
            .chain(self.content.iter().flat_map(|content| content.headers.iter()))
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.content.as_ref().map(|content| &content.body)
    }

    /// Flatten into a plain `http::Request` for the transport.
    pub fn into_http(self) -> Request<Bytes> {
        let mut headers = self.headers;
        let body = match self.content {
            Some(content) => {
                for (name, value) in &content.headers {
                    headers.append(name.clone(), value.clone());
                }
                content.body
            }
            None => Bytes::new(),
        };

        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = headers;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_request_uri_from_host_header() {
        let parts = parts(
            Request::builder()
                .uri("/api/users?page=2")
                .header(header::HOST, "gateway.local:8080")
                .body(())
                .unwrap(),
        );

        let uri = request_uri(&parts, &Scheme::HTTP).unwrap();
        assert_eq!(uri, "http://gateway.local:8080/api/users?page=2");
    }

    #[test]
    fn test_request_uri_keeps_absolute_form() {
        let parts = parts(
            Request::builder()
                .uri("https://gateway.local/health")
                .body(())
                .unwrap(),
        );

        let uri = request_uri(&parts, &Scheme::HTTP).unwrap();
        assert_eq!(uri, "https://gateway.local/health");
    }

    #[test]
    fn test_request_uri_restores_path_base() {
        let mut request = Request::builder()
            .uri("/users")
            .header(header::HOST, "gateway.local")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(OriginalUri(Uri::from_static("/api/users?all=true")));

        let uri = request_uri(&parts(request), &Scheme::HTTPS).unwrap();
        assert_eq!(uri, "https://gateway.local/api/users?all=true");
    }

    #[test]
    fn test_request_uri_without_host_fails() {
        let parts = parts(Request::builder().uri("/").body(()).unwrap());
        assert!(matches!(
            request_uri(&parts, &Scheme::HTTP),
            Err(ForwardError::MissingHost)
        ));
    }

    #[test]
    fn test_bodiless_methods() {
        assert!(!method_carries_body(&Method::GET));
        assert!(!method_carries_body(&Method::HEAD));
        assert!(!method_carries_body(&Method::TRACE));
        assert!(method_carries_body(&Method::POST));
        assert!(method_carries_body(&Method::DELETE));
    }

    #[test]
    fn test_content_headers_follow_the_body() {
        let inbound = parts(
            Request::builder()
                .method(Method::POST)
                .uri("/submit")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "text/plain")
                .header("x-trace", "a")
                .header("x-trace", "b")
                .body(())
                .unwrap(),
        );

        let outbound = OutboundRequest::from_inbound(
            &inbound,
            Uri::from_static("http://backend/submit"),
            Body::empty(),
        );

        let content = outbound.content.as_ref().unwrap();
        assert_eq!(content.headers[header::CONTENT_TYPE], "application/json");
        assert!(!outbound.headers.contains_key(header::CONTENT_TYPE));
        assert_eq!(outbound.headers[header::ACCEPT], "text/plain");
        assert_eq!(outbound.headers.get_all("x-trace").iter().count(), 2);
    }

    #[test]
    fn test_content_headers_dropped_without_body() {
        let inbound = parts(
            Request::builder()
                .method(Method::GET)
                .uri("/")
                .header(header::CONTENT_TYPE, "text/plain")
                .header(header::ACCEPT, "*/*")
                .body(())
                .unwrap(),
        );

        let outbound = OutboundRequest::from_inbound(
            &inbound,
            Uri::from_static("http://backend/"),
            Body::from("ignored"),
        );

        assert!(outbound.content.is_none());
        assert!(!outbound.headers.contains_key(header::CONTENT_TYPE));
        assert!(outbound.headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_host_header_follows_target() {
        let mut outbound =
            OutboundRequest::new(Method::GET, Uri::from_static("http://backend:9000/healthz"));
        outbound
            .headers
            .insert(header::HOST, HeaderValue::from_static("gateway.local"));

        outbound.set_host_header().unwrap();
        assert_eq!(outbound.headers[header::HOST], "backend:9000");

        outbound.uri = Uri::from_static("/relative");
        assert!(matches!(
            outbound.set_host_header(),
            Err(ForwardError::MissingTargetHost(_))
        ));
    }

    #[tokio::test]
    async fn test_buffer_recomputes_framing() {
        let mut outbound =
            OutboundRequest::new(Method::PUT, Uri::from_static("http://backend/items/1"));
        outbound.headers.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        outbound.content = Some(OutboundContent::new("payload"));

        let buffered = outbound.buffer().await.unwrap();
        assert!(!buffered.headers.contains_key(header::TRANSFER_ENCODING));
        assert_eq!(buffered.body().unwrap().as_ref(), b"payload");

        let request = buffered.into_http();
        assert_eq!(request.headers()[header::CONTENT_LENGTH], "7");
        assert_eq!(request.body().as_ref(), b"payload");
    }
}
