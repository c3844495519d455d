//! Per-request diagnostic record handed to the [`Reporter`](crate::ports::reporter::Reporter).
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use serde::{Serialize, Serializer};

use crate::core::request::BufferedRequest;

/// Terminal classification of how a request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyStatus {
    /// A forward to a backend was attempted
    Proxied,
    /// No rule matched; the next handler served the request
    NotProxied,
    /// A rule matched but required an authenticated caller
    NotAuthenticated,
}

/// Ordered header name to values list.
pub type HeaderList = Vec<(String, Vec<String>)>;

/// Immutable snapshot of one request's journey through the engine.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyResult {
    pub proxy_status: ProxyStatus,
    pub http_status_code: u16,
    #[serde(serialize_with = "serialize_display")]
    pub original_uri: Uri,
    #[serde(serialize_with = "serialize_optional_display")]
    pub proxied_uri: Option<Uri>,
    #[serde(serialize_with = "serialize_display")]
    pub http_method: Method,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub request_headers: HeaderList,
    pub response_headers: HeaderList,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
}

fn serialize_display<T: std::fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_optional_display<T: std::fmt::Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_some(&value.to_string()),
        None => serializer.serialize_none(),
    }
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64() * 1000.0)
}

/// Group header values by name, keeping first-seen order.
pub fn header_list<'a>(headers: impl IntoIterator<Item = (&'a HeaderName, &'a HeaderValue)>) -> HeaderList {
    let mut list: HeaderList = Vec::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match list.iter_mut().find(|(existing, _)| existing == name.as_str()) {
            Some((_, values)) => values.push(value),
            None => list.push((name.as_str().to_string(), vec![value])),
        }
    }
    list
}

/// Accumulates facts about a request and finalizes them exactly once.
///
/// The finalizers consume the builder, so a result can neither be finalized
/// twice nor modified after it was handed out.
#[derive(Debug)]
pub struct ProxyResultBuilder {
    result: ProxyResult,
    start: Instant,
}

impl ProxyResultBuilder {
    /// Start recording a request at entry.
    pub fn new(original_uri: Uri, http_method: Method) -> Self {
        Self {
            result: ProxyResult {
                proxy_status: ProxyStatus::NotProxied,
                http_status_code: 0,
                original_uri,
                proxied_uri: None,
                http_method,
                started_at: Utc::now(),
                elapsed: Duration::ZERO,
                request_headers: Vec::new(),
                response_headers: Vec::new(),
                request_body: None,
                response_body: None,
            },
            start: Instant::now(),
        }
    }

    /// Record the outbound request as it will be sent.
    pub fn record_request(&mut self, request: &BufferedRequest) {
        self.result.http_method = request.method.clone();
        self.result.request_headers = header_list(request.all_headers());
        self.result.request_body = request
            .body()
            .map(|body| String::from_utf8_lossy(body).into_owned());
    }

    /// Record what the backend answered.
    pub fn record_response(&mut self, status: StatusCode, headers: &HeaderMap, body: &[u8]) {
        self.result.http_status_code = status.as_u16();
        self.result.response_headers = header_list(headers);
        self.result.response_body = Some(String::from_utf8_lossy(body).into_owned());
    }

    /// A forward to `proxied_uri` was attempted; `status` is what the caller got.
    pub fn proxied(mut self, proxied_uri: Uri, status: StatusCode) -> ProxyResult {
        self.result.proxied_uri = Some(proxied_uri);
        self.finish(ProxyStatus::Proxied, status)
    }

    /// No rule matched; `status` is whatever the next handler produced.
    pub fn not_proxied(self, status: StatusCode) -> ProxyResult {
        self.finish(ProxyStatus::NotProxied, status)
    }

    pub fn not_authenticated(self) -> ProxyResult {
        self.finish(ProxyStatus::NotAuthenticated, StatusCode::UNAUTHORIZED)
    }

    fn finish(mut self, proxy_status: ProxyStatus, status: StatusCode) -> ProxyResult {
        self.result.proxy_status = proxy_status;
        self.result.http_status_code = status.as_u16();
        self.result.elapsed = self.start.elapsed();
        self.result
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::header;

    use super::*;
    use crate::core::request::BufferedContent;

    #[test]
    fn test_header_list_groups_values() {
        let mut headers = HeaderMap::new();
        headers.append(header::ACCEPT, HeaderValue::from_static("text/html"));
        headers.append("x-tag", HeaderValue::from_static("one"));
        headers.append(header::ACCEPT, HeaderValue::from_static("*/*"));

        let list = header_list(&headers);
        assert_eq!(
            list,
            vec![
                (
                    "accept".to_string(),
                    vec!["text/html".to_string(), "*/*".to_string()]
                ),
                ("x-tag".to_string(), vec!["one".to_string()]),
            ]
        );
    }

    #[test]
    fn test_not_authenticated() {
        let result = ProxyResultBuilder::new(Uri::from_static("http://gw/api/x"), Method::GET)
            .not_authenticated();

        assert_eq!(result.proxy_status, ProxyStatus::NotAuthenticated);
        assert_eq!(result.http_status_code, 401);
        assert!(result.proxied_uri.is_none());
        assert!(result.request_headers.is_empty());
    }

    #[test]
    fn test_proxied_records_request_and_response() {
        let mut builder =
            ProxyResultBuilder::new(Uri::from_static("http://gw/submit"), Method::POST);

        let mut content_headers = HeaderMap::new();
        content_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let request = BufferedRequest {
            method: Method::POST,
            uri: Uri::from_static("http://backend/submit"),
            headers: HeaderMap::new(),
            content: Some(BufferedContent {
                headers: content_headers,
                body: Bytes::from_static(b"data"),
            }),
        };
        builder.record_request(&request);
        builder.record_response(StatusCode::CREATED, &HeaderMap::new(), b"created");

        let result = builder.proxied(request.uri.clone(), StatusCode::CREATED);
        assert_eq!(result.proxy_status, ProxyStatus::Proxied);
        assert_eq!(result.http_status_code, 201);
        assert_eq!(result.proxied_uri.unwrap(), "http://backend/submit");
        assert_eq!(result.request_body.as_deref(), Some("data"));
        assert_eq!(result.response_body.as_deref(), Some("created"));
        assert_eq!(result.request_headers[0].0, "content-type");
    }

    #[test]
    fn test_serializes_to_json() {
        let result = ProxyResultBuilder::new(Uri::from_static("http://gw/static/app.js"), Method::GET)
            .not_proxied(StatusCode::OK);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["proxy_status"], "not_proxied");
        assert_eq!(json["original_uri"], "http://gw/static/app.js");
        assert_eq!(json["http_method"], "GET");
        assert!(json["proxied_uri"].is_null());
        assert!(json["elapsed_ms"].is_number());
    }
}
