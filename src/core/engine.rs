//! Forwarding engine.
//!
//! `ForwardingEngine` runs the whole decision and transformation pipeline for
//! one inbound request:
//! * first-match rule selection over the canonical request URI
//! * authentication gate (401 without forwarding)
//! * outbound request construction and rewriting
//! * a single-shot send over the shared transport, bound to caller liveness
//! * response relay and optional response rewriting
//! * exactly one [`ProxyResult`] handed to the reporter per finished request
//!
//! Requests that match no rule are handed to the `next` continuation.
use std::{future::Future, sync::Arc};

use axum::body::Body;
use http::{Request, Response, StatusCode, Uri, request::Parts, uri::Scheme};
use tokio_util::sync::CancellationToken;

use crate::{
    adapters::http_client::HttpClientAdapter,
    config::models::TransportConfig,
    core::{
        error::{ForwardError, ForwardResult},
        identity::CallerIdentity,
        request::{BufferedRequest, OutboundRequest, request_uri},
        response::{RelayedResponse, ResponseContext, UpstreamResponse},
        result::{ProxyResult, ProxyResultBuilder},
        rule::ProxyRule,
    },
    ports::{
        http_client::{HttpClient, HttpClientError, HttpClientResult},
        reporter::Reporter,
    },
};

/// Everything the engine needs, fixed at startup.
pub struct ProxyOptions {
    /// Evaluated in order; the first match wins.
    pub rules: Vec<ProxyRule>,
    pub reporter: Arc<dyn Reporter>,
    /// Used to build the default transport when `http_client` is `None`.
    pub transport: TransportConfig,
    /// Custom transport replacing the default one.
    pub http_client: Option<Arc<dyn HttpClient>>,
    /// Scheme assumed for origin-form inbound URIs.
    pub default_scheme: Scheme,
}

impl ProxyOptions {
    pub fn new(rules: Vec<ProxyRule>, reporter: impl Reporter) -> Self {
        Self {
            rules,
            reporter: Arc::new(reporter),
            transport: TransportConfig::default(),
            http_client: None,
            default_scheme: Scheme::HTTP,
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_default_scheme(mut self, scheme: Scheme) -> Self {
        self.default_scheme = scheme;
        self
    }
}

/// Failures while talking to the backend, split by who handles them.
enum ExchangeError {
    /// Recovered locally as 503
    Transport(HttpClientError),
    /// Escalated to the caller of [`ForwardingEngine::handle`]
    Forward(ForwardError),
}

impl From<HttpClientError> for ExchangeError {
    fn from(error: HttpClientError) -> Self {
        match error {
            HttpClientError::InvalidRequest(_) => Self::Forward(ForwardError::InvalidTarget(error)),
            error => Self::Transport(error),
        }
    }
}

impl From<ForwardError> for ExchangeError {
    fn from(error: ForwardError) -> Self {
        Self::Forward(error)
    }
}

/// Run `future` unless the caller goes away first.
async fn until_cancelled<F: Future>(
    cancellation: &CancellationToken,
    future: F,
) -> ForwardResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(ForwardError::Cancelled),
        output = future => Ok(output),
    }
}

/// Request forwarding engine. Cheap to clone; all state is shared and
/// read-only after construction.
#[derive(Clone)]
pub struct ForwardingEngine {
    rules: Arc<[ProxyRule]>,
    reporter: Arc<dyn Reporter>,
    http_client: Arc<dyn HttpClient>,
    default_scheme: Scheme,
}

impl ForwardingEngine {
    /// Build the engine, creating the shared transport unless a custom one
    /// was supplied.
    pub fn new(options: ProxyOptions) -> HttpClientResult<Self> {
        let http_client = match options.http_client {
            Some(client) => client,
            None => Arc::new(HttpClientAdapter::new(&options.transport)?),
        };

        tracing::info!(rules = options.rules.len(), "Forwarding engine ready");

        Ok(Self {
            rules: options.rules.into(),
            reporter: options.reporter,
            http_client,
            default_scheme: options.default_scheme,
        })
    }

    pub fn rules(&self) -> &[ProxyRule] {
        &self.rules
    }

    /// First rule, in list order, whose matcher accepts `uri`.
    pub fn find_rule(&self, uri: &Uri) -> Option<&ProxyRule> {
        self.rules.iter().find(|rule| rule.matches(uri))
    }

    /// Handle one inbound request.
    ///
    /// `next` is invoked (exactly once) only when no rule matches. Transport
    /// failures become a 503 response; the returned error covers
    /// misconfiguration, broken inbound requests and cancellation, in which
    /// case nothing is reported.
    #[tracing::instrument(
        name = "forward",
        skip_all,
        fields(http.method = %request.method(), http.path = %request.uri().path())
    )]
    pub async fn handle<N, Fut>(
        &self,
        request: Request<Body>,
        next: N,
    ) -> ForwardResult<Response<Body>>
    where
        N: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response<Body>>,
    {
        let (parts, body) = request.into_parts();
        let uri = request_uri(&parts, &self.default_scheme)?;
        let mut recorder = ProxyResultBuilder::new(uri.clone(), parts.method.clone());

        let Some(rule) = self.find_rule(&uri) else {
            tracing::debug!(%uri, "No rule matched, delegating to next handler");
            let response = next(Request::from_parts(parts, body)).await;
            self.reporter.report(recorder.not_proxied(response.status()));
            return Ok(response);
        };

        tracing::debug!(%uri, rule = ?rule.name(), "Rule matched");

        let caller = CallerIdentity::from_extensions(&parts.extensions);
        if rule.requires_authentication() && !caller.is_authenticated() {
            tracing::info!(%uri, "Rejecting unauthenticated caller");
            self.reporter.report(recorder.not_authenticated());
            return Ok(RelayedResponse::with_status(StatusCode::UNAUTHORIZED).into_response());
        }

        let cancellation = parts
            .extensions
            .get::<CancellationToken>()
            .cloned()
            .unwrap_or_default();

        let mut outbound = OutboundRequest::from_inbound(&parts, uri, body);
        rule.modify_request(&mut outbound, &caller)
            .map_err(ForwardError::RequestModifier)?;
        outbound.set_host_header()?;

        let outbound = until_cancelled(&cancellation, outbound.buffer()).await??;
        recorder.record_request(&outbound);
        let proxied_uri = outbound.uri.clone();

        let mut relayed = RelayedResponse::default();
        let exchange = self.exchange(
            rule,
            outbound,
            &parts,
            &caller,
            &cancellation,
            &mut relayed,
            &mut recorder,
        );
        match exchange.await {
            Ok(()) => {}
            Err(ExchangeError::Transport(error)) => {
                tracing::warn!(target_uri = %proxied_uri, %error, "Backend unreachable");
                relayed = RelayedResponse::with_status(StatusCode::SERVICE_UNAVAILABLE);
            }
            Err(ExchangeError::Forward(error)) => return Err(error),
        }

        tracing::info!(
            target_uri = %proxied_uri,
            status = relayed.status.as_u16(),
            "Request proxied"
        );
        self.reporter
            .report(recorder.proxied(proxied_uri, relayed.status));
        Ok(relayed.into_response())
    }

    /// Send the request and fill `relayed` from the backend's answer.
    #[allow(clippy::too_many_arguments)]
    async fn exchange(
        &self,
        rule: &ProxyRule,
        request: BufferedRequest,
        inbound: &Parts,
        caller: &CallerIdentity,
        cancellation: &CancellationToken,
        relayed: &mut RelayedResponse,
        recorder: &mut ProxyResultBuilder,
    ) -> Result<(), ExchangeError> {
        let response =
            until_cancelled(cancellation, self.http_client.send_request(request.into_http()))
                .await??;
        let mut upstream = UpstreamResponse::new(response);

        if rule.copies_response() {
            relayed.copy_head_from(&upstream);
            if upstream.status != StatusCode::NO_CONTENT {
                let body = until_cancelled(cancellation, upstream.bytes()).await??;
                relayed.write(&body);
            }
        }

        if let Some(modifier) = rule.response_modifier() {
            let context = ResponseContext {
                request: inbound,
                caller,
                response: &mut *relayed,
            };
            until_cancelled(cancellation, modifier.modify(&mut upstream, context))
                .await?
                .map_err(|report| match report.downcast::<HttpClientError>() {
                    Ok(error) => ExchangeError::from(error),
                    Err(report) => ExchangeError::Forward(ForwardError::ResponseModifier(report)),
                })?;
        }

        let body = until_cancelled(cancellation, upstream.bytes()).await??;
        recorder.record_response(upstream.status, &upstream.headers, &body);
        Ok(())
    }
}
