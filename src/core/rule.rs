//! Routing rules.
//!
//! A [`ProxyRule`] is plain data with behaviour slots: a matcher, a request
//! modifier and an optional response modifier. Rules are evaluated in list
//! order and the first match wins.
use std::{fmt, sync::Arc};

use async_trait::async_trait;
use http::Uri;

use crate::core::{
    identity::CallerIdentity,
    request::OutboundRequest,
    response::{ResponseContext, UpstreamResponse},
};

/// Predicate over the canonical request URI. Must be cheap and free of side
/// effects: it runs for every request until some rule matches.
pub type Matcher = Arc<dyn Fn(&Uri) -> bool + Send + Sync>;

/// Rewrites the outbound request in place (target, headers, body).
pub type RequestModifier =
    Arc<dyn Fn(&mut OutboundRequest, &CallerIdentity) -> eyre::Result<()> + Send + Sync>;

/// Hook that runs once the backend has answered.
///
/// It can read the backend response (including its body) and write status,
/// headers and body of the relayed response through the context.
#[async_trait]
pub trait ResponseModifier: Send + Sync {
    async fn modify(
        &self,
        upstream: &mut UpstreamResponse,
        context: ResponseContext<'_>,
    ) -> eyre::Result<()>;
}

#[derive(Clone)]
pub struct ProxyRule {
    name: Option<String>,
    matcher: Matcher,
    requires_authentication: bool,
    request_modifier: RequestModifier,
    response_modifier: Option<Arc<dyn ResponseModifier>>,
    pre_process_response: bool,
}

impl ProxyRule {
    /// Start building a rule around `matcher`.
    pub fn builder<F>(matcher: F) -> ProxyRuleBuilder
    where
        F: Fn(&Uri) -> bool + Send + Sync + 'static,
    {
        ProxyRuleBuilder::new(Arc::new(matcher))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn matches(&self, uri: &Uri) -> bool {
        (self.matcher)(uri)
    }

    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }

    pub fn modify_request(
        &self,
        request: &mut OutboundRequest,
        caller: &CallerIdentity,
    ) -> eyre::Result<()> {
        (self.request_modifier)(request, caller)
    }

    pub fn response_modifier(&self) -> Option<&dyn ResponseModifier> {
        self.response_modifier.as_deref()
    }

    pub fn pre_process_response(&self) -> bool {
        self.pre_process_response
    }

    /// Whether the engine copies status, headers and body itself before any
    /// response modifier runs.
    pub fn copies_response(&self) -> bool {
        self.pre_process_response || self.response_modifier.is_none()
    }
}

impl fmt::Debug for ProxyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRule")
            .field("name", &self.name)
            .field("requires_authentication", &self.requires_authentication)
            .field("has_response_modifier", &self.response_modifier.is_some())
            .field("pre_process_response", &self.pre_process_response)
            .finish_non_exhaustive()
    }
}

fn keep_target(_request: &mut OutboundRequest, _caller: &CallerIdentity) -> eyre::Result<()> {
    Ok(())
}

/// Builder for [`ProxyRule`]. Without a request modifier the outbound request
/// targets the inbound URI unchanged.
pub struct ProxyRuleBuilder {
    name: Option<String>,
    matcher: Matcher,
    requires_authentication: bool,
    request_modifier: Option<RequestModifier>,
    response_modifier: Option<Arc<dyn ResponseModifier>>,
    pre_process_response: bool,
}

impl ProxyRuleBuilder {
    fn new(matcher: Matcher) -> Self {
        Self {
            name: None,
            matcher,
            requires_authentication: false,
            request_modifier: None,
            response_modifier: None,
            pre_process_response: false,
        }
    }

    /// Name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn requires_authentication(mut self, required: bool) -> Self {
        self.requires_authentication = required;
        self
    }

    pub fn request_modifier<F>(mut self, modifier: F) -> Self
    where
        F: Fn(&mut OutboundRequest, &CallerIdentity) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.request_modifier = Some(Arc::new(modifier));
        self
    }

    pub fn response_modifier(mut self, modifier: impl ResponseModifier + 'static) -> Self {
        self.response_modifier = Some(Arc::new(modifier));
        self
    }

    /// Copy the backend response before the response modifier runs.
    pub fn pre_process_response(mut self, enabled: bool) -> Self {
        self.pre_process_response = enabled;
        self
    }

    pub fn build(self) -> ProxyRule {
        ProxyRule {
            name: self.name,
            matcher: self.matcher,
            requires_authentication: self.requires_authentication,
            request_modifier: self
                .request_modifier
                .unwrap_or_else(|| Arc::new(keep_target)),
            response_modifier: self.response_modifier,
            pre_process_response: self.pre_process_response,
        }
    }
}
