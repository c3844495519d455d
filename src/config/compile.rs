//! Turns declarative [`RuleConfig`] entries into executable [`ProxyRule`]s.
use http::{
    HeaderName, HeaderValue, Uri,
    uri::{Authority, Scheme},
};
use thiserror::Error;

use crate::{config::models::RuleConfig, core::rule::ProxyRule};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Parsed pieces of a rule target.
#[derive(Debug, Clone)]
struct Target {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl Target {
    fn parse(target: &str) -> Result<Self, CompileError> {
        let invalid = |reason: String| CompileError::InvalidTarget {
            target: target.to_string(),
            reason,
        };

        let uri: Uri = target.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| invalid("missing scheme".to_string()))?;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| invalid("missing host".to_string()))?;

        Ok(Self {
            scheme,
            authority,
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    /// Target URI for an inbound `path` and `query`.
    fn resolve(&self, path: &str, query: Option<&str>) -> Result<Uri, http::Error> {
        let path = match (self.base_path.as_str(), path) {
            ("", "") => "/".to_string(),
            (base, "") => base.to_string(),
            (base, rest) if rest.starts_with('/') => format!("{base}{rest}"),
            (base, rest) => format!("{base}/{rest}"),
        };
        let path_and_query = match query {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

fn header_name(name: &str) -> Result<HeaderName, CompileError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| CompileError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Compile one rule.
///
/// The matcher accepts URIs whose path starts with `path_prefix` and, when a
/// host is configured, whose host equals it (ASCII case-insensitive). The
/// request modifier points the request at `target` and applies the header
/// actions (removals first, then additions replacing existing values).
pub fn compile_rule(config: &RuleConfig) -> Result<ProxyRule, CompileError> {
    let target = Target::parse(&config.target)?;

    let remove = config
        .request_headers
        .remove
        .iter()
        .map(|name| header_name(name))
        .collect::<Result<Vec<_>, _>>()?;
    let add = config
        .request_headers
        .add
        .iter()
        .map(|(name, value)| {
            let value = HeaderValue::from_str(value).map_err(|e| CompileError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            Ok((header_name(name)?, value))
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let prefix = config.path_prefix.clone();
    let host = config.host.clone();
    let strip_prefix = config.strip_prefix;
    let strip = prefix.clone();

    let mut builder = ProxyRule::builder(move |uri: &Uri| {
        let host_matches = match &host {
            Some(expected) => uri
                .host()
                .is_some_and(|actual| actual.eq_ignore_ascii_case(expected)),
            None => true,
        };
        host_matches && uri.path().starts_with(prefix.as_str())
    })
    .requires_authentication(config.requires_authentication)
    .request_modifier(move |request, _caller| {
        let path = request.uri.path();
        let path = if strip_prefix {
            path.strip_prefix(strip.as_str()).unwrap_or(path)
        } else {
            path
        };
        request.uri = target.resolve(path, request.uri.query())?;

        for name in &remove {
            request.headers.remove(name);
        }
        for (name, value) in &add {
            request.headers.insert(name.clone(), value.clone());
        }
        Ok(())
    });

    if let Some(name) = &config.name {
        builder = builder.name(name.clone());
    }

    Ok(builder.build())
}

/// Compile every rule, keeping order.
pub fn compile_rules(configs: &[RuleConfig]) -> Result<Vec<ProxyRule>, CompileError> {
    configs.iter().map(compile_rule).collect()
}
