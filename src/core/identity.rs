//! Caller identity as established by an upstream authentication layer.
//!
//! The engine never authenticates anyone itself. An authentication middleware
//! placed before it inserts a [`CallerIdentity`] into the request extensions;
//! requests without one are treated as anonymous.
use std::collections::HashMap;

use http::Extensions;

/// A single identity attached to a caller (a bearer token, a cookie session, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Name of the authenticated principal, if known.
    pub name: Option<String>,
    /// Scheme that authenticated this identity. `None` means unauthenticated.
    pub authentication_type: Option<String>,
    /// Free-form claims made available to request modifiers.
    pub claims: HashMap<String, String>,
}

impl Identity {
    /// Identity authenticated by `authentication_type` for the principal `name`.
    pub fn authenticated(
        authentication_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            authentication_type: Some(authentication_type.into()),
            claims: HashMap::new(),
        }
    }

    /// Attach a claim.
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication_type.is_some()
    }
}

/// Every identity known for the caller of one request. The first identity is
/// the primary one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    identities: Vec<Identity>,
}

impl CallerIdentity {
    /// A caller with no identities at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(identities: Vec<Identity>) -> Self {
        Self { identities }
    }

    /// Caller identity found in the request extensions, or anonymous.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions.get::<CallerIdentity>().cloned().unwrap_or_default()
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    /// Primary identity, if any.
    pub fn primary(&self) -> Option<&Identity> {
        self.identities.first()
    }

    /// True when at least one identity is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.identities.iter().any(Identity::is_authenticated)
    }
}

impl From<Identity> for CallerIdentity {
    fn from(identity: Identity) -> Self {
        Self::new(vec![identity])
    }
}
