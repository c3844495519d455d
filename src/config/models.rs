//! Configuration data structures for Switchyard.
//!
//! These types map directly to YAML (also JSON / TOML) configuration files. They are
//! serde‑friendly and include defaults so that minimal configs remain concise.
//! Only declarative rules can live in a file; rules with custom code are
//! built with [`ProxyRule::builder`](crate::core::rule::ProxyRule::builder).
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> usize {
    10
}

/// Settings of the shared outbound transport. Read once at startup.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Follow 3xx redirects from backends instead of relaying them
    pub follow_redirects: bool,
    /// Maximum number of redirect hops when following
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Transparently decode gzip / deflate response bodies
    #[serde(default = "default_true")]
    pub decompression: bool,
    /// Upper bound on a whole backend exchange, in seconds
    pub timeout_secs: Option<u64>,
    /// Upper bound on establishing a backend connection, in seconds
    pub connect_timeout_secs: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            follow_redirects: false,
            max_redirects: default_max_redirects(),
            decompression: true,
            timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `switchyard=debug`
    pub level: String,
    /// JSON lines instead of human readable output
    pub json: bool,
    /// Include request/response bodies in reported results
    pub include_bodies: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
            include_bodies: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct HeaderActions {
    #[serde(default)]
    pub add: HashMap<String, String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// A declarative forwarding rule.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RuleConfig {
    /// Name used in logs
    #[serde(default)]
    pub name: Option<String>,
    /// Path prefix the request must start with
    pub path_prefix: String,
    /// Restrict the rule to one inbound host (case-insensitive, port ignored)
    #[serde(default)]
    pub host: Option<String>,
    /// Backend base URL, e.g. `http://backend:9000` or `http://backend/v2`
    pub target: String,
    /// Remove `path_prefix` before appending the path to `target`
    #[serde(default)]
    pub strip_prefix: bool,
    #[serde(default)]
    pub requires_authentication: bool,
    #[serde(default)]
    pub request_headers: HeaderActions,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SwitchyardConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Scheme assumed for inbound requests that do not carry one
    #[serde(default = "default_scheme")]
    pub default_scheme: String,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Evaluated top to bottom, first match wins
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for SwitchyardConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            default_scheme: default_scheme(),
            transport: TransportConfig::default(),
            logging: LoggingConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl SwitchyardConfig {
    /// Create a new configuration builder
    pub fn builder() -> SwitchyardConfigBuilder {
        SwitchyardConfigBuilder::default()
    }
}

/// Builder for SwitchyardConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct SwitchyardConfigBuilder {
    config: SwitchyardConfig,
}

impl SwitchyardConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.config.transport = transport;
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Append a rule; rules keep insertion order
    pub fn rule(mut self, rule: RuleConfig) -> Self {
        self.config.rules.push(rule);
        self
    }

    pub fn build(self) -> SwitchyardConfig {
        self.config
    }
}
