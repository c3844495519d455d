use std::net::SocketAddr;

use http::{HeaderName, HeaderValue};

use crate::config::models::{HeaderActions, RuleConfig, SwitchyardConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Configuration validator. Collects every problem instead of stopping at
/// the first one.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire configuration
    pub fn validate(config: &SwitchyardConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.default_scheme != "http" && config.default_scheme != "https" {
            errors.push(ValidationError::InvalidField {
                field: "default_scheme".to_string(),
                message: format!(
                    "Must be 'http' or 'https', got '{}'",
                    config.default_scheme
                ),
            });
        }

        if config.transport.follow_redirects && config.transport.max_redirects == 0 {
            errors.push(ValidationError::InvalidField {
                field: "transport.max_redirects".to_string(),
                message: "Must be at least 1 when follow_redirects is enabled".to_string(),
            });
        }

        for (index, rule) in config.rules.iter().enumerate() {
            errors.extend(Self::validate_rule(index, rule));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Validate a single rule configuration
    pub fn validate_rule(index: usize, rule: &RuleConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let label = match &rule.name {
            Some(name) => format!("rule '{name}'"),
            None => format!("rule #{}", index + 1),
        };

        if !rule.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("{label} path_prefix"),
                message: "Path prefixes must start with '/'".to_string(),
            });
        }

        if let Err(e) = Self::validate_url(&rule.target, &format!("{label} target")) {
            errors.push(e);
        }

        if let Some(host) = &rule.host {
            if host.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{label} host"),
                    message: "Host cannot be empty".to_string(),
                });
            }
        }

        errors.extend(Self::validate_header_actions(
            &rule.request_headers,
            &format!("{label} request_headers"),
        ));

        errors
    }

    /// Validate URL format
    fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
        match url::Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: format!(
                            "URL scheme must be 'http' or 'https', got '{}'",
                            url.scheme()
                        ),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "URL must have a valid host".to_string(),
                    });
                }

                if url.query().is_some() || url.fragment().is_some() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "Target URLs cannot carry a query or fragment".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: format!("Invalid URL format: {e}"),
            }),
        }
    }

    fn validate_header_actions(actions: &HeaderActions, context: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (name, value) in &actions.add {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{context}.add"),
                    message: format!("Invalid header name '{name}'"),
                });
            }
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{context}.add.{name}"),
                    message: "Invalid header value".to_string(),
                });
            }
        }

        for name in &actions.remove {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{context}.remove"),
                    message: format!("Invalid header name '{name}'"),
                });
            }
        }

        errors
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
