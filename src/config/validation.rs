//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check names are usable as DNS labels (they end up in the dial target)
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ScalerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::time::Duration;

use crate::config::schema::ScalerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `workload.port`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a fully-merged configuration.
pub fn validate_config(config: &ScalerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.socket_addr() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address: {}", config.listener.bind_address, e),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be at least 1"));
    }

    check_dns_label(&mut errors, "workload.name", &config.workload.name);
    check_dns_label(&mut errors, "workload.namespace", &config.workload.namespace);
    check_dns_label(&mut errors, "workload.headless_service", &config.workload.headless_service);
    if config.workload.port == 0 {
        errors.push(ValidationError::new("workload.port", "must be non-zero"));
    }
    if let Some(domain) = &config.workload.cluster_domain {
        if domain.is_empty() || domain.split('.').any(|label| !is_dns_label(label)) {
            errors.push(ValidationError::new(
                "workload.cluster_domain",
                format!("{:?} is not a valid DNS suffix", domain),
            ));
        }
    }

    check_positive(&mut errors, "scaling.ready_timeout", config.scaling.ready_timeout);
    check_positive(&mut errors, "scaling.poll_interval", config.scaling.poll_interval);
    check_positive(&mut errors, "scaling.dial_timeout", config.scaling.dial_timeout);
    check_positive(&mut errors, "orchestrator.request_timeout", config.orchestrator.request_timeout);

    if let Some(api_server) = &config.orchestrator.api_server {
        match url::Url::parse(api_server) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(u) => errors.push(ValidationError::new(
                "orchestrator.api_server",
                format!("unsupported scheme {:?}", u.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "orchestrator.api_server",
                format!("{:?} is not a URL: {}", api_server, e),
            )),
        }
    }

    if config
        .observability
        .log_level
        .parse::<tracing::Level>()
        .is_err()
    {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: Duration) {
    if value.is_zero() {
        errors.push(ValidationError::new(field, "must be greater than zero"));
    }
}

fn check_dns_label(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !is_dns_label(value) {
        errors.push(ValidationError::new(
            field,
            format!("{:?} is not a valid DNS-1123 label", value),
        ));
    }
}

/// RFC 1123 label: 1-63 chars of `[a-z0-9-]`, alphanumeric at both ends.
fn is_dns_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
}
