//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs, timeouts and key strength
//! - Detect duplicate route names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// Minimum HMAC key length in bytes (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("auth.jwt_secret is empty")]
    EmptySecret,

    #[error("auth.jwt_secret is {0} bytes, at least 32 are required")]
    WeakSecret(usize),

    #[error("auth.public_paths entry `{0}` must start with '/'")]
    PublicPath(String),

    #[error("no routes configured")]
    NoRoutes,

    #[error("route #{0} has an empty name")]
    EmptyRouteName(usize),

    #[error("route `{0}` is declared more than once")]
    DuplicateRoute(String),

    #[error("route `{name}` path_prefix `{prefix}` must start with '/'")]
    RoutePrefix { name: String, prefix: String },

    #[error("route `{name}` backend `{backend}` is invalid: {reason}")]
    Backend {
        name: String,
        backend: String,
        reason: String,
    },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let secret_len = config.auth.jwt_secret.len();
    if secret_len == 0 {
        errors.push(ValidationError::EmptySecret);
    } else if secret_len < MIN_SECRET_LEN {
        errors.push(ValidationError::WeakSecret(secret_len));
    }

    for path in &config.auth.public_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::PublicPath(path.clone()));
        }
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName(index));
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::RoutePrefix {
                name: route.name.clone(),
                prefix: route.path_prefix.clone(),
            });
        }

        if let Err(reason) = check_backend(&route.backend) {
            errors.push(ValidationError::Backend {
                name: route.name.clone(),
                backend: route.backend.clone(),
                reason,
            });
        }
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("idle_secs", timeouts.idle_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(field));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_backend(backend: &str) -> Result<(), String> {
    let url = Url::parse(backend).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() {
        return Err("query strings are not allowed".to_string());
    }
    Ok(())
}
