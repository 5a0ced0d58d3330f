//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("route `{name}` has an invalid backend: {source}")]
    Backend {
        name: String,
        #[source]
        source: url::ParseError,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Built-in defaults, overridden from the process environment, validated.
pub fn load_default_config() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse and validate an in-memory TOML document. No environment lookups.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Recognised keys: `JWT_SECRET`, `GATEWAY_BIND_ADDRESS`, `GATEWAY_LOG_LEVEL`
/// and `<ROUTE_NAME>_URL` per route (`auth-service` reads `AUTH_SERVICE_URL`).
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secret) = lookup("JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(addr) = lookup("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
        config.observability.log_level = level;
    }
    for route in config.routes.iter_mut() {
        if let Some(backend) = lookup(&route_env_key(&route.name)) {
            route.backend = backend;
        }
    }
}

/// Environment variable holding the backend address for a route.
pub fn route_env_key(route_name: &str) -> String {
    let mut key: String = route_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    key.push_str("_URL");
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn route_env_keys() {
        assert_eq!(route_env_key("auth-service"), "AUTH_SERVICE_URL");
        assert_eq!(route_env_key("catalog.service"), "CATALOG_SERVICE_URL");
    }

    #[test]
    fn overrides_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", "an-overridden-secret-of-sufficient-length"),
            ("GATEWAY_BIND_ADDRESS", "127.0.0.1:9000"),
            ("BOOKING_SERVICE_URL", "http://bookings.internal:80"),
        ]);
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.auth.jwt_secret, "an-overridden-secret-of-sufficient-length");
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.observability.log_level, "info");
        let booking = config.routes.iter().find(|r| r.name == "booking-service").unwrap();
        assert_eq!(booking.backend, "http://bookings.internal:80");
        let auth = config.routes.iter().find(|r| r.name == "auth-service").unwrap();
        assert_eq!(auth.backend, "http://localhost:3002");
    }

    #[test]
    fn parses_toml_and_preserves_route_order() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8088"

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
            public_paths = ["/api/auth/login"]

            [[routes]]
            name = "auth"
            path_prefix = "/api/auth/"
            backend = "http://127.0.0.1:3002"

            [[routes]]
            name = "admin"
            path_prefix = "/api/auth/admin/"
            backend = "http://127.0.0.1:4000"
            strip_prefix = true
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8088");
        assert_eq!(config.auth.public_paths, vec!["/api/auth/login"]);
        let names: Vec<&str> = config.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["auth", "admin"]);
        assert!(config.routes[1].strip_prefix);
        assert_eq!(config.timeouts.upstream_secs, 30);
    }

    #[test]
    fn missing_routes_fall_back_to_defaults() {
        let config = parse_config("[listener]\nbind_address = \"127.0.0.1:8089\"\n").unwrap();
        assert_eq!(config.routes.len(), 7);
    }

    #[test]
    fn invalid_config_reports_validation_errors() {
        let err = parse_config("[auth]\njwt_secret = \"tiny\"\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::WeakSecret(4)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
    }
}
