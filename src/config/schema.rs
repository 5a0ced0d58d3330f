//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Signing secret used when neither the config file nor `JWT_SECRET` set one.
pub const DEFAULT_JWT_SECRET: &str = "my-super-secret-jwt-key-for-library-booking-system-2024";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Token verification and public path settings.
    pub auth: AuthConfig,

    /// Ordered route definitions. Declaration order is match order.
    pub routes: RoutesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Authentication settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret used to verify bearer tokens.
    pub jwt_secret: String,

    /// Path prefixes exempt from authentication.
    pub public_paths: Vec<String>,
}

impl AuthConfig {
    /// True when the built-in secret is still in use.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut public_paths = vec![
            "/api/auth/register".to_string(),
            "/api/auth/login".to_string(),
        ];
        public_paths.extend(
            SERVICES
                .iter()
                .map(|(_, segment, _)| format!("/api/{}/health", segment)),
        );

        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            public_paths,
        }
    }
}

// The secret never shows up in logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("public_paths", &self.public_paths)
            .finish()
    }
}

/// Route configuration mapping a path prefix to one backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Literal path prefix to match.
    pub path_prefix: String,

    /// Backend base address (e.g., "http://localhost:3002").
    pub backend: String,

    /// Forward only the part of the path after `path_prefix`.
    #[serde(default)]
    pub strip_prefix: bool,
}

impl RouteConfig {
    pub fn new(name: impl Into<String>, path_prefix: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path_prefix: path_prefix.into(),
            backend: backend.into(),
            strip_prefix: false,
        }
    }
}

/// Ordered list of routes.
///
/// Wrapped so that an absent `[[routes]]` table falls back to the stock
/// service map while an explicit list replaces it entirely.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RoutesConfig(pub Vec<RouteConfig>);

impl Default for RoutesConfig {
    fn default() -> Self {
        Self(
            SERVICES
                .iter()
                .map(|(name, segment, port)| {
                    RouteConfig::new(
                        *name,
                        format!("/api/{}/", segment),
                        format!("http://localhost:{}", port),
                    )
                })
                .collect(),
        )
    }
}

impl std::ops::Deref for RoutesConfig {
    type Target = Vec<RouteConfig>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for RoutesConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// (route name, path segment under /api, default local port)
const SERVICES: [(&str, &str, u16); 7] = [
    ("auth-service", "auth", 3002),
    ("user-service", "users", 3001),
    ("catalog-service", "resources", 3003),
    ("policy-service", "policies", 3005),
    ("booking-service", "bookings", 3004),
    ("notification-service", "notifications", 3006),
    ("analytics-service", "analytics", 3007),
];

/// Timeout configuration for backend calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upper bound on a backend exchange (send + response head) in seconds.
    pub upstream_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            idle_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
