//! Per-request pipeline.
//!
//! ```text
//! request
//!     → AuthGate::apply        (401 short-circuit, identity headers)
//!     → RouteTable::resolve    (404 short-circuit)
//!     → Upstream::forward      (502 / 503 on network failure or timeout)
//!     → backend response relayed as-is
//! ```
//!
//! The steps run strictly in this order; a failed step ends the request
//! before any later one starts. Gate and table are pure and never suspend.

use std::time::Instant;

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};

use crate::config::{ConfigError, GatewayConfig};
use crate::error::GatewayError;
use crate::http::request::request_id;
use crate::http::upstream::Upstream;
use crate::observability::metrics;
use crate::routing::RouteTable;
use crate::security::AuthGate;

/// Composes the auth gate, route table and upstream client.
#[derive(Clone)]
pub struct Dispatcher {
    gate: AuthGate,
    routes: RouteTable,
    upstream: Upstream,
}

impl Dispatcher {
    pub fn new(gate: AuthGate, routes: RouteTable, upstream: Upstream) -> Self {
        Self {
            gate,
            routes,
            upstream,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            AuthGate::from_config(&config.auth),
            RouteTable::from_config(&config.routes)?,
            Upstream::new(&config.timeouts),
        ))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Handle one inbound request end to end.
    pub async fn handle(&self, mut request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let request_id = request_id(&request).to_string();

        if let Err(err) = self.gate.apply(&mut request) {
            metrics::record_auth_rejection(err.reason());
            metrics::record_request(method.as_str(), err.status().as_u16(), "none", start);
            return err.into_response();
        }

        let Some(route) = self.routes.resolve(&path) else {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            let err = GatewayError::RouteNotFound;
            metrics::record_request(method.as_str(), err.status().as_u16(), "none", start);
            return err.into_response();
        };

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            route = route.name(),
            backend = %route.backend(),
            "Proxying request"
        );

        match self.upstream.forward(route, request).await {
            Ok(response) => {
                metrics::record_request(method.as_str(), response.status().as_u16(), route.name(), start);
                response
            }
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    route = route.name(),
                    reason = err.reason(),
                    "Request failed: {}",
                    err
                );
                metrics::record_request(method.as_str(), err.status().as_u16(), route.name(), start);
                err.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, TimeoutConfig};
    use axum::http::{header::AUTHORIZATION, StatusCode};
    use jsonwebtoken::{encode, get_current_timestamp, Algorithm, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "dispatcher-secret-with-at-least-32-bytes";

    /// Backends on a reserved, unroutable port: any contact attempt fails.
    fn dispatcher() -> Dispatcher {
        let mut config = GatewayConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.routes.clear();
        config.routes.push(RouteConfig::new("users", "/api/users/", "http://127.0.0.1:1"));
        config.timeouts = TimeoutConfig {
            connect_secs: 1,
            upstream_secs: 2,
            idle_secs: 5,
        };
        Dispatcher::from_config(&config).unwrap()
    }

    fn bearer() -> String {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({"sub": "alice", "userId": 42, "exp": get_current_timestamp() + 600}),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn rejection_short_circuits_before_routing() {
        // Unknown path *and* no token: the gate answers first.
        let request = Request::builder()
            .uri("/api/unknown/thing")
            .body(Body::empty())
            .unwrap();
        let response = dispatcher().handle(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_unknown_path_is_404() {
        let request = Request::builder()
            .uri("/api/unknown/thing")
            .header(AUTHORIZATION, bearer())
            .body(Body::empty())
            .unwrap();
        let response = dispatcher().handle(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreachable_backend_is_502() {
        let request = Request::builder()
            .uri("/api/users/me")
            .header(AUTHORIZATION, bearer())
            .body(Body::empty())
            .unwrap();
        let response = dispatcher().handle(request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
