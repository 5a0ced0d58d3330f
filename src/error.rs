//! Per-request failure taxonomy and its HTTP mapping.
//!
//! Every variant is terminal for the request it belongs to. Clients only
//! ever see the status code; the message is for operators.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a request did not reach (or did not come back from) a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("missing authorization header")]
    AuthHeaderMissing,

    #[error("invalid authorization header")]
    AuthHeaderMalformed,

    #[error("invalid token")]
    TokenInvalid,

    #[error("expired token")]
    TokenExpired,

    #[error("error processing token: {0}")]
    ClaimExtractionFailed(String),

    #[error("no route matches the request path")]
    RouteNotFound,

    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("backend did not respond in time")]
    BackendTimeout,
}

impl GatewayError {
    /// HTTP status returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthHeaderMissing
            | GatewayError::AuthHeaderMalformed
            | GatewayError::TokenInvalid
            | GatewayError::TokenExpired
            | GatewayError::ClaimExtractionFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::BackendTimeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            GatewayError::AuthHeaderMissing => "auth_header_missing",
            GatewayError::AuthHeaderMalformed => "auth_header_malformed",
            GatewayError::TokenInvalid => "token_invalid",
            GatewayError::TokenExpired => "token_expired",
            GatewayError::ClaimExtractionFailed(_) => "claim_extraction_failed",
            GatewayError::RouteNotFound => "route_not_found",
            GatewayError::BackendUnreachable(_) => "backend_unreachable",
            GatewayError::BackendTimeout => "backend_timeout",
        }
    }

    /// True for the authentication failures.
    pub fn is_auth_rejection(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_auth_rejection() {
            return status.into_response();
        }
        let body = match self {
            GatewayError::RouteNotFound => "No matching route found",
            GatewayError::BackendTimeout => "Upstream request timed out",
            _ => "Upstream request failed",
        };
        (status, body).into_response()
    }
}
