//! Authentication gate.
//!
//! Decides, per request and before any routing, whether the caller may
//! proceed and which identity headers the backend will see.
//!
//! ```text
//! path public?            → Public (client identity headers dropped)
//! Authorization present?  → else AuthHeaderMissing
//! "Bearer " prefix?       → else AuthHeaderMalformed
//! signature verifies?     → else TokenInvalid
//! not expired?            → else TokenExpired
//! identity readable?      → else ClaimExtractionFailed
//!                         → Authenticated (X-User-Id / X-Username set)
//! ```

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, Request};

use crate::config::AuthConfig;
use crate::error::GatewayError;
use crate::security::token::{ClaimError, Identity, TokenVerifier};

/// Header carrying the authenticated numeric user id.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Header carrying the authenticated username.
pub const USERNAME_HEADER: HeaderName = HeaderName::from_static("x-username");

const BEARER_PREFIX: &str = "Bearer ";

/// Path prefixes that skip authentication.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    prefixes: Vec<String>,
}

impl PublicPaths {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// True if `path` starts with any listed prefix.
    pub fn is_public(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Outcome of a request that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Public path; no token inspected, no identity headers forwarded.
    Public,
    /// Verified caller.
    Authenticated(Identity),
}

/// Per-request authentication decision unit.
#[derive(Clone)]
pub struct AuthGate {
    verifier: TokenVerifier,
    public_paths: PublicPaths,
}

impl AuthGate {
    pub fn new(verifier: TokenVerifier, public_paths: PublicPaths) -> Self {
        Self {
            verifier,
            public_paths,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            TokenVerifier::new(&config.jwt_secret),
            PublicPaths::new(config.public_paths.clone()),
        )
    }

    pub fn public_paths(&self) -> &PublicPaths {
        &self.public_paths
    }

    /// Decide whether a request for `path` carrying `headers` may proceed.
    pub fn authorize(&self, path: &str, headers: &HeaderMap) -> Result<AuthDecision, GatewayError> {
        if self.public_paths.is_public(path) {
            return Ok(AuthDecision::Public);
        }

        let header = headers
            .get(AUTHORIZATION)
            .ok_or(GatewayError::AuthHeaderMissing)?;

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .ok_or(GatewayError::AuthHeaderMalformed)?;

        let claims = self.verifier.verify(token).map_err(|cause| {
            tracing::warn!(path = %path, cause = %cause, "Token validation failed");
            GatewayError::TokenInvalid
        })?;

        if self.verifier.is_expired(&claims) {
            return Err(GatewayError::TokenExpired);
        }

        let identity = self
            .verifier
            .extract_identity(&claims)
            .map_err(|cause| GatewayError::ClaimExtractionFailed(cause.to_string()))?;

        tracing::debug!(
            user_id = ?identity.user_id,
            username = %identity.subject,
            "Token validated"
        );

        Ok(AuthDecision::Authenticated(identity))
    }

    /// Run the gate on a request, attaching identity headers on success.
    ///
    /// Client-supplied identity headers never pass: they are dropped on
    /// public paths and overwritten on protected ones. Rejections are
    /// logged here with their specific cause.
    pub fn apply<B>(&self, request: &mut Request<B>) -> Result<AuthDecision, GatewayError> {
        let path = request.uri().path();
        let decision = self
            .authorize(path, request.headers())
            .and_then(|decision| {
                match &decision {
                    AuthDecision::Authenticated(identity) => {
                        let (user_id, username) = identity_headers(identity)
                            .map_err(|cause| GatewayError::ClaimExtractionFailed(cause.to_string()))?;
                        let headers = request.headers_mut();
                        headers.insert(USER_ID_HEADER, user_id);
                        headers.insert(USERNAME_HEADER, username);
                    }
                    AuthDecision::Public => {
                        let headers = request.headers_mut();
                        headers.remove(USER_ID_HEADER);
                        headers.remove(USERNAME_HEADER);
                    }
                }
                Ok(decision)
            });

        if let Err(err) = &decision {
            tracing::warn!(
                path = %request.uri().path(),
                reason = err.reason(),
                "Authentication failed: {}",
                err
            );
        }
        decision
    }
}

/// Header values for an identity: user id as decimal (empty if absent),
/// username as-is (empty if absent).
pub fn identity_headers(identity: &Identity) -> Result<(HeaderValue, HeaderValue), ClaimError> {
    let user_id = match identity.user_id {
        Some(id) => HeaderValue::from(id),
        None => HeaderValue::from_static(""),
    };
    let username =
        HeaderValue::from_str(&identity.subject).map_err(|_| ClaimError::InvalidHeaderValue)?;
    Ok((user_id, username))
}
