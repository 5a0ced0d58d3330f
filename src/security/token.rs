//! Bearer token verification.
//!
//! # Responsibilities
//! - Check HMAC signature integrity against the shared secret
//! - Check structural well-formedness (encoding, JSON object payload)
//! - Answer expiration separately from signature validity
//! - Extract the caller identity from verified claims
//!
//! # Design Decisions
//! - Verify, expiry and extraction are separate calls so callers can tell
//!   "tampered" from "expired" from "unreadable claims"
//! - Every failure is an explicit value; nothing here panics
//! - Stateless: the same token always yields the same answers
//! - Missing or unreadable `exp` counts as expired (fail closed)

use std::collections::HashSet;

use jsonwebtoken::{decode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Claim carrying the numeric user identifier.
pub const USER_ID_CLAIM: &str = "userId";

/// Claim carrying the username.
pub const SUBJECT_CLAIM: &str = "sub";

/// Claim carrying the expiration timestamp (seconds since the epoch).
pub const EXPIRATION_CLAIM: &str = "exp";

/// Why a token could not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a decodable token (bad segments, base64, JSON, or payload shape).
    #[error("malformed token")]
    Malformed,
    /// Decodable, but not signed with the shared key.
    #[error("signature does not verify")]
    InvalidSignature,
}

/// Why identity could not be read from otherwise valid claims.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("subject claim is not a string")]
    InvalidSubject,
    #[error("userId claim is not an integer: {0}")]
    InvalidUserId(String),
    #[error("subject is not a valid header value")]
    InvalidHeaderValue,
}

/// Claims of a token whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Raw access to a claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Expiration in seconds since the epoch, if present and numeric.
    pub fn expires_at(&self) -> Option<f64> {
        self.get(EXPIRATION_CLAIM).and_then(Value::as_f64)
    }
}

/// Caller identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    /// Username; empty when the token carries no subject.
    pub subject: String,
    /// Numeric user id; `None` when absent (zero is a real id).
    pub user_id: Option<i64>,
}

/// Verifies HMAC-signed bearer tokens with one shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for the given UTF-8 secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // Expiry is answered by `is_expired`, not folded into signature checks.
        validation.validate_exp = false;
        validation.validate_nbf = true;
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check signature and structure, returning the claims on success.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                let err = classify(e.kind());
                tracing::debug!(error = %e, classified = %err, "Token verification failed");
                Err(err)
            }
        }
    }

    /// True if `exp` is at or before the current time, or unreadable.
    pub fn is_expired(&self, claims: &Claims) -> bool {
        self.is_expired_at(claims, get_current_timestamp())
    }

    /// Expiry check against an explicit clock reading (seconds since the epoch).
    pub fn is_expired_at(&self, claims: &Claims, now: u64) -> bool {
        match claims.expires_at() {
            Some(exp) => exp <= now as f64,
            None => true,
        }
    }

    /// Read the subject and user id out of verified claims.
    pub fn extract_identity(&self, claims: &Claims) -> Result<Identity, ClaimError> {
        let subject = match claims.get(SUBJECT_CLAIM) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ClaimError::InvalidSubject),
        };

        let user_id = match claims.get(USER_ID_CLAIM) {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_i64()
                    .ok_or_else(|| ClaimError::InvalidUserId(value.to_string()))?,
            ),
        };

        Ok(Identity { subject, user_id })
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            TokenError::InvalidSignature
        }
        _ => TokenError::Malformed,
    }
}
