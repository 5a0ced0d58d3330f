//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → gate.rs (public path check, Authorization header shape)
//!     → token.rs (signature, expiry, identity claims)
//!     → gate.rs (inject X-User-Id / X-Username)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - Every rejection is a 401; the specific cause is only logged
//! - No trust in client-supplied identity headers on protected paths

pub mod gate;
pub mod token;

pub use gate::{AuthDecision, AuthGate, PublicPaths, USERNAME_HEADER, USER_ID_HEADER};
pub use token::{Claims, ClaimError, Identity, TokenError, TokenVerifier};
