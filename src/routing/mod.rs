//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → table.rs (ordered prefix scan)
//!     → Return: matched RouteEntry or None
//!
//! Route compilation (at startup):
//!     RouteConfig[] (declaration order preserved)
//!     → parse backend base URLs
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (literal prefix matching only)
//! - First match wins in declaration order; overlapping prefixes are
//!   not resolved by specificity

pub mod table;

pub use table::{RouteEntry, RouteTable};
