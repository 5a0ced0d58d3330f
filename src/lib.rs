//! Edge gateway for the library-booking platform.
//!
//! Routes `/api/<service>/...` requests to one backend per service and
//! authenticates callers with HMAC-signed bearer tokens, passing the
//! verified identity downstream as `X-User-Id` / `X-Username`.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
