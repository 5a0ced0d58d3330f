//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id + trace layers)
//!     → dispatcher.rs (auth gate → route table → upstream)
//!     → upstream.rs (rewrite, forward, relay)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod server;
pub mod upstream;

pub use dispatcher::Dispatcher;
pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
pub use upstream::Upstream;
