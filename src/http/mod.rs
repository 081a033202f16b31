//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, layers, reloadable state)
//!     → request.rs (request ID, public origin)
//!     → middleware.rs (ingest relay, bypass, region redirects)
//!     → forward.rs (binary-safe relay to analytics or the storefront origin)
//!     → Send to client
//! ```

pub mod forward;
pub mod middleware;
pub mod request;
pub mod server;

pub use forward::{ForwardProfile, Forwarder};
pub use request::X_REQUEST_ID;
pub use server::{AppState, EdgeServer, EdgeState, StartupError};
