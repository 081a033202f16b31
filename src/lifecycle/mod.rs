//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! Config reload is file-driven (see `config::watcher`), not signal-driven.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
