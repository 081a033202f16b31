//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarded request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → upstream
//! Relayed response:
//!     → headers.rs (strip hop-by-hop, CORS for ingest)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Cookies never leave the site towards third-party analytics hosts
//! - Body bytes are never inspected or rewritten

pub mod headers;
