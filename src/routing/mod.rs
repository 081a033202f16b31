//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, cookies)
//!     → matcher.rs (ingest prefix? bypass prefix / static file?)
//!     → [region cache resolves a country]
//!     → dispatch.rs (pass through, cookie redirect, country redirect, no regions)
//!     → cache_id.rs (read / issue _medusa_cache_id)
//! ```
//!
//! # Design Decisions
//! - Matchers compiled from config, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Decision logic is pure and tested without HTTP

pub mod cache_id;
pub mod dispatch;
pub mod matcher;

pub use cache_id::{cache_id_set_cookie, new_cache_id, read_cache_id, CACHE_ID_COOKIE};
pub use dispatch::{decide, Dispatch, RequestView};
pub use matcher::{bypass_matcher, AnyMatcher, IngestMatcher, PathMatcher, PrefixMatcher};
