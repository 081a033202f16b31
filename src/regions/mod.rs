//! Region subsystem.
//!
//! # Data Flow
//! ```text
//! request (path, geo header)
//!     → cache.rs (get_or_refresh: fresh snapshot, or fetch via source.rs)
//!     → country.rs (URL segment → geo → default → first known country)
//!     → country code handed to the redirect decision
//!
//! source.rs failure:
//!     → single-region fallback keyed by the default country
//! ```
//!
//! # Design Decisions
//! - The cache is an owned object injected into handlers, not a global
//! - Snapshots are immutable; refresh swaps the whole map
//! - Only a missing backend URL is fatal

pub mod cache;
pub mod country;
pub mod source;
pub mod types;

pub use cache::{RegionCache, RegionError, RegionLookup, Snapshot};
pub use country::{geo_country, path_country_segment, resolve_country_code};
pub use source::{FetchError, HttpRegionSource, RegionSource};
pub use types::{Country, Region, RegionMap};
