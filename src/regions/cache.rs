//! Freshness-bounded region cache.
//!
//! The cache holds at most one snapshot: a complete `RegionMap` plus the
//! instant it was loaded. Snapshots are replaced wholesale through `ArcSwap`,
//! so readers never observe a partially built map. Refreshes are serialized;
//! a task that waited on the refresh lock re-checks freshness before fetching.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{Environment, RegionConfig};
use crate::observability::metrics;
use crate::regions::source::{FetchError, HttpRegionSource, RegionSource, SourceInitError};
use crate::regions::types::RegionMap;

/// Fatal region errors. Everything else degrades to the fallback map.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error(
        "Error fetching regions. Did you set up regions in your Admin and define a MEDUSA_BACKEND_URL environment variable? Note that the variable is no longer named NEXT_PUBLIC_MEDUSA_BACKEND_URL."
    )]
    MissingBackendUrl,

    #[error(transparent)]
    Source(#[from] SourceInitError),
}

/// A loaded region map and when it was loaded.
#[derive(Debug)]
pub struct Snapshot {
    pub map: Arc<RegionMap>,
    pub refreshed_at: Instant,
    pub fallback: bool,
}

/// Outcome of `RegionCache::get_or_refresh`.
#[derive(Debug)]
pub enum RegionLookup {
    /// Served from a fresh snapshot.
    Cached(Arc<RegionMap>),
    /// The backend was queried and answered.
    Refreshed(Arc<RegionMap>),
    /// The backend failed; the single-region fallback was installed.
    Fallback {
        map: Arc<RegionMap>,
        reason: FetchError,
    },
}

impl RegionLookup {
    pub fn map(&self) -> &Arc<RegionMap> {
        match self {
            RegionLookup::Cached(map) | RegionLookup::Refreshed(map) => map,
            RegionLookup::Fallback { map, .. } => map,
        }
    }

    pub fn into_map(self) -> Arc<RegionMap> {
        match self {
            RegionLookup::Cached(map) | RegionLookup::Refreshed(map) => map,
            RegionLookup::Fallback { map, .. } => map,
        }
    }
}

pub struct RegionCache {
    source: Option<Arc<dyn RegionSource>>,
    default_country: String,
    ttl: Duration,
    environment: Environment,
    snapshot: ArcSwapOption<Snapshot>,
    refresh_lock: Mutex<()>,
}

impl RegionCache {
    /// Create an empty cache. A `None` source means no backend is configured,
    /// which every lookup reports as `RegionError::MissingBackendUrl`.
    pub fn new(
        source: Option<Arc<dyn RegionSource>>,
        default_country: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            default_country: default_country.into().to_lowercase(),
            ttl,
            environment: Environment::Production,
            snapshot: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Build a cache backed by the HTTP store API.
    pub fn from_config(
        config: &RegionConfig,
        environment: Environment,
    ) -> Result<Self, RegionError> {
        let source = match config.backend_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Some(Arc::new(HttpRegionSource::new(
                url,
                config.publishable_key.clone(),
                Duration::from_secs(config.fetch_timeout_secs),
            )?) as Arc<dyn RegionSource>),
            None => None,
        };

        Ok(Self::new(
            source,
            config.default_country.clone(),
            Duration::from_secs(config.refresh_secs),
        )
        .with_environment(environment))
    }

    pub fn default_country(&self) -> &str {
        &self.default_country
    }

    /// Return the current region map, reloading it first when the cache is
    /// empty or older than the ttl.
    pub async fn get_or_refresh(&self, cache_id: &str) -> Result<RegionLookup, RegionError> {
        let source = self.source.as_ref().ok_or(RegionError::MissingBackendUrl)?;

        if let Some(map) = self.fresh_map() {
            return Ok(RegionLookup::Cached(map));
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(map) = self.fresh_map() {
            return Ok(RegionLookup::Cached(map));
        }

        tracing::debug!(cache_id = %cache_id, "Refreshing region cache");
        let lookup = match source.fetch_regions().await {
            Ok(regions) => {
                let map = Arc::new(RegionMap::from_regions(regions));
                if map.is_empty() {
                    tracing::warn!("Region backend returned no countries");
                }
                self.install(Arc::clone(&map), false);
                metrics::record_region_refresh("refreshed", map.len());
                RegionLookup::Refreshed(map)
            }
            Err(reason) => {
                if self.environment.is_development() {
                    tracing::warn!(
                        error = %reason,
                        default_country = %self.default_country,
                        "Failed to fetch regions, falling back to default region"
                    );
                } else {
                    tracing::debug!(error = %reason, "Region fetch failed, using fallback");
                }
                let map = Arc::new(RegionMap::fallback(&self.default_country));
                self.install(Arc::clone(&map), true);
                metrics::record_region_refresh("fallback", map.len());
                RegionLookup::Fallback { map, reason }
            }
        };

        Ok(lookup)
    }

    /// Drop the snapshot; the next lookup refetches.
    pub fn invalidate(&self) {
        self.snapshot.store(None);
        tracing::info!("Region cache invalidated");
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    fn fresh_map(&self) -> Option<Arc<RegionMap>> {
        let guard = self.snapshot.load();
        let snapshot = guard.as_ref()?;
        if snapshot.map.is_empty() || snapshot.refreshed_at.elapsed() >= self.ttl {
            return None;
        }
        Some(Arc::clone(&snapshot.map))
    }

    fn install(&self, map: Arc<RegionMap>, fallback: bool) {
        self.snapshot.store(Some(Arc::new(Snapshot {
            map,
            refreshed_at: Instant::now(),
            fallback,
        })));
    }
}
