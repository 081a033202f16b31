use std::sync::atomic::Ordering;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub environment: &'static str,
    pub total_requests: u64,
    pub analytics_region: &'static str,
    pub analytics_key_configured: bool,
}

#[derive(Serialize)]
pub struct RegionSummary {
    pub id: String,
    pub name: String,
    pub currency_code: String,
}

#[derive(Serialize)]
pub struct CountryEntry {
    pub country: String,
    pub region: RegionSummary,
}

#[derive(Serialize)]
pub struct RegionCacheStatus {
    pub loaded: bool,
    pub fallback: bool,
    pub age_secs: Option<u64>,
    pub ttl_secs: u64,
    pub countries: Vec<CountryEntry>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        environment: inner.config.observability.environment.as_str(),
        total_requests: inner.request_count.load(Ordering::Relaxed),
        analytics_region: inner.hosts.region().as_str(),
        analytics_key_configured: inner.config.analytics.api_key.is_some(),
    })
}

pub async fn get_regions(State(state): State<AppState>) -> Json<RegionCacheStatus> {
    let inner = state.inner.load();
    let ttl_secs = inner.config.regions.refresh_secs;

    let Some(snapshot) = inner.regions.snapshot() else {
        return Json(RegionCacheStatus {
            loaded: false,
            fallback: false,
            age_secs: None,
            ttl_secs,
            countries: Vec::new(),
        });
    };

    let countries = snapshot
        .map
        .countries()
        .filter_map(|code| {
            snapshot.map.get(code).map(|region| CountryEntry {
                country: code.to_string(),
                region: RegionSummary {
                    id: region.id.clone(),
                    name: region.name.clone(),
                    currency_code: region.currency_code.clone(),
                },
            })
        })
        .collect();

    Json(RegionCacheStatus {
        loaded: true,
        fallback: snapshot.fallback,
        age_secs: Some(snapshot.refreshed_at.elapsed().as_secs()),
        ttl_secs,
        countries,
    })
}

pub async fn invalidate_regions(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.inner.load().regions.invalidate();
    Json(serde_json::json!({ "invalidated": true }))
}
