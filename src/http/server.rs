//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: edge middleware in front of the origin handler
//! - Wire up layers (request id, tracing, timeout)
//! - Hold the reloadable shared state
//! - Serve over plain TCP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{EdgeConfig, TlsConfig};
use crate::http::forward::{ForwardProfile, Forwarder};
use crate::http::middleware::edge_middleware;
use crate::http::request::{origin_target, propagate_request_id_layer, set_request_id_layer};
use crate::ingest::target::HostError;
use crate::ingest::IngestHosts;
use crate::net::load_tls_config;
use crate::regions::{RegionCache, RegionError};
use crate::routing::{bypass_matcher, AnyMatcher, IngestMatcher};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("region cache: {0}")]
    Regions(#[from] RegionError),

    #[error(transparent)]
    AnalyticsHost(#[from] HostError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a request needs, rebuilt as a unit on config reload.
pub struct EdgeState {
    pub config: EdgeConfig,
    pub regions: Arc<RegionCache>,
    pub ingest: IngestMatcher,
    pub bypass: AnyMatcher,
    pub hosts: IngestHosts,
    pub forwarder: Forwarder,
    /// Requests seen since start, carried across reloads.
    pub request_count: Arc<AtomicU64>,
}

impl EdgeState {
    /// Build state for `config`. The region cache of `previous` is kept when
    /// the `[regions]` section did not change, so a reload does not force a
    /// refetch.
    pub fn build(config: EdgeConfig, previous: Option<&EdgeState>) -> Result<Self, StartupError> {
        let regions = match previous {
            Some(prev)
                if prev.config.regions == config.regions
                    && prev.config.observability.environment
                        == config.observability.environment =>
            {
                Arc::clone(&prev.regions)
            }
            _ => Arc::new(RegionCache::from_config(
                &config.regions,
                config.observability.environment,
            )?),
        };

        let forwarder = Forwarder::new(
            &config.timeouts,
            &config.security,
            config.listener.tls.is_some(),
        )?;

        Ok(Self {
            regions,
            ingest: IngestMatcher::new(config.analytics.ingest_prefixes.iter().cloned()),
            bypass: bypass_matcher(&config.site.bypass_prefixes),
            hosts: IngestHosts::from_config(&config.analytics)?,
            forwarder,
            request_count: previous
                .map(|prev| Arc::clone(&prev.request_count))
                .unwrap_or_default(),
            config,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<EdgeState>>,
}

impl AppState {
    pub fn new(state: EdgeState) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(state)),
        }
    }

    /// Rebuild from a new config and swap it in. On error the running state
    /// stays untouched.
    pub fn reload(&self, config: EdgeConfig) -> Result<(), StartupError> {
        let current = self.inner.load_full();
        let next = EdgeState::build(config, Some(current.as_ref()))?;
        self.inner.store(Arc::new(next));
        Ok(())
    }
}

/// The storefront edge server.
pub struct EdgeServer {
    state: AppState,
    request_timeout: Duration,
}

impl EdgeServer {
    pub fn new(config: EdgeConfig) -> Result<Self, StartupError> {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState::new(EdgeState::build(config, None)?);
        Ok(Self {
            state,
            request_timeout,
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout wraps only the origin handler. Ingest requests are
    /// bounded by `analytics.timeout_secs` inside the edge middleware.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(origin_handler)
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                edge_middleware,
            ))
            .with_state(self.state.clone())
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Edge server starting");

        spawn_reloader(self.state.clone(), config_updates, shutdown.resubscribe());

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let rustls_config = load_tls_config(tls).await?;
        tracing::info!(address = %addr, "Edge server starting (TLS)");

        spawn_reloader(self.state.clone(), config_updates, shutdown.resubscribe());

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let drain = self.request_timeout;
        tokio::spawn(async move {
            wait_for(shutdown).await;
            shutdown_handle.graceful_shutdown(Some(drain));
        });

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }
}

/// Requests that pass edge handling go to the storefront renderer.
async fn origin_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let inner = state.inner.load_full();
    let target = origin_target(&inner.config.site.origin_url, request.uri());
    let timeout = inner.config.timeouts.upstream_budget();
    inner
        .forwarder
        .forward(request, &target, ForwardProfile::Origin, timeout)
        .await
}

fn spawn_reloader(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<EdgeConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(config) = update else { break };
                    match state.reload(config) {
                        Ok(()) => tracing::info!("Configuration reloaded"),
                        Err(e) => tracing::error!(error = %e, "Rejected configuration reload"),
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}

async fn wait_for(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
    tracing::info!("Shutdown signal received");
}
