//! Storefront edge
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                STOREFRONT EDGE               │
//!   Client Request         │                                              │
//!   ───────────────────────┼─▶ request id ─▶ edge middleware              │
//!                          │                   │                          │
//!                          │      /ph/...      │      page paths          │
//!                          │         ▼         ▼                          │
//!                          │   ingest relay   region cache ─▶ decide()    │
//!                          │         │              │     307 / 500       │
//!                          │         ▼              ▼                     │
//!                          │   PostHog hosts   storefront origin          │
//!                          │                                              │
//!                          │  config (TOML + env, hot reload) · metrics   │
//!                          │  admin API · graceful shutdown               │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_edge::admin::setup_admin_router;
use storefront_edge::config::{load_config, watcher::ConfigWatcher};
use storefront_edge::http::EdgeServer;
use storefront_edge::lifecycle::{signals::wait_for_signal, Shutdown};
use storefront_edge::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "storefront-edge", version, about = "Region-aware edge for the storefront")]
struct Args {
    /// TOML configuration file. Environment variables override it.
    #[arg(short, long, env = "EDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("storefront-edge: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.observability.environment.as_str(),
        bind_address = %config.listener.bind_address,
        origin = %config.site.origin_url,
        analytics_host = %config.analytics.host,
        "storefront-edge starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    // The watcher handle must outlive the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (rx, Some(watcher.run()?))
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let admin = config.admin.clone();
    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = EdgeServer::new(config)?;

    if admin.enabled {
        let listener = TcpListener::bind(&admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(server.state());
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server failed");
            }
        });
    }

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Draining connections");
        shutdown.trigger();
    });

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            server
                .run_tls(addr, &tls, config_updates, server_shutdown)
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
