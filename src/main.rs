//! Waitlist server
//!
//! ## Usage
//!
//! ```bash
//! # Admin credentials are required
//! ADMIN_USERNAME=admin ADMIN_PASSWORD=secret waitlist
//!
//! # Custom listen address and database file
//! waitlist --listen 127.0.0.1:8080 --database-url /data/waitlist.db
//! ```

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waitlist::{
    Args, BroadcastHub, BroadcastHubConfig, CorsPolicy, HttpServer, PoolConfig, StatusPolicy,
    Store, WaitlistService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("waitlist={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    let credentials = args.admin_credentials()?;
    let policy = StatusPolicy::new(args.status_prefix.clone());

    info!("======================================");
    info!("  Waitlist server");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Database: {}", args.database_url);
    info!("Pool size: {}", args.pool_size);
    info!("Request timeout: {}ms", args.request_timeout_ms);
    info!("Status prefix: {}", policy.prefix());
    info!("Allowed origins: {:?}", args.allowed_origin_list());
    info!("======================================");

    let pool_config = PoolConfig {
        max_size: args.pool_size,
        operation_timeout: args.request_timeout(),
        ..PoolConfig::default()
    };
    let store = match Store::open(&args.database_url, &pool_config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    match store.initialize().await {
        Ok(report) => info!(
            admin_created = report.admin_created,
            registrants = report.registrant_count,
            "Store initialized"
        ),
        Err(e) => {
            error!("Store bootstrap failed: {}", e);
            std::process::exit(1);
        }
    }

    let hub = Arc::new(BroadcastHub::new(BroadcastHubConfig {
        heartbeat_interval: args.heartbeat_interval(),
        ..BroadcastHubConfig::default()
    }));

    let service = Arc::new(WaitlistService::new(
        Arc::clone(&store),
        hub,
        policy,
        credentials,
    ));
    let server = Arc::new(HttpServer::new(
        service,
        CorsPolicy::new(args.allowed_origin_list()),
    ));

    let listener = TcpListener::bind(args.listen).await?;

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = server.run(listener) => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = shutdown => {}
    }

    store.shutdown().await;
    info!("Waitlist server stopped");
    Ok(())
}
