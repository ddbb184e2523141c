// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Login Guard Service
//!
//! Rate-limited login endpoint for the booking site's admin panel.
//!
//! - 3 failed logins per IP within 15 minutes trigger a lockout (default)
//! - Locked-out clients are refused without contacting the identity provider
//! - A successful login clears the failure history
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `AUTH_PROVIDER_URL`: Base URL of the identity provider (required)
//! - `AUTH_PROVIDER_API_KEY`: Public API key for the identity provider
//! - `MAX_ATTEMPTS`: Failures before lockout (default: 3)
//! - `LOCKOUT_DURATION_MINUTES`: Window and lockout length (default: 15)
//! - `STORE_TIMEOUT_MS` / `PROVIDER_TIMEOUT_MS`: Collaborator timeouts
//! - `CLEANUP_INTERVAL_SECS`: Expired-record purge interval, 0 disables (default: 300)
//! - `TRUST_PEER_ADDR`: Use the socket address when no proxy header is set
//! - `MAX_EMAIL_LEN` / `MAX_PASSWORD_LEN`: Request field caps (default: 320 / 1024)
//! - `METRICS_ENABLED` / `METRICS_PATH`: Prometheus endpoint (default: on, /metrics)
//! - `DATABASE_URL`: Postgres rate-limit table (requires the `postgres` feature)

use anyhow::Context;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use login_guard::{
    config::Config,
    guard::LoginGuard,
    handlers::{router, AppState},
    metrics::GuardMetrics,
    provider::HttpIdentityProvider,
    store::{MemoryStore, RateLimitStore},
    validator::CredentialsValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env();
    config.validate()?;
    info!(
        bind_addr = %config.bind_addr,
        max_attempts = config.guard.max_attempts,
        lockout_duration_minutes = config.guard.lockout_duration_minutes,
        "Starting login guard"
    );

    let store = build_store(&config).await?;
    let provider = Arc::new(HttpIdentityProvider::new(&config.provider)?);

    let metrics = if config.metrics.enabled {
        Some(GuardMetrics::new().context("registering metrics")?)
    } else {
        None
    };

    let mut guard = LoginGuard::new(&config.guard, store.clone(), provider)
        .with_validator(CredentialsValidator::new(config.validation.clone()));
    if let Some(metrics) = &metrics {
        guard = guard.with_metrics(metrics.clone());
    }

    // Spawn cleanup task
    if let Some(interval) = config.guard.cleanup_interval() {
        let window = config.guard.lockout_duration();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match store.purge_expired(Utc::now() - window).await {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "Purged expired rate-limit records"),
                    Err(e) => warn!(error = %e, "Rate-limit cleanup failed"),
                }
            }
        });
    }

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState {
        guard,
        metrics,
        config,
    });
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    if let Some(url) = &config.store.database_url {
        let store = login_guard::postgres::PostgresStore::connect(url).await?;
        store.migrate().await?;
        info!("Using Postgres rate-limit store");
        return Ok(Arc::new(store));
    }
    info!("Using in-memory rate-limit store");
    Ok(Arc::new(MemoryStore::new()))
}

#[cfg(not(feature = "postgres"))]
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    if config.store.database_url.is_some() {
        warn!("DATABASE_URL set but built without the postgres feature, using in-memory store");
    }
    Ok(Arc::new(MemoryStore::new()))
}
