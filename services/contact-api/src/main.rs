// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact API Service
//!
//! Accepts `POST /api/contact` submissions from the website, validates them
//! and forwards each one as an email to the organization inbox.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `SMTP_HOST`, `SMTP_USER`, `SMTP_PASS`: relay account (required)
//! - `SMTP_PORT`: relay port (default: 587, 465 selects implicit TLS)
//! - `INBOX_TO`: destination inbox (required)
//! - `INBOX_FROM`: sender identity (default: `SMTP_USER`)
//! - `PORT`: listen port (default: 4000)
//! - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_MS`: throttle (default: 30 per 60000 ms)
//! - `TRUST_FORWARDED_FOR`: key clients by `X-Forwarded-For` (default: false)

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_api::{router, AppState, Config, RateLimiter, SmtpMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG set there reaches the filter
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        port = config.port,
        smtp_host = %config.smtp.host,
        smtp_port = config.smtp.port,
        implicit_tls = config.smtp.implicit_tls(),
        inbox_to = %config.mail.inbox_to,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        client_addr = ?config.client_addr,
        "Starting contact API"
    );

    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

    // Check the relay without holding up startup
    let relay = mailer.clone();
    tokio::spawn(async move {
        match relay.test_connection().await {
            Ok(true) => info!("SMTP relay reachable"),
            Ok(false) => warn!("SMTP relay refused the test connection"),
            Err(e) => warn!(error = %e, "Could not reach SMTP relay, sends will fail"),
        }
    });

    let state = Arc::new(AppState::new(
        RateLimiter::new(config.rate_limit.clone()),
        mailer,
        config.mail.clone(),
        config.client_addr,
    )?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let sweep_interval = config.rate_limit.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = router(state, &config.metrics);

    // Start server
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
