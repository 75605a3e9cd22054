// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact API
//!
//! Receives contact-form submissions from the organization website and
//! relays them to a fixed inbox:
//!
//! - Per-client sliding-window rate limiting (30 requests per minute)
//! - Field validation (email, name, contact, message)
//! - Plain-text and HTML-escaped message composition
//! - Delivery through an SMTP relay

pub mod client_addr;
pub mod clock;
pub mod composer;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod validator;

pub use config::Config;
pub use handlers::AppState;
pub use limiter::{RateLimitResult, RateLimiter};
pub use mailer::{Mailer, SmtpMailer};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use config::MetricsConfig;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router.
///
/// The health check and contact routes share the rate limiter; the metrics
/// route is mounted after it and is never throttled.
pub fn router(state: Arc<AppState>, metrics: &MetricsConfig) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::health))
        .route("/api/contact", post(handlers::contact))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::rate_limit,
        ));

    if metrics.enabled {
        app = app.route(&metrics.path, get(handlers::metrics));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
    .with_state(state)
}
