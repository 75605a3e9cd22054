// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact API.
//!
//! Rate limiting runs as route middleware, so a throttled request is
//! answered before its body is read.

use crate::client_addr::ClientAddrSource;
use crate::composer::compose;
use crate::config::MailConfig;
use crate::error::{ApiResponse, AppError, Result, SENT_MESSAGE};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::mailer::Mailer;
use crate::metrics::{Metrics, Outcome};
use crate::validator::{parse_fields, validate};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const HEALTH_MESSAGE: &str = "Contact API is running.";

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub mailer: Arc<dyn Mailer>,
    pub mail: MailConfig,
    pub client_addr: ClientAddrSource,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        limiter: RateLimiter,
        mailer: Arc<dyn Mailer>,
        mail: MailConfig,
        client_addr: ClientAddrSource,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            limiter,
            mailer,
            mail,
            client_addr,
            metrics: Metrics::new()?,
        })
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}

/// Per-client sliding-window throttle.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = state.client_addr.client_key(request.headers(), peer);

    match state.limiter.check(&client).await {
        RateLimitResult::Allowed { remaining } => {
            debug!(%client, remaining, "Request allowed");
            next.run(request).await
        }
        RateLimitResult::Limited { retry_after } => {
            info!(
                %client,
                path = %request.uri().path(),
                retry_after_secs = retry_after.as_secs(),
                "Request rate limited"
            );
            state.metrics.record(Outcome::RateLimited);
            AppError::RateLimited { retry_after }.into_response()
        }
    }
}

/// Validate a contact form submission and forward it to the inbox.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ApiResponse>> {
    let fields = parse_fields(&body);

    let submission = validate(&fields).inspect_err(|err| {
        debug!(field = err.field(), reason = %err, "Submission rejected");
        state.metrics.record(Outcome::Invalid);
    })?;

    let message = compose(&submission, &state.mail);

    if let Err(err) = state.mailer.send(&message).await {
        error!(error = %err, to = %message.to, "Email error");
        state.metrics.record(Outcome::Failed);
        return Err(AppError::Dispatch(err));
    }

    info!(to = %message.to, "Contact message sent");
    state.metrics.record(Outcome::Sent);
    Ok(Json(ApiResponse::success(SENT_MESSAGE)))
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String> {
    state.metrics.render().map_err(|err| {
        error!(error = %err, "Failed to render metrics");
        AppError::Internal(err.to_string())
    })
}
