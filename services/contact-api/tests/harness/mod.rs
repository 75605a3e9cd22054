// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for the contact API.
//!
//! Builds the real router around a mock clock and an in-memory mailer so
//! requests can be driven end to end without an SMTP relay.

#![allow(dead_code)]

pub mod mailers;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use contact_api::{
    client_addr::ClientAddrSource,
    clock::MockClock,
    config::{MailConfig, MetricsConfig, RateLimitConfig},
    error::ApiResponse,
    router, AppState, Mailer, RateLimiter,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const INBOX: &str = "office@montessori.example";
pub const SENDER: &str = "website@montessori.example";

/// A router wired to test doubles.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: MockClock,
}

pub fn mail_config() -> MailConfig {
    MailConfig {
        inbox_to: INBOX.to_string(),
        inbox_from: SENDER.to_string(),
        subject_prefix: "Kidz Montessori Academy".to_string(),
    }
}

/// Build an app with default limits, keyed by `X-Forwarded-For`.
pub fn test_app(mailer: Arc<dyn Mailer>) -> TestApp {
    test_app_with(mailer, RateLimitConfig::default(), ClientAddrSource::ForwardedFor)
}

pub fn test_app_with(
    mailer: Arc<dyn Mailer>,
    rate_limit: RateLimitConfig,
    client_addr: ClientAddrSource,
) -> TestApp {
    let clock = MockClock::default();
    let limiter = RateLimiter::with_clock(rate_limit, Arc::new(clock.clone()));
    let state = Arc::new(
        AppState::new(limiter, mailer, mail_config(), client_addr).expect("metrics registry"),
    );
    let router = router(state.clone(), &MetricsConfig::default());

    TestApp {
        router,
        state,
        clock,
    }
}

/// `POST /api/contact` from `client` with a raw body.
pub fn contact_request(client: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client)
        .body(body.into())
        .expect("valid request")
}

pub fn contact_json(client: &str, body: &Value) -> Request<Body> {
    contact_request(client, body.to_string())
}

impl TestApp {
    /// Send a request and decode the JSON envelope.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, ApiResponse) {
        let (status, _, body) = self.send_raw(request).await;
        let parsed = serde_json::from_slice(&body).expect("JSON response body");
        (status, parsed)
    }

    pub async fn send_raw(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        (status, headers, body.to_vec())
    }
}
