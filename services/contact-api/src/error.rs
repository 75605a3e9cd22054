// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request-level errors and their HTTP mapping.
//!
//! Clients only ever see the short messages below; transport details stay in
//! the server log.

use crate::mailer::MailError;
use crate::validator::ValidationError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const SENT_MESSAGE: &str = "Message sent successfully.";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try later.";
pub const FAILED_MESSAGE: &str = "Failed to send message.";

/// JSON body returned by the contact endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Mail dispatch failed: {0}")]
    Dispatch(#[from] MailError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Dispatch(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::RateLimited { .. } => RATE_LIMITED_MESSAGE.to_string(),
            Self::Dispatch(_) | Self::Internal(_) => FAILED_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ApiResponse::failure(self.public_message()));

        match self {
            Self::RateLimited { retry_after } => {
                // Whole seconds, rounded up so clients never retry early
                let secs = retry_after.as_millis().div_ceil(1000).max(1);
                (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
