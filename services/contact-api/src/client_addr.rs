// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client key extraction for rate limiting.
//!
//! Whether `X-Forwarded-For` is honoured is a deployment decision: only turn
//! it on when the service sits behind a proxy that overwrites the header.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Key used when neither the header nor the socket yields an address.
pub const UNKNOWN_CLIENT: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Where the client address is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAddrSource {
    /// TCP peer address
    #[default]
    Peer,
    /// First hop listed in `X-Forwarded-For`, falling back to the peer
    ForwardedFor,
}

impl ClientAddrSource {
    /// Derive the rate-limit key for a request.
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if *self == ClientAddrSource::ForwardedFor {
            let forwarded = headers
                .get(FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());

            if let Some(addr) = forwarded {
                return addr.to_string();
            }
        }

        peer.map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}
