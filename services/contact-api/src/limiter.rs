// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for the contact endpoint.
//!
//! Every request for a client key records its timestamp (rejected ones
//! included) after pruning timestamps that fell out of the window. The
//! request is rejected when the recorded count exceeds the configured
//! maximum.

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Requests left before the key is limited
        remaining: usize,
    },
    /// Request is rate limited
    Limited {
        /// Time until the oldest counted request leaves the window
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Thread-safe sliding-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    /// Per-key request timestamps, oldest first
    hits: RwLock<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a rate limiter backed by the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a rate limiter with an explicit time source.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            hits: RwLock::new(HashMap::new()),
        }
    }

    /// Record a request for `key` and decide whether it may proceed.
    pub async fn check(&self, key: &str) -> RateLimitResult {
        let now = self.clock.now();
        let window = self.config.window_duration();

        // Prune, append and count under one write lock so concurrent
        // requests for the same key never lose an update.
        let mut hits = self.hits.write().await;
        let timestamps = hits.entry(key.to_string()).or_default();

        while timestamps
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= window)
        {
            timestamps.pop_front();
        }
        timestamps.push_back(now);

        let count = timestamps.len();
        if count > self.config.max_requests {
            let oldest = timestamps.front().copied().unwrap_or(now);
            let retry_after = window.saturating_sub(now.saturating_duration_since(oldest));
            debug!(key, count, ?retry_after, "Client rate limit exceeded");
            RateLimitResult::Limited { retry_after }
        } else {
            RateLimitResult::Allowed {
                remaining: self.config.max_requests - count,
            }
        }
    }

    /// Drop keys with no request inside the window.
    ///
    /// Returns the number of evicted keys.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.window_duration();

        let mut hits = self.hits.write().await;
        let before = hits.len();
        hits.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|t| now.saturating_duration_since(*t) < window)
        });
        let evicted = before - hits.len();
        if evicted > 0 {
            debug!(evicted, remaining = hits.len(), "Evicted idle rate limit keys");
        }
        evicted
    }

    /// Number of client keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.hits.read().await.len()
    }
}
