// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact API.
//!
//! Everything is sourced from the process environment (a `.env` file is
//! loaded first by the binary). `SMTP_HOST`, `SMTP_USER`, `SMTP_PASS` and
//! `INBOX_TO` are required; every other setting has a default.

use crate::client_addr::ClientAddrSource;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Port that selects implicit-TLS SMTP instead of STARTTLS.
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Routes served by the contact API itself.
const RESERVED_PATHS: &[&str] = &["/", "/api/contact"];

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Configuration for the contact API service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port (default: 4000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound SMTP account
    pub smtp: SmtpConfig,

    /// Envelope and subject settings for composed messages
    pub mail: MailConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Where the rate-limit client key comes from
    #[serde(default)]
    pub client_addr: ClientAddrSource,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// SMTP relay credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    /// Relay port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    pub user: String,

    #[serde(skip_serializing)]
    pub pass: String,
}

// Keep the password out of logs.
impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

impl SmtpConfig {
    /// Port 465 speaks TLS from the first byte.
    pub fn implicit_tls(&self) -> bool {
        self.port == IMPLICIT_TLS_PORT
    }
}

/// Addressing for messages sent to the organization inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Destination inbox
    pub inbox_to: String,

    /// Sender identity (defaults to the SMTP user)
    pub inbox_from: String,

    /// Organization name placed in front of every subject
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per client key inside one window (default: 30)
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Interval between stale-key sweeps in seconds (default: 60)
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_port() -> u16 {
    4000
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject_prefix() -> String {
    "Kidz Montessori Academy".to_string()
}

fn default_max_requests() -> usize {
    30
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_sweep_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Get the sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let smtp = SmtpConfig {
            host: required("SMTP_HOST")?,
            port: parse_or(get("SMTP_PORT"), "SMTP_PORT", default_smtp_port())?,
            user: required("SMTP_USER")?,
            pass: required("SMTP_PASS")?,
        };

        let mail = MailConfig {
            inbox_to: required("INBOX_TO")?,
            inbox_from: get("INBOX_FROM").unwrap_or_else(|| smtp.user.clone()),
            subject_prefix: get("MAIL_SUBJECT_PREFIX").unwrap_or_else(default_subject_prefix),
        };

        let rate_limit = RateLimitConfig {
            max_requests: parse_positive_or(get("RATE_LIMIT_MAX"), "RATE_LIMIT_MAX", default_max_requests())?,
            window_ms: parse_positive_or(
                get("RATE_LIMIT_WINDOW_MS"),
                "RATE_LIMIT_WINDOW_MS",
                default_window_ms(),
            )?,
            sweep_interval_secs: parse_positive_or(
                get("RATE_LIMIT_SWEEP_SECS"),
                "RATE_LIMIT_SWEEP_SECS",
                default_sweep_secs(),
            )?,
        };

        let client_addr = if parse_flag(get("TRUST_FORWARDED_FOR"), "TRUST_FORWARDED_FOR", false)? {
            ClientAddrSource::ForwardedFor
        } else {
            ClientAddrSource::Peer
        };

        let metrics = MetricsConfig {
            enabled: parse_flag(get("METRICS_ENABLED"), "METRICS_ENABLED", true)?,
            path: get("METRICS_PATH").unwrap_or_else(default_metrics_path),
        };
        // Must be a distinct absolute route
        if !metrics.path.starts_with('/') || RESERVED_PATHS.contains(&metrics.path.as_str()) {
            return Err(ConfigError::Invalid {
                key: "METRICS_PATH",
                value: metrics.path,
            });
        }

        Ok(Self {
            port: parse_or(get("PORT"), "PORT", default_port())?,
            smtp,
            mail,
            rate_limit,
            client_addr,
            metrics,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_positive_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let parsed = parse_or(value.clone(), key, default)?;
    if parsed == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: value.unwrap_or_default(),
        });
    }
    Ok(parsed)
}

fn parse_flag(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: v.clone(),
            }),
        },
    }
}
