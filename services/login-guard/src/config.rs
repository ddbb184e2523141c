// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the login guard service.
//!
//! Defaults match the admin login policy: three failures inside a fifteen
//! minute window lock the identifier out until the window ends.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration for the login guard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Lockout policy and timeouts
    #[serde(default)]
    pub guard: GuardConfig,

    /// Identity provider connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Rate-limit store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Request validation limits
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Lockout policy for the login gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Failures allowed before lockout (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Length of the tracking window and lockout in minutes (default: 15)
    #[serde(default = "default_lockout_minutes")]
    pub lockout_duration_minutes: u32,

    /// Action discriminator stored with every record (default: "login")
    #[serde(default = "default_action")]
    pub action: String,

    /// Timeout for a single store round-trip in milliseconds (default: 2000)
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Timeout for the identity provider call in milliseconds (default: 5000)
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Interval between expired-record purges in seconds, 0 disables (default: 300)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Fall back to the socket peer address when no proxy header is present
    #[serde(default)]
    pub trust_peer_addr: bool,
}

/// Identity provider connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the auth service, e.g. `https://project.example.co`
    #[serde(default)]
    pub url: String,

    /// Public API key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: String,
}

/// Rate-limit store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Postgres connection string; in-memory store when absent
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Length caps applied to login requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum email length in bytes (default: 320)
    #[serde(default = "default_max_email_len")]
    pub max_email_len: usize,

    /// Maximum password length in bytes (default: 1024)
    #[serde(default = "default_max_password_len")]
    pub max_password_len: usize,
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

/// Configuration rejected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Invalid identity provider URL {url:?}: {reason}")]
    InvalidProviderUrl { url: String, reason: String },
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lockout_minutes() -> u32 {
    15
}

fn default_action() -> String {
    "login".to_string()
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_provider_timeout_ms() -> u64 {
    5000
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_max_email_len() -> usize {
    320 // RFC 5321 path limit
}

fn default_max_password_len() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            guard: GuardConfig::default(),
            provider: ProviderConfig::default(),
            store: StoreConfig::default(),
            validation: ValidationConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            lockout_duration_minutes: default_lockout_minutes(),
            action: default_action(),
            store_timeout_ms: default_store_timeout_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            trust_peer_addr: false,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_email_len: default_max_email_len(),
            max_password_len: default_max_password_len(),
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

impl GuardConfig {
    /// Get the window / lockout length
    pub fn lockout_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.lockout_duration_minutes))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Cleanup interval, `None` when periodic purging is disabled
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first
    /// when present. Unparsable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            guard: GuardConfig {
                max_attempts: parse_var(&lookup, "MAX_ATTEMPTS").unwrap_or(defaults.guard.max_attempts),
                lockout_duration_minutes: parse_var(&lookup, "LOCKOUT_DURATION_MINUTES")
                    .unwrap_or(defaults.guard.lockout_duration_minutes),
                store_timeout_ms: parse_var(&lookup, "STORE_TIMEOUT_MS")
                    .unwrap_or(defaults.guard.store_timeout_ms),
                provider_timeout_ms: parse_var(&lookup, "PROVIDER_TIMEOUT_MS")
                    .unwrap_or(defaults.guard.provider_timeout_ms),
                cleanup_interval_secs: parse_var(&lookup, "CLEANUP_INTERVAL_SECS")
                    .unwrap_or(defaults.guard.cleanup_interval_secs),
                trust_peer_addr: parse_var(&lookup, "TRUST_PEER_ADDR")
                    .unwrap_or(defaults.guard.trust_peer_addr),
                ..defaults.guard
            },
            provider: ProviderConfig {
                url: lookup("AUTH_PROVIDER_URL").unwrap_or_default(),
                api_key: lookup("AUTH_PROVIDER_API_KEY").unwrap_or_default(),
            },
            store: StoreConfig {
                database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            },
            validation: ValidationConfig {
                max_email_len: parse_var(&lookup, "MAX_EMAIL_LEN")
                    .unwrap_or(defaults.validation.max_email_len),
                max_password_len: parse_var(&lookup, "MAX_PASSWORD_LEN")
                    .unwrap_or(defaults.validation.max_password_len),
            },
            metrics: MetricsConfig {
                enabled: parse_var(&lookup, "METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
                path: lookup("METRICS_PATH")
                    .filter(|v| v.starts_with('/'))
                    .unwrap_or(defaults.metrics.path),
            },
        }
    }

    /// Reject configurations the guard cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guard.max_attempts == 0 {
            return Err(ConfigError::Zero("max_attempts"));
        }
        if self.guard.lockout_duration_minutes == 0 {
            return Err(ConfigError::Zero("lockout_duration_minutes"));
        }
        if let Err(e) = Url::parse(&self.provider.url) {
            return Err(ConfigError::InvalidProviderUrl {
                url: self.provider.url.clone(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}
