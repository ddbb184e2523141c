// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for login attempts.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label values for `login_attempts_total`.
pub mod outcome {
    pub const AUTHENTICATED: &str = "authenticated";
    pub const REJECTED: &str = "rejected";
    pub const LOCKED: &str = "locked";
    pub const LOCKOUT_TRIGGERED: &str = "lockout_triggered";
    pub const INVALID: &str = "invalid";
    pub const ERROR: &str = "error";
}

/// Login gate metrics on a private registry.
#[derive(Clone)]
pub struct GuardMetrics {
    registry: Registry,
    attempts: IntCounterVec,
    provider_duration: HistogramVec,
}

impl GuardMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let attempts = IntCounterVec::new(
            Opts::new("login_attempts_total", "Login attempts by outcome"),
            &["outcome"],
        )?;
        let provider_duration = HistogramVec::new(
            HistogramOpts::new(
                "login_provider_duration_seconds",
                "Identity provider round-trip time",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["result"],
        )?;

        registry.register(Box::new(attempts.clone()))?;
        registry.register(Box::new(provider_duration.clone()))?;

        Ok(Self {
            registry,
            attempts,
            provider_duration,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.attempts.with_label_values(&[outcome]).inc();
    }

    /// Observe a provider call; `result` is `verdict` or `error`.
    pub fn observe_provider(&self, result: &str, seconds: f64) {
        self.provider_duration
            .with_label_values(&[result])
            .observe(seconds);
    }

    pub fn attempts(&self, outcome: &str) -> u64 {
        self.attempts.with_label_values(&[outcome]).get()
    }

    /// Render the registry in the text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
