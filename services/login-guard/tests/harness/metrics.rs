// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use login_guard::{GuardError, Outcome};
use std::collections::HashMap;
use std::time::Duration;

/// Collects metrics during attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Count of attempts by outcome
    outcomes: HashMap<AttemptOutcome, usize>,
    /// Count of attempts by IP
    attempts_per_ip: HashMap<String, usize>,
    /// Latency samples (microseconds)
    latencies: Vec<u64>,
}

/// Possible outcomes for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    Authenticated,
    Rejected,
    LockoutTriggered,
    Locked,
    Invalid,
    SystemError,
}

impl AttemptOutcome {
    pub fn of(result: &Result<Outcome, GuardError>) -> Self {
        match result {
            Ok(Outcome::Authenticated(_)) => Self::Authenticated,
            Ok(Outcome::Rejected { .. }) => Self::Rejected,
            Ok(Outcome::Locked {
                newly_triggered: true,
                ..
            }) => Self::LockoutTriggered,
            Ok(Outcome::Locked { .. }) => Self::Locked,
            Err(GuardError::Validation(_)) => Self::Invalid,
            Err(_) => Self::SystemError,
        }
    }
}

impl AttackMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt outcome.
    pub fn record(&mut self, outcome: AttemptOutcome, ip: &str, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.attempts_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        self.latencies.push(latency.as_micros() as u64);
    }

    /// Get total attempt count.
    pub fn total_attempts(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: AttemptOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Ratio of attempts refused without reaching the provider.
    pub fn short_circuit_rate(&self) -> f64 {
        let total = self.total_attempts();
        if total == 0 {
            return 0.0;
        }
        self.count(AttemptOutcome::Locked) as f64 / total as f64
    }

    /// Get median latency in microseconds.
    pub fn median_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    /// Get number of unique IPs that made attempts.
    pub fn unique_ips(&self) -> usize {
        self.attempts_per_ip.len()
    }

    /// Generate a summary report.
    pub fn report(&self, provider_calls: usize) -> MetricsReport {
        MetricsReport {
            total_attempts: self.total_attempts(),
            authenticated: self.count(AttemptOutcome::Authenticated),
            rejected: self.count(AttemptOutcome::Rejected),
            lockouts_triggered: self.count(AttemptOutcome::LockoutTriggered),
            locked: self.count(AttemptOutcome::Locked),
            errors: self.count(AttemptOutcome::Invalid) + self.count(AttemptOutcome::SystemError),
            provider_calls,
            short_circuit_rate: self.short_circuit_rate(),
            median_latency_us: self.median_latency_us(),
            unique_ips: self.unique_ips(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_attempts: usize,
    pub authenticated: usize,
    pub rejected: usize,
    pub lockouts_triggered: usize,
    pub locked: usize,
    pub errors: usize,
    pub provider_calls: usize,
    pub short_circuit_rate: f64,
    pub median_latency_us: u64,
    pub unique_ips: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Total Attempts:     {}", self.total_attempts)?;
        writeln!(f, "Provider Calls:     {}", self.provider_calls)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Authenticated:      {}", self.authenticated)?;
        writeln!(f, "Rejected:           {}", self.rejected)?;
        writeln!(f, "Lockouts Triggered: {}", self.lockouts_triggered)?;
        writeln!(f, "Locked (no call):   {}", self.locked)?;
        writeln!(f, "Errors:             {}", self.errors)?;
        writeln!(f, "Short-circuited:    {:.1}%", self.short_circuit_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "--- Latency ---")?;
        writeln!(f, "Median:             {} us", self.median_latency_us)?;
        writeln!(f, "Unique IPs:         {}", self.unique_ips)?;
        Ok(())
    }
}
