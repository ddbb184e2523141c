// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack simulation patterns for security testing.

use std::time::Duration;

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of login attempts
    pub total_attempts: usize,
    /// Simulated time between attempts
    pub interval: Duration,
    /// Number of unique client IPs
    pub unique_ips: usize,
    /// Number of targeted accounts
    pub unique_emails: usize,
    /// Attempt index (0-based) at which the real password is tried, if any
    pub correct_at: Option<usize>,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_attempts: 100,
            interval: Duration::from_secs(1),
            unique_ips: 1,
            unique_emails: 1,
            correct_at: None,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// One IP hammering one account with a wordlist.
    pub fn single_ip_brute_force() -> Self {
        Self {
            total_attempts: 200,
            interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Many IPs, a few guesses each.
    pub fn distributed_stuffing() -> Self {
        Self {
            total_attempts: 500,
            interval: Duration::from_millis(50),
            unique_ips: 100,
            unique_emails: 20,
            ..Default::default()
        }
    }

    /// The real password shows up late in the wordlist.
    pub fn late_correct_guess() -> Self {
        Self {
            total_attempts: 20,
            interval: Duration::from_secs(2),
            correct_at: Some(10),
            ..Default::default()
        }
    }

    /// Slow drip: one guess every 8 minutes stays under the limit only
    /// because each window expires before the third failure.
    pub fn slow_drip() -> Self {
        Self {
            total_attempts: 30,
            interval: Duration::from_secs(8 * 60),
            ..Default::default()
        }
    }

    /// Legitimate admin: two typos, then the right password.
    pub fn legitimate_typos() -> Self {
        Self {
            total_attempts: 3,
            interval: Duration::from_secs(5),
            correct_at: Some(2),
            ..Default::default()
        }
    }
}
