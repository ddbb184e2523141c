// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attempt-tracking record and the lockout window state machine.
//!
//! A record moves through `Fresh -> Accruing -> Locked -> Fresh`. All
//! transitions are pure functions of a record snapshot and a clock reading,
//! so stores can apply them under their own lock or statement.

use crate::config::GuardConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Failure history of one identifier for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Client IP, or `"unknown"`
    pub identifier: String,
    /// What is being throttled, e.g. `"login"`
    pub action: String,
    /// Consecutive failures since `window_start`
    pub attempts: u32,
    /// Start of the current tracking window
    pub window_start: DateTime<Utc>,
    /// Most recent attempt
    pub last_attempt: DateTime<Utc>,
}

impl RateLimitRecord {
    /// An empty record whose window opens at `now`.
    pub fn new(identifier: impl Into<String>, action: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            action: action.into(),
            attempts: 0,
            window_start: now,
            last_attempt: now,
        }
    }

    /// Time since the window opened. Clock skew that puts `now` before
    /// `window_start` counts as zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.window_start).max(Duration::zero())
    }

    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.elapsed(now) >= window
    }

    /// Restart the window at zero attempts.
    pub fn reset(mut self, now: DateTime<Utc>) -> Self {
        self.attempts = 0;
        self.window_start = now;
        self.last_attempt = now;
        self
    }

    /// Count one failure against `current`, creating the record when absent
    /// and restarting an expired window first. Stores call this inside their
    /// per-key critical section.
    pub fn with_failure(
        current: Option<Self>,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        let mut record = match current {
            Some(r) if r.is_expired(now, window) => r.reset(now),
            Some(r) => r,
            None => Self::new(identifier, action, now),
        };
        record.attempts = record.attempts.saturating_add(1);
        record.last_attempt = now;
        record
    }
}

/// Where an identifier stands relative to the lockout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// No failures in an open window
    Fresh,
    /// Some failures, attempts remain
    Accruing { attempts: u32 },
    /// Limit reached; refused until the window ends
    Locked { remaining: Duration },
}

/// Input to [`LockoutPolicy::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent<'a> {
    /// Record looked up before contacting the provider
    Observe,
    /// Provider rejected the credentials
    Failure { identifier: &'a str, action: &'a str },
    /// Provider accepted the credentials
    Success,
}

/// Result of [`LockoutPolicy::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to write
    Unchanged,
    /// Window expired; record restarted at zero attempts
    ResetByExpiry(RateLimitRecord),
    /// Failure counted, attempts remain
    Increment(RateLimitRecord),
    /// Failure counted and the limit reached
    LockTriggered(RateLimitRecord),
    /// Credentials accepted; record removed
    ClearOnSuccess,
}

/// Lockout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}

impl LockoutPolicy {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.max_attempts, config.lockout_duration())
    }

    /// Classify a record snapshot.
    pub fn state(&self, record: Option<&RateLimitRecord>, now: DateTime<Utc>) -> WindowState {
        match record {
            None => WindowState::Fresh,
            Some(r) if r.is_expired(now, self.lockout_duration) => WindowState::Fresh,
            Some(r) if r.attempts >= self.max_attempts => WindowState::Locked {
                remaining: self.lockout_duration - r.elapsed(now),
            },
            Some(r) if r.attempts == 0 => WindowState::Fresh,
            Some(r) => WindowState::Accruing {
                attempts: r.attempts,
            },
        }
    }

    /// The window state machine.
    pub fn apply(
        &self,
        current: Option<&RateLimitRecord>,
        event: AttemptEvent<'_>,
        now: DateTime<Utc>,
    ) -> Transition {
        match event {
            AttemptEvent::Observe => match current {
                Some(r) if r.is_expired(now, self.lockout_duration) => {
                    Transition::ResetByExpiry(r.clone().reset(now))
                }
                _ => Transition::Unchanged,
            },
            AttemptEvent::Failure { identifier, action } => {
                let record = RateLimitRecord::with_failure(
                    current.cloned(),
                    identifier,
                    action,
                    now,
                    self.lockout_duration,
                );
                self.classify_failure(record)
            }
            AttemptEvent::Success => Transition::ClearOnSuccess,
        }
    }

    /// Label a record that already has the failure counted.
    pub fn classify_failure(&self, record: RateLimitRecord) -> Transition {
        if self.is_limit_reached(record.attempts) {
            Transition::LockTriggered(record)
        } else {
            Transition::Increment(record)
        }
    }

    pub fn is_limit_reached(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// Attempts left before lockout; never negative.
    pub fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(attempts)
    }

    /// Full lockout length in whole minutes.
    pub fn lockout_minutes(&self) -> u32 {
        ceil_minutes(self.lockout_duration)
    }
}

/// Round a duration up to whole minutes.
pub fn ceil_minutes(duration: Duration) -> u32 {
    let millis = duration.num_milliseconds().max(0);
    let minutes = (millis + 59_999) / 60_000;
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
