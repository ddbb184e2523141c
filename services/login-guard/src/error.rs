// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the login guard

use crate::validator::ValidationError;
use thiserror::Error;

/// Rate-limit store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Rate-limit store unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Identity provider failures that are not a verdict on the credentials.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Identity provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unreadable identity provider response: {0}")]
    Decode(String),
}

/// Errors surfaced by [`LoginGuard::attempt`](crate::guard::LoginGuard::attempt).
///
/// None of these count against the attempt budget of the identifier.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Invalid login request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Timed out waiting for {operation}")]
    Timeout { operation: &'static str },

    #[error("Login attempt aborted: {0}")]
    Aborted(String),
}

impl GuardError {
    /// True for failures of the gate or its collaborators, as opposed to
    /// malformed input.
    pub fn is_system(&self) -> bool {
        !matches!(self, GuardError::Validation(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GuardError>;
