// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Login Guard
//!
//! Brute-force protection for the admin login endpoint:
//!
//! - Per-IP failure tracking (3 failures per 15 minute window by default)
//! - Hard lockout that skips the identity provider entirely
//! - History cleared on successful login, windows reset lazily on expiry
//! - Atomic failure counting in the rate-limit store
//! - Provider outages and timeouts never count against a client

pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod metrics;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod provider;
pub mod record;
pub mod store;
pub mod validator;

pub use config::Config;
pub use error::{GuardError, ProviderError, StoreError};
pub use guard::{LoginGuard, Outcome};
pub use provider::{HttpIdentityProvider, IdentityProvider, Session, Verdict};
pub use record::{LockoutPolicy, RateLimitRecord, WindowState};
pub use store::{MemoryStore, RateLimitStore};
pub use validator::{CredentialsValidator, ValidationError, ValidationResult};
