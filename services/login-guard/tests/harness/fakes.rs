// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scripted identity providers and faulty stores.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use login_guard::{
    provider::{IdentityProvider, Session, Verdict},
    record::RateLimitRecord,
    store::RateLimitStore,
    ProviderError, StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::{Barrier, Notify};

/// Provider with a fixed set of accounts.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    accounts: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn with_account(email: &str, password: &str) -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(email.to_string(), password.to_string());
        Self {
            accounts,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn session_for(email: &str) -> Session {
    Session {
        session: serde_json::json!({
            "access_token": format!("token-{email}"),
            "token_type": "bearer",
            "expires_in": 3600,
        }),
        user: serde_json::json!({ "email": email }),
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn verify_password(&self, email: &str, password: &str) -> Result<Verdict, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.accounts.get(email) {
            Some(expected) if expected == password => Ok(Verdict::Authenticated(session_for(email))),
            _ => Ok(Verdict::InvalidCredentials {
                reason: "Invalid login credentials".to_string(),
            }),
        }
    }
}

/// Provider that is always down.
#[derive(Debug, Default)]
pub struct DownProvider {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityProvider for DownProvider {
    async fn verify_password(&self, _email: &str, _password: &str) -> Result<Verdict, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Upstream {
            status: 503,
            message: "Service Unavailable".to_string(),
        })
    }
}

/// Provider that answers only after `delay`.
#[derive(Debug)]
pub struct SlowProvider {
    pub delay: std::time::Duration,
}

#[async_trait]
impl IdentityProvider for SlowProvider {
    async fn verify_password(&self, _email: &str, _password: &str) -> Result<Verdict, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(Verdict::InvalidCredentials {
            reason: "Invalid login credentials".to_string(),
        })
    }
}

/// Provider that signals `entered` and then waits for `release` before
/// rejecting the credentials.
#[derive(Debug, Default)]
pub struct GatedProvider {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl IdentityProvider for GatedProvider {
    async fn verify_password(&self, _email: &str, _password: &str) -> Result<Verdict, ProviderError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Verdict::InvalidCredentials {
            reason: "Invalid login credentials".to_string(),
        })
    }
}

/// Store whose every call fails.
#[derive(Debug, Default)]
pub struct DownStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl RateLimitStore for DownStore {
    async fn get(&self, _identifier: &str, _action: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Err(down())
    }

    async fn upsert(&self, _record: &RateLimitRecord) -> Result<(), StoreError> {
        Err(down())
    }

    async fn delete(&self, _identifier: &str, _action: &str) -> Result<(), StoreError> {
        Err(down())
    }

    async fn reset_if_expired(
        &self,
        _identifier: &str,
        _action: &str,
        _now: DateTime<Utc>,
        _window: Duration,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        Err(down())
    }

    async fn record_failure(
        &self,
        _identifier: &str,
        _action: &str,
        _now: DateTime<Utc>,
        _window: Duration,
    ) -> Result<RateLimitRecord, StoreError> {
        Err(down())
    }

    async fn purge_expired(&self, _before: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(down())
    }
}

/// Wraps a store so that two attempts read the same snapshot, then lets the
/// first window reset through at once and holds the second back for
/// `reset_delay`.
pub struct ContendedStore<S> {
    inner: S,
    lookups: Arc<Barrier>,
    resets: AtomicUsize,
    reset_delay: StdDuration,
}

impl<S> ContendedStore<S> {
    pub fn new(inner: S, reset_delay: StdDuration) -> Self {
        Self {
            inner,
            lookups: Arc::new(Barrier::new(2)),
            resets: AtomicUsize::new(0),
            reset_delay,
        }
    }
}

#[async_trait]
impl<S: RateLimitStore> RateLimitStore for ContendedStore<S> {
    async fn get(&self, identifier: &str, action: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let record = self.inner.get(identifier, action).await;
        self.lookups.wait().await;
        record
    }

    async fn upsert(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        self.inner.upsert(record).await
    }

    async fn delete(&self, identifier: &str, action: &str) -> Result<(), StoreError> {
        self.inner.delete(identifier, action).await
    }

    async fn reset_if_expired(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        if self.resets.fetch_add(1, Ordering::SeqCst) > 0 {
            tokio::time::sleep(self.reset_delay).await;
        }
        self.inner.reset_if_expired(identifier, action, now, window).await
    }

    async fn record_failure(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitRecord, StoreError> {
        self.inner.record_failure(identifier, action, now, window).await
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.purge_expired(before).await
    }
}
