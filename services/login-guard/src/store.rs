// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rate-limit store port and the in-memory adapter.

use crate::error::StoreError;
use crate::record::RateLimitRecord;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Persistence for [`RateLimitRecord`]s, keyed by `(identifier, action)`.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, identifier: &str, action: &str) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Insert or replace the record for its `(identifier, action)` key.
    async fn upsert(&self, record: &RateLimitRecord) -> Result<(), StoreError>;

    /// Remove the record; a missing record is not an error.
    async fn delete(&self, identifier: &str, action: &str) -> Result<(), StoreError>;

    /// Restart the window only if it is still expired as of `now`, then
    /// return the stored record. The expiry check and the write happen
    /// atomically, so a window another attempt has already restarted and
    /// counted against is left alone.
    async fn reset_if_expired(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Count one failure atomically.
    ///
    /// Creates the record, restarts an expired window, or increments the
    /// counter in a single step and returns the stored result. Concurrent
    /// callers for the same key must never lose an increment.
    async fn record_failure(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitRecord, StoreError>;

    /// Remove records whose window opened before `before`.
    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;
}

type Key = (String, String);

fn key(identifier: &str, action: &str) -> Key {
    (identifier.to_owned(), action.to_owned())
}

/// Process-local store. State is lost on restart, which only forgets
/// failure history.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<Key, RateLimitRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, identifier: &str, action: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&key(identifier, action)).cloned())
    }

    async fn upsert(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(key(&record.identifier, &record.action), record.clone());
        Ok(())
    }

    async fn delete(&self, identifier: &str, action: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.remove(&key(identifier, action));
        Ok(())
    }

    async fn reset_if_expired(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&key(identifier, action)) else {
            return Ok(None);
        };
        if record.is_expired(now, window) {
            *record = record.clone().reset(now);
            debug!(%identifier, %action, "Window reset");
        }
        Ok(Some(record.clone()))
    }

    async fn record_failure(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitRecord, StoreError> {
        // Read and write under one write guard.
        let mut records = self.records.write().await;
        let k = key(identifier, action);
        let updated = RateLimitRecord::with_failure(records.remove(&k), identifier, action, now, window);
        debug!(%identifier, %action, attempts = updated.attempts, "Failure recorded");
        records.insert(k, updated.clone());
        Ok(updated)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let initial = records.len();
        records.retain(|_, r| r.window_start >= before);
        Ok((initial - records.len()) as u64)
    }
}
