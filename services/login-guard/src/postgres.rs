// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! PostgreSQL-backed rate-limit store using the `rate_limits` table.

use crate::error::StoreError;
use crate::record::RateLimitRecord;
use crate::store::RateLimitStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const SCHEMA: &str = include_str!("../migrations/0001_rate_limits.sql");

/// PostgreSQL implementation of [`RateLimitStore`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the table and index if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for PostgresStore {
    async fn get(&self, identifier: &str, action: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT identifier, action, attempts, window_start, last_attempt
            FROM rate_limits
            WHERE identifier = $1 AND action = $2
            "#,
        )
        .bind(identifier)
        .bind(action)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RateLimitRecord::from))
    }

    async fn upsert(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO rate_limits (identifier, action, attempts, window_start, last_attempt)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (identifier, action) DO UPDATE
            SET
                attempts = EXCLUDED.attempts,
                window_start = EXCLUDED.window_start,
                last_attempt = EXCLUDED.last_attempt
            "#,
        )
        .bind(&record.identifier)
        .bind(&record.action)
        .bind(i32::try_from(record.attempts).unwrap_or(i32::MAX))
        .bind(record.window_start)
        .bind(record.last_attempt)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, identifier: &str, action: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM rate_limits WHERE identifier = $1 AND action = $2")
            .bind(identifier)
            .bind(action)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset_if_expired(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        let reset = sqlx::query_as::<_, RecordRow>(
            r#"
            UPDATE rate_limits
            SET attempts = 0, window_start = $3, last_attempt = $3
            WHERE identifier = $1
              AND action = $2
              AND window_start + make_interval(secs => $4::float8) <= $3
            RETURNING identifier, action, attempts, window_start, last_attempt
            "#,
        )
        .bind(identifier)
        .bind(action)
        .bind(now)
        .bind(interval_secs(window))
        .fetch_optional(&self.pool)
        .await?;

        match reset {
            Some(row) => Ok(Some(row.into())),
            None => self.get(identifier, action).await,
        }
    }

    async fn record_failure(
        &self,
        identifier: &str,
        action: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitRecord, StoreError> {
        // One statement: the row lock taken by ON CONFLICT serialises
        // concurrent failures for the same key.
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            INSERT INTO rate_limits (identifier, action, attempts, window_start, last_attempt)
            VALUES ($1, $2, 1, $3, $3)
            ON CONFLICT (identifier, action) DO UPDATE
            SET
                attempts = CASE
                    WHEN rate_limits.window_start + make_interval(secs => $4::float8) <= $3
                    THEN 1
                    ELSE rate_limits.attempts + 1
                END,
                window_start = CASE
                    WHEN rate_limits.window_start + make_interval(secs => $4::float8) <= $3
                    THEN $3
                    ELSE rate_limits.window_start
                END,
                last_attempt = $3
            RETURNING identifier, action, attempts, window_start, last_attempt
            "#,
        )
        .bind(identifier)
        .bind(action)
        .bind(now)
        .bind(interval_secs(window))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE window_start < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn interval_secs(window: Duration) -> f64 {
    window.num_milliseconds() as f64 / 1000.0
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    identifier: String,
    action: String,
    attempts: i32,
    window_start: DateTime<Utc>,
    last_attempt: DateTime<Utc>,
}

impl From<RecordRow> for RateLimitRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            identifier: row.identifier,
            action: row.action,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            window_start: row.window_start,
            last_attempt: row.last_attempt,
        }
    }
}
