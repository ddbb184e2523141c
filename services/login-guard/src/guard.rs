// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Login gate.
//!
//! Sits in front of the identity provider and throttles repeated failures
//! per client identifier:
//! 1. Refuse outright while an identifier is locked out, without asking the
//!    provider.
//! 2. Otherwise delegate to the provider and count explicit credential
//!    rejections with an atomic store update.
//! 3. Clear the history on success.
//!
//! Provider outages, timeouts, and malformed requests never touch the
//! attempt counter.

use crate::config::GuardConfig;
use crate::error::{GuardError, Result, StoreError};
use crate::metrics::{outcome, GuardMetrics};
use crate::provider::{IdentityProvider, Session, Verdict};
use crate::record::{ceil_minutes, AttemptEvent, LockoutPolicy, Transition, WindowState};
use crate::store::RateLimitStore;
use crate::validator::CredentialsValidator;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Identifier used when the client address cannot be determined. All such
/// clients share one bucket.
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// Decision for one login attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Credentials accepted; failure history cleared
    Authenticated(Session),
    /// Credentials rejected, attempts remain
    Rejected { remaining_attempts: u32 },
    /// Identifier locked out. `newly_triggered` is set when this attempt's
    /// failure reached the limit.
    Locked {
        remaining_minutes: u32,
        newly_triggered: bool,
    },
}

/// Replace a blank identifier with [`UNKNOWN_IDENTIFIER`].
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_IDENTIFIER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rate-limited login gate. Cheap to clone.
#[derive(Clone)]
pub struct LoginGuard {
    store: Arc<dyn RateLimitStore>,
    provider: Arc<dyn IdentityProvider>,
    validator: CredentialsValidator,
    policy: LockoutPolicy,
    action: Arc<str>,
    store_timeout: Duration,
    provider_timeout: Duration,
    metrics: Option<GuardMetrics>,
}

impl LoginGuard {
    pub fn new(
        config: &GuardConfig,
        store: Arc<dyn RateLimitStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            provider,
            validator: CredentialsValidator::default(),
            policy: LockoutPolicy::from_config(config),
            action: Arc::from(config.action.as_str()),
            store_timeout: config.store_timeout(),
            provider_timeout: config.provider_timeout(),
            metrics: None,
        }
    }

    pub fn with_validator(mut self, validator: CredentialsValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_metrics(mut self, metrics: GuardMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Run one login attempt against the current time.
    pub async fn attempt(&self, identifier: &str, email: &str, password: &str) -> Result<Outcome> {
        self.attempt_at(identifier, email, password, Utc::now()).await
    }

    /// Run one login attempt as of `now`.
    ///
    /// The store and provider work runs on its own task: dropping the
    /// returned future does not abort a provider call or store write that
    /// is already in flight.
    pub async fn attempt_at(
        &self,
        identifier: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        if let Err(e) = self.validator.validate(Some(email), Some(password)).into_result() {
            debug!(error = %e, "Rejecting malformed login request");
            self.count(outcome::INVALID);
            return Err(e.into());
        }

        let guard = self.clone();
        let identifier = normalize_identifier(identifier);
        let email = email.to_owned();
        let password = password.to_owned();

        let task = tokio::spawn(async move {
            let result = guard.run(&identifier, &email, &password, now).await;
            guard.count(match &result {
                Ok(Outcome::Authenticated(_)) => outcome::AUTHENTICATED,
                Ok(Outcome::Rejected { .. }) => outcome::REJECTED,
                Ok(Outcome::Locked {
                    newly_triggered: true,
                    ..
                }) => outcome::LOCKOUT_TRIGGERED,
                Ok(Outcome::Locked { .. }) => outcome::LOCKED,
                Err(_) => outcome::ERROR,
            });
            result
        });

        task.await.map_err(|e| GuardError::Aborted(e.to_string()))?
    }

    async fn run(
        &self,
        identifier: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let action: &str = &self.action;

        let existing = self
            .store_call("rate-limit lookup", self.store.get(identifier, action))
            .await?;

        let existing = match self.policy.apply(existing.as_ref(), AttemptEvent::Observe, now) {
            Transition::ResetByExpiry(_) => {
                debug!(%identifier, "Window expired, starting fresh");
                self.store_call(
                    "rate-limit reset",
                    self.store.reset_if_expired(
                        identifier,
                        action,
                        now,
                        self.policy.lockout_duration,
                    ),
                )
                .await?
            }
            _ => existing,
        };

        if let WindowState::Locked { remaining } = self.policy.state(existing.as_ref(), now) {
            let remaining_minutes = ceil_minutes(remaining);
            info!(%identifier, remaining_minutes, "Login refused, identifier locked out");
            return Ok(Outcome::Locked {
                remaining_minutes,
                newly_triggered: false,
            });
        }

        match self.verify(identifier, email, password).await? {
            Verdict::Authenticated(session) => {
                // Delete even when the lookup saw nothing: a concurrent
                // failure may have created the record since.
                if self.policy.apply(existing.as_ref(), AttemptEvent::Success, now)
                    == Transition::ClearOnSuccess
                {
                    self.store_call("rate-limit clear", self.store.delete(identifier, action))
                        .await?;
                }
                info!(%identifier, "Login succeeded");
                Ok(Outcome::Authenticated(session))
            }
            Verdict::InvalidCredentials { reason } => {
                let record = self
                    .store_call(
                        "rate-limit update",
                        self.store.record_failure(
                            identifier,
                            action,
                            now,
                            self.policy.lockout_duration,
                        ),
                    )
                    .await?;

                if self.policy.is_limit_reached(record.attempts) {
                    warn!(
                        %identifier,
                        attempts = record.attempts,
                        "Too many failed logins, identifier locked out"
                    );
                    return Ok(Outcome::Locked {
                        remaining_minutes: self.policy.lockout_minutes(),
                        newly_triggered: true,
                    });
                }

                let remaining_attempts = self.policy.remaining_attempts(record.attempts);
                info!(%identifier, %reason, remaining_attempts, "Login rejected");
                Ok(Outcome::Rejected { remaining_attempts })
            }
        }
    }

    /// Ask the provider, mapping transport failures and timeouts to errors
    /// that are not counted.
    async fn verify(&self, identifier: &str, email: &str, password: &str) -> Result<Verdict> {
        let started = Instant::now();
        let result = timeout(self.provider_timeout, self.provider.verify_password(email, password)).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(Ok(verdict)) => {
                self.observe_provider("verdict", elapsed);
                Ok(verdict)
            }
            Ok(Err(e)) => {
                self.observe_provider("error", elapsed);
                warn!(%identifier, error = %e, "Identity provider failed, attempt not counted");
                Err(e.into())
            }
            Err(_) => {
                self.observe_provider("error", elapsed);
                warn!(%identifier, "Identity provider timed out, attempt not counted");
                Err(GuardError::Timeout {
                    operation: "identity provider",
                })
            }
        }
    }

    async fn store_call<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        match timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(|e| {
                warn!(operation, error = %e, "Rate-limit store failed");
                GuardError::from(e)
            }),
            Err(_) => {
                warn!(operation, "Rate-limit store timed out");
                Err(GuardError::Timeout { operation })
            }
        }
    }

    fn count(&self, label: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(label);
        }
    }

    fn observe_provider(&self, label: &str, seconds: f64) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_provider(label, seconds);
        }
    }
}
