// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Identity provider port and the HTTP password-grant client.
//!
//! The guard only distinguishes three answers: credentials accepted,
//! credentials rejected, and "could not get a verdict". Session material is
//! passed through untouched.

use crate::config::{ConfigError, ProviderConfig};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Opaque session material returned on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session: Value,
    pub user: Value,
}

/// The provider's decision on a credential pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Authenticated(Session),
    /// The only verdict that counts against the attempt budget
    InvalidCredentials { reason: String },
}

/// Password verification backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_password(&self, email: &str, password: &str) -> Result<Verdict, ProviderError>;
}

/// Client for a GoTrue-compatible `token?grant_type=password` endpoint.
pub struct HttpIdentityProvider {
    token_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    /// Create a client for the auth service at `config.url`.
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &ProviderConfig, client: reqwest::Client) -> Result<Self, ConfigError> {
        let raw = format!("{}/auth/v1/token", config.url.trim_end_matches('/'));
        let mut token_url = Url::parse(&raw).map_err(|e| ConfigError::InvalidProviderUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        token_url
            .query_pairs_mut()
            .append_pair("grant_type", "password");

        Ok(Self {
            token_url,
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify_password(&self, email: &str, password: &str) -> Result<Verdict, ProviderError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "Identity provider responded");

        interpret_response(status, &body)
    }
}

/// Map a provider HTTP response onto a verdict.
fn interpret_response(status: StatusCode, body: &str) -> Result<Verdict, ProviderError> {
    if status.is_success() {
        let session: Value =
            serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        let user = session.get("user").cloned().unwrap_or(Value::Null);
        return Ok(Verdict::Authenticated(Session { session, user }));
    }

    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
            Ok(Verdict::InvalidCredentials { reason: message })
        }
        // Provider-side throttling and outages are not the user's fault.
        _ => Err(ProviderError::Upstream {
            status: status.as_u16(),
            message,
        }),
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}
