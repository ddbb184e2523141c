// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the login guard service.
//!
//! The admin panel posts credentials to `/login`; the response carries either
//! the provider's session or the lockout state the client should display.

use crate::config::Config;
use crate::error::GuardError;
use crate::guard::{LoginGuard, Outcome, UNKNOWN_IDENTIFIER};
use crate::metrics::GuardMetrics;
use crate::validator::ValidationError;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Shared application state.
pub struct AppState {
    pub guard: LoginGuard,
    pub metrics: Option<GuardMetrics>,
    pub config: Config,
}

/// Login request body. Missing fields deserialize to `None` and are
/// reported by the validator.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Successful login body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session: Value,
    pub user: Value,
}

/// Error body for every non-200 login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl ErrorResponse {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            remaining_attempts: None,
            remaining_minutes: None,
            locked: None,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router with CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/login", post(login));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Public login endpoint: any origin, credentials travel in the body.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ])
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "login-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let Some(metrics) = &state.metrics else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Rate-limited login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let peer = connect_info
        .filter(|_| state.config.guard.trust_peer_addr)
        .map(|ConnectInfo(addr)| addr);
    let identifier = client_identifier(&headers, peer);

    let request: LoginRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            debug!(%identifier, error = %e, "Unreadable login body");
            return error_response(&identifier, ValidationError::MalformedBody(e.to_string()).into());
        }
    };

    let result = state
        .guard
        .attempt(
            &identifier,
            request.email.as_deref().unwrap_or_default(),
            request.password.as_deref().unwrap_or_default(),
        )
        .await;

    match result {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => error_response(&identifier, e),
    }
}

/// Client identifier: first `x-forwarded-for` hop, then `x-real-ip`, then
/// the peer address when trusted, else [`UNKNOWN_IDENTIFIER`].
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string())
}

fn outcome_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Authenticated(session) => (
            StatusCode::OK,
            Json(LoginResponse {
                session: session.session,
                user: session.user,
            }),
        )
            .into_response(),
        Outcome::Rejected { remaining_attempts } => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: format!(
                    "Invalid email or password. {remaining_attempts} attempt(s) remaining."
                ),
                remaining_attempts: Some(remaining_attempts),
                remaining_minutes: None,
                locked: None,
            }),
        )
            .into_response(),
        Outcome::Locked {
            remaining_minutes,
            newly_triggered,
        } => {
            let retry_after = (u64::from(remaining_minutes) * 60).to_string();
            let body = if newly_triggered {
                ErrorResponse {
                    error: format!(
                        "Too many failed login attempts. Locked for {remaining_minutes} minutes."
                    ),
                    remaining_attempts: Some(0),
                    remaining_minutes: None,
                    locked: Some(true),
                }
            } else {
                ErrorResponse {
                    error: format!(
                        "Too many failed login attempts. Try again in {remaining_minutes} minutes."
                    ),
                    remaining_attempts: None,
                    remaining_minutes: Some(remaining_minutes),
                    locked: Some(true),
                }
            };
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after)],
                Json(body),
            )
                .into_response()
        }
    }
}

fn error_response(identifier: &str, err: GuardError) -> Response {
    match err {
        GuardError::Validation(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::message(e.to_string())),
        )
            .into_response(),
        other => {
            error!(%identifier, error = %other, "Login attempt failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::message("Login is temporarily unavailable")),
            )
                .into_response()
        }
    }
}
