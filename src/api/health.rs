// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Embedded database availability.
    pub store: String,
    /// JWKS (authentication keys) status.
    /// Only present in production mode (JWKS_URL configured).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
}

/// Check that the store answers a read.
fn check_store(state: &AppState) -> String {
    match state.db.get_client("health-check") {
        Ok(_) => "ok".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "store health check failed");
            "unavailable".to_string()
        }
    }
}

/// Check if JWKS is available (production auth mode).
async fn check_jwks(state: &AppState) -> Option<String> {
    if let Some(ref jwks_manager) = state.auth_config.jwks {
        // Check if we have cached keys
        if jwks_manager.is_cached().await {
            Some("ok".to_string())
        } else {
            // Try to fetch keys
            match jwks_manager.refresh().await {
                Ok(_) => Some("ok".to_string()),
                Err(_) => Some("unavailable".to_string()),
            }
        }
    } else {
        // Development mode - no JWKS configured
        None
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "All checks passed", body = ReadyResponse),
        (status = 503, description = "One or more checks failed", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let store = check_store(&state);
    let jwks = check_jwks(&state).await;

    let degraded =
        store != "ok" || jwks.as_deref().is_some_and(|status| status != "ok");

    let response = ReadyResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            store,
            jwks,
        },
    };

    let status = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SocialWalletDb;
    use std::sync::Arc;

    #[tokio::test]
    async fn health_reports_ok() {
        let response = health().await;
        assert_eq!(response.0.status, "ok");
    }

    #[tokio::test]
    async fn ready_passes_in_dev_mode() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(SocialWalletDb::open(&dir.path().join("test.redb")).unwrap());
        let state = AppState::new(db);

        let (status, Json(body)) = ready(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.store, "ok");
        assert!(body.checks.jwks.is_none());
    }
}
