// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Platform (OAuth client) registration endpoints. Admin only.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::{auth::AdminOnly, error::ApiError, state::AppState};

/// Request to register a third-party platform.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterClientRequest {
    /// Display name shown on the consent/login screen.
    pub name: String,
    /// Exact-match callback URI allow-list.
    pub redirect_uris: Vec<String>,
    /// Fraction of gift volume paid to this platform (default 0.10).
    #[serde(default)]
    pub revenue_share: Option<f64>,
}

/// Response after registering a platform.
///
/// The secret is returned exactly once; only its hash is stored.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterClientResponse {
    /// Assigned client identifier.
    pub client_id: String,
    /// Plaintext client secret. Shown only in this response.
    pub client_secret: String,
    /// Display name.
    pub name: String,
    /// Registered callback URIs.
    pub redirect_uris: Vec<String>,
    /// Platform revenue share.
    pub revenue_share: f64,
}

/// Register a third-party platform. Admin only.
#[utoipa::path(
    post,
    path = "/v1/clients",
    tag = "Clients",
    security(("bearer_auth" = [])),
    request_body = RegisterClientRequest,
    responses(
        (status = 201, description = "Client registered", body = RegisterClientResponse),
        (status = 400, description = "Invalid name, redirect URIs, or revenue share"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn register_client(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<RegisterClientRequest>,
) -> Result<(StatusCode, Json<RegisterClientResponse>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request(
            "invalid_client_name",
            "Client name must not be empty",
        ));
    }
    if request.redirect_uris.is_empty() {
        return Err(ApiError::bad_request(
            "invalid_redirect_uris",
            "At least one redirect URI is required",
        ));
    }
    for uri in &request.redirect_uris {
        if Url::parse(uri).is_err() {
            return Err(ApiError::bad_request(
                "invalid_redirect_uris",
                format!("Not a valid URI: {uri}"),
            ));
        }
    }
    if let Some(share) = request.revenue_share {
        if !(0.0..=1.0).contains(&share) {
            return Err(ApiError::bad_request(
                "invalid_revenue_share",
                "Revenue share must be between 0 and 1",
            ));
        }
    }

    let registered = state.broker.register_client(
        request.name.trim(),
        request.redirect_uris,
        request.revenue_share,
    )?;

    tracing::info!(
        admin = %admin.user_id,
        client_id = %registered.client.client_id,
        "client registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterClientResponse {
            client_id: registered.client.client_id,
            client_secret: registered.client_secret,
            name: registered.client.name,
            redirect_uris: registered.client.redirect_uris,
            revenue_share: registered.client.revenue_share,
        }),
    ))
}
