// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! OAuth wire endpoints for third-party platforms.
//!
//! These are thin adapters over the authorization broker: they parse the
//! OAuth wire shapes, enforce the token-endpoint rate limit, and map
//! broker errors onto the `{code, message, details?}` body.

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::OptionalAuth,
    error::ApiError,
    oauth::{
        broker::OAuthError,
        models::{AuthorizeRequest, IntrospectResponse, TokenRequest, TokenResponse},
        AuthorizeOutcome, ScopeSet,
    },
    state::AppState,
};

/// Body returned when an anonymous user hits the authorize endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginRequiredResponse {
    /// Always true; distinguishes this body from a redirect.
    pub login_required: bool,
    /// The requesting platform's display name, for the login screen.
    pub client_name: String,
}

/// Begin an authorization-code grant.
///
/// Authenticated users are redirected back to the platform with a fresh
/// code; anonymous users receive a login-required body and must re-invoke
/// after authenticating.
#[utoipa::path(
    get,
    path = "/oauth/authorize",
    tag = "OAuth",
    params(AuthorizeRequest),
    responses(
        (status = 303, description = "Redirect to the platform callback with code and state"),
        (status = 200, description = "Login required", body = LoginRequiredResponse),
        (status = 400, description = "Invalid request, redirect URI, or scope"),
        (status = 404, description = "Unknown or inactive client")
    )
)]
pub async fn authorize(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Query(request): Query<AuthorizeRequest>,
) -> Result<Response, ApiError> {
    if request.response_type != "code" {
        return Err(ApiError::bad_request(
            "invalid_request",
            "Only the 'code' response_type is supported",
        ));
    }

    let scopes = parse_scope_param(request.scope.as_deref())?;

    let outcome = state.broker.initiate_authorization(
        &request.client_id,
        &request.redirect_uri,
        &scopes,
        request.state.as_deref(),
        user.as_ref().map(|u| u.user_id.as_str()),
    )?;

    match outcome {
        AuthorizeOutcome::LoginRequired { client_name } => Ok(Json(LoginRequiredResponse {
            login_required: true,
            client_name,
        })
        .into_response()),
        AuthorizeOutcome::Redirect { redirect_uri } => {
            Ok(Redirect::to(&redirect_uri).into_response())
        }
    }
}

/// Exchange a code or refresh token for an access token pair.
#[utoipa::path(
    post,
    path = "/oauth/token",
    tag = "OAuth",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Malformed request or unsupported grant type"),
        (status = 401, description = "Bad credentials, code, or refresh token"),
        (status = 403, description = "Subscription inactive"),
        (status = 409, description = "Code already used"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn token(
    State(state): State<AppState>,
    Form(request): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if !state.token_limiter.check(&request.client_id) {
        return Err(ApiError::rate_limited(
            "Too many token requests for this client",
        ));
    }

    let token = match request.grant_type.as_str() {
        "authorization_code" => {
            let client_secret = request.client_secret.as_deref().ok_or_else(|| {
                ApiError::bad_request("invalid_request", "client_secret is required")
            })?;
            let code = request
                .code
                .as_deref()
                .ok_or_else(|| ApiError::bad_request("invalid_request", "code is required"))?;
            let redirect_uri = request.redirect_uri.as_deref().ok_or_else(|| {
                ApiError::bad_request("invalid_request", "redirect_uri is required")
            })?;

            state
                .broker
                .exchange_code(&request.client_id, client_secret, code, redirect_uri)?
        }
        "refresh_token" => {
            let refresh_token = request.refresh_token.as_deref().ok_or_else(|| {
                ApiError::bad_request("invalid_request", "refresh_token is required")
            })?;

            state
                .broker
                .exchange_refresh_token(&request.client_id, refresh_token)?
        }
        other => return Err(OAuthError::UnsupportedGrantType(other.to_string()).into()),
    };

    Ok(Json(TokenResponse::from_token(&token)))
}

/// Form body for revocation and introspection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenValueRequest {
    /// The access token value.
    pub token: String,
}

/// Revoke an access token. Idempotent.
#[utoipa::path(
    post,
    path = "/oauth/revoke",
    tag = "OAuth",
    request_body(content = TokenValueRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 204, description = "Token revoked (or was already absent)")
    )
)]
pub async fn revoke(
    State(state): State<AppState>,
    Form(request): Form<TokenValueRequest>,
) -> Result<StatusCode, ApiError> {
    state.broker.revoke_token(&request.token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve an access token to its user, client, and scopes.
#[utoipa::path(
    post,
    path = "/oauth/introspect",
    tag = "OAuth",
    request_body(content = TokenValueRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token is live", body = IntrospectResponse),
        (status = 401, description = "Unknown or expired token"),
        (status = 403, description = "Owning account inactive")
    )
)]
pub async fn introspect(
    State(state): State<AppState>,
    Form(request): Form<TokenValueRequest>,
) -> Result<Json<IntrospectResponse>, ApiError> {
    let identity = state.broker.validate_access_token(&request.token)?;
    // The record must still exist after a successful validation
    let record = state
        .db
        .get_access_token(&request.token)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::unauthorized("invalid_access_token", "invalid access token"))?;

    Ok(Json(IntrospectResponse {
        user_id: identity.user_id,
        client_id: identity.client_id,
        scope: identity.scopes.to_string(),
        expires_at: record.expires_at,
    }))
}

/// Parse the space-joined `scope` parameter into the closed scope set.
fn parse_scope_param(scope: Option<&str>) -> Result<ScopeSet, ApiError> {
    match scope {
        None => Ok(ScopeSet::new()),
        Some(raw) => ScopeSet::parse(raw)
            .map_err(|unknown| OAuthError::InvalidScope(unknown).into()),
    }
}
