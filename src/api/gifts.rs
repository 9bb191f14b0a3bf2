// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Gift catalog and gift-send endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{AdminOnly, Auth},
    error::ApiError,
    ledger::{Gift, GiftReceipt},
    state::AppState,
};

/// Request to add a gift to the catalog.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGiftRequest {
    /// Display name.
    pub name: String,
    /// Unit price in coins.
    pub price: i64,
    /// Restrict the gift to one platform's client id.
    #[serde(default)]
    pub platform_id: Option<String>,
    /// Cap total stock.
    #[serde(default)]
    pub limited: bool,
    /// Units available when limited.
    #[serde(default)]
    pub quantity_cap: i64,
}

/// Catalog listing response.
#[derive(Debug, Serialize, ToSchema)]
pub struct GiftListResponse {
    /// Active gifts, sorted by name.
    pub gifts: Vec<Gift>,
}

/// Request to send a gift.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendGiftRequest {
    /// Receiving user.
    pub receiver_id: String,
    /// Catalog gift to send.
    pub gift_id: String,
    /// Platform (client id) the send goes through.
    pub platform_id: String,
    /// Units to send, 1 to 100.
    pub quantity: i64,
}

/// List the active gift catalog.
#[utoipa::path(
    get,
    path = "/v1/gifts",
    tag = "Gifts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active gifts", body = GiftListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_gifts(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<GiftListResponse>, ApiError> {
    let gifts = state.ledger.list_active_gifts()?;
    Ok(Json(GiftListResponse { gifts }))
}

/// Add a gift to the catalog. Admin only.
#[utoipa::path(
    post,
    path = "/v1/gifts",
    tag = "Gifts",
    security(("bearer_auth" = [])),
    request_body = CreateGiftRequest,
    responses(
        (status = 201, description = "Gift created", body = Gift),
        (status = 400, description = "Invalid price or name"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_gift(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<CreateGiftRequest>,
) -> Result<(StatusCode, Json<Gift>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request(
            "invalid_gift_name",
            "Gift name must not be empty",
        ));
    }
    if request.limited && request.quantity_cap <= 0 {
        return Err(ApiError::bad_request(
            "invalid_quantity_cap",
            "Limited gifts need a positive quantity cap",
        ));
    }

    let gift = state.ledger.create_gift(
        &request.name,
        request.price,
        request.platform_id.as_deref(),
        request.limited,
        request.quantity_cap,
    )?;

    Ok((StatusCode::CREATED, Json(gift)))
}

/// Send a gift from the authenticated user to another user.
///
/// Debits the sender, credits the receiver net of fees, and records the
/// audit row atomically.
#[utoipa::path(
    post,
    path = "/v1/gifts/send",
    tag = "Gifts",
    security(("bearer_auth" = [])),
    request_body = SendGiftRequest,
    responses(
        (status = 200, description = "Gift sent", body = GiftReceipt),
        (status = 400, description = "Invalid recipient, quantity, or platform"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Gift not found"),
        (status = 409, description = "Insufficient balance or stock")
    )
)]
pub async fn send_gift(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SendGiftRequest>,
) -> Result<Json<GiftReceipt>, ApiError> {
    let receipt = state.ledger.send_gift(
        &user.user_id,
        &request.receiver_id,
        &request.gift_id,
        &request.platform_id,
        request.quantity,
    )?;

    tracing::info!(
        sender = %user.user_id,
        receiver = %request.receiver_id,
        gift_tx = %receipt.gift_tx_id,
        total = receipt.total,
        "gift sent"
    );

    Ok(Json(receipt))
}
