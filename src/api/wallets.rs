// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Wallet endpoints: balance, history, transfers, and admin lock control.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{AdminOnly, Auth},
    error::ApiError,
    ledger::{BalanceSummary, WalletTransaction},
    state::AppState,
};

/// Default and maximum page sizes for transaction history.
const DEFAULT_TX_LIMIT: usize = 50;
const MAX_TX_LIMIT: usize = 200;

/// Query parameters for transaction history.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Maximum number of entries to return (default: 50, max: 200)
    #[param(default = 50)]
    pub limit: Option<usize>,
}

/// Transaction history response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    /// Ledger entries, newest first.
    pub transactions: Vec<WalletTransaction>,
}

/// Request to transfer coins to another user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Recipient user id.
    pub to_user_id: String,
    /// Coins to move.
    pub amount: i64,
    /// Optional note recorded on both ledger entries.
    #[serde(default)]
    pub description: Option<String>,
}

/// Transfer result.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    /// Reference id shared by both ledger entries.
    pub transfer_id: String,
    /// Sender balance after the debit.
    pub balance: i64,
}

/// Response after an admin lock/unlock.
#[derive(Debug, Serialize, ToSchema)]
pub struct LockResponse {
    /// Wallet owner.
    pub user_id: String,
    /// Whether the wallet is now locked.
    pub locked: bool,
}

/// Get the authenticated user's balance.
///
/// Creates the wallet lazily on first query.
#[utoipa::path(
    get,
    path = "/v1/wallet",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Balance summary", body = BalanceSummary),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_balance(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<BalanceSummary>, ApiError> {
    let summary = state.ledger.get_balance(&user.user_id)?;
    Ok(Json(summary))
}

/// Get the authenticated user's transaction history, newest first.
#[utoipa::path(
    get,
    path = "/v1/wallet/transactions",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Ledger entries", body = TransactionListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_TX_LIMIT).min(MAX_TX_LIMIT);
    let transactions = state.ledger.list_transactions(&user.user_id, limit)?;
    Ok(Json(TransactionListResponse { transactions }))
}

/// Transfer coins from the authenticated user to another user.
#[utoipa::path(
    post,
    path = "/v1/wallet/transfer",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer applied", body = TransferResponse),
        (status = 400, description = "Invalid amount or recipient"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Insufficient balance or wallet locked")
    )
)]
pub async fn transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let description = request
        .description
        .unwrap_or_else(|| "Coin transfer".to_string());
    let receipt = state.ledger.transfer(
        &user.user_id,
        &request.to_user_id,
        request.amount,
        &description,
    )?;

    Ok(Json(TransferResponse {
        transfer_id: receipt.transfer_id,
        balance: receipt.from_balance,
    }))
}

/// Lock a user's wallet, blocking debits. Admin only.
#[utoipa::path(
    post,
    path = "/v1/wallets/{user_id}/lock",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "Wallet owner")),
    responses(
        (status = 200, description = "Wallet locked", body = LockResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn lock_wallet(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<LockResponse>, ApiError> {
    state.ledger.lock(&user_id)?;
    tracing::info!(admin = %admin.user_id, user_id = %user_id, "wallet locked");
    Ok(Json(LockResponse {
        user_id,
        locked: true,
    }))
}

/// Unlock a user's wallet, re-enabling debits. Admin only.
#[utoipa::path(
    post,
    path = "/v1/wallets/{user_id}/unlock",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "Wallet owner")),
    responses(
        (status = 200, description = "Wallet unlocked", body = LockResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn unlock_wallet(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<LockResponse>, ApiError> {
    state.ledger.unlock(&user_id)?;
    tracing::info!(admin = %admin.user_id, user_id = %user_id, "wallet unlocked");
    Ok(Json(LockResponse {
        user_id,
        locked: false,
    }))
}
