// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Payment-processor webhook endpoint.
//!
//! The processor signs each delivery with HMAC-SHA256 over the raw body;
//! the signature arrives in `X-Webhook-Signature` as lowercase hex. The
//! body is only parsed after the signature verifies.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};

use crate::{
    error::ApiError,
    ledger::payments::{verify_webhook_signature, PaymentEvent},
    ledger::PaymentOutcome,
    state::AppState,
};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Consume a payment-processor event.
///
/// Only `payment_succeeded` events credit the wallet; the payment record's
/// status makes redelivery idempotent.
#[utoipa::path(
    post,
    path = "/v1/payments/webhook",
    tag = "Payments",
    request_body = PaymentEvent,
    responses(
        (status = 200, description = "Event consumed", body = PaymentOutcome),
        (status = 400, description = "Malformed event body"),
        (status = 401, description = "Missing or invalid signature"),
        (status = 503, description = "Webhook secret not configured")
    )
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PaymentOutcome>, ApiError> {
    let Some(ref secret) = state.webhook_secret else {
        return Err(ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "webhook_not_configured",
            "Payment webhook secret is not configured",
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::unauthorized("missing_signature", "Webhook signature header is required")
        })?;

    if !verify_webhook_signature(secret, &body, signature) {
        tracing::warn!("rejected payment webhook with bad signature");
        return Err(ApiError::unauthorized(
            "invalid_signature",
            "Webhook signature did not verify",
        ));
    }

    let event: PaymentEvent = serde_json::from_slice(&body).map_err(|e| {
        ApiError::bad_request("invalid_event", format!("Malformed event body: {e}"))
    })?;

    let outcome = state.ledger.apply_payment_event(&event)?;
    tracing::info!(
        payment_id = %event.external_payment_id,
        user_id = %event.user_id,
        ?outcome,
        "payment webhook consumed"
    );

    Ok(Json(outcome))
}
