// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! API error type.
//!
//! Every failure surfaces as `{code, message, details?}` with a machine
//! code stable across releases. Domain errors ([`OAuthError`],
//! [`LedgerError`]) convert into [`ApiError`] here so handlers can use
//! `?` and surface the kind and message verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::ledger::LedgerError;
use crate::oauth::broker::OAuthError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details to the error body.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            code: self.code,
            message: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            OAuthError::InvalidClient => (StatusCode::NOT_FOUND, "invalid_client"),
            OAuthError::InvalidRedirectUri => (StatusCode::BAD_REQUEST, "invalid_redirect_uri"),
            OAuthError::InvalidScope(_) => (StatusCode::BAD_REQUEST, "invalid_scope"),
            OAuthError::InvalidClientCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_client_credentials")
            }
            OAuthError::SubscriptionInactive => (StatusCode::FORBIDDEN, "subscription_inactive"),
            OAuthError::InvalidCode => (StatusCode::UNAUTHORIZED, "invalid_code"),
            OAuthError::CodeAlreadyUsed => (StatusCode::CONFLICT, "code_already_used"),
            OAuthError::CodeExpired => (StatusCode::UNAUTHORIZED, "code_expired"),
            OAuthError::CodeValidationFailed => {
                (StatusCode::UNAUTHORIZED, "code_validation_failed")
            }
            OAuthError::InvalidRefreshToken => (StatusCode::UNAUTHORIZED, "invalid_refresh_token"),
            OAuthError::InvalidAccessToken => (StatusCode::UNAUTHORIZED, "invalid_access_token"),
            OAuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            OAuthError::InactiveAccount => (StatusCode::FORBIDDEN, "inactive_account"),
            OAuthError::UnsupportedGrantType(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_grant_type")
            }
            OAuthError::RandomFailure | OAuthError::Store(_) => {
                tracing::error!(error = %err, "authorization broker failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        Self::new(status, code, message)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match &err {
            LedgerError::InvalidAmount => Self::bad_request("invalid_amount", message),
            LedgerError::WalletNotFound(_) => Self::not_found("wallet_not_found", message),
            LedgerError::WalletLocked => Self::conflict("wallet_locked", message),
            LedgerError::InsufficientBalance {
                required,
                available,
            } => Self::conflict("insufficient_balance", message).with_details(json!({
                "required": required,
                "available": available,
            })),
            LedgerError::InvalidTransfer => Self::bad_request("invalid_transfer", message),
            LedgerError::InvalidRecipient => Self::bad_request("invalid_recipient", message),
            LedgerError::InvalidQuantity => Self::bad_request("invalid_quantity", message),
            LedgerError::GiftNotFound => Self::not_found("gift_not_found", message),
            LedgerError::GiftNotAvailable => Self::bad_request("gift_not_available", message),
            LedgerError::InsufficientQuantity {
                requested,
                remaining,
            } => Self::conflict("insufficient_quantity", message).with_details(json!({
                "requested": requested,
                "remaining": remaining,
            })),
            LedgerError::Store(_) => {
                tracing::error!(error = %err, "ledger store failure");
                Self::internal(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn body_carries_code_message_and_details() {
        let response = ApiError::conflict("insufficient_balance", "not enough coins")
            .with_details(json!({"required": 1500, "available": 1000}))
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["code"], "insufficient_balance");
        assert_eq!(body["message"], "not enough coins");
        assert_eq!(body["details"]["required"], 1500);
    }

    #[tokio::test]
    async fn details_are_omitted_when_absent() {
        let response = ApiError::bad_request("invalid_amount", "bad").into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert!(body.get("details").is_none());
    }

    #[test]
    fn oauth_errors_map_to_spec_status_classes() {
        let err: ApiError = OAuthError::CodeAlreadyUsed.into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "code_already_used");

        let err: ApiError = OAuthError::InvalidClientCredentials.into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err: ApiError = OAuthError::SubscriptionInactive.into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn ledger_errors_carry_structured_details() {
        let err: ApiError = LedgerError::InsufficientBalance {
            required: 1500,
            available: 1000,
        }
        .into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        let details = err.details.unwrap();
        assert_eq!(details["required"], 1500);
        assert_eq!(details["available"], 1000);
    }
}
