// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Coin top-ups driven by payment-processor webhooks.
//!
//! The processor delivers `payment_succeeded` events carrying a user id
//! and a coin amount. Crediting the wallet and marking the payment record
//! completed happen in one store transaction; the record's status is the
//! idempotency gate, so a redelivered event can never double-credit.
//!
//! Webhook bodies are authenticated with an HMAC-SHA256 signature over the
//! raw payload, verified in constant time before the event is parsed.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use utoipa::ToSchema;

use super::ledger::{credit_in, EntryParams, WalletLedger};
use super::wallet::TransactionType;
use super::LedgerError;

type HmacSha256 = Hmac<Sha256>;

/// External reference tag on deposit ledger entries.
const PAYMENT_REF_TYPE: &str = "payment";

/// Payment record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Created but not yet settled.
    Pending,
    /// Settled and credited. Terminal.
    Completed,
    /// Settlement failed. Terminal.
    Failed,
}

/// A coin top-up record, keyed by the processor's payment id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    /// Processor-side payment id (unique, table key).
    pub external_payment_id: String,
    /// User whose wallet the purchase credits.
    pub user_id: String,
    /// Coins purchased.
    pub coin_amount: i64,
    /// Current status. `Completed` gates re-crediting.
    pub status: PaymentStatus,
    /// When the record was first seen.
    pub created_at: DateTime<Utc>,
    /// When the credit was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A verified webhook event from the payment processor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentEvent {
    /// Processor-side payment id.
    pub external_payment_id: String,
    /// User whose wallet to credit.
    pub user_id: String,
    /// Coins purchased.
    pub coin_amount: i64,
    /// Event status; only `payment_succeeded` triggers a credit.
    pub status: String,
}

/// Outcome of consuming a webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PaymentOutcome {
    /// Wallet credited; carries the new balance.
    Credited { new_balance: i64 },
    /// The payment was already completed; nothing was written.
    AlreadyProcessed,
    /// Event status was not `payment_succeeded`; nothing was written.
    Ignored,
}

impl WalletLedger {
    /// Consume a verified payment event.
    ///
    /// Credits the wallet and marks the payment completed in one
    /// transaction. A second delivery of the same event finds the
    /// completed record and returns [`PaymentOutcome::AlreadyProcessed`].
    pub fn apply_payment_event(&self, event: &PaymentEvent) -> Result<PaymentOutcome, LedgerError> {
        if event.status != "payment_succeeded" {
            return Ok(PaymentOutcome::Ignored);
        }
        if event.coin_amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let now = Utc::now();
        self.db.run_write(|w| {
            let existing = w.get_payment(&event.external_payment_id)?;
            if let Some(ref payment) = existing {
                if payment.status == PaymentStatus::Completed {
                    return Ok(PaymentOutcome::AlreadyProcessed);
                }
            }

            let new_balance = credit_in(
                w,
                &event.user_id,
                event.coin_amount,
                EntryParams::new(TransactionType::Deposit, "Coin purchase")
                    .with_ref(PAYMENT_REF_TYPE, &event.external_payment_id),
                now,
            )?;

            let payment = Payment {
                external_payment_id: event.external_payment_id.clone(),
                user_id: event.user_id.clone(),
                coin_amount: event.coin_amount,
                status: PaymentStatus::Completed,
                created_at: existing.map_or(now, |p| p.created_at),
                completed_at: Some(now),
            };
            w.put_payment(&payment)?;

            Ok(PaymentOutcome::Credited { new_balance })
        })
    }
}

// =============================================================================
// Webhook Signature
// =============================================================================

/// Verify an HMAC-SHA256 webhook signature (lowercase hex) over the raw
/// request body. Comparison is constant-time.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Some(signature) = decode_hex(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Compute the hex signature for a body. Used by tests and by operators
/// replaying events against a local instance.
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    Some(digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    }))
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
