// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Gift catalog and the gift-send flow.
//!
//! Sending a gift produces four writes: the sender debit, the receiver
//! credit, the [`GiftTransaction`] audit row, and (for limited gifts) the
//! sold-count increment. All four commit in one store transaction or not
//! at all.
//!
//! ## Fee Split
//!
//! ```text
//! total             = unit price x quantity
//! platform_fee      = round(total x platform revenue share)   (default 10%)
//! social_wallet_fee = round(total x 1.5%)
//! sender debit      = total + social_wallet_fee
//! receiver credit   = total - platform_fee - social_wallet_fee
//! ```
//!
//! Each fee is rounded independently, so the split can drift from `total`
//! by a coin on some inputs. Reconciliation downstream depends on this
//! exact arithmetic; do not rebalance the rounding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ledger::{credit_in, debit_in, EntryParams, WalletLedger};
use super::wallet::TransactionType;
use super::LedgerError;

/// Share of gift volume retained by the Social Wallet platform.
pub const SOCIAL_WALLET_FEE_RATE: f64 = 0.015;

/// Platform revenue share applied when the platform record is absent.
pub const DEFAULT_REVENUE_SHARE: f64 = 0.10;

/// Gift quantity bounds per send.
pub const MIN_GIFT_QUANTITY: i64 = 1;
pub const MAX_GIFT_QUANTITY: i64 = 100;

/// External reference tag on gift ledger entries.
const GIFT_REF_TYPE: &str = "gift";

// =============================================================================
// Records
// =============================================================================

/// A gift catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Gift {
    /// Unique gift identifier (UUID).
    pub gift_id: String,
    /// Display name.
    pub name: String,
    /// Unit price in coins.
    pub price: i64,
    /// Inactive gifts cannot be sent.
    pub active: bool,
    /// When set, the gift can only be sent through this platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<String>,
    /// Whether stock is capped.
    pub limited: bool,
    /// Total units available for a limited gift.
    pub quantity_cap: i64,
    /// Units sold so far (only meaningful for limited gifts).
    pub sold_count: i64,
    /// When the gift was added to the catalog.
    pub created_at: DateTime<Utc>,
}

impl Gift {
    /// Remaining stock for a limited gift.
    pub fn remaining(&self) -> i64 {
        self.quantity_cap - self.sold_count
    }
}

/// Append-only audit row for a completed gift send.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GiftTransaction {
    /// Unique identifier, shared as the ref id of both ledger entries.
    pub id: String,
    /// Gift that was sent.
    pub gift_id: String,
    /// Sending user.
    pub sender_id: String,
    /// Receiving user.
    pub receiver_id: String,
    /// Platform the send went through.
    pub platform_id: String,
    /// Number of units sent.
    pub quantity: i64,
    /// Unit price x quantity.
    pub total: i64,
    /// Coins owed to the platform.
    pub platform_fee: i64,
    /// Coins retained by Social Wallet.
    pub social_wallet_fee: i64,
    /// Coins credited to the receiver.
    pub receiver_amount: i64,
    /// When the send completed.
    pub created_at: DateTime<Utc>,
}

/// Result of a completed gift send.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GiftReceipt {
    /// Audit row id.
    pub gift_tx_id: String,
    /// Unit price x quantity.
    pub total: i64,
    /// Coins owed to the platform.
    pub platform_fee: i64,
    /// Coins retained by Social Wallet.
    pub social_wallet_fee: i64,
    /// Coins credited to the receiver.
    pub receiver_amount: i64,
    /// Sender balance after the debit.
    pub sender_balance: i64,
}

// =============================================================================
// Gift Send Flow
// =============================================================================

impl WalletLedger {
    /// Send `quantity` units of a gift from one user to another through a
    /// platform.
    ///
    /// Fails before any write on a bad recipient, quantity, catalog state,
    /// platform exclusivity, or stock; the sender's balance check runs in
    /// the same transaction as all four writes.
    pub fn send_gift(
        &self,
        sender_id: &str,
        receiver_id: &str,
        gift_id: &str,
        platform_id: &str,
        quantity: i64,
    ) -> Result<GiftReceipt, LedgerError> {
        if sender_id == receiver_id {
            return Err(LedgerError::InvalidRecipient);
        }
        if !(MIN_GIFT_QUANTITY..=MAX_GIFT_QUANTITY).contains(&quantity) {
            return Err(LedgerError::InvalidQuantity);
        }

        let now = Utc::now();
        let gift_tx_id = Uuid::new_v4().to_string();

        self.db.run_write(|w| {
            let mut gift = w.get_gift(gift_id)?.ok_or(LedgerError::GiftNotFound)?;
            if !gift.active {
                return Err(LedgerError::GiftNotFound);
            }
            if let Some(ref exclusive_to) = gift.platform_id {
                if exclusive_to != platform_id {
                    return Err(LedgerError::GiftNotAvailable);
                }
            }
            if gift.limited && gift.remaining() < quantity {
                return Err(LedgerError::InsufficientQuantity {
                    requested: quantity,
                    remaining: gift.remaining(),
                });
            }

            let revenue_share = w
                .get_client(platform_id)?
                .map_or(DEFAULT_REVENUE_SHARE, |client| client.revenue_share);

            let total = gift.price * quantity;
            let platform_fee = (total as f64 * revenue_share).round() as i64;
            let social_wallet_fee = (total as f64 * SOCIAL_WALLET_FEE_RATE).round() as i64;
            let receiver_amount = total - platform_fee - social_wallet_fee;

            let description = format!("Gift: {} x{}", gift.name, quantity);
            let metadata = serde_json::json!({
                "gift_id": gift.gift_id,
                "quantity": quantity,
            });

            let sender_balance = debit_in(
                w,
                sender_id,
                total + social_wallet_fee,
                EntryParams::new(TransactionType::GiftSent, &description)
                    .with_ref(GIFT_REF_TYPE, &gift_tx_id)
                    .with_metadata(metadata.clone()),
                now,
            )?;
            credit_in(
                w,
                receiver_id,
                receiver_amount,
                EntryParams::new(TransactionType::GiftReceived, &description)
                    .with_ref(GIFT_REF_TYPE, &gift_tx_id)
                    .with_metadata(metadata),
                now,
            )?;

            if gift.limited {
                gift.sold_count += quantity;
                w.put_gift(&gift)?;
            }

            w.put_gift_tx(&GiftTransaction {
                id: gift_tx_id.clone(),
                gift_id: gift.gift_id.clone(),
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                platform_id: platform_id.to_string(),
                quantity,
                total,
                platform_fee,
                social_wallet_fee,
                receiver_amount,
                created_at: now,
            })?;

            Ok(GiftReceipt {
                gift_tx_id: gift_tx_id.clone(),
                total,
                platform_fee,
                social_wallet_fee,
                receiver_amount,
                sender_balance,
            })
        })
    }

    /// Add a gift to the catalog.
    pub fn create_gift(
        &self,
        name: &str,
        price: i64,
        platform_id: Option<&str>,
        limited: bool,
        quantity_cap: i64,
    ) -> Result<Gift, LedgerError> {
        if price <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let gift = Gift {
            gift_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price,
            active: true,
            platform_id: platform_id.map(str::to_string),
            limited,
            quantity_cap: if limited { quantity_cap } else { 0 },
            sold_count: 0,
            created_at: Utc::now(),
        };
        self.db.run_write(|w| {
            w.put_gift(&gift)?;
            Ok::<_, LedgerError>(())
        })?;
        Ok(gift)
    }

    /// Active gifts in the catalog.
    pub fn list_active_gifts(&self) -> Result<Vec<Gift>, LedgerError> {
        let mut gifts: Vec<Gift> = self
            .db
            .list_gifts()?
            .into_iter()
            .filter(|gift| gift.active)
            .collect();
        gifts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(gifts)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SocialWalletDb;
    use std::sync::Arc;

    fn test_ledger() -> (WalletLedger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = SocialWalletDb::open(&dir.path().join("test.redb")).unwrap();
        (WalletLedger::new(Arc::new(db)), dir)
    }

    fn fund(ledger: &WalletLedger, user: &str, amount: i64) {
        ledger
            .credit(user, amount, EntryParams::new(TransactionType::Deposit, "seed"))
            .unwrap();
    }

    #[test]
    fn gift_send_applies_the_spec_fee_split() {
        let (ledger, _dir) = test_ledger();
        fund(&ledger, "sender", 1000);
        let gift = ledger.create_gift("Rose", 100, None, false, 0).unwrap();

        // price 100, quantity 2, default 10% share:
        // total=200, social_wallet_fee=round(200*0.015)=3,
        // platform_fee=round(200*0.10)=20, receiver=200-20-3=177
        let receipt = ledger
            .send_gift("sender", "receiver", &gift.gift_id, "platform-1", 2)
            .unwrap();
        assert_eq!(receipt.total, 200);
        assert_eq!(receipt.social_wallet_fee, 3);
        assert_eq!(receipt.platform_fee, 20);
        assert_eq!(receipt.receiver_amount, 177);
        assert_eq!(receipt.sender_balance, 1000 - 203);

        assert_eq!(ledger.get_balance("receiver").unwrap().balance, 177);

        // Audit row matches the receipt and links both ledger entries
        let audit = ledger
            .db
            .get_gift_tx(&receipt.gift_tx_id)
            .unwrap()
            .unwrap();
        assert_eq!(audit.total, 200);
        assert_eq!(audit.platform_id, "platform-1");
        let sender_txs = ledger.list_transactions("sender", 10).unwrap();
        let receiver_txs = ledger.list_transactions("receiver", 10).unwrap();
        assert_eq!(sender_txs[0].ref_id.as_deref(), Some(receipt.gift_tx_id.as_str()));
        assert_eq!(receiver_txs[0].ref_id.as_deref(), Some(receipt.gift_tx_id.as_str()));
        let metadata = sender_txs[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["quantity"], 2);
    }

    #[test]
    fn gift_to_self_is_rejected() {
        let (ledger, _dir) = test_ledger();
        let gift = ledger.create_gift("Rose", 10, None, false, 0).unwrap();
        assert!(matches!(
            ledger.send_gift("user", "user", &gift.gift_id, "p", 1),
            Err(LedgerError::InvalidRecipient)
        ));
    }

    #[test]
    fn quantity_bounds_are_enforced() {
        let (ledger, _dir) = test_ledger();
        let gift = ledger.create_gift("Rose", 10, None, false, 0).unwrap();
        for quantity in [0, -1, 101] {
            assert!(matches!(
                ledger.send_gift("a", "b", &gift.gift_id, "p", quantity),
                Err(LedgerError::InvalidQuantity)
            ));
        }
    }

    #[test]
    fn missing_or_inactive_gift_is_not_found() {
        let (ledger, _dir) = test_ledger();
        fund(&ledger, "a", 100);
        assert!(matches!(
            ledger.send_gift("a", "b", "missing", "p", 1),
            Err(LedgerError::GiftNotFound)
        ));

        let mut gift = ledger.create_gift("Rose", 10, None, false, 0).unwrap();
        gift.active = false;
        ledger
            .db
            .run_write(|w| {
                w.put_gift(&gift)?;
                Ok::<_, LedgerError>(())
            })
            .unwrap();
        assert!(matches!(
            ledger.send_gift("a", "b", &gift.gift_id, "p", 1),
            Err(LedgerError::GiftNotFound)
        ));
    }

    #[test]
    fn platform_exclusive_gift_rejects_other_platforms() {
        let (ledger, _dir) = test_ledger();
        fund(&ledger, "a", 1000);
        let gift = ledger
            .create_gift("VIP Badge", 50, Some("platform-1"), false, 0)
            .unwrap();

        assert!(matches!(
            ledger.send_gift("a", "b", &gift.gift_id, "platform-2", 1),
            Err(LedgerError::GiftNotAvailable)
        ));
        // The owning platform works
        assert!(ledger
            .send_gift("a", "b", &gift.gift_id, "platform-1", 1)
            .is_ok());
    }

    #[test]
    fn limited_gift_stock_is_enforced_and_decremented() {
        let (ledger, _dir) = test_ledger();
        fund(&ledger, "a", 10_000);
        let gift = ledger.create_gift("Trophy", 10, None, true, 5).unwrap();

        let err = ledger
            .send_gift("a", "b", &gift.gift_id, "p", 6)
            .unwrap_err();
        match err {
            LedgerError::InsufficientQuantity {
                requested,
                remaining,
            } => {
                assert_eq!(requested, 6);
                assert_eq!(remaining, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The rejected send wrote nothing
        assert!(ledger.list_transactions("a", 10).unwrap().len() == 1);
        assert_eq!(ledger.db.get_gift(&gift.gift_id).unwrap().unwrap().sold_count, 0);

        // Selling down the stock
        ledger.send_gift("a", "b", &gift.gift_id, "p", 3).unwrap();
        ledger.send_gift("a", "b", &gift.gift_id, "p", 2).unwrap();
        assert_eq!(ledger.db.get_gift(&gift.gift_id).unwrap().unwrap().sold_count, 5);
        assert!(matches!(
            ledger.send_gift("a", "b", &gift.gift_id, "p", 1),
            Err(LedgerError::InsufficientQuantity { .. })
        ));
    }

    #[test]
    fn insufficient_sender_balance_rolls_back_everything() {
        let (ledger, _dir) = test_ledger();
        fund(&ledger, "a", 100);
        fund(&ledger, "b", 10);
        let gift = ledger.create_gift("Trophy", 100, None, true, 5).unwrap();

        // debit would be 100*2 + fee > 100
        let err = ledger
            .send_gift("a", "b", &gift.gift_id, "p", 2)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        assert_eq!(ledger.get_balance("a").unwrap().balance, 100);
        assert_eq!(ledger.get_balance("b").unwrap().balance, 10);
        assert_eq!(ledger.db.get_gift(&gift.gift_id).unwrap().unwrap().sold_count, 0);
    }

    #[test]
    fn registered_platform_revenue_share_is_used() {
        let (ledger, _dir) = test_ledger();
        fund(&ledger, "a", 1000);
        let gift = ledger.create_gift("Rose", 100, None, false, 0).unwrap();

        // Register a platform with a 20% share
        let client = crate::oauth::models::Client {
            client_id: "platform-x".to_string(),
            name: "Platform X".to_string(),
            secret_hash: crate::oauth::models::hash_secret("s"),
            redirect_uris: vec![],
            active: true,
            revenue_share: 0.20,
            subscription_active: true,
            created_at: Utc::now(),
        };
        ledger
            .db
            .run_write(|w| {
                w.put_client(&client)?;
                Ok::<_, LedgerError>(())
            })
            .unwrap();

        let receipt = ledger
            .send_gift("a", "b", &gift.gift_id, "platform-x", 1)
            .unwrap();
        assert_eq!(receipt.platform_fee, 20); // round(100 * 0.20)
        assert_eq!(receipt.social_wallet_fee, 2); // round(100 * 0.015)
        assert_eq!(receipt.receiver_amount, 78);
    }
}
