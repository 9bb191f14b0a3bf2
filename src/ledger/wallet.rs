// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Wallet and ledger entry records.
//!
//! A wallet's balance is derived state: at all times it equals the sum of
//! the signed amounts of its transaction history. [`WalletTransaction`]
//! rows are append-only and never mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-user coin wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    /// Owning user (unique, table key).
    pub user_id: String,
    /// Current balance in coins. Never negative.
    pub balance: i64,
    /// Cumulative coins ever credited.
    pub lifetime_earned: i64,
    /// Cumulative coins ever debited.
    pub lifetime_spent: i64,
    /// Locked wallets reject debits (credits still apply).
    pub locked: bool,
    /// Monotonic ledger sequence, one per appended transaction.
    pub tx_count: u64,
    /// When the wallet was lazily created.
    pub created_at: DateTime<Utc>,
    /// When the wallet was last written.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// A fresh zero-balance wallet for `user_id`.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            balance: 0,
            lifetime_earned: 0,
            lifetime_spent: 0,
            locked: false,
            tx_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ledger entry type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Coin purchase credited from a completed payment.
    Deposit,
    /// Debit side of a gift send.
    GiftSent,
    /// Credit side of a gift send.
    GiftReceived,
    /// Promotional or administrative credit.
    Bonus,
    /// Reversal credit.
    Refund,
    /// Coins paid out of the system.
    Withdrawal,
    /// Administrative debit.
    Penalty,
    /// Credit side of a wallet-to-wallet transfer.
    TransferIn,
    /// Debit side of a wallet-to-wallet transfer.
    TransferOut,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            TransactionType::Deposit => "deposit",
            TransactionType::GiftSent => "gift_sent",
            TransactionType::GiftReceived => "gift_received",
            TransactionType::Bonus => "bonus",
            TransactionType::Refund => "refund",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Penalty => "penalty",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
        };
        write!(f, "{tag}")
    }
}

/// Append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTransaction {
    /// Unique entry ID.
    pub id: String,
    /// Wallet this entry belongs to.
    pub user_id: String,
    /// Signed amount: positive for credits, negative for debits.
    pub amount: i64,
    /// Entry type tag.
    pub tx_type: TransactionType,
    /// Balance immediately after applying this entry.
    pub balance_after: i64,
    /// Human-readable description.
    pub description: String,
    /// External reference type (e.g. "payment", "gift", "transfer").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    /// External reference ID linking this entry to an outside event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Free-form metadata attached by the originating flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

/// Balance summary returned to API clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceSummary {
    /// Owning user.
    pub user_id: String,
    /// Current balance in coins.
    pub balance: i64,
    /// Cumulative coins ever credited.
    pub lifetime_earned: i64,
    /// Cumulative coins ever debited.
    pub lifetime_spent: i64,
}

impl From<&Wallet> for BalanceSummary {
    fn from(wallet: &Wallet) -> Self {
        Self {
            user_id: wallet.user_id.clone(),
            balance: wallet.balance,
            lifetime_earned: wallet.lifetime_earned,
            lifetime_spent: wallet.lifetime_spent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wallet_starts_empty_and_unlocked() {
        let wallet = Wallet::new("user-1", Utc::now());
        assert_eq!(wallet.balance, 0);
        assert_eq!(wallet.lifetime_earned, 0);
        assert_eq!(wallet.lifetime_spent, 0);
        assert_eq!(wallet.tx_count, 0);
        assert!(!wallet.locked);
    }

    #[test]
    fn transaction_type_wire_tags() {
        assert_eq!(TransactionType::GiftSent.to_string(), "gift_sent");
        assert_eq!(
            serde_json::to_string(&TransactionType::TransferOut).unwrap(),
            "\"transfer_out\""
        );
    }

    #[test]
    fn balance_summary_from_wallet() {
        let mut wallet = Wallet::new("user-1", Utc::now());
        wallet.balance = 42;
        wallet.lifetime_earned = 100;
        wallet.lifetime_spent = 58;
        let summary = BalanceSummary::from(&wallet);
        assert_eq!(summary.balance, 42);
        assert_eq!(summary.lifetime_earned, 100);
        assert_eq!(summary.lifetime_spent, 58);
    }
}
