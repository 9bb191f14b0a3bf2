// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! # Wallet Ledger
//!
//! Per-user integer coin balances with an append-only transaction ledger.
//!
//! ## Invariants
//!
//! - A wallet's balance always equals the sum of its ledger amounts.
//! - Balances never go negative; a rejected debit writes nothing.
//! - Composite flows (transfer, gift send, webhook credit) commit all of
//!   their writes in one store transaction or none of them.

pub mod gifts;
pub mod ledger;
pub mod payments;
pub mod wallet;

pub use gifts::{Gift, GiftReceipt, GiftTransaction};
pub use ledger::{EntryParams, TransferReceipt, WalletLedger};
pub use payments::{Payment, PaymentEvent, PaymentOutcome, PaymentStatus};
pub use wallet::{BalanceSummary, TransactionType, Wallet, WalletTransaction};

use crate::storage::StoreError;

/// Ledger failure taxonomy.
///
/// Every variant is raised before the enclosing store transaction commits,
/// so a failed operation has zero side effects.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Credit/debit amounts must be strictly positive.
    #[error("amount must be a positive number of coins")]
    InvalidAmount,

    /// Debits and lock flips require an existing wallet.
    #[error("wallet not found for user {0}")]
    WalletNotFound(String),

    /// The wallet's locked flag blocks debits.
    #[error("wallet is locked")]
    WalletLocked,

    /// Balance does not cover the requested debit.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// Transfers between a wallet and itself are meaningless.
    #[error("cannot transfer coins to the same wallet")]
    InvalidTransfer,

    /// Gifts cannot be sent to oneself.
    #[error("cannot send a gift to yourself")]
    InvalidRecipient,

    /// Gift quantity out of the allowed [1, 100] range.
    #[error("gift quantity must be between 1 and 100")]
    InvalidQuantity,

    /// Unknown or inactive gift.
    #[error("gift not found")]
    GiftNotFound,

    /// Gift is exclusive to a different platform.
    #[error("gift is not available on this platform")]
    GiftNotAvailable,

    /// Limited gift stock does not cover the requested quantity.
    #[error("insufficient gift stock: requested {requested}, remaining {remaining}")]
    InsufficientQuantity { requested: i64, remaining: i64 },

    /// Store-level failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
