// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Coin ledger operations.
//!
//! Every mutating operation runs inside one store write transaction: the
//! balance check and the balance write can never be separated by another
//! writer, and a failed operation leaves no partial effects. Composite
//! flows (transfer, gift send, webhook credit) reuse [`credit_in`] and
//! [`debit_in`] so all their ledger movements share a single transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::storage::{SocialWalletDb, StoreWriter};

use super::wallet::{BalanceSummary, TransactionType, Wallet, WalletTransaction};
use super::LedgerError;

/// External reference tag shared by both sides of a transfer.
const TRANSFER_REF_TYPE: &str = "transfer";

/// Wallet ledger service.
///
/// Holds an injected store handle; no global state.
#[derive(Clone)]
pub struct WalletLedger {
    pub(crate) db: Arc<SocialWalletDb>,
}

impl WalletLedger {
    pub fn new(db: Arc<SocialWalletDb>) -> Self {
        Self { db }
    }

    /// Current balance, lazily creating a zero wallet on first query.
    pub fn get_balance(&self, user_id: &str) -> Result<BalanceSummary, LedgerError> {
        if let Some(wallet) = self.db.get_wallet(user_id)? {
            return Ok(BalanceSummary::from(&wallet));
        }

        self.db.run_write(|w| {
            // Re-check inside the write transaction: another request may
            // have created the wallet between the read and here.
            if let Some(wallet) = w.get_wallet(user_id)? {
                return Ok(BalanceSummary::from(&wallet));
            }
            let wallet = Wallet::new(user_id, Utc::now());
            w.put_wallet(&wallet)?;
            Ok(BalanceSummary::from(&wallet))
        })
    }

    /// Credit coins to a wallet, creating it if absent. Returns the new
    /// balance.
    pub fn credit(
        &self,
        user_id: &str,
        amount: i64,
        entry: EntryParams<'_>,
    ) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.db
            .run_write(|w| credit_in(w, user_id, amount, entry, Utc::now()))
    }

    /// Debit coins from a wallet. Returns the new balance.
    pub fn debit(
        &self,
        user_id: &str,
        amount: i64,
        entry: EntryParams<'_>,
    ) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.db
            .run_write(|w| debit_in(w, user_id, amount, entry, Utc::now()))
    }

    /// Move coins between two wallets atomically.
    ///
    /// Both movements commit together or not at all; the pair is linked by
    /// a shared transfer reference id so the ledger can reconstruct the
    /// transfer from either side.
    pub fn transfer(
        &self,
        from_user: &str,
        to_user: &str,
        amount: i64,
        description: &str,
    ) -> Result<TransferReceipt, LedgerError> {
        if from_user == to_user {
            return Err(LedgerError::InvalidTransfer);
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let transfer_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.db.run_write(|w| {
            let from_balance = debit_in(
                w,
                from_user,
                amount,
                EntryParams::new(TransactionType::TransferOut, description)
                    .with_ref(TRANSFER_REF_TYPE, &transfer_id),
                now,
            )?;
            let to_balance = credit_in(
                w,
                to_user,
                amount,
                EntryParams::new(TransactionType::TransferIn, description)
                    .with_ref(TRANSFER_REF_TYPE, &transfer_id),
                now,
            )?;
            Ok(TransferReceipt {
                transfer_id: transfer_id.clone(),
                from_balance,
                to_balance,
            })
        })
    }

    /// Block future debits on a wallet. Credits still apply.
    pub fn lock(&self, user_id: &str) -> Result<(), LedgerError> {
        self.set_locked(user_id, true)
    }

    /// Re-enable debits on a wallet.
    pub fn unlock(&self, user_id: &str) -> Result<(), LedgerError> {
        self.set_locked(user_id, false)
    }

    fn set_locked(&self, user_id: &str, locked: bool) -> Result<(), LedgerError> {
        self.db.run_write(|w| {
            let mut wallet = w
                .get_wallet(user_id)?
                .ok_or_else(|| LedgerError::WalletNotFound(user_id.to_string()))?;
            wallet.locked = locked;
            wallet.updated_at = Utc::now();
            w.put_wallet(&wallet)?;
            Ok(())
        })
    }

    /// Newest-first page of a wallet's ledger history.
    pub fn list_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>, LedgerError> {
        Ok(self.db.list_wallet_txs(user_id, limit)?)
    }
}

/// Result of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// Shared reference id linking both ledger entries.
    pub transfer_id: String,
    /// Sender balance after the debit.
    pub from_balance: i64,
    /// Receiver balance after the credit.
    pub to_balance: i64,
}

/// How a ledger entry should be recorded: type tag, description, and
/// optional external reference and metadata.
#[derive(Debug, Clone)]
pub struct EntryParams<'a> {
    pub tx_type: TransactionType,
    pub description: &'a str,
    pub ref_type: Option<&'a str>,
    pub ref_id: Option<&'a str>,
    pub metadata: Option<serde_json::Value>,
}

impl<'a> EntryParams<'a> {
    pub fn new(tx_type: TransactionType, description: &'a str) -> Self {
        Self {
            tx_type,
            description,
            ref_type: None,
            ref_id: None,
            metadata: None,
        }
    }

    /// Link this entry to an outside event.
    pub fn with_ref(mut self, ref_type: &'a str, ref_id: &'a str) -> Self {
        self.ref_type = Some(ref_type);
        self.ref_id = Some(ref_id);
        self
    }

    /// Attach free-form metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// =============================================================================
// Transactional Primitives
// =============================================================================

/// Apply a credit inside an open write transaction.
///
/// Loads or creates the wallet, bumps balance and lifetime earned, and
/// appends the ledger entry. Returns the new balance.
pub(crate) fn credit_in(
    w: &StoreWriter<'_>,
    user_id: &str,
    amount: i64,
    entry: EntryParams<'_>,
    now: DateTime<Utc>,
) -> Result<i64, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let mut wallet = w
        .get_wallet(user_id)?
        .unwrap_or_else(|| Wallet::new(user_id, now));

    let new_balance = wallet.balance + amount;
    let seq = wallet.tx_count;
    wallet.balance = new_balance;
    wallet.lifetime_earned += amount;
    wallet.tx_count += 1;
    wallet.updated_at = now;
    w.put_wallet(&wallet)?;

    w.append_wallet_tx(seq, &make_entry(user_id, amount, new_balance, entry, now))?;

    Ok(new_balance)
}

/// Apply a debit inside an open write transaction.
///
/// The wallet must exist, be unlocked, and cover the amount; the checks
/// and the write share the transaction, so no other writer can interleave.
/// Returns the new balance.
pub(crate) fn debit_in(
    w: &StoreWriter<'_>,
    user_id: &str,
    amount: i64,
    entry: EntryParams<'_>,
    now: DateTime<Utc>,
) -> Result<i64, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let mut wallet = w
        .get_wallet(user_id)?
        .ok_or_else(|| LedgerError::WalletNotFound(user_id.to_string()))?;

    if wallet.locked {
        return Err(LedgerError::WalletLocked);
    }
    if wallet.balance < amount {
        return Err(LedgerError::InsufficientBalance {
            required: amount,
            available: wallet.balance,
        });
    }

    let new_balance = wallet.balance - amount;
    let seq = wallet.tx_count;
    wallet.balance = new_balance;
    wallet.lifetime_spent += amount;
    wallet.tx_count += 1;
    wallet.updated_at = now;
    w.put_wallet(&wallet)?;

    w.append_wallet_tx(seq, &make_entry(user_id, -amount, new_balance, entry, now))?;

    Ok(new_balance)
}

fn make_entry(
    user_id: &str,
    signed_amount: i64,
    balance_after: i64,
    entry: EntryParams<'_>,
    now: DateTime<Utc>,
) -> WalletTransaction {
    WalletTransaction {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        amount: signed_amount,
        tx_type: entry.tx_type,
        balance_after,
        description: entry.description.to_string(),
        ref_type: entry.ref_type.map(str::to_string),
        ref_id: entry.ref_id.map(str::to_string),
        metadata: entry.metadata,
        created_at: now,
    }
}

// =============================================================================
// Tests
// =============================================================================
