// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Embedded application database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `clients`: client_id → serialized Client
//! - `auth_codes`: code → serialized AuthorizationCode
//! - `access_tokens`: token → serialized AccessToken
//! - `refresh_index`: refresh_token → token (secondary index)
//! - `wallets`: user_id → serialized Wallet
//! - `wallet_txs`: composite key (user_id|!seq) → serialized WalletTransaction
//! - `gifts`: gift_id → serialized Gift
//! - `gift_txs`: gift_tx_id → serialized GiftTransaction
//! - `payments`: external_payment_id → serialized Payment
//!
//! ## Unit of Work
//!
//! Every composite operation (code exchange, debit, transfer, gift send,
//! webhook credit) runs inside [`SocialWalletDb::run_write`]: the closure
//! receives a [`StoreWriter`] bound to one write transaction, which commits
//! only when the closure returns `Ok`. Returning `Err` drops the
//! transaction and aborts every write in it. redb admits one write
//! transaction at a time, so read-modify-write sequences against a wallet
//! can never interleave with another writer.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

use crate::ledger::gifts::{Gift, GiftTransaction};
use crate::ledger::payments::Payment;
use crate::ledger::wallet::{Wallet, WalletTransaction};
use crate::oauth::models::{AccessToken, AuthorizationCode, Client};

// =============================================================================
// Table Definitions
// =============================================================================

/// Registered third-party platforms: client_id → Client (JSON bytes).
const CLIENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("clients");

/// One-time authorization grants: code → AuthorizationCode.
const AUTH_CODES: TableDefinition<&str, &[u8]> = TableDefinition::new("auth_codes");

/// Live token records: token → AccessToken.
const ACCESS_TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("access_tokens");

/// Secondary index: refresh_token → token.
const REFRESH_INDEX: TableDefinition<&str, &str> = TableDefinition::new("refresh_index");

/// Coin wallets: user_id → Wallet.
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Append-only ledger: composite key (user_id|!seq_be) → WalletTransaction.
/// The inverted sequence yields newest-first ordering on forward scans.
const WALLET_TXS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("wallet_txs");

/// Gift catalog: gift_id → Gift.
const GIFTS: TableDefinition<&str, &[u8]> = TableDefinition::new("gifts");

/// Gift audit rows: gift_tx_id → GiftTransaction.
const GIFT_TXS: TableDefinition<&str, &[u8]> = TableDefinition::new("gift_txs");

/// Coin top-up records: external_payment_id → Payment.
const PAYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Ledger Index Keys
// =============================================================================

/// Build a composite key for the wallet_txs table.
///
/// Format: `user_id | inverted_seq_be_bytes`
///
/// Sequence numbers are assigned per wallet under the write lock, so the
/// inverted big-endian encoding makes forward range scans newest-first.
fn make_ledger_key(user_id: &str, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1 + 8);
    key.extend_from_slice(user_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!seq).to_be_bytes());
    key
}

/// Build a prefix key for range scanning all ledger entries of a wallet.
fn make_ledger_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(user_id.len() + 1);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a ledger range scan.
fn make_ledger_prefix_end(user_id: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(user_id.len() + 1 + 9);
    end.extend_from_slice(user_id.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 9]);
    end
}

// =============================================================================
// SocialWalletDb
// =============================================================================

/// Embedded ACID application database.
pub struct SocialWalletDb {
    db: Database,
}

impl SocialWalletDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CLIENTS)?;
            let _ = write_txn.open_table(AUTH_CODES)?;
            let _ = write_txn.open_table(ACCESS_TOKENS)?;
            let _ = write_txn.open_table(REFRESH_INDEX)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_TXS)?;
            let _ = write_txn.open_table(GIFTS)?;
            let _ = write_txn.open_table(GIFT_TXS)?;
            let _ = write_txn.open_table(PAYMENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run a closure inside one write transaction.
    ///
    /// Commits when the closure returns `Ok`; any `Err` drops the
    /// transaction and rolls back every write made through the
    /// [`StoreWriter`]. This is the only way mutating code touches the
    /// store, so an operation either applies fully or not at all.
    pub fn run_write<T, E>(&self, f: impl FnOnce(&StoreWriter<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self
            .db
            .begin_write()
            .map_err(StoreError::from)
            .map_err(E::from)?;
        let writer = StoreWriter { txn: &txn };
        let out = f(&writer)?;
        txn.commit().map_err(StoreError::from).map_err(E::from)?;
        Ok(out)
    }

    // =========================================================================
    // Read Paths (MVCC snapshots)
    // =========================================================================

    /// Look up a client by id.
    pub fn get_client(&self, client_id: &str) -> StoreResult<Option<Client>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;
        read_value(&table, client_id)
    }

    /// Look up an authorization code by value.
    pub fn get_auth_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTH_CODES)?;
        read_value(&table, code)
    }

    /// Look up an access token by value.
    pub fn get_access_token(&self, token: &str) -> StoreResult<Option<AccessToken>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_TOKENS)?;
        read_value(&table, token)
    }

    /// Look up a wallet by owning user.
    pub fn get_wallet(&self, user_id: &str) -> StoreResult<Option<Wallet>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        read_value(&table, user_id)
    }

    /// Newest-first page of a wallet's ledger entries.
    pub fn list_wallet_txs(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<WalletTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_TXS)?;

        let prefix = make_ledger_prefix(user_id);
        let prefix_end = make_ledger_prefix_end(user_id);

        let mut entries = Vec::new();
        for item in table.range(prefix.as_slice()..prefix_end.as_slice())? {
            if entries.len() >= limit {
                break;
            }
            let (_, value) = item?;
            let tx: WalletTransaction = serde_json::from_slice(value.value())?;
            entries.push(tx);
        }
        Ok(entries)
    }

    /// Look up a gift catalog entry.
    pub fn get_gift(&self, gift_id: &str) -> StoreResult<Option<Gift>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GIFTS)?;
        read_value(&table, gift_id)
    }

    /// List every gift in the catalog.
    pub fn list_gifts(&self) -> StoreResult<Vec<Gift>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GIFTS)?;

        let mut gifts = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            gifts.push(serde_json::from_slice(value.value())?);
        }
        Ok(gifts)
    }

    /// Look up a gift audit row by id.
    pub fn get_gift_tx(&self, gift_tx_id: &str) -> StoreResult<Option<GiftTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GIFT_TXS)?;
        read_value(&table, gift_tx_id)
    }

    /// Look up a payment record by external payment id.
    pub fn get_payment(&self, external_payment_id: &str) -> StoreResult<Option<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS)?;
        read_value(&table, external_payment_id)
    }
}

/// Deserialize one value out of a readable string-keyed table.
fn read_value<T, Tbl>(table: &Tbl, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

// =============================================================================
// StoreWriter
// =============================================================================

/// Typed access to the tables of one in-flight write transaction.
///
/// Reads made through the writer see the transaction's own uncommitted
/// writes, so precondition checks and the writes they guard are a single
/// serialized unit.
pub struct StoreWriter<'a> {
    txn: &'a WriteTransaction,
}

impl StoreWriter<'_> {
    fn put<T: Serialize>(
        &self,
        def: TableDefinition<&'static str, &'static [u8]>,
        key: &str,
        value: &T,
    ) -> StoreResult<()> {
        let json = serde_json::to_vec(value)?;
        let mut table = self.txn.open_table(def)?;
        table.insert(key, json.as_slice())?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&'static str, &'static [u8]>,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let table = self.txn.open_table(def)?;
        let bytes = match table.get(key)? {
            Some(value) => value.value().to_vec(),
            None => return Ok(None),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    // ===== Clients =====

    pub fn get_client(&self, client_id: &str) -> StoreResult<Option<Client>> {
        self.get(CLIENTS, client_id)
    }

    pub fn put_client(&self, client: &Client) -> StoreResult<()> {
        self.put(CLIENTS, &client.client_id, client)
    }

    // ===== Authorization Codes =====

    pub fn get_auth_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>> {
        self.get(AUTH_CODES, code)
    }

    pub fn put_auth_code(&self, code: &AuthorizationCode) -> StoreResult<()> {
        self.put(AUTH_CODES, &code.code, code)
    }

    // ===== Access Tokens =====

    pub fn get_access_token(&self, token: &str) -> StoreResult<Option<AccessToken>> {
        self.get(ACCESS_TOKENS, token)
    }

    /// Insert a token record and its refresh index row.
    pub fn put_access_token(&self, token: &AccessToken) -> StoreResult<()> {
        self.put(ACCESS_TOKENS, &token.token, token)?;
        let mut index = self.txn.open_table(REFRESH_INDEX)?;
        index.insert(token.refresh_token.as_str(), token.token.as_str())?;
        Ok(())
    }

    /// Remove a token record and its refresh index row. No-op when absent.
    pub fn delete_access_token(&self, token_value: &str) -> StoreResult<()> {
        let record: Option<AccessToken> = self.get(ACCESS_TOKENS, token_value)?;
        let Some(record) = record else {
            return Ok(());
        };

        {
            let mut table = self.txn.open_table(ACCESS_TOKENS)?;
            table.remove(token_value)?;
        }
        let mut index = self.txn.open_table(REFRESH_INDEX)?;
        index.remove(record.refresh_token.as_str())?;
        Ok(())
    }

    /// Resolve a refresh token to its token record.
    pub fn find_token_by_refresh(&self, refresh_token: &str) -> StoreResult<Option<AccessToken>> {
        let token_value = {
            let index = self.txn.open_table(REFRESH_INDEX)?;
            let token_value = match index.get(refresh_token)? {
                Some(value) => value.value().to_string(),
                None => return Ok(None),
            };
            token_value
        };
        self.get(ACCESS_TOKENS, &token_value)
    }

    // ===== Wallets & Ledger =====

    pub fn get_wallet(&self, user_id: &str) -> StoreResult<Option<Wallet>> {
        self.get(WALLETS, user_id)
    }

    pub fn put_wallet(&self, wallet: &Wallet) -> StoreResult<()> {
        self.put(WALLETS, &wallet.user_id, wallet)
    }

    /// Append one ledger entry at the given wallet sequence number.
    pub fn append_wallet_tx(&self, seq: u64, tx: &WalletTransaction) -> StoreResult<()> {
        let json = serde_json::to_vec(tx)?;
        let key = make_ledger_key(&tx.user_id, seq);
        let mut table = self.txn.open_table(WALLET_TXS)?;
        table.insert(key.as_slice(), json.as_slice())?;
        Ok(())
    }

    // ===== Gifts =====

    pub fn get_gift(&self, gift_id: &str) -> StoreResult<Option<Gift>> {
        self.get(GIFTS, gift_id)
    }

    pub fn put_gift(&self, gift: &Gift) -> StoreResult<()> {
        self.put(GIFTS, &gift.gift_id, gift)
    }

    pub fn put_gift_tx(&self, gift_tx: &GiftTransaction) -> StoreResult<()> {
        self.put(GIFT_TXS, &gift_tx.id, gift_tx)
    }

    // ===== Payments =====

    pub fn get_payment(&self, external_payment_id: &str) -> StoreResult<Option<Payment>> {
        self.get(PAYMENTS, external_payment_id)
    }

    pub fn put_payment(&self, payment: &Payment) -> StoreResult<()> {
        self.put(PAYMENTS, &payment.external_payment_id, payment)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::wallet::TransactionType;
    use chrono::Utc;

    fn temp_db() -> (SocialWalletDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = SocialWalletDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn sample_tx(user_id: &str, seq: u64, amount: i64, balance_after: i64) -> WalletTransaction {
        WalletTransaction {
            id: format!("tx-{seq}"),
            user_id: user_id.to_string(),
            amount,
            tx_type: if amount >= 0 {
                TransactionType::Bonus
            } else {
                TransactionType::Penalty
            },
            balance_after,
            description: "test".to_string(),
            ref_type: None,
            ref_id: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn wallet_round_trip() {
        let (db, _dir) = temp_db();
        let wallet = Wallet::new("user-1", Utc::now());
        db.run_write::<_, StoreError>(|w| {
            w.put_wallet(&wallet)?;
            Ok(())
        })
        .unwrap();

        let loaded = db.get_wallet("user-1").unwrap().unwrap();
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.balance, 0);
        assert!(db.get_wallet("user-2").unwrap().is_none());
    }

    #[test]
    fn ledger_entries_list_newest_first() {
        let (db, _dir) = temp_db();
        db.run_write::<_, StoreError>(|w| {
            for seq in 0..5u64 {
                w.append_wallet_tx(seq, &sample_tx("user-1", seq, 10, (seq as i64 + 1) * 10))?;
            }
            Ok(())
        })
        .unwrap();

        let entries = db.list_wallet_txs("user-1", 10).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].id, "tx-4");
        assert_eq!(entries[4].id, "tx-0");

        let page = db.list_wallet_txs("user-1", 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "tx-4");
    }

    #[test]
    fn ledger_scans_do_not_cross_wallets() {
        let (db, _dir) = temp_db();
        db.run_write::<_, StoreError>(|w| {
            w.append_wallet_tx(0, &sample_tx("alice", 0, 5, 5))?;
            w.append_wallet_tx(0, &sample_tx("bob", 0, 7, 7))?;
            Ok(())
        })
        .unwrap();

        let alice = db.list_wallet_txs("alice", 10).unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].amount, 5);
    }

    #[test]
    fn failed_closure_rolls_back_all_writes() {
        let (db, _dir) = temp_db();
        let wallet = Wallet::new("user-1", Utc::now());

        let result: Result<(), StoreError> = db.run_write(|w| {
            w.put_wallet(&wallet)?;
            w.append_wallet_tx(0, &sample_tx("user-1", 0, 10, 10))?;
            let bad_json = serde_json::from_str::<i32>("not json").unwrap_err();
            Err(StoreError::Serde(bad_json))
        });
        assert!(result.is_err());

        // Neither write survived the abort
        assert!(db.get_wallet("user-1").unwrap().is_none());
        assert!(db.list_wallet_txs("user-1", 10).unwrap().is_empty());
    }

    #[test]
    fn refresh_index_follows_token_lifecycle() {
        let (db, _dir) = temp_db();
        let now = Utc::now();
        let token = AccessToken {
            token: "tok-1".to_string(),
            refresh_token: "ref-1".to_string(),
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            scopes: Default::default(),
            expires_at: now,
            created_at: now,
        };

        db.run_write::<_, StoreError>(|w| {
            w.put_access_token(&token)?;
            Ok(())
        })
        .unwrap();

        db.run_write::<_, StoreError>(|w| {
            let found = w.find_token_by_refresh("ref-1")?.unwrap();
            assert_eq!(found.token, "tok-1");
            w.delete_access_token("tok-1")?;
            assert!(w.find_token_by_refresh("ref-1")?.is_none());
            // Idempotent: deleting again is a no-op
            w.delete_access_token("tok-1")?;
            Ok(())
        })
        .unwrap();

        assert!(db.get_access_token("tok-1").unwrap().is_none());
    }

    #[test]
    fn writer_sees_its_own_writes() {
        let (db, _dir) = temp_db();
        db.run_write::<_, StoreError>(|w| {
            let wallet = Wallet::new("user-1", Utc::now());
            w.put_wallet(&wallet)?;
            let loaded = w.get_wallet("user-1")?.unwrap();
            assert_eq!(loaded.user_id, "user-1");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn make_ledger_key_ordering() {
        // Higher sequence numbers should produce smaller composite keys
        let key_old = make_ledger_key("user", 1);
        let key_new = make_ledger_key("user", 2);
        assert!(key_new < key_old, "Newer entries should sort first");
    }
}
