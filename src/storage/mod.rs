// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! # Storage Module
//!
//! Persistent storage on an embedded redb database. All records are
//! serialized as JSON bytes; code/token/payment uniqueness falls out of
//! the tables being keyed by those values.
//!
//! See [`db::SocialWalletDb`] for the table layout and the unit-of-work
//! contract.

pub mod db;

pub use db::{SocialWalletDb, StoreError, StoreResult, StoreWriter};
