// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Shared application state.
//!
//! The store handle is opened once in main and injected into every
//! component constructor; there is no module-level mutable state.

use std::sync::Arc;

use crate::api::rate_limit::FixedWindowLimiter;
use crate::auth::JwksManager;
use crate::ledger::WalletLedger;
use crate::oauth::broker::AuthorizationBroker;
use crate::storage::SocialWalletDb;

/// User JWT verification configuration.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// JWKS manager; `None` enables development mode (no signature check).
    pub jwks: Option<JwksManager>,
    /// Expected `iss` claim.
    pub issuer: Option<String>,
    /// Expected `aud` claim.
    pub audience: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SocialWalletDb>,
    pub broker: AuthorizationBroker,
    pub ledger: WalletLedger,
    pub auth_config: AuthConfig,
    /// HMAC secret for payment webhook signatures. `None` rejects all
    /// webhook deliveries.
    pub webhook_secret: Option<String>,
    /// Per-client limiter guarding the token endpoint.
    pub token_limiter: FixedWindowLimiter,
}

impl AppState {
    pub fn new(db: Arc<SocialWalletDb>) -> Self {
        Self {
            broker: AuthorizationBroker::new(db.clone()),
            ledger: WalletLedger::new(db.clone()),
            db,
            auth_config: AuthConfig::default(),
            webhook_secret: None,
            token_limiter: FixedWindowLimiter::default(),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_components_share_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(SocialWalletDb::open(&dir.path().join("test.redb")).unwrap());
        let state = AppState::new(db);

        // A wallet credited through the ledger is visible via the shared db
        state
            .ledger
            .credit(
                "user-1",
                10,
                crate::ledger::EntryParams::new(crate::ledger::TransactionType::Bonus, "t"),
            )
            .unwrap();
        assert!(state.db.get_wallet("user-1").unwrap().is_some());
    }
}
