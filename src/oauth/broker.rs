// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! OAuth2-style authorization broker.
//!
//! Implements the authorization-code grant against the embedded store:
//! codes are single-use and expire after 10 minutes; token pairs expire
//! after 1 hour and rotate on refresh. Marking a code used and issuing its
//! token happen in one store transaction, so a crash can never leave a
//! consumed code without a token or a token behind a live code.
//!
//! The client_id and redirect_uri presented at exchange must match what
//! was recorded at issuance byte-for-byte. This is an anti-substitution
//! check, not a convenience default.

use std::sync::Arc;

use chrono::Utc;
use ring::rand::SystemRandom;
use url::Url;
use uuid::Uuid;

use crate::storage::{SocialWalletDb, StoreError};

use super::models::{
    access_token_expiry, auth_code_expiry, hash_secret, mint_token_value, AccessToken,
    AuthorizationCode, Client,
};
use super::scopes::ScopeSet;

/// Default platform revenue share for newly registered clients.
pub const DEFAULT_CLIENT_REVENUE_SHARE: f64 = 0.10;

/// Authorization broker failure taxonomy.
///
/// Every variant is raised before the enclosing store transaction commits,
/// so a failed call has zero side effects.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Unknown or deactivated client on an authorize request.
    #[error("unknown or inactive client")]
    InvalidClient,

    /// redirect_uri not in the client's allow-list.
    #[error("redirect_uri is not registered for this client")]
    InvalidRedirectUri,

    /// A requested scope is outside the closed scope set.
    #[error("unknown scope: {0}")]
    InvalidScope(String),

    /// Client id/secret pair did not validate.
    #[error("invalid client credentials")]
    InvalidClientCredentials,

    /// The client's platform subscription has lapsed.
    #[error("client subscription is inactive")]
    SubscriptionInactive,

    /// No such authorization code.
    #[error("invalid authorization code")]
    InvalidCode,

    /// The code was already exchanged once.
    #[error("authorization code has already been used")]
    CodeAlreadyUsed,

    /// The code is past its 10-minute window.
    #[error("authorization code has expired")]
    CodeExpired,

    /// client_id or redirect_uri does not match what the code was issued
    /// for.
    #[error("authorization code validation failed")]
    CodeValidationFailed,

    /// No matching refresh token for this client.
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// No such access token.
    #[error("invalid access token")]
    InvalidAccessToken,

    /// The access token is past its expiry.
    #[error("access token has expired")]
    TokenExpired,

    /// The owning client has been deactivated since issuance.
    #[error("account is inactive")]
    InactiveAccount,

    /// grant_type other than authorization_code / refresh_token.
    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// The CSPRNG failed to produce token material.
    #[error("failed to generate token material")]
    RandomFailure,

    /// Store-level failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of an authorize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// No authenticated user context: the caller must log the user in and
    /// re-invoke. Carries the client's display name for the login screen.
    LoginRequired { client_name: String },
    /// Redirect target embedding the code and the caller's state.
    Redirect { redirect_uri: String },
}

/// The identity an access token resolves to.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub user_id: String,
    pub client_id: String,
    pub scopes: ScopeSet,
}

/// A freshly registered client together with its one-time plaintext secret.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client: Client,
    /// Shown exactly once; only the hash is stored.
    pub client_secret: String,
}

/// OAuth authorization broker.
///
/// Holds an injected store handle; no global state.
#[derive(Clone)]
pub struct AuthorizationBroker {
    db: Arc<SocialWalletDb>,
    rng: SystemRandom,
}

impl AuthorizationBroker {
    pub fn new(db: Arc<SocialWalletDb>) -> Self {
        Self {
            db,
            rng: SystemRandom::new(),
        }
    }

    fn mint(&self) -> Result<String, OAuthError> {
        mint_token_value(&self.rng).map_err(|_| OAuthError::RandomFailure)
    }

    /// Begin an authorization-code grant.
    ///
    /// Validates the client and redirect target; without a user context it
    /// returns the login-required signal. Otherwise it persists a
    /// 10-minute code and returns the redirect embedding `code` and the
    /// caller's `state` unmodified.
    pub fn initiate_authorization(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &ScopeSet,
        state: Option<&str>,
        current_user: Option<&str>,
    ) -> Result<AuthorizeOutcome, OAuthError> {
        let client = self
            .db
            .get_client(client_id)?
            .filter(|c| c.active)
            .ok_or(OAuthError::InvalidClient)?;

        if !client.redirect_uris.iter().any(|uri| uri == redirect_uri) {
            return Err(OAuthError::InvalidRedirectUri);
        }

        let Some(user_id) = current_user else {
            return Ok(AuthorizeOutcome::LoginRequired {
                client_name: client.name,
            });
        };

        let now = Utc::now();
        let code = AuthorizationCode {
            code: self.mint()?,
            user_id: user_id.to_string(),
            client_id: client.client_id.clone(),
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.clone(),
            expires_at: auth_code_expiry(now),
            used: false,
            created_at: now,
        };

        self.db.run_write(|w| w.put_auth_code(&code))?;

        let mut target =
            Url::parse(redirect_uri).map_err(|_| OAuthError::InvalidRedirectUri)?;
        {
            let mut pairs = target.query_pairs_mut();
            pairs.append_pair("code", &code.code);
            if let Some(state) = state {
                pairs.append_pair("state", state);
            }
        }

        tracing::info!(
            client_id = %client.client_id,
            user_id = %user_id,
            "issued authorization code"
        );

        Ok(AuthorizeOutcome::Redirect {
            redirect_uri: target.into(),
        })
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// The code is consumed and the token issued inside one write
    /// transaction.
    pub fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code_value: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, OAuthError> {
        let now = Utc::now();
        let token_value = self.mint()?;
        let refresh_value = self.mint()?;

        self.db.run_write(|w| {
            let client = w
                .get_client(client_id)?
                .filter(|c| c.active && c.verify_secret(client_secret))
                .ok_or(OAuthError::InvalidClientCredentials)?;

            if !client.subscription_active {
                return Err(OAuthError::SubscriptionInactive);
            }

            let mut code = w
                .get_auth_code(code_value)?
                .ok_or(OAuthError::InvalidCode)?;
            if code.used {
                return Err(OAuthError::CodeAlreadyUsed);
            }
            if code.is_expired(now) {
                return Err(OAuthError::CodeExpired);
            }
            if code.client_id != client_id || code.redirect_uri != redirect_uri {
                return Err(OAuthError::CodeValidationFailed);
            }

            code.used = true;
            w.put_auth_code(&code)?;

            let token = AccessToken {
                token: token_value.clone(),
                refresh_token: refresh_value.clone(),
                user_id: code.user_id.clone(),
                client_id: code.client_id.clone(),
                scopes: code.scopes.clone(),
                expires_at: access_token_expiry(now),
                created_at: now,
            };
            w.put_access_token(&token)?;

            tracing::info!(
                client_id = %client.client_id,
                user_id = %token.user_id,
                "exchanged authorization code for token"
            );

            Ok(token)
        })
    }

    /// Rotate a token pair via its refresh token.
    ///
    /// Replaces the token and refresh values in place, preserving the
    /// granted scopes; the previous values are invalid once the
    /// transaction commits.
    pub fn exchange_refresh_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<AccessToken, OAuthError> {
        let now = Utc::now();
        let token_value = self.mint()?;
        let refresh_value = self.mint()?;

        self.db.run_write(|w| {
            let previous = w
                .find_token_by_refresh(refresh_token)?
                .filter(|t| t.client_id == client_id)
                .ok_or(OAuthError::InvalidRefreshToken)?;

            w.delete_access_token(&previous.token)?;

            let token = AccessToken {
                token: token_value.clone(),
                refresh_token: refresh_value.clone(),
                user_id: previous.user_id,
                client_id: previous.client_id,
                scopes: previous.scopes,
                expires_at: access_token_expiry(now),
                created_at: previous.created_at,
            };
            w.put_access_token(&token)?;

            Ok(token)
        })
    }

    /// Resolve an access token to its user, client, and scopes.
    pub fn validate_access_token(&self, token_value: &str) -> Result<TokenIdentity, OAuthError> {
        let token = self
            .db
            .get_access_token(token_value)?
            .ok_or(OAuthError::InvalidAccessToken)?;

        if token.is_expired(Utc::now()) {
            return Err(OAuthError::TokenExpired);
        }

        let client_active = self
            .db
            .get_client(&token.client_id)?
            .is_some_and(|c| c.active);
        if !client_active {
            return Err(OAuthError::InactiveAccount);
        }

        Ok(TokenIdentity {
            user_id: token.user_id,
            client_id: token.client_id,
            scopes: token.scopes,
        })
    }

    /// Revoke an access token. Idempotent; revoking an absent token is a
    /// no-op.
    pub fn revoke_token(&self, token_value: &str) -> Result<(), OAuthError> {
        self.db.run_write(|w| {
            w.delete_access_token(token_value)?;
            Ok(())
        })
    }

    /// Register a third-party platform.
    ///
    /// Returns the plaintext secret exactly once; only its hash is stored.
    pub fn register_client(
        &self,
        name: &str,
        redirect_uris: Vec<String>,
        revenue_share: Option<f64>,
    ) -> Result<RegisteredClient, OAuthError> {
        let secret = self.mint()?;
        let client = Client {
            client_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            secret_hash: hash_secret(&secret),
            redirect_uris,
            active: true,
            revenue_share: revenue_share.unwrap_or(DEFAULT_CLIENT_REVENUE_SHARE),
            subscription_active: true,
            created_at: Utc::now(),
        };

        self.db.run_write(|w| w.put_client(&client))?;
        tracing::info!(client_id = %client.client_id, name = %client.name, "registered client");

        Ok(RegisteredClient {
            client,
            client_secret: secret,
        })
    }

    /// Look up a client record.
    pub fn get_client(&self, client_id: &str) -> Result<Option<Client>, OAuthError> {
        Ok(self.db.get_client(client_id)?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::scopes::Scope;

    fn test_broker() -> (AuthorizationBroker, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = SocialWalletDb::open(&dir.path().join("test.redb")).unwrap();
        (AuthorizationBroker::new(Arc::new(db)), dir)
    }

    const CALLBACK: &str = "https://platform.example/callback";

    fn register(broker: &AuthorizationBroker) -> RegisteredClient {
        broker
            .register_client("Platform", vec![CALLBACK.to_string()], None)
            .unwrap()
    }

    fn profile_scopes() -> ScopeSet {
        ScopeSet::from(vec![Scope::Profile])
    }

    /// Issue a code for `user-1` and return its value.
    fn issue_code(broker: &AuthorizationBroker, client_id: &str) -> String {
        let outcome = broker
            .initiate_authorization(client_id, CALLBACK, &profile_scopes(), None, Some("user-1"))
            .unwrap();
        let AuthorizeOutcome::Redirect { redirect_uri } = outcome else {
            panic!("expected redirect");
        };
        let url = Url::parse(&redirect_uri).unwrap();
        url.query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .expect("redirect must carry a code")
    }

    #[test]
    fn authorize_unknown_client_fails() {
        let (broker, _dir) = test_broker();
        assert!(matches!(
            broker.initiate_authorization("nope", CALLBACK, &profile_scopes(), None, Some("u")),
            Err(OAuthError::InvalidClient)
        ));
    }

    #[test]
    fn authorize_inactive_client_fails() {
        let (broker, _dir) = test_broker();
        let mut registered = register(&broker);
        registered.client.active = false;
        broker
            .db
            .run_write(|w| w.put_client(&registered.client))
            .unwrap();

        assert!(matches!(
            broker.initiate_authorization(
                &registered.client.client_id,
                CALLBACK,
                &profile_scopes(),
                None,
                Some("u"),
            ),
            Err(OAuthError::InvalidClient)
        ));
    }

    #[test]
    fn authorize_unregistered_redirect_fails() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        assert!(matches!(
            broker.initiate_authorization(
                &registered.client.client_id,
                "https://evil.example/cb",
                &profile_scopes(),
                None,
                Some("u"),
            ),
            Err(OAuthError::InvalidRedirectUri)
        ));
    }

    #[test]
    fn authorize_without_user_requires_login() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let outcome = broker
            .initiate_authorization(
                &registered.client.client_id,
                CALLBACK,
                &profile_scopes(),
                None,
                None,
            )
            .unwrap();
        assert_eq!(
            outcome,
            AuthorizeOutcome::LoginRequired {
                client_name: "Platform".to_string()
            }
        );
    }

    #[test]
    fn authorize_redirect_carries_code_and_state() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let outcome = broker
            .initiate_authorization(
                &registered.client.client_id,
                CALLBACK,
                &profile_scopes(),
                Some("xyzzy&="),
                Some("user-1"),
            )
            .unwrap();
        let AuthorizeOutcome::Redirect { redirect_uri } = outcome else {
            panic!("expected redirect");
        };
        let url = Url::parse(&redirect_uri).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.iter().any(|(k, _)| k == "code"));
        // State is echoed back unmodified, surviving URL encoding
        assert!(pairs.iter().any(|(k, v)| k == "state" && v == "xyzzy&="));
    }

    #[test]
    fn code_exchange_issues_scoped_token_once() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code = issue_code(&broker, &client_id);

        let token = broker
            .exchange_code(&client_id, &registered.client_secret, &code, CALLBACK)
            .unwrap();
        assert_eq!(token.user_id, "user-1");
        assert_eq!(token.scopes, profile_scopes());

        // Second exchange of the same code fails and issues nothing new
        let err = broker
            .exchange_code(&client_id, &registered.client_secret, &code, CALLBACK)
            .unwrap_err();
        assert!(matches!(err, OAuthError::CodeAlreadyUsed));
        assert!(broker.validate_access_token(&token.token).is_ok());
    }

    #[test]
    fn exchange_rejects_bad_credentials() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code = issue_code(&broker, &client_id);

        assert!(matches!(
            broker.exchange_code(&client_id, "wrong-secret", &code, CALLBACK),
            Err(OAuthError::InvalidClientCredentials)
        ));
        assert!(matches!(
            broker.exchange_code("ghost", &registered.client_secret, &code, CALLBACK),
            Err(OAuthError::InvalidClientCredentials)
        ));
        // The failed attempts did not consume the code
        assert!(broker
            .exchange_code(&client_id, &registered.client_secret, &code, CALLBACK)
            .is_ok());
    }

    #[test]
    fn exchange_requires_active_subscription() {
        let (broker, _dir) = test_broker();
        let mut registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code = issue_code(&broker, &client_id);

        registered.client.subscription_active = false;
        broker
            .db
            .run_write(|w| w.put_client(&registered.client))
            .unwrap();

        assert!(matches!(
            broker.exchange_code(&client_id, &registered.client_secret, &code, CALLBACK),
            Err(OAuthError::SubscriptionInactive)
        ));
    }

    #[test]
    fn exchange_unknown_code_fails() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        assert!(matches!(
            broker.exchange_code(
                &registered.client.client_id,
                &registered.client_secret,
                "no-such-code",
                CALLBACK,
            ),
            Err(OAuthError::InvalidCode)
        ));
    }

    #[test]
    fn exchange_expired_code_fails() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code_value = issue_code(&broker, &client_id);

        // Backdate the code past its window
        broker
            .db
            .run_write(|w| {
                let mut code = w.get_auth_code(&code_value)?.unwrap();
                code.expires_at = Utc::now() - chrono::Duration::seconds(1);
                w.put_auth_code(&code)
            })
            .unwrap();

        assert!(matches!(
            broker.exchange_code(&client_id, &registered.client_secret, &code_value, CALLBACK),
            Err(OAuthError::CodeExpired)
        ));
    }

    #[test]
    fn exchange_detects_substitution() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let client_id = registered.client.client_id.clone();

        // redirect_uri mismatch
        let code = issue_code(&broker, &client_id);
        assert!(matches!(
            broker.exchange_code(
                &client_id,
                &registered.client_secret,
                &code,
                "https://platform.example/callback/", // trailing slash: not byte-equal
            ),
            Err(OAuthError::CodeValidationFailed)
        ));

        // client mismatch: a second client presenting the first client's code
        let other = broker
            .register_client("Other", vec![CALLBACK.to_string()], None)
            .unwrap();
        assert!(matches!(
            broker.exchange_code(
                &other.client.client_id,
                &other.client_secret,
                &code,
                CALLBACK,
            ),
            Err(OAuthError::CodeValidationFailed)
        ));
    }

    #[test]
    fn refresh_rotates_and_invalidates_previous_pair() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code = issue_code(&broker, &client_id);
        let first = broker
            .exchange_code(&client_id, &registered.client_secret, &code, CALLBACK)
            .unwrap();

        let second = broker
            .exchange_refresh_token(&client_id, &first.refresh_token)
            .unwrap();
        assert_ne!(second.token, first.token);
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(second.scopes, first.scopes);
        assert_eq!(second.user_id, first.user_id);

        // Old pair is dead
        assert!(matches!(
            broker.validate_access_token(&first.token),
            Err(OAuthError::InvalidAccessToken)
        ));
        assert!(matches!(
            broker.exchange_refresh_token(&client_id, &first.refresh_token),
            Err(OAuthError::InvalidRefreshToken)
        ));
        // New token validates
        assert!(broker.validate_access_token(&second.token).is_ok());
    }

    #[test]
    fn refresh_rejects_client_mismatch() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code = issue_code(&broker, &client_id);
        let token = broker
            .exchange_code(&client_id, &registered.client_secret, &code, CALLBACK)
            .unwrap();

        let other = broker
            .register_client("Other", vec![CALLBACK.to_string()], None)
            .unwrap();
        assert!(matches!(
            broker.exchange_refresh_token(&other.client.client_id, &token.refresh_token),
            Err(OAuthError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn validate_reports_expiry_and_inactive_client() {
        let (broker, _dir) = test_broker();
        let mut registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code = issue_code(&broker, &client_id);
        let token = broker
            .exchange_code(&client_id, &registered.client_secret, &code, CALLBACK)
            .unwrap();

        let identity = broker.validate_access_token(&token.token).unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.client_id, client_id);

        // Deactivate the client: existing tokens stop validating
        registered.client.active = false;
        broker
            .db
            .run_write(|w| w.put_client(&registered.client))
            .unwrap();
        assert!(matches!(
            broker.validate_access_token(&token.token),
            Err(OAuthError::InactiveAccount)
        ));

        // Reactivate and backdate the expiry
        registered.client.active = true;
        broker
            .db
            .run_write(|w| {
                w.put_client(&registered.client)?;
                let mut record = w.get_access_token(&token.token)?.unwrap();
                record.expires_at = Utc::now() - chrono::Duration::seconds(1);
                w.put_access_token(&record)
            })
            .unwrap();
        assert!(matches!(
            broker.validate_access_token(&token.token),
            Err(OAuthError::TokenExpired)
        ));
    }

    #[test]
    fn revoke_is_idempotent() {
        let (broker, _dir) = test_broker();
        let registered = register(&broker);
        let client_id = registered.client.client_id.clone();
        let code = issue_code(&broker, &client_id);
        let token = broker
            .exchange_code(&client_id, &registered.client_secret, &code, CALLBACK)
            .unwrap();

        broker.revoke_token(&token.token).unwrap();
        assert!(matches!(
            broker.validate_access_token(&token.token),
            Err(OAuthError::InvalidAccessToken)
        ));
        // Second revoke is a silent no-op
        broker.revoke_token(&token.token).unwrap();
        broker.revoke_token("never-existed").unwrap();
    }
}
