// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Authorization broker records and wire types.
//!
//! ## Records
//!
//! - [`Client`]: a registered third-party platform (secret hashed at rest)
//! - [`AuthorizationCode`]: single-use grant, 10 minute expiry
//! - [`AccessToken`]: bearer token + refresh token pair, 1 hour expiry
//!
//! Code and token values carry 256 bits of CSPRNG entropy, encoded as
//! unpadded base64url. Client secrets are never stored in plaintext; only
//! the SHA-256 digest is kept.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::{IntoParams, ToSchema};

use super::scopes::ScopeSet;

/// Authorization code lifetime.
pub const AUTH_CODE_TTL_MINUTES: i64 = 10;

/// Access token lifetime.
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Random bytes per minted code/token value.
const TOKEN_ENTROPY_BYTES: usize = 32;

// =============================================================================
// Stored Records
// =============================================================================

/// A registered third-party platform.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Client {
    /// Unique client identifier (UUID).
    pub client_id: String,
    /// Display name shown on the consent/login screen.
    pub name: String,
    /// SHA-256 digest of the client secret (hex).
    pub secret_hash: String,
    /// Exact-match allow-list of callback URIs.
    pub redirect_uris: Vec<String>,
    /// Inactive clients cannot authorize or exchange.
    pub active: bool,
    /// Fraction of gift volume paid to this platform (default 0.10).
    pub revenue_share: f64,
    /// Whether the platform's subscription is current. Checked on token
    /// exchange; the monthly billing sweep maintains it.
    pub subscription_active: bool,
    /// When the client was registered.
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Verify a presented secret against the stored digest.
    pub fn verify_secret(&self, secret: &str) -> bool {
        hash_secret(secret) == self.secret_hash
    }
}

/// A one-time authorization grant.
///
/// Consumed (used flag set) exactly once during token exchange and never
/// updated afterward. A used or expired code is permanently unusable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationCode {
    /// The code value (random, unique, table key).
    pub code: String,
    /// User who granted the authorization.
    pub user_id: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Redirect URI the code was issued for. Exchange must match it
    /// byte-for-byte.
    pub redirect_uri: String,
    /// Granted scopes.
    pub scopes: ScopeSet,
    /// Absolute expiry (issue time + 10 minutes).
    pub expires_at: DateTime<Utc>,
    /// Set to true on exchange.
    pub used: bool,
    /// When the code was issued.
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    /// Whether the code is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An access/refresh token pair.
///
/// Refreshing replaces the token and refresh values in place (same logical
/// record, re-keyed); the old values become invalid the moment the
/// replacement commits. Expiry is absolute, not sliding.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessToken {
    /// Bearer token value (random, unique, table key).
    pub token: String,
    /// Refresh token value (random, unique, secondary index).
    pub refresh_token: String,
    /// User the token acts for.
    pub user_id: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Granted scopes, carried over from the authorization code.
    pub scopes: ScopeSet,
    /// Absolute expiry (issue/refresh time + 1 hour).
    pub expires_at: DateTime<Utc>,
    /// When the token chain was first created.
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Query parameters for `GET /oauth/authorize`.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct AuthorizeRequest {
    /// Must be `code`.
    pub response_type: String,
    /// Client identifier.
    pub client_id: String,
    /// Callback URI; must appear in the client's allow-list.
    pub redirect_uri: String,
    /// Space-joined requested scopes.
    pub scope: Option<String>,
    /// Opaque CSRF state, echoed back unmodified.
    pub state: Option<String>,
}

/// Form body for `POST /oauth/token`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// `authorization_code` or `refresh_token`.
    pub grant_type: String,
    /// Client identifier.
    pub client_id: String,
    /// Client secret (required for `authorization_code`).
    pub client_secret: Option<String>,
    /// Authorization code (for `authorization_code`).
    pub code: Option<String>,
    /// Redirect URI the code was issued for.
    pub redirect_uri: Option<String>,
    /// Refresh token (for `refresh_token`).
    pub refresh_token: Option<String>,
}

/// Success body for `POST /oauth/token`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Bearer token value.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Seconds until expiry (3600).
    pub expires_in: i64,
    /// Refresh token value.
    pub refresh_token: String,
    /// Space-joined granted scopes.
    pub scope: String,
}

impl TokenResponse {
    /// Build the wire response for an issued token.
    pub fn from_token(token: &AccessToken) -> Self {
        Self {
            access_token: token.token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_TTL_SECONDS,
            refresh_token: token.refresh_token.clone(),
            scope: token.scopes.to_string(),
        }
    }
}

/// Result of a token introspection (`POST /oauth/introspect`).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IntrospectResponse {
    /// User the token acts for.
    pub user_id: String,
    /// Client the token belongs to.
    pub client_id: String,
    /// Space-joined granted scopes.
    pub scope: String,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Minting Helpers
// =============================================================================

/// Mint a random code/token value: 32 CSPRNG bytes, base64url unpadded.
pub fn mint_token_value(rng: &SystemRandom) -> Result<String, ring::error::Unspecified> {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    rng.fill(&mut bytes)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// SHA-256 digest of a client secret, lowercase hex.
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Compute the expiry timestamp for a newly issued authorization code.
pub fn auth_code_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(AUTH_CODE_TTL_MINUTES)
}

/// Compute the expiry timestamp for a newly issued or refreshed token.
pub fn access_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(ACCESS_TOKEN_TTL_SECONDS)
}
