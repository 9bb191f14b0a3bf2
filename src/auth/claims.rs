// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims decoded from an identity-provider JWT.
///
/// Standard OIDC claims plus an optional metadata object carrying the
/// user's role.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user ID) - the canonical user identifier
    pub sub: String,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issuer (the identity provider instance URL)
    #[serde(default)]
    pub iss: String,

    /// Session ID (provider-specific)
    #[serde(default)]
    pub sid: Option<String>,

    /// Audience (validated by the jsonwebtoken crate, not read directly)
    #[serde(default)]
    #[allow(dead_code)]
    pub aud: Option<serde_json::Value>,

    /// Custom metadata containing the user's role
    #[serde(default)]
    pub metadata: Option<UserMetadata>,
}

/// Custom metadata block on identity-provider tokens.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserMetadata {
    /// User's role (set in the identity provider's dashboard)
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated user information extracted from a JWT.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (JWT `sub` claim)
    pub user_id: String,

    /// User's role
    pub role: Role,

    /// Session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Original issuer (used for validation, not serialized)
    #[serde(skip)]
    pub issuer: String,

    /// Token expiration (Unix timestamp, used for validation, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from decoded claims.
    pub fn from_claims(claims: IdentityClaims) -> Self {
        // Extract role from metadata or default to User
        let role = claims
            .metadata
            .as_ref()
            .and_then(|m| m.role.as_ref())
            .and_then(|r| Role::from_str(r))
            .unwrap_or(Role::User);

        Self {
            user_id: claims.sub,
            role,
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
