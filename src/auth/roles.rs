// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access: client registration, gift catalog, wallet locks
/// - `User` - Normal end user, can only act on their own wallet
/// - `Support` - Read-only access to wallet metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Normal end user (owns a wallet)
    User,
    /// Support staff (read-only metadata)
    Support,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            // Admin can do anything
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            (Role::Support, Role::Support) => true,
            // Everything else is denied
            _ => false,
        }
    }

    /// Parse role from string (case-insensitive).
    /// Used when extracting roles from identity-provider metadata claims.
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            "support" => Some(Role::Support),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege for authenticated users).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
            Role::Support => write!(f, "support"),
        }
    }
}
