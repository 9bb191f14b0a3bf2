// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Permission scopes granted to third-party platforms.
//!
//! Scopes form a closed set: anything outside it is rejected when the
//! request is parsed, never at query time. On the wire a scope list is a
//! single space-joined string (`"profile media"`).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named permission a client may hold for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Read the user's social profile.
    Profile,
    /// Read the user's media attachments.
    Media,
    /// Read wallet balance and transaction history.
    Wallet,
    /// Send and receive gifts on the user's behalf.
    Gifts,
}

impl Scope {
    /// Parse a single scope string (case-sensitive, lowercase wire form).
    pub fn parse(s: &str) -> Option<Scope> {
        match s {
            "profile" => Some(Scope::Profile),
            "media" => Some(Scope::Media),
            "wallet" => Some(Scope::Wallet),
            "gifts" => Some(Scope::Gifts),
            _ => None,
        }
    }

    /// Wire representation of this scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Profile => "profile",
            Scope::Media => "media",
            Scope::Wallet => "wallet",
            Scope::Gifts => "gifts",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered, deduplicated set of scopes.
///
/// Granted scope sets are opaque: no hierarchy, no wildcard expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
    /// Create an empty scope set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a space-joined scope string.
    ///
    /// Returns the offending token on the first unknown scope.
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut scopes = Vec::new();
        for token in s.split_whitespace() {
            let scope = Scope::parse(token).ok_or_else(|| token.to_string())?;
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes.sort();
        Ok(Self(scopes))
    }

    /// Check membership.
    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of scopes in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the scopes.
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }
}

impl From<Vec<Scope>> for ScopeSet {
    fn from(mut scopes: Vec<Scope>) -> Self {
        scopes.sort();
        scopes.dedup();
        Self(scopes)
    }
}

impl std::fmt::Display for ScopeSet {
    /// Space-joined wire form (`"media profile"`).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{joined}")
    }
}
