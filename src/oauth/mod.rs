// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! # Authorization Broker
//!
//! OAuth2-style authorization-code grant for third-party platforms:
//! short-lived single-use codes, 1-hour access/refresh token pairs, and a
//! closed permission scope set.

pub mod broker;
pub mod models;
pub mod scopes;

pub use broker::{AuthorizationBroker, AuthorizeOutcome, OAuthError, TokenIdentity};
pub use models::{AccessToken, AuthorizationCode, Client, TokenRequest, TokenResponse};
pub use scopes::{Scope, ScopeSet};
