// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! # Authentication Module
//!
//! First-party user authentication via identity-provider JWTs.
//!
//! ## Auth Flow
//!
//! 1. Frontend authenticates the user with the identity provider
//! 2. Frontend sends `Authorization: Bearer <JWT>`
//! 3. Server:
//!    - Fetches the provider JWKS via HTTPS
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - role claims (custom metadata)
//!
//! Third-party platforms never present user JWTs; they hold access tokens
//! issued by the authorization broker (`crate::oauth`).
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - JWT verification uses HTTPS-only JWKS fetching
//! - JWKS is cached with TTL for performance
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, OptionalAuth};
pub use jwks::JwksManager;
pub use roles::Role;
