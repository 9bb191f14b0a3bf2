// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWKS_URL` | Identity-provider JWKS endpoint for JWT verification | Required for production |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Required for production |
//! | `JWT_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `PAYMENT_WEBHOOK_SECRET` | HMAC secret for payment webhook signatures | Webhooks rejected if unset |
//! | `TOKEN_RATE_LIMIT` | Token-endpoint requests per client per minute | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the data directory path.
///
/// The embedded database file lives at `<DATA_DIR>/social-wallet.redb`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Database filename inside the data directory.
pub const DB_FILENAME: &str = "social-wallet.redb";

/// Environment variable for the identity-provider JWKS endpoint.
pub const JWKS_URL_ENV: &str = "JWKS_URL";

/// Environment variable for the expected JWT issuer.
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";

/// Environment variable for the expected JWT audience.
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";

/// Environment variable for the payment webhook HMAC secret.
pub const PAYMENT_WEBHOOK_SECRET_ENV: &str = "PAYMENT_WEBHOOK_SECRET";

/// Environment variable for the token-endpoint rate limit (per minute).
pub const TOKEN_RATE_LIMIT_ENV: &str = "TOKEN_RATE_LIMIT";
