// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use social_wallet_server::api::rate_limit::FixedWindowLimiter;
use social_wallet_server::api::router;
use social_wallet_server::auth::JwksManager;
use social_wallet_server::config::{
    DATA_DIR_ENV, DB_FILENAME, DEFAULT_DATA_DIR, JWKS_URL_ENV, JWT_AUDIENCE_ENV, JWT_ISSUER_ENV,
    PAYMENT_WEBHOOK_SECRET_ENV, TOKEN_RATE_LIMIT_ENV,
};
use social_wallet_server::state::{AppState, AuthConfig};
use social_wallet_server::storage::SocialWalletDb;

#[tokio::main]
async fn main() {
    init_tracing();

    // Open the embedded database
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let db_path: PathBuf = [data_dir.as_str(), DB_FILENAME].iter().collect();
    let db = SocialWalletDb::open(&db_path).expect("Failed to open database");
    tracing::info!(path = %db_path.display(), "database open");

    // Auth: production JWKS verification when configured, dev mode otherwise
    let auth_config = AuthConfig {
        jwks: env::var(JWKS_URL_ENV).ok().map(JwksManager::new),
        issuer: env::var(JWT_ISSUER_ENV).ok(),
        audience: env::var(JWT_AUDIENCE_ENV).ok(),
    };
    if auth_config.jwks.is_none() {
        tracing::warn!("JWKS_URL not set; JWT signatures are NOT verified (development mode)");
    }

    let mut state = AppState::new(Arc::new(db)).with_auth_config(auth_config);

    if let Ok(secret) = env::var(PAYMENT_WEBHOOK_SECRET_ENV) {
        state = state.with_webhook_secret(secret);
    } else {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET not set; payment webhooks will be rejected");
    }

    if let Ok(limit) = env::var(TOKEN_RATE_LIMIT_ENV) {
        if let Ok(limit) = limit.parse::<u32>() {
            state.token_limiter = FixedWindowLimiter::new(limit, Duration::from_secs(60));
        }
    }

    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Social Wallet server listening on http://{addr} (docs at /docs)");

    // Graceful shutdown on SIGINT/SIGTERM
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        signal_token.cancel();
    });

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .expect("HTTP server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
