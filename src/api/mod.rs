// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    ledger::{
        gifts::{Gift, GiftReceipt},
        payments::{PaymentEvent, PaymentOutcome},
        wallet::{BalanceSummary, TransactionType, WalletTransaction},
    },
    oauth::models::{AuthorizeRequest, IntrospectResponse, TokenRequest, TokenResponse},
    oauth::scopes::{Scope, ScopeSet},
    state::AppState,
};

pub mod clients;
pub mod gifts;
pub mod health;
pub mod oauth;
pub mod payments;
pub mod rate_limit;
pub mod wallets;

pub fn router(state: AppState) -> Router {
    let oauth_routes = Router::new()
        .route("/authorize", get(oauth::authorize))
        .route("/token", post(oauth::token))
        .route("/revoke", post(oauth::revoke))
        .route("/introspect", post(oauth::introspect));

    let v1_routes = Router::new()
        .route("/wallet", get(wallets::get_balance))
        .route("/wallet/transactions", get(wallets::list_transactions))
        .route("/wallet/transfer", post(wallets::transfer))
        .route("/wallets/{user_id}/lock", post(wallets::lock_wallet))
        .route("/wallets/{user_id}/unlock", post(wallets::unlock_wallet))
        .route("/gifts", get(gifts::list_gifts).post(gifts::create_gift))
        .route("/gifts/send", post(gifts::send_gift))
        .route("/payments/webhook", post(payments::payment_webhook))
        .route("/clients", post(clients::register_client));

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/oauth", oauth_routes)
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::ready,
        oauth::authorize,
        oauth::token,
        oauth::revoke,
        oauth::introspect,
        clients::register_client,
        wallets::get_balance,
        wallets::list_transactions,
        wallets::transfer,
        wallets::lock_wallet,
        wallets::unlock_wallet,
        gifts::list_gifts,
        gifts::create_gift,
        gifts::send_gift,
        payments::payment_webhook
    ),
    components(
        schemas(
            Scope,
            ScopeSet,
            AuthorizeRequest,
            TokenRequest,
            TokenResponse,
            IntrospectResponse,
            oauth::LoginRequiredResponse,
            oauth::TokenValueRequest,
            clients::RegisterClientRequest,
            clients::RegisterClientResponse,
            BalanceSummary,
            TransactionType,
            WalletTransaction,
            wallets::TransactionListResponse,
            wallets::TransferRequest,
            wallets::TransferResponse,
            wallets::LockResponse,
            Gift,
            GiftReceipt,
            gifts::CreateGiftRequest,
            gifts::GiftListResponse,
            gifts::SendGiftRequest,
            PaymentEvent,
            PaymentOutcome,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "OAuth", description = "Authorization broker for third-party platforms"),
        (name = "Clients", description = "Platform registration"),
        (name = "Wallet", description = "Coin balances and transfers"),
        (name = "Gifts", description = "Gift catalog and sending"),
        (name = "Payments", description = "Payment webhook top-ups")
    )
)]
struct ApiDoc;
