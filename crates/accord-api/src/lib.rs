//! # accord-api: Axum HTTP Service for the Accord Protocol
//!
//! Exposes one agreement over JSON. Every mutating request names its acting
//! participant in the `x-accord-participant` header; the agreement itself
//! decides whether that participant may act.
//!
//! ## API Surface
//!
//! | Prefix                         | Module                  | Domain                 |
//! |--------------------------------|-------------------------|------------------------|
//! | `/v1/settings*`, `/v1/sign`    | [`routes::settings`]    | Settings registry      |
//! | `/v1/signers/*`                | [`routes::settings`]    | Signer review status   |
//! | `/v1/stake*`, `/v1/unstake`    | [`routes::staking`]     | Staking ledger         |
//! | `/v1/balances/*`               | [`routes::staking`]     | Balance queries        |
//! | `/v1/actions*`                 | [`routes::actions`]     | Action lifecycle       |
//! | `/v1/actions/{id}/challenge`   | [`routes::challenges`]  | Challenge and settle   |
//! | `/v1/actions/{id}/dispute`     | [`routes::disputes`]    | Disputes and evidence  |
//! | `/v1/disputes/{id}/ruling`     | [`routes::disputes`]    | Arbitrator callback    |
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros and served at `/openapi.json`.

pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::settings::router())
        .merge(routes::staking::router())
        .merge(routes::actions::router())
        .merge(routes::challenges::router())
        .merge(routes::disputes::router())
        .merge(openapi::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
