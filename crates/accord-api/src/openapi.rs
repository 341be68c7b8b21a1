//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Accord API",
        version = "0.1.0",
        description = "Collateral-backed, time-windowed agreements: settings, staking, scheduled actions, challenges, and arbitrated disputes.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Settings
        crate::routes::settings::change_setting,
        crate::routes::settings::current_setting,
        crate::routes::settings::get_setting,
        crate::routes::settings::sign,
        crate::routes::settings::get_signer,
        // Staking
        crate::routes::staking::stake,
        crate::routes::staking::stake_for,
        crate::routes::staking::unstake,
        crate::routes::staking::get_balance,
        // Actions
        crate::routes::actions::schedule,
        crate::routes::actions::get_action,
        crate::routes::actions::cancel,
        crate::routes::actions::execute,
        crate::routes::actions::allowed_paths,
        // Challenges
        crate::routes::challenges::challenge,
        crate::routes::challenges::settle,
        crate::routes::challenges::get_challenge,
        // Disputes
        crate::routes::disputes::dispute,
        crate::routes::disputes::get_dispute,
        crate::routes::disputes::missing_fees,
        crate::routes::disputes::submit_evidence,
        crate::routes::disputes::rule,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::settings::ChangeSettingRequest,
        crate::routes::settings::SettingResponse,
        crate::routes::settings::SignResponse,
        crate::routes::settings::SignerResponse,
        crate::routes::staking::StakeRequest,
        crate::routes::staking::StakeForRequest,
        crate::routes::staking::UnstakeRequest,
        crate::routes::staking::BalanceResponse,
        crate::routes::actions::ScheduleRequest,
        crate::routes::actions::ScheduledResponse,
        crate::routes::actions::ActionResponse,
        crate::routes::actions::AllowedPathsResponse,
        crate::routes::challenges::ChallengeRequest,
        crate::routes::challenges::ChallengeResponse,
        crate::routes::disputes::EvidenceRequest,
        crate::routes::disputes::RulingRequest,
        crate::routes::disputes::DisputeOpenedResponse,
        crate::routes::disputes::EvidenceSubmittedResponse,
        crate::routes::disputes::EvidenceResponse,
        crate::routes::disputes::DisputeResponse,
        crate::routes::disputes::MissingFeesResponse,
        crate::routes::disputes::RulingResponse,
    )),
    tags(
        (name = "settings", description = "Settings registry and signer review"),
        (name = "staking", description = "Staking ledger"),
        (name = "actions", description = "Action lifecycle"),
        (name = "challenges", description = "Challenges and settlement"),
        (name = "disputes", description = "Arbitration, evidence, and rulings"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
