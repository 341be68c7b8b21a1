//! # Challenge Routes
//!
//! Raising a challenge against a scheduled action and settling it.

use accord_core::ActionId;
use accord_state::Challenge;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, Caller};
use crate::state::AppState;

// ── Request / Response types ────────────────────────────────────────

/// Challenge a scheduled action.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChallengeRequest {
    /// Portion of the collateral the challenger would settle for.
    /// Clamped to the collateral amount.
    pub settlement_offer: u64,
    /// Challenger's reason, forwarded as evidence if disputed.
    #[serde(default)]
    pub context: String,
}

/// A challenge and its state.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChallengeResponse {
    pub action_id: u64,
    pub challenger: String,
    pub context: String,
    pub settlement_offer: u64,
    pub arbitrator_fee_asset: String,
    pub arbitrator_fee_amount: u64,
    pub state: String,
    pub dispute_id: Option<u64>,
    pub created_at: String,
}

impl ChallengeResponse {
    fn new(action_id: ActionId, c: Challenge) -> Self {
        Self {
            action_id: action_id.get(),
            challenger: c.challenger.to_string(),
            context: c.context,
            settlement_offer: c.settlement_offer,
            arbitrator_fee_asset: c.arbitrator_fee_asset.to_string(),
            arbitrator_fee_amount: c.arbitrator_fee_amount,
            state: c.state.to_string(),
            dispute_id: c.dispute_id.map(|d| d.get()),
            created_at: c.created_at.to_iso8601(),
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the challenge router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/actions/{id}/challenge", post(challenge).get(get_challenge))
        .route("/v1/actions/{id}/settle", post(settle))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/actions/{id}/challenge: Challenge inside the delay window.
#[utoipa::path(
    post,
    path = "/v1/actions/{id}/challenge",
    request_body = ChallengeRequest,
    params(
        ("id" = u64, Path, description = "Action id"),
        ("x-accord-participant" = String, Header, description = "Challenger"),
    ),
    responses(
        (status = 201, description = "Challenge raised", body = ChallengeResponse),
        (status = 403, description = "Caller may not challenge", body = crate::error::ErrorBody),
        (status = 409, description = "Not challengeable", body = crate::error::ErrorBody),
        (status = 422, description = "Challenger cannot cover stake and fee", body = crate::error::ErrorBody),
    ),
    tag = "challenges"
)]
pub(crate) async fn challenge(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(challenger): Caller,
    body: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChallengeResponse>), AppError> {
    let req = extract_json(body)?;
    let agreement = state.agreement();
    let action_id = ActionId(id);
    agreement.challenge(action_id, &challenger, req.settlement_offer, req.context)?;
    let challenge = agreement.challenge_of(action_id)?;
    Ok((StatusCode::CREATED, Json(ChallengeResponse::new(action_id, challenge))))
}

/// POST /v1/actions/{id}/settle: Accept the settlement offer.
#[utoipa::path(
    post,
    path = "/v1/actions/{id}/settle",
    params(
        ("id" = u64, Path, description = "Action id"),
        ("x-accord-participant" = String, Header, description = "Submitter, or anyone once the answer window closed"),
    ),
    responses(
        (status = 200, description = "Settled", body = ChallengeResponse),
        (status = 403, description = "Only the submitter may settle inside the window", body = crate::error::ErrorBody),
        (status = 409, description = "Not settleable", body = crate::error::ErrorBody),
    ),
    tag = "challenges"
)]
pub(crate) async fn settle(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(by): Caller,
) -> Result<Json<ChallengeResponse>, AppError> {
    let agreement = state.agreement();
    let action_id = ActionId(id);
    agreement.settle(action_id, &by)?;
    Ok(Json(ChallengeResponse::new(action_id, agreement.challenge_of(action_id)?)))
}

/// GET /v1/actions/{id}/challenge: The action's challenge.
#[utoipa::path(
    get,
    path = "/v1/actions/{id}/challenge",
    params(("id" = u64, Path, description = "Action id")),
    responses(
        (status = 200, description = "Challenge found", body = ChallengeResponse),
        (status = 404, description = "Unknown action or never challenged", body = crate::error::ErrorBody),
    ),
    tag = "challenges"
)]
pub(crate) async fn get_challenge(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let action_id = ActionId(id);
    let challenge = state.agreement().challenge_of(action_id)?;
    Ok(Json(ChallengeResponse::new(action_id, challenge)))
}
