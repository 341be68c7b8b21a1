//! # Action Routes
//!
//! Scheduling, cancelling and executing actions, and the transition oracle's
//! per-action view of which operations are legal right now.

use accord_agreement::AllowedPaths;
use accord_core::ActionId;
use accord_state::Action;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_empty, Caller, Validate};
use crate::state::AppState;

// ── Request / Response types ────────────────────────────────────────

/// Schedule an action under the current setting.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    /// Reference the payload runner executes.
    pub payload_ref: String,
    /// Submitter's description, forwarded as evidence if disputed.
    #[serde(default)]
    pub context: String,
}

impl Validate for ScheduleRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("payload_ref", &self.payload_ref)
    }
}

/// Id of a newly scheduled action.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduledResponse {
    pub action_id: u64,
}

/// An action and its lifecycle state.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    pub action_id: u64,
    pub submitter: String,
    pub setting_id: u64,
    pub payload_ref: String,
    pub context: String,
    pub state: String,
    /// Present once challenged.
    pub challenge_state: Option<String>,
    pub created_at: String,
    pub transition_count: usize,
}

impl From<Action> for ActionResponse {
    fn from(a: Action) -> Self {
        Self {
            action_id: a.id.get(),
            submitter: a.submitter.to_string(),
            setting_id: a.setting_id.get(),
            challenge_state: a.challenge.as_ref().map(|c| c.state.to_string()),
            state: a.state.to_string(),
            created_at: a.created_at.to_iso8601(),
            transition_count: a.transitions.len(),
            payload_ref: a.payload_ref,
            context: a.context,
        }
    }
}

/// Operations legal for an action at request time.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AllowedPathsResponse {
    pub can_cancel: bool,
    pub can_challenge: bool,
    pub can_settle: bool,
    pub can_dispute: bool,
    pub can_claim_settlement: bool,
    pub can_rule: bool,
    pub can_submit_evidence: bool,
    pub can_execute: bool,
}

impl From<AllowedPaths> for AllowedPathsResponse {
    fn from(p: AllowedPaths) -> Self {
        Self {
            can_cancel: p.can_cancel,
            can_challenge: p.can_challenge,
            can_settle: p.can_settle,
            can_dispute: p.can_dispute,
            can_claim_settlement: p.can_claim_settlement,
            can_rule: p.can_rule,
            can_submit_evidence: p.can_submit_evidence,
            can_execute: p.can_execute,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the action lifecycle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/actions", post(schedule))
        .route("/v1/actions/{id}", get(get_action))
        .route("/v1/actions/{id}/cancel", post(cancel))
        .route("/v1/actions/{id}/execute", post(execute))
        .route("/v1/actions/{id}/paths", get(allowed_paths))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/actions: Schedule an action, locking the caller's collateral.
#[utoipa::path(
    post,
    path = "/v1/actions",
    request_body = ScheduleRequest,
    params(("x-accord-participant" = String, Header, description = "Submitter")),
    responses(
        (status = 201, description = "Action scheduled", body = ScheduledResponse),
        (status = 403, description = "Caller lacks sign role", body = crate::error::ErrorBody),
        (status = 422, description = "Not enough available collateral", body = crate::error::ErrorBody),
    ),
    tag = "actions"
)]
pub(crate) async fn schedule(
    State(state): State<AppState>,
    Caller(submitter): Caller,
    body: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScheduledResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let id = state
        .agreement()
        .schedule(&submitter, req.payload_ref, req.context)?;
    Ok((
        StatusCode::CREATED,
        Json(ScheduledResponse {
            action_id: id.get(),
        }),
    ))
}

/// GET /v1/actions/{id}: One action.
#[utoipa::path(
    get,
    path = "/v1/actions/{id}",
    params(("id" = u64, Path, description = "Action id")),
    responses(
        (status = 200, description = "Action found", body = ActionResponse),
        (status = 404, description = "Unknown action", body = crate::error::ErrorBody),
    ),
    tag = "actions"
)]
pub(crate) async fn get_action(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(state.agreement().action(ActionId(id))?.into()))
}

/// POST /v1/actions/{id}/cancel: Submitter withdraws the action.
#[utoipa::path(
    post,
    path = "/v1/actions/{id}/cancel",
    params(
        ("id" = u64, Path, description = "Action id"),
        ("x-accord-participant" = String, Header, description = "Submitter"),
    ),
    responses(
        (status = 200, description = "Cancelled", body = ActionResponse),
        (status = 403, description = "Caller is not the submitter", body = crate::error::ErrorBody),
        (status = 409, description = "Not cancellable", body = crate::error::ErrorBody),
    ),
    tag = "actions"
)]
pub(crate) async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(by): Caller,
) -> Result<Json<ActionResponse>, AppError> {
    let agreement = state.agreement();
    agreement.cancel(ActionId(id), &by)?;
    Ok(Json(agreement.action(ActionId(id))?.into()))
}

/// POST /v1/actions/{id}/execute: Run the payload once the window closed.
#[utoipa::path(
    post,
    path = "/v1/actions/{id}/execute",
    params(("id" = u64, Path, description = "Action id")),
    responses(
        (status = 200, description = "Executed", body = ActionResponse),
        (status = 409, description = "Not executable yet", body = crate::error::ErrorBody),
        (status = 502, description = "Payload failed", body = crate::error::ErrorBody),
    ),
    tag = "actions"
)]
pub(crate) async fn execute(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ActionResponse>, AppError> {
    let agreement = state.agreement();
    agreement.execute(ActionId(id))?;
    Ok(Json(agreement.action(ActionId(id))?.into()))
}

/// GET /v1/actions/{id}/paths: Operations legal right now.
#[utoipa::path(
    get,
    path = "/v1/actions/{id}/paths",
    params(("id" = u64, Path, description = "Action id")),
    responses(
        (status = 200, description = "Allowed paths", body = AllowedPathsResponse),
        (status = 404, description = "Unknown action", body = crate::error::ErrorBody),
    ),
    tag = "actions"
)]
pub(crate) async fn allowed_paths(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<AllowedPathsResponse>, AppError> {
    Ok(Json(state.agreement().allowed_paths(ActionId(id))?.into()))
}
