//! # Dispute Routes
//!
//! Escalating a challenge to the arbitration service, forwarding evidence,
//! and the inbound ruling callback. Rulings are accepted only from the
//! arbitrator's own account and only once per dispute.

use accord_core::{ActionId, DisputeId};
use accord_state::{Dispute, EvidenceRecord};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, require_non_empty, Caller, Validate};
use crate::state::AppState;

// ── Request / Response types ────────────────────────────────────────

/// Evidence from one of the parties.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EvidenceRequest {
    pub evidence: String,
    /// Close the caller's side of the evidence period.
    #[serde(default)]
    pub finished: bool,
}

impl Validate for EvidenceRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("evidence", &self.evidence)
    }
}

/// Arbitrator's ruling, as its numeric code.
///
/// `2` refused, `3` in favour of submitter, `4` in favour of challenger.
/// `0` (missing) and any other code are rejected.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RulingRequest {
    pub ruling: u8,
}

/// A dispute was opened.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeOpenedResponse {
    pub action_id: u64,
    pub dispute_id: u64,
}

/// Evidence was recorded.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvidenceSubmittedResponse {
    pub evidence_id: String,
}

/// One forwarded evidence record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvidenceResponse {
    pub evidence_id: String,
    pub party: String,
    pub author: String,
    pub digest: String,
    pub finished: bool,
    pub submitted_at: String,
}

impl From<EvidenceRecord> for EvidenceResponse {
    fn from(e: EvidenceRecord) -> Self {
        Self {
            evidence_id: e.id.to_string(),
            party: e.party.to_string(),
            author: e.author.to_string(),
            digest: e.digest.as_hex().to_string(),
            finished: e.finished,
            submitted_at: e.submitted_at.to_iso8601(),
        }
    }
}

/// Dispute state of an action.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeResponse {
    pub action_id: u64,
    pub dispute_id: Option<u64>,
    pub ruling: String,
    pub submitter_finished_evidence: bool,
    pub challenger_finished_evidence: bool,
    pub evidence: Vec<EvidenceResponse>,
}

impl DisputeResponse {
    fn new(action_id: ActionId, dispute_id: Option<DisputeId>, d: Dispute) -> Self {
        Self {
            action_id: action_id.get(),
            dispute_id: dispute_id.map(|id| id.get()),
            ruling: d.ruling.to_string(),
            submitter_finished_evidence: d.submitter_finished_evidence,
            challenger_finished_evidence: d.challenger_finished_evidence,
            evidence: d.evidence.into_iter().map(EvidenceResponse::from).collect(),
        }
    }
}

/// Fee the submitter still has to add to dispute now.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MissingFeesResponse {
    pub action_id: u64,
    pub asset: String,
    pub amount: u64,
}

/// Outcome of a delivered ruling.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RulingResponse {
    pub dispute_id: u64,
    pub action_id: u64,
    pub challenge_state: String,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the dispute router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/actions/{id}/dispute", post(dispute).get(get_dispute))
        .route("/v1/actions/{id}/dispute-fees", get(missing_fees))
        .route("/v1/actions/{id}/evidence", post(submit_evidence))
        .route("/v1/disputes/{id}/ruling", post(rule))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/actions/{id}/dispute: Escalate a waiting challenge.
#[utoipa::path(
    post,
    path = "/v1/actions/{id}/dispute",
    params(
        ("id" = u64, Path, description = "Action id"),
        ("x-accord-participant" = String, Header, description = "Submitter"),
    ),
    responses(
        (status = 201, description = "Dispute opened", body = DisputeOpenedResponse),
        (status = 403, description = "Caller is not the submitter", body = crate::error::ErrorBody),
        (status = 409, description = "Not disputable", body = crate::error::ErrorBody),
        (status = 502, description = "Arbitration service failed", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn dispute(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(by): Caller,
) -> Result<(StatusCode, Json<DisputeOpenedResponse>), AppError> {
    let dispute_id = state.agreement().dispute(ActionId(id), &by)?;
    Ok((
        StatusCode::CREATED,
        Json(DisputeOpenedResponse {
            action_id: id,
            dispute_id: dispute_id.get(),
        }),
    ))
}

/// GET /v1/actions/{id}/dispute: The action's dispute.
#[utoipa::path(
    get,
    path = "/v1/actions/{id}/dispute",
    params(("id" = u64, Path, description = "Action id")),
    responses(
        (status = 200, description = "Dispute found", body = DisputeResponse),
        (status = 404, description = "No dispute for this action", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn get_dispute(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DisputeResponse>, AppError> {
    let action_id = ActionId(id);
    let agreement = state.agreement();
    let dispute_id = agreement.challenge_of(action_id)?.dispute_id;
    let dispute = agreement.dispute_of(action_id)?;
    Ok(Json(DisputeResponse::new(action_id, dispute_id, dispute)))
}

/// GET /v1/actions/{id}/dispute-fees: Fee the submitter must add to dispute.
#[utoipa::path(
    get,
    path = "/v1/actions/{id}/dispute-fees",
    params(("id" = u64, Path, description = "Action id")),
    responses(
        (status = 200, description = "Missing fees", body = MissingFeesResponse),
        (status = 404, description = "Action not challenged", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn missing_fees(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MissingFeesResponse>, AppError> {
    let (asset, amount) = state.agreement().missing_arbitration_fees(ActionId(id))?;
    Ok(Json(MissingFeesResponse {
        action_id: id,
        asset: asset.to_string(),
        amount,
    }))
}

/// POST /v1/actions/{id}/evidence: Forward evidence to the open dispute.
#[utoipa::path(
    post,
    path = "/v1/actions/{id}/evidence",
    request_body = EvidenceRequest,
    params(
        ("id" = u64, Path, description = "Action id"),
        ("x-accord-participant" = String, Header, description = "Submitter or challenger"),
    ),
    responses(
        (status = 201, description = "Evidence recorded", body = EvidenceSubmittedResponse),
        (status = 403, description = "Caller is not a party", body = crate::error::ErrorBody),
        (status = 409, description = "Not in dispute, or caller finished", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn submit_evidence(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(by): Caller,
    body: Result<Json<EvidenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EvidenceSubmittedResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let evidence_id = state
        .agreement()
        .submit_evidence(ActionId(id), &by, req.evidence, req.finished)?;
    Ok((
        StatusCode::CREATED,
        Json(EvidenceSubmittedResponse {
            evidence_id: evidence_id.to_string(),
        }),
    ))
}

/// POST /v1/disputes/{id}/ruling: Arbitrator delivers its final ruling.
#[utoipa::path(
    post,
    path = "/v1/disputes/{id}/ruling",
    request_body = RulingRequest,
    params(
        ("id" = u64, Path, description = "Dispute id"),
        ("x-accord-participant" = String, Header, description = "Arbitrator account"),
    ),
    responses(
        (status = 200, description = "Ruling applied", body = RulingResponse),
        (status = 403, description = "Caller is not the arbitrator", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown dispute", body = crate::error::ErrorBody),
        (status = 409, description = "Already ruled", body = crate::error::ErrorBody),
        (status = 422, description = "Not a final ruling", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub(crate) async fn rule(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(by): Caller,
    body: Result<Json<RulingRequest>, JsonRejection>,
) -> Result<Json<RulingResponse>, AppError> {
    let req = extract_json(body)?;
    let agreement = state.agreement();
    let dispute_id = DisputeId(id);
    let challenge_state = agreement.rule_code(dispute_id, req.ruling, &by)?;
    let action_id = agreement.action_for_dispute(dispute_id)?;
    Ok(Json(RulingResponse {
        dispute_id: id,
        action_id: action_id.get(),
        challenge_state: challenge_state.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use accord_core::ParticipantId;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn post_as(who: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-accord-participant", who)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn challenged_app() -> (Router, AppState) {
        let (state, _clock) = test_state();
        let agreement = state.agreement();
        let alice = ParticipantId::new("alice").unwrap();
        let bob = ParticipantId::new("bob").unwrap();
        agreement.stake(&alice, 100).unwrap();
        let id = agreement.schedule(&alice, "p", "alice says").unwrap();
        agreement.challenge(id, &bob, 40, "bob says").unwrap();
        (super::router().with_state(state.clone()), state)
    }

    #[tokio::test]
    async fn dispute_reports_missing_fee_first() {
        let (app, _state) = challenged_app();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/v1/actions/1/dispute-fees")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let fees: MissingFeesResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!((fees.asset.as_str(), fees.amount), ("DAI", 10));
    }

    #[tokio::test]
    async fn ruling_only_from_arbitrator_and_only_once() {
        let (app, _state) = challenged_app();
        let resp = app
            .clone()
            .oneshot(post_as("alice", "/v1/actions/1/dispute", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let opened: DisputeOpenedResponse = serde_json::from_slice(&bytes).unwrap();

        let uri = format!("/v1/disputes/{}/ruling", opened.dispute_id);
        let resp = app
            .clone()
            .oneshot(post_as("alice", &uri, serde_json::json!({"ruling": 3})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app
            .clone()
            .oneshot(post_as("arbitrator", &uri, serde_json::json!({"ruling": 3})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let ruled: RulingResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ruled.challenge_state, "REJECTED");

        let resp = app
            .oneshot(post_as("arbitrator", &uri, serde_json::json!({"ruling": 4})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn evidence_is_listed_on_the_dispute() {
        let (app, state) = challenged_app();
        let alice = ParticipantId::new("alice").unwrap();
        state.agreement().dispute(ActionId(1), &alice).unwrap();

        let resp = app
            .clone()
            .oneshot(post_as(
                "bob",
                "/v1/actions/1/evidence",
                serde_json::json!({"evidence": "receipt", "finished": true}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/v1/actions/1/dispute")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let dispute: DisputeResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(dispute.challenger_finished_evidence);
        assert!(!dispute.submitter_finished_evidence);
        assert_eq!(dispute.evidence.len(), 3);
        assert_eq!(dispute.evidence[2].party, "challenger");
    }
}
