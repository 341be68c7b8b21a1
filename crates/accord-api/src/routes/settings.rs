//! # Settings Routes
//!
//! Append-only settings registry, signer review, and signer status.

use accord_agreement::SignerInfo;
use accord_core::{AssetId, ParticipantId, SettingId};
use accord_state::{Setting, SettingParams};
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

/// Parameters of a new setting.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeSettingRequest {
    /// Arbitration content reference.
    pub content: String,
    /// Collateral asset symbol.
    pub collateral_asset: String,
    /// Collateral locked per scheduled action.
    pub collateral_amount: u64,
    /// Stake a challenger escrows.
    pub challenge_stake: u64,
    /// Challenge window, seconds.
    pub delay_period_secs: u64,
    /// Answer window, seconds.
    pub settlement_period_secs: u64,
}

impl Validate for ChangeSettingRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("content", &self.content)?;
        require_non_empty("collateral_asset", &self.collateral_asset)
    }
}

/// A registry entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingResponse {
    pub setting_id: u64,
    pub content: String,
    pub collateral_asset: String,
    pub collateral_amount: u64,
    pub challenge_stake: u64,
    pub delay_period_secs: u64,
    pub settlement_period_secs: u64,
    pub created_at: String,
}

impl From<Setting> for SettingResponse {
    fn from(s: Setting) -> Self {
        Self {
            setting_id: s.id.get(),
            content: s.content,
            collateral_asset: s.collateral_asset.to_string(),
            collateral_amount: s.collateral_amount,
            challenge_stake: s.challenge_stake,
            delay_period_secs: s.delay_period,
            settlement_period_secs: s.settlement_period,
            created_at: s.created_at.to_iso8601(),
        }
    }
}

/// Setting the caller just signed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignResponse {
    pub setting_id: u64,
}

/// Review status of one signer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignerResponse {
    pub participant: String,
    pub last_setting_signed: Option<u64>,
    pub must_review: bool,
}

impl From<SignerInfo> for SignerResponse {
    fn from(info: SignerInfo) -> Self {
        Self {
            participant: info.participant.to_string(),
            last_setting_signed: info.last_setting_signed.map(|id| id.get()),
            must_review: info.must_review,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/settings", post(change_setting))
        .route("/v1/settings/current", get(current_setting))
        .route("/v1/settings/{id}", get(get_setting))
        .route("/v1/sign", post(sign))
        .route("/v1/signers/{participant}", get(get_signer))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/settings: Append a new setting.
#[utoipa::path(
    post,
    path = "/v1/settings",
    request_body = ChangeSettingRequest,
    params(("x-accord-participant" = String, Header, description = "Acting participant")),
    responses(
        (status = 201, description = "Setting appended", body = SettingResponse),
        (status = 403, description = "Caller lacks manage_settings", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid setting", body = crate::error::ErrorBody),
    ),
    tag = "settings"
)]
pub(crate) async fn change_setting(
    State(state): State<AppState>,
    Caller(by): Caller,
    body: Result<Json<ChangeSettingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SettingResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let params = SettingParams {
        content: req.content,
        collateral_asset: AssetId::new(req.collateral_asset)?,
        collateral_amount: req.collateral_amount,
        challenge_stake: req.challenge_stake,
        delay_period: req.delay_period_secs,
        settlement_period: req.settlement_period_secs,
    };
    let agreement = state.agreement();
    let id = agreement.change_setting(&by, params)?;
    Ok((StatusCode::CREATED, Json(agreement.setting(id)?.into())))
}

/// GET /v1/settings/current: The setting new actions bind to.
#[utoipa::path(
    get,
    path = "/v1/settings/current",
    responses((status = 200, description = "Current setting", body = SettingResponse)),
    tag = "settings"
)]
pub(crate) async fn current_setting(State(state): State<AppState>) -> Json<SettingResponse> {
    Json(state.agreement().current_setting().into())
}

/// GET /v1/settings/{id}: One registry entry.
#[utoipa::path(
    get,
    path = "/v1/settings/{id}",
    params(("id" = u64, Path, description = "Setting id")),
    responses(
        (status = 200, description = "Setting found", body = SettingResponse),
        (status = 404, description = "Unknown setting", body = crate::error::ErrorBody),
    ),
    tag = "settings"
)]
pub(crate) async fn get_setting(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SettingResponse>, AppError> {
    Ok(Json(state.agreement().setting(SettingId(id))?.into()))
}

/// POST /v1/sign: Review the current setting.
#[utoipa::path(
    post,
    path = "/v1/sign",
    params(("x-accord-participant" = String, Header, description = "Acting participant")),
    responses(
        (status = 200, description = "Signed", body = SignResponse),
        (status = 409, description = "Already signed", body = crate::error::ErrorBody),
    ),
    tag = "settings"
)]
pub(crate) async fn sign(
    State(state): State<AppState>,
    Caller(participant): Caller,
) -> Result<Json<SignResponse>, AppError> {
    let id = state.agreement().sign(&participant)?;
    Ok(Json(SignResponse {
        setting_id: id.get(),
    }))
}

/// GET /v1/signers/{participant}: Signer review status.
#[utoipa::path(
    get,
    path = "/v1/signers/{participant}",
    params(("participant" = String, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Signer status", body = SignerResponse),
        (status = 422, description = "Malformed participant id", body = crate::error::ErrorBody),
    ),
    tag = "settings"
)]
pub(crate) async fn get_signer(
    State(state): State<AppState>,
    Path(participant): Path<String>,
) -> Result<Json<SignerResponse>, AppError> {
    let participant = ParticipantId::new(participant)?;
    Ok(Json(state.agreement().signer(&participant).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let (state, _clock) = test_state();
        super::router().with_state(state)
    }

    async fn json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn current_setting_is_the_initial_one() {
        let resp = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v1/settings/current")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let setting: SettingResponse = json(resp).await;
        assert_eq!(setting.setting_id, 0);
        assert_eq!(setting.collateral_asset, "ANT");
        assert_eq!(setting.collateral_amount, 100);
    }

    #[tokio::test]
    async fn change_setting_requires_caller() {
        let body = serde_json::json!({
            "content": "ipfs:v2",
            "collateral_asset": "ANT",
            "collateral_amount": 200,
            "challenge_stake": 50,
            "delay_period_secs": 60,
            "settlement_period_secs": 60
        });
        let resp = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/settings")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let body = serde_json::json!({
            "content": " ",
            "collateral_asset": "ANT",
            "collateral_amount": 200,
            "challenge_stake": 50,
            "delay_period_secs": 60,
            "settlement_period_secs": 60
        });
        let resp = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/settings")
                    .header("content-type", "application/json")
                    .header("x-accord-participant", "alice")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
