//! # Staking Routes
//!
//! Deposits into and withdrawals from the staking ledger, plus balance
//! queries. Amounts are validated by the ledger itself so zero amounts and
//! floor violations come back with the ledger's own error codes.

use accord_core::{AssetId, ParticipantId};
use accord_staking::Balance;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, require_non_empty, Caller, Validate};
use crate::state::AppState;

// ── Request / Response types ────────────────────────────────────────

/// Stake the caller's own funds.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StakeRequest {
    pub amount: u64,
}

/// Stake on behalf of another participant; the caller pays.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StakeForRequest {
    /// Participant credited with the stake.
    pub participant: String,
    pub amount: u64,
}

impl Validate for StakeForRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("participant", &self.participant)
    }
}

/// Withdraw available balance.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UnstakeRequest {
    pub amount: u64,
    /// Asset to withdraw. Defaults to the current collateral asset.
    #[serde(default)]
    pub asset: Option<String>,
}

/// One participant's balance of one asset.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub participant: String,
    pub asset: String,
    pub available: u64,
    pub locked: u64,
    pub challenged: u64,
}

impl BalanceResponse {
    fn new(participant: &ParticipantId, asset: &AssetId, balance: Balance) -> Self {
        Self {
            participant: participant.to_string(),
            asset: asset.to_string(),
            available: balance.available,
            locked: balance.locked,
            challenged: balance.challenged,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the staking router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/stake", post(stake))
        .route("/v1/stake-for", post(stake_for))
        .route("/v1/unstake", post(unstake))
        .route("/v1/balances/{participant}/{asset}", get(get_balance))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/stake: Stake collateral from the caller's holdings.
#[utoipa::path(
    post,
    path = "/v1/stake",
    request_body = StakeRequest,
    params(("x-accord-participant" = String, Header, description = "Acting participant")),
    responses(
        (status = 200, description = "Staked", body = BalanceResponse),
        (status = 422, description = "Invalid amount", body = crate::error::ErrorBody),
        (status = 502, description = "Value transfer failed", body = crate::error::ErrorBody),
    ),
    tag = "staking"
)]
pub(crate) async fn stake(
    State(state): State<AppState>,
    Caller(participant): Caller,
    body: Result<Json<StakeRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let req = extract_json(body)?;
    let agreement = state.agreement();
    let balance = agreement.stake(&participant, req.amount)?;
    let asset = agreement.current_setting().collateral_asset;
    Ok(Json(BalanceResponse::new(&participant, &asset, balance)))
}

/// POST /v1/stake-for: Stake for another participant, paid by the caller.
#[utoipa::path(
    post,
    path = "/v1/stake-for",
    request_body = StakeForRequest,
    params(("x-accord-participant" = String, Header, description = "Paying participant")),
    responses(
        (status = 200, description = "Staked", body = BalanceResponse),
        (status = 403, description = "Beneficiary lacks sign role", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid amount", body = crate::error::ErrorBody),
    ),
    tag = "staking"
)]
pub(crate) async fn stake_for(
    State(state): State<AppState>,
    Caller(payer): Caller,
    body: Result<Json<StakeForRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let participant = ParticipantId::new(req.participant)?;
    let agreement = state.agreement();
    let balance = agreement.stake_for(&payer, &participant, req.amount)?;
    let asset = agreement.current_setting().collateral_asset;
    Ok(Json(BalanceResponse::new(&participant, &asset, balance)))
}

/// POST /v1/unstake: Withdraw available balance to the caller.
#[utoipa::path(
    post,
    path = "/v1/unstake",
    request_body = UnstakeRequest,
    params(("x-accord-participant" = String, Header, description = "Acting participant")),
    responses(
        (status = 200, description = "Unstaked", body = BalanceResponse),
        (status = 422, description = "Insufficient balance or below collateral floor", body = crate::error::ErrorBody),
    ),
    tag = "staking"
)]
pub(crate) async fn unstake(
    State(state): State<AppState>,
    Caller(participant): Caller,
    body: Result<Json<UnstakeRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let req = extract_json(body)?;
    let agreement = state.agreement();
    let asset = match req.asset {
        Some(symbol) => AssetId::new(symbol)?,
        None => agreement.current_setting().collateral_asset,
    };
    let balance = agreement.unstake_asset(&participant, &asset, req.amount)?;
    Ok(Json(BalanceResponse::new(&participant, &asset, balance)))
}

/// GET /v1/balances/{participant}/{asset}: Staked balance.
#[utoipa::path(
    get,
    path = "/v1/balances/{participant}/{asset}",
    params(
        ("participant" = String, Path, description = "Participant id"),
        ("asset" = String, Path, description = "Asset symbol"),
    ),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 422, description = "Malformed identifier", body = crate::error::ErrorBody),
    ),
    tag = "staking"
)]
pub(crate) async fn get_balance(
    State(state): State<AppState>,
    Path((participant, asset)): Path<(String, String)>,
) -> Result<Json<BalanceResponse>, AppError> {
    let participant = ParticipantId::new(participant)?;
    let asset = AssetId::new(asset)?;
    let balance = state.agreement().balance(&participant, &asset);
    Ok(Json(BalanceResponse::new(&participant, &asset, balance)))
}
