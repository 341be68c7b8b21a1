//! # Integration Tests for accord-api
//!
//! Drives the assembled router end to end: health probes, OpenAPI, the
//! error envelope, and full action lifecycles through challenge, dispute
//! and ruling, checking ledger conservation after each flow.

use std::sync::Arc;

use accord_agreement::AgreementConfig;
use accord_api::state::AppState;
use accord_core::ManualClock;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const CONFIG: &str = r#"
setting:
  content: "ipfs:integration"
  collateral_asset: ANT
  collateral_amount: 100
  challenge_stake: 50
  delay_period_secs: 86400
  settlement_period_secs: 3600
permissions:
  manage_settings: [council]
arbitrator:
  account: court
  fee_asset: DAI
  fee_amount: 20
genesis:
  - { holder: alice, asset: ANT, amount: 10000 }
  - { holder: alice, asset: DAI, amount: 1000 }
  - { holder: bob, asset: ANT, amount: 10000 }
  - { holder: bob, asset: DAI, amount: 1000 }
"#;

/// Helper: build the test app on a manual clock.
fn test_app() -> (axum::Router, AppState, Arc<ManualClock>) {
    let config = AgreementConfig::from_yaml_str(CONFIG).unwrap();
    let clock = Arc::new(ManualClock::at_epoch(1_700_000_000));
    let state = AppState::from_config(&config, clock.clone()).unwrap();
    (accord_api::app(state.clone()), state, clock)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(app: &axum::Router, who: &str, uri: &str, body: Value) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("x-accord-participant", who)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn ant_balance(app: &axum::Router, who: &str) -> Value {
    body_json(get(app, &format!("/v1/balances/{who}/ANT")).await).await
}

fn assert_conserved(state: &AppState) {
    for check in state.deployment.custody_checks() {
        assert!(check.holds(), "{check:?}");
    }
}

/// Stake for alice and schedule one action; returns its id.
async fn scheduled(app: &axum::Router) -> u64 {
    let resp = post(app, "alice", "/v1/stake", json!({"amount": 100})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = post(
        app,
        "alice",
        "/v1/actions",
        json!({"payload_ref": "vote:7", "context": "enact vote 7"}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["action_id"].as_u64().unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let (app, _, _) = test_app();
    let response = get(&app, "/health/liveness").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let (app, _, _) = test_app();
    let response = get(&app, "/health/readiness").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _, _) = test_app();
    let response = get(&app, "/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["info"]["title"], "Accord API");
    assert!(doc["paths"]["/v1/disputes/{id}/ruling"].is_object());
}

// -- Error Envelope -----------------------------------------------------------

#[tokio::test]
async fn test_unknown_action_uses_error_envelope() {
    let (app, _, _) = test_app();
    let response = get(&app, "/v1/actions/99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ACTION_DOES_NOT_EXIST");
    assert_eq!(body["error"]["details"]["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn test_restricted_role_is_forbidden() {
    let (app, _, _) = test_app();
    let setting = json!({
        "content": "ipfs:v2",
        "collateral_asset": "ANT",
        "collateral_amount": 200,
        "challenge_stake": 50,
        "delay_period_secs": 60,
        "settlement_period_secs": 60
    });
    let response = post(&app, "alice", "/v1/settings", setting.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"]["code"], "MISSING_PERMISSION");

    let response = post(&app, "council", "/v1/settings", setting).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["setting_id"], 1);

    let signer = body_json(get(&app, "/v1/signers/alice").await).await;
    assert_eq!(signer["must_review"], true);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _, _) = test_app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/actions")
                .header("content-type", "application/json")
                .header("x-accord-participant", "alice")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

// -- Lifecycles ---------------------------------------------------------------

#[tokio::test]
async fn test_unchallenged_action_executes_after_delay() {
    let (app, state, clock) = test_app();
    let id = scheduled(&app).await;
    let paths = body_json(get(&app, &format!("/v1/actions/{id}/paths")).await).await;
    assert_eq!(paths["can_challenge"], true);
    assert_eq!(paths["can_execute"], false);

    clock.advance(86_401);
    let response = post(&app, "bob", &format!("/v1/actions/{id}/execute"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["state"], "EXECUTED");

    let alice = ant_balance(&app, "alice").await;
    assert_eq!((alice["available"].as_u64(), alice["locked"].as_u64()), (Some(100), Some(0)));
    let paths = body_json(get(&app, &format!("/v1/actions/{id}/paths")).await).await;
    assert!(paths.as_object().unwrap().values().all(|v| v == false));
    assert_conserved(&state);
}

#[tokio::test]
async fn test_challenge_dispute_and_ruling_for_challenger() {
    let (app, state, _clock) = test_app();
    let id = scheduled(&app).await;

    let response = post(
        &app,
        "bob",
        &format!("/v1/actions/{id}/challenge"),
        json!({"settlement_offer": 40, "context": "vote 7 is malicious"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(ant_balance(&app, "alice").await["challenged"], 100);

    let fees = body_json(get(&app, &format!("/v1/actions/{id}/dispute-fees")).await).await;
    assert_eq!(fees["amount"], 10);

    let response = post(&app, "alice", &format!("/v1/actions/{id}/dispute"), json!({})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let dispute_id = body_json(response).await["dispute_id"].as_u64().unwrap();

    let response = post(
        &app,
        "alice",
        &format!("/v1/actions/{id}/evidence"),
        json!({"evidence": "audit report", "finished": true}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post(
        &app,
        "court",
        &format!("/v1/disputes/{dispute_id}/ruling"),
        json!({"ruling": 4}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["challenge_state"], "ACCEPTED");

    let alice = ant_balance(&app, "alice").await;
    assert_eq!(alice["challenged"], 0);
    assert_eq!(alice["available"], 0);
    let bob = accord_core::ParticipantId::new("bob").unwrap();
    let ant = accord_core::AssetId::new("ANT").unwrap();
    assert_eq!(state.deployment.transfer.balance_of(&bob, &ant), 10_000 + 100);
    assert_conserved(&state);
}

#[tokio::test]
async fn test_settlement_claimed_after_answer_window() {
    let (app, state, clock) = test_app();
    let id = scheduled(&app).await;
    post(
        &app,
        "bob",
        &format!("/v1/actions/{id}/challenge"),
        json!({"settlement_offer": 40, "context": "no"}),
    )
    .await;

    let response = post(&app, "bob", &format!("/v1/actions/{id}/settle"), json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    clock.advance(3_601);
    let response = post(&app, "bob", &format!("/v1/actions/{id}/settle"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["state"], "SETTLED");

    let response = post(&app, "alice", &format!("/v1/actions/{id}/dispute"), json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(ant_balance(&app, "alice").await["available"], 60);
    assert_conserved(&state);
}

#[tokio::test]
async fn test_payload_failure_is_bad_gateway() {
    let (app, state, clock) = test_app();
    let id = scheduled(&app).await;
    state.deployment.payloads.fail_on("vote:7");
    clock.advance(86_401);

    let response = post(&app, "bob", &format!("/v1/actions/{id}/execute"), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"]["code"], "PAYLOAD_FAILED");
    let action = body_json(get(&app, &format!("/v1/actions/{id}")).await).await;
    assert_eq!(action["state"], "SCHEDULED");
    assert_eq!(ant_balance(&app, "alice").await["locked"], 100);
}
