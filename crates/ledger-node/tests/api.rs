use axum::http::StatusCode;
use axum_test::TestServer;
use ledger_core::{ChainRegistry, Difficulty, LedgerConfig};
use ledger_node::{router, AppState};
use serde_json::{json, Value};
use std::time::Duration;

fn server_with(config: LedgerConfig, chains: &[&str]) -> TestServer {
    let registry = ChainRegistry::new(config);
    for name in chains {
        registry.create(name).expect("fresh registry");
    }
    TestServer::new(router(AppState::new(registry))).expect("test server")
}

fn server() -> TestServer {
    let config = LedgerConfig {
        difficulty: Difficulty::new(2).unwrap(),
        mine_timeout: None,
    };
    server_with(config, &["main"])
}

#[tokio::test]
async fn health_and_listing() {
    let server = server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");

    let response = server.get("/chains").await;
    response.assert_status_ok();
    let chains: Value = response.json();
    assert_eq!(chains[0]["name"], "main");
    assert_eq!(chains[0]["length"], 1);
}

#[tokio::test]
async fn create_and_fetch_chain() {
    let server = server();

    let response = server.post("/chains").json(&json!({ "name": "side" })).await;
    response.assert_status(StatusCode::CREATED);
    let chain: Value = response.json();
    assert_eq!(chain["length"], 1);
    assert_eq!(chain["blocks"][0]["proof"], 100);
    assert_eq!(chain["difficulty"], 2);

    let response = server.post("/chains").json(&json!({ "name": "side" })).await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server.get("/chains/missing").await;
    response.assert_status_not_found();
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("missing"));
}

#[tokio::test]
async fn submit_mine_and_validate() {
    let server = server();

    let response = server
        .post("/chains/main/transactions")
        .json(&json!({ "sender": "bob", "recipient": "alice", "amount": 10 }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.json::<Value>()["index"], 1);

    let response = server.post("/chains/main/mine").await;
    response.assert_status(StatusCode::CREATED);
    let block: Value = response.json();
    assert_eq!(block["index"], 2);
    assert_eq!(block["transactions"][0]["sender"], "bob");
    assert_eq!(block["hash"].as_str().unwrap().len(), 64);

    let response = server.get("/chains/main/validate").await;
    response.assert_status_ok();
    let validation: Value = response.json();
    assert_eq!(validation["valid"], true);
    assert!(validation.get("error").is_none());

    let chain: Value = server.get("/chains/main").await.json();
    assert_eq!(chain["length"], 2);
    assert_eq!(chain["pending"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn bad_proof_is_reported_by_validation() {
    let server = server();

    // The second seal is 0 after 0: sha256("0") starts with "5f".
    server
        .post("/chains/main/blocks")
        .json(&json!({ "proof": 0 }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/chains/main/blocks")
        .json(&json!({ "proof": 0 }))
        .await
        .assert_status(StatusCode::CREATED);

    let validation: Value = server.get("/chains/main/validate").await.json();
    assert_eq!(validation["valid"], false);
    assert!(validation["error"].as_str().unwrap().contains("proof"));
}

#[tokio::test]
async fn consensus_picks_longest_valid() {
    let server = server();
    server.post("/chains").json(&json!({ "name": "long" })).await;
    server.post("/chains").json(&json!({ "name": "broken" })).await;

    for _ in 0..2 {
        server.post("/chains/long/mine").await.assert_status(StatusCode::CREATED);
    }
    for _ in 0..4 {
        server
            .post("/chains/broken/blocks")
            .json(&json!({ "proof": 0 }))
            .await;
    }

    let response = server
        .post("/consensus")
        .json(&json!({ "chains": ["main", "broken", "long"] }))
        .await;
    response.assert_status_ok();
    let out: Value = response.json();
    assert_eq!(out["winner"], "long");
    assert_eq!(out["length"], 3);

    let response = server
        .post("/consensus")
        .json(&json!({ "chains": ["broken"] }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn merkle_endpoint() {
    let server = server();

    let response = server
        .post("/merkle")
        .json(&json!({ "values": ["a", "b", "c"] }))
        .await;
    response.assert_status_ok();
    let out: Value = response.json();
    assert_eq!(out["leaves"], 3);
    assert_eq!(out["depth"], 2);
    assert_eq!(out["root"].as_str().unwrap().len(), 64);

    let response = server.post("/merkle").json(&json!({ "values": [] })).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn mining_times_out() {
    let config = LedgerConfig {
        difficulty: Difficulty::new(64).unwrap(),
        mine_timeout: Some(Duration::from_millis(20)),
    };
    let server = server_with(config, &["hard"]);
    let response = server.post("/chains/hard/mine").await;
    response.assert_status(StatusCode::REQUEST_TIMEOUT);
}
