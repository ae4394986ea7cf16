//! Integration tests for VoteChain API endpoints
//!
//! These tests drive the router the server binary mounts and check the JSON
//! each dashboard endpoint returns before and after votes are cast.

#![cfg(feature = "api")]

use axum_test::TestServer;
use serde_json::{json, Value};
use votechain::api::{build_api_router, ApiState};
use votechain::node::LedgerHandle;
use votechain::voting::VotingBooth;

fn test_server() -> TestServer {
    let ledger = LedgerHandle::with_difficulty(1).expect("Failed to create ledger");
    let choices = vec!["Green Party".to_string(), "Independent".to_string()];
    let booth = VotingBooth::new(ledger, choices).expect("Failed to create voting booth");

    TestServer::new(build_api_router(ApiState::new(booth))).expect("Failed to create test server")
}

#[tokio::test]
async fn test_dashboard_endpoints() {
    let server = test_server();

    // Test /api/health
    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());

    // Test /api/chain/summary
    let response = server.get("/api/chain/summary").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total_blocks"], 1); // Genesis block
    assert_eq!(json["total_votes"], 0);
    assert_eq!(json["difficulty"], 1);
    assert_eq!(json["is_valid"], true);

    // Test /api/chain/valid
    let response = server.get("/api/chain/valid").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["valid"], true);
    assert!(json.get("error").is_none());

    // Test /api/block/0
    let response = server.get("/api/block/0").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["index"], 0);
    assert_eq!(json["previous_hash"], "0");

    // Test /api/choices
    let response = server.get("/api/choices").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["choices"], json!(["Green Party", "Independent"]));

    // Test /api/stats
    let response = server.get("/api/stats").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert!(json["total_requests"].is_number());
    assert!(json["uptime_seconds"].is_number());
    assert_eq!(json["chain_length"], 1);
}

#[tokio::test]
async fn test_vote_lifecycle() {
    let server = test_server();

    let response = server
        .post("/api/votes")
        .json(&json!({ "voter_id": "v1", "choice": "Green Party" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let block: Value = response.json();
    assert_eq!(block["index"], 1);
    assert_eq!(block["payload"]["voter_id"], "v1");
    assert!(block["hash"].as_str().unwrap().starts_with('0'));

    // Same voter again
    let response = server
        .post("/api/votes")
        .json(&json!({ "voter_id": "v1", "choice": "Independent" }))
        .await;
    assert_eq!(response.status_code(), 409);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("v1"));

    // Not on the ballot
    let response = server
        .post("/api/votes")
        .json(&json!({ "voter_id": "v2", "choice": "Whig" }))
        .await;
    assert_eq!(response.status_code(), 400);

    // Blank voter id
    let response = server
        .post("/api/votes")
        .json(&json!({ "voter_id": "  ", "choice": "Independent" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server.get("/api/voters/v1").await;
    let json: Value = response.json();
    assert_eq!(json["voter_id"], "v1");
    assert_eq!(json["has_voted"], true);

    let response = server.get("/api/voters/v2").await;
    let json: Value = response.json();
    assert_eq!(json["has_voted"], false);

    let response = server.get("/api/results").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total_votes"], 1);
    assert_eq!(json["leader"], "Green Party");
    assert_eq!(json["results"][0]["choice"], "Green Party");
    assert_eq!(json["results"][0]["votes"], 1);
    assert_eq!(json["results"][1]["votes"], 0);

    let response = server.get("/api/stats").await;
    let json: Value = response.json();
    assert_eq!(json["votes_recorded"], 1);
    assert_eq!(json["votes_rejected"], 3);
    assert_eq!(json["chain_length"], 2);
}

#[tokio::test]
async fn test_chain_browsing_and_search() {
    let server = test_server();
    for voter in ["v1", "v2", "v3"] {
        let response = server
            .post("/api/votes")
            .json(&json!({ "voter_id": voter, "choice": "Independent" }))
            .await;
        assert_eq!(response.status_code(), 201);
    }

    let response = server.get("/api/chain?page=1&limit=2").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total"], 4);
    assert_eq!(json["page"], 1);
    let blocks = json["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["index"], 2);
    assert_eq!(blocks[1]["index"], 3);

    // Oversized pages are capped
    let response = server.get("/api/chain?limit=5000").await;
    let json: Value = response.json();
    assert_eq!(json["limit"], 100);
    assert_eq!(json["blocks"].as_array().unwrap().len(), 4);

    // Search by index, hash and voter id
    let response = server.get("/api/chain/search/2").await;
    assert_eq!(response.status_code(), 200);
    let by_index: Value = response.json();
    assert_eq!(by_index["payload"]["voter_id"], "v2");

    let hash = by_index["hash"].as_str().unwrap().to_string();
    let response = server.get(&format!("/api/chain/search/{}", hash)).await;
    let by_hash: Value = response.json();
    assert_eq!(by_hash["index"], 2);

    let response = server.get("/api/chain/search/v3").await;
    let by_voter: Value = response.json();
    assert_eq!(by_voter["index"], 3);

    let response = server.get("/api/chain/search/nobody").await;
    assert_eq!(response.status_code(), 404);

    let response = server.get("/api/block/99").await;
    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert!(json["error"].is_string());
}
