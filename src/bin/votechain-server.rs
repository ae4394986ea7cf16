#![forbid(unsafe_code)]
//! HTTP server for the VoteChain ledger

use votechain::api::{run_api_server, ApiState};
use votechain::node::Node;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let node = Node::init()?;

    tracing::info!(
        host = %node.config.api.host,
        port = node.config.api.port,
        difficulty = node.config.ledger.difficulty,
        "starting VoteChain server"
    );

    let state = ApiState::new(node.booth.clone());
    run_api_server(state, &node.config.api).await
}
