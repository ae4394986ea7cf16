//! REST API for VoteChain
//!
//! Exposes the ledger to dashboard, explorer and vote-casting frontends:
//! chain browsing and search, integrity checks, tallies, and vote
//! submission through the [`VotingBooth`].

use axum::{
    extract::{Path, Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::blockchain::{Block, ChainSummary};
use crate::config::ApiConfig;
use crate::error::ChainError;
use crate::voting::{ChoiceResult, VotingBooth};

/// Largest page size served by `GET /api/chain`.
const MAX_PAGE_SIZE: usize = 100;

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub booth: VotingBooth,
    api_stats: Arc<RwLock<ApiStats>>,
}

impl ApiState {
    pub fn new(booth: VotingBooth) -> Self {
        Self {
            booth,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn get_stats(&self) -> Result<ApiStatsResponse, ChainError> {
        let chain_length = self.booth.ledger().read_async(|chain| chain.block_count()).await?;
        let stats = self.api_stats.read().await;

        Ok(ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            votes_recorded: stats.votes_recorded,
            votes_rejected: stats.votes_rejected,
            uptime_seconds: stats.start_time.elapsed().as_secs(),
            chain_length,
        })
    }
}

#[derive(Debug)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    votes_recorded: u64,
    votes_rejected: u64,
    start_time: Instant,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            votes_recorded: 0,
            votes_rejected: 0,
            start_time: Instant::now(),
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Chain(e) => match e {
                ChainError::InvalidVote(_) | ChainError::UnknownChoice(_) => StatusCode::BAD_REQUEST,
                ChainError::AlreadyVoted(_) => StatusCode::CONFLICT,
                ChainError::MiningCancelled | ChainError::MiningTimeout(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };
        let message = match self {
            ApiError::Chain(e) => e.to_string(),
            ApiError::NotFound(msg) => msg,
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub votes_recorded: u64,
    pub votes_rejected: u64,
    pub uptime_seconds: u64,
    pub chain_length: usize,
}

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub voter_id: String,
    pub choice: String,
}

#[derive(Serialize)]
struct ChainPage {
    blocks: Vec<Block>,
    total: usize,
    page: usize,
    limit: usize,
}

#[derive(Serialize)]
struct ValidityResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ResultsResponse {
    total_votes: u64,
    leader: Option<String>,
    results: Vec<ChoiceResult>,
}

#[derive(Serialize)]
struct VoterStatus {
    voter_id: String,
    has_voted: bool,
}

#[derive(Deserialize)]
struct PaginationQuery {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_page() -> usize {
    0
}
fn default_limit() -> usize {
    10
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    state.api_stats.write().await.record_request(success);

    response
}

async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the router with every endpoint mounted under `/api`.
pub fn build_api_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    let api_routes = Router::new()
        // Chain endpoints
        .route("/chain", get(get_chain))
        .route("/chain/summary", get(get_summary))
        .route("/chain/valid", get(get_validity))
        .route("/chain/search/:query", get(search_chain))
        .route("/block/:index", get(get_block))
        // Voting endpoints
        .route("/votes", post(cast_vote))
        .route("/results", get(get_results))
        .route("/choices", get(get_choices))
        .route("/voters/:voter_id", get(get_voter_status))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), stats_middleware))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn run_api_server(state: ApiState, config: &ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "api server listening");

    axum::serve(listener, build_api_router(state)).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_chain(
    State(state): State<ApiState>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ChainPage>, ApiError> {
    let limit = params.limit.min(MAX_PAGE_SIZE);
    let offset = params.page.saturating_mul(limit);

    let (blocks, total) = state
        .booth
        .ledger()
        .read_async(move |chain| {
            let blocks: Vec<Block> = chain.blocks().iter().skip(offset).take(limit).cloned().collect();
            (blocks, chain.block_count())
        })
        .await?;

    Ok(Json(ChainPage {
        blocks,
        total,
        page: params.page,
        limit,
    }))
}

async fn get_summary(State(state): State<ApiState>) -> Result<Json<ChainSummary>, ApiError> {
    let summary = state.booth.ledger().read_async(|chain| chain.summary()).await?;
    Ok(Json(summary))
}

async fn get_validity(State(state): State<ApiState>) -> Result<Json<ValidityResponse>, ApiError> {
    let verdict = state.booth.ledger().read_async(|chain| chain.verify()).await?;
    Ok(Json(ValidityResponse {
        valid: verdict.is_ok(),
        error: verdict.err().map(|e| e.to_string()),
    }))
}

async fn search_chain(
    State(state): State<ApiState>,
    Path(query): Path<String>,
) -> Result<Json<Block>, ApiError> {
    let lookup = query.clone();
    state
        .booth
        .ledger()
        .read_async(move |chain| chain.search(&lookup).cloned())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No block matches {}", query)))
}

async fn get_block(
    State(state): State<ApiState>,
    Path(index): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    state
        .booth
        .ledger()
        .read_async(move |chain| chain.block_by_index(index).cloned())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Block {} not found", index)))
}

async fn cast_vote(
    State(state): State<ApiState>,
    Json(request): Json<CastVoteRequest>,
) -> Result<(StatusCode, Json<Block>), ApiError> {
    let outcome = state.booth.cast_vote_async(request.voter_id, request.choice).await;

    {
        let mut stats = state.api_stats.write().await;
        if outcome.is_ok() {
            stats.votes_recorded += 1;
        } else {
            stats.votes_rejected += 1;
        }
    }

    Ok((StatusCode::CREATED, Json(outcome?)))
}

async fn get_results(State(state): State<ApiState>) -> Result<Json<ResultsResponse>, ApiError> {
    // one snapshot, so the totals always agree with the rows
    let tally = state.booth.ledger().read_async(|chain| chain.results()).await?;
    Ok(Json(ResultsResponse {
        total_votes: tally.total(),
        leader: tally.leader().map(|(choice, _)| choice.to_string()),
        results: state.booth.rows_for(&tally),
    }))
}

async fn get_choices(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({ "choices": state.booth.choices() }))
}

async fn get_voter_status(
    State(state): State<ApiState>,
    Path(voter_id): Path<String>,
) -> Result<Json<VoterStatus>, ApiError> {
    let lookup = voter_id.clone();
    let has_voted = state
        .booth
        .ledger()
        .read_async(move |chain| chain.has_voted(&lookup))
        .await?;

    Ok(Json(VoterStatus { voter_id, has_voted }))
}

async fn get_api_stats(State(state): State<ApiState>) -> Result<Json<ApiStatsResponse>, ApiError> {
    Ok(Json(state.get_stats().await?))
}
