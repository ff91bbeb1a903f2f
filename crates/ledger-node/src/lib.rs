//! HTTP entry point over a [`ChainRegistry`]: submit transactions, seal or
//! mine blocks, validate, and run consensus across named chains.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{merkle::MerkleTree, Block, Chain, ChainRegistry, LedgerError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    registry: Arc<ChainRegistry>,
}

impl AppState {
    pub fn new(registry: ChainRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }
}

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(err) => {
                let status = match err {
                    LedgerError::UnknownChain(_) => StatusCode::NOT_FOUND,
                    LedgerError::ChainExists(_) => StatusCode::CONFLICT,
                    LedgerError::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
                    LedgerError::SearchExhausted => StatusCode::SERVICE_UNAVAILABLE,
                    LedgerError::NoValidChain
                    | LedgerError::EmptyInput(_)
                    | LedgerError::Config(_)
                    | LedgerError::StructuralMismatch { .. }
                    | LedgerError::ProofInvalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, err.to_string())
            }
            ApiError::Internal(message) => {
                error!(%message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct ChainSummary {
    name: String,
    length: usize,
    pending: usize,
}

#[derive(Serialize)]
struct ChainView {
    name: String,
    length: usize,
    #[serde(flatten)]
    chain: Chain,
}

#[derive(Serialize)]
struct SealedBlock {
    hash: String,
    #[serde(flatten)]
    block: Block,
}

impl From<Block> for SealedBlock {
    fn from(block: Block) -> Self {
        Self {
            hash: block.hash(),
            block,
        }
    }
}

#[derive(Deserialize)]
struct CreateChain {
    name: String,
}

#[derive(Deserialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct TxAccepted {
    index: u64,
}

#[derive(Deserialize)]
struct SealIn {
    proof: u64,
}

#[derive(Serialize)]
struct Validation {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ConsensusIn {
    chains: Vec<String>,
}

#[derive(Serialize)]
struct ConsensusOut {
    winner: String,
    length: usize,
}

#[derive(Deserialize)]
struct MerkleIn {
    values: Vec<String>,
}

#[derive(Serialize)]
struct MerkleOut {
    root: String,
    leaves: usize,
    depth: usize,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn list_chains(State(state): State<AppState>) -> ApiResult<Json<Vec<ChainSummary>>> {
    let mut out = Vec::new();
    for name in state.registry.names() {
        let chain = state.registry.get(&name)?.snapshot();
        out.push(ChainSummary {
            name,
            length: chain.len(),
            pending: chain.pending().len(),
        });
    }
    Ok(Json(out))
}

async fn create_chain(
    State(state): State<AppState>,
    Json(body): Json<CreateChain>,
) -> ApiResult<(StatusCode, Json<ChainView>)> {
    let chain = state.registry.create(&body.name)?.snapshot();
    Ok((
        StatusCode::CREATED,
        Json(ChainView {
            name: body.name,
            length: chain.len(),
            chain,
        }),
    ))
}

async fn get_chain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ChainView>> {
    let chain = state.registry.get(&name)?.snapshot();
    Ok(Json(ChainView {
        name,
        length: chain.len(),
        chain,
    }))
}

async fn submit_transaction(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(tx): Json<TxIn>,
) -> ApiResult<(StatusCode, Json<TxAccepted>)> {
    let index = state
        .registry
        .submit_transaction(&name, tx.sender, tx.recipient, tx.amount)?;
    Ok((StatusCode::ACCEPTED, Json(TxAccepted { index })))
}

async fn seal_block(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SealIn>,
) -> ApiResult<(StatusCode, Json<SealedBlock>)> {
    let block = state.registry.seal_block(&name, body.proof)?;
    Ok((StatusCode::CREATED, Json(block.into())))
}

async fn mine_block(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<(StatusCode, Json<SealedBlock>)> {
    let registry = state.registry.clone();
    let block = tokio::task::spawn_blocking(move || registry.mine_block(&name))
        .await
        .map_err(|err| ApiError::Internal(format!("mining task failed: {err}")))??;
    info!(index = block.index(), proof = block.proof(), "mined block");
    Ok((StatusCode::CREATED, Json(block.into())))
}

async fn validate_chain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Validation>> {
    let result = state.registry.get(&name)?.verify();
    Ok(Json(Validation {
        valid: result.is_ok(),
        error: result.err().map(|err| err.to_string()),
    }))
}

async fn run_consensus(
    State(state): State<AppState>,
    Json(body): Json<ConsensusIn>,
) -> ApiResult<Json<ConsensusOut>> {
    let winner = state.registry.consensus(&body.chains)?;
    let length = state.registry.get(&winner)?.len();
    Ok(Json(ConsensusOut { winner, length }))
}

async fn merkle_root(Json(body): Json<MerkleIn>) -> ApiResult<Json<MerkleOut>> {
    let tree = MerkleTree::new(&body.values)?;
    Ok(Json(MerkleOut {
        root: tree.root_hash().to_string(),
        leaves: tree.leaf_count(),
        depth: tree.depth(),
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chains", get(list_chains).post(create_chain))
        .route("/chains/{name}", get(get_chain))
        .route("/chains/{name}/transactions", post(submit_transaction))
        .route("/chains/{name}/blocks", post(seal_block))
        .route("/chains/{name}/mine", post(mine_block))
        .route("/chains/{name}/validate", get(validate_chain))
        .route("/consensus", post(run_consensus))
        .route("/merkle", post(merkle_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
