use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use powchain_core::{Block, Transaction};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{constants::BLOCK_FORGED_MESSAGE, error::ApiError, AppState};

#[derive(Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub node_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

/// Every field optional so an incomplete body is reported as missing values
/// rather than a decode failure.
#[derive(Deserialize)]
pub struct TxIn {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<i64>,
}

#[derive(Serialize, Deserialize)]
pub struct TxAccepted {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        node_id: state.node_id.to_string(),
    })
}

pub async fn mine(State(state): State<AppState>) -> Result<Json<MineResponse>, ApiError> {
    let block = tokio::spawn(mine_next_block(state))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(MineResponse {
        message: BLOCK_FORGED_MESSAGE.to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

/// Searches for a proof and commits the block. Runs as its own task, so a
/// client that goes away does not cancel it: the block is still created and
/// the mining lock is held until the search finishes or gives up.
async fn mine_next_block(state: AppState) -> Result<Block, ApiError> {
    let _mining = state.mining.lock().await;
    let template = state.ledger.read().await.template();

    let search = template.clone();
    let max_attempts = state.max_attempts;
    let proof = tokio::task::spawn_blocking(move || match max_attempts {
        Some(limit) => search.find_proof_bounded(limit),
        None => Ok(search.find_proof()),
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let block = state
        .ledger
        .write()
        .await
        .commit_mined(template, proof, &state.node_id)?;
    info!(index = block.index, proof = block.proof, "new block forged");
    Ok(block)
}

pub async fn new_transaction(
    State(state): State<AppState>,
    body: Result<Json<TxIn>, JsonRejection>,
) -> Result<(StatusCode, Json<TxAccepted>), ApiError> {
    let Json(tx) = body.map_err(|e| ApiError::Malformed(e.body_text()))?;
    let (Some(sender), Some(recipient), Some(amount)) = (tx.sender, tx.recipient, tx.amount) else {
        return Err(ApiError::MissingFields);
    };

    let index = state
        .ledger
        .write()
        .await
        .enqueue_transaction(sender, recipient, amount);

    Ok((
        StatusCode::CREATED,
        Json(TxAccepted {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
    ))
}

pub async fn full_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    let ledger = state.ledger.read().await;
    Json(ChainResponse {
        chain: ledger.chain().to_vec(),
        length: ledger.height(),
    })
}

pub async fn validate_chain(State(state): State<AppState>) -> Json<Validation> {
    let ledger = state.ledger.read().await;
    let length = ledger.height();
    Json(match ledger.validate() {
        Ok(()) => Validation {
            valid: true,
            length,
            error: None,
        },
        Err(e) => Validation {
            valid: false,
            length,
            error: Some(e.to_string()),
        },
    })
}
