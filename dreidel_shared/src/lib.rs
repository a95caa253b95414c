use chrono::{DateTime, Utc};
use dreidel_core::{ConfigDocument, Direction, DreidelError, Ledger, Phase, Symbol};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRequest {
    pub player_count: usize,
    #[serde(default)]
    pub client_seed: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub server_seed_hash: String,
    pub nonce: u64,
    pub player: usize,
    pub symbol: Symbol,
    pub spin_duration_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub ledger: Ledger,
    pub phase: Phase,
    pub current_player: usize,
    pub client_seed: String,
    pub next_nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub server_seed_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdminSetConfigRequest {
    pub config: ConfigDocument,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinLogEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub client_seed: String,
    pub nonce: i64,
    pub server_seed_hash: String,
    pub player: i64,
    pub symbol: Symbol,
    pub amount_moved: i64,
    pub direction: Direction,
    pub pot_after: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

impl From<DreidelError> for ApiError {
    fn from(e: DreidelError) -> Self {
        match e {
            DreidelError::Config(_) | DreidelError::Index { .. } => ApiError::Invalid(e.to_string()),
            DreidelError::InvalidState { .. } | DreidelError::Exhausted => {
                ApiError::Conflict(e.to_string())
            }
        }
    }
}
