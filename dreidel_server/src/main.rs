use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use dreidel_core::{DreidelError, ProvablyFairRng, SpinConfig};
use dreidel_shared::{
    AdminSetConfigRequest, ApiError, GameView, NewGameRequest, SpinLogEntry, SpinResponse,
    VerifyResponse,
};
use serde::Deserialize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod db;
mod session;

use session::{schedule_settlement, SharedTable, Table};

#[derive(Clone)]
struct AppState {
    db: SqlitePool,
    api_key: String,
    default_client_seed: String,
    table: SharedTable,
}

struct AppError(ApiError);

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        AppError(e)
    }
}

impl From<DreidelError> for AppError {
    fn from(e: DreidelError) -> Self {
        AppError(e.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = %e, "request failed");
        AppError(ApiError::Internal)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

type ApiResult<T> = Result<T, AppError>;

async fn route_verify(State(state): State<Arc<AppState>>) -> Json<VerifyResponse> {
    Json(state.table.lock().await.verify())
}

async fn route_game(State(state): State<Arc<AppState>>) -> Json<GameView> {
    Json(state.table.lock().await.view())
}

async fn route_new_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewGameRequest>,
) -> ApiResult<Json<GameView>> {
    let p = db::get_params(&state.db).await?;
    let config = p.rules()?;
    let client_seed = req
        .client_seed
        .unwrap_or_else(|| state.default_client_seed.clone());
    let rng = ProvablyFairRng::new(p.server_seed, client_seed, p.nonce as u64);
    let mut table = state.table.lock().await;
    table.replace(req.player_count, config, rng)?;
    info!(players = req.player_count, "new game");
    Ok(Json(table.view()))
}

async fn route_spin(State(state): State<Arc<AppState>>) -> ApiResult<Json<SpinResponse>> {
    let (spin, server_seed_hash) = {
        let mut table = state.table.lock().await;
        let spin = table.start_spin()?;
        (spin, table.server_seed_hash().to_string())
    };
    let pool = state.db.clone();
    schedule_settlement(state.table.clone(), &spin, move |settled| async move {
        if let Err(e) = db::log_spin(&pool, &settled).await {
            error!(error = %e, nonce = settled.nonce, "failed to log spin");
        }
    })
    .await;
    db::save_nonce(&state.db, spin.nonce + 1).await?;

    Ok(Json(SpinResponse {
        server_seed_hash,
        nonce: spin.nonce,
        player: spin.player,
        symbol: spin.symbol,
        spin_duration_ms: spin.duration.as_millis() as u64,
    }))
}

#[derive(Debug, Deserialize)]
struct SpinsQuery {
    #[serde(default = "default_spins_limit")]
    n: i64,
}

fn default_spins_limit() -> i64 {
    20
}

async fn route_spins(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SpinsQuery>,
) -> ApiResult<Json<Vec<SpinLogEntry>>> {
    Ok(Json(db::recent_spins(&state.db, q.n).await?))
}

async fn route_admin_set_config(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): TypedHeader<
        axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
    >,
    Json(req): Json<AdminSetConfigRequest>,
) -> ApiResult<StatusCode> {
    if bearer.token() != state.api_key {
        return Err(ApiError::Unauthorized.into());
    }
    SpinConfig::try_from(req.config.clone())?;
    db::save_rules(&state.db, &req.config).await?;
    info!("rules updated, effective from the next game");
    Ok(StatusCode::NO_CONTENT)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&env_or("DATABASE_URL", "sqlite://dreidel.db?mode=rwc"))
        .await?;
    db::init_db(&db).await?;

    if let Ok(path) = std::env::var("DREIDEL_CONFIG") {
        let json = std::fs::read_to_string(&path)?;
        let doc: dreidel_core::ConfigDocument = serde_json::from_str(&json)?;
        SpinConfig::try_from(doc.clone())?;
        db::save_rules(&db, &doc).await?;
        info!(%path, "rules loaded");
    }

    let players: usize = env_or("DREIDEL_PLAYERS", "2").parse()?;
    let client_seed = env_or("CLIENT_SEED", "table");
    let p = db::get_params(&db).await?;
    let table = Table::new(
        players,
        p.rules()?,
        ProvablyFairRng::new(p.server_seed, client_seed.clone(), p.nonce as u64),
    )?;

    let state = Arc::new(AppState {
        db,
        api_key: env_or("API_KEY", "dev-key"),
        default_client_seed: client_seed,
        table: Arc::new(Mutex::new(table)),
    });

    let app = Router::new()
        .route("/verify", get(route_verify))
        .route("/game", get(route_game).post(route_new_game))
        .route("/spin", post(route_spin))
        .route("/spins", get(route_spins))
        .route("/admin/set-config", post(route_admin_set_config))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = env_or("BIND", "127.0.0.1:8080");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
