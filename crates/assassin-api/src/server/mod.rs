use std::fmt;
use std::net::SocketAddr;
use std::path::Path as FsPath;

use assassin_core::{
    DeathOutcome, EngineConfig, FinalOutcome, GameEngine, GameOverview, GameStore,
    NotificationSink, NotifySendError, PoolUpdate, PoolsView, StartSummary,
};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use contracts::{
    ApiError, ContractView, ErrorCode, GameError, GameRecord, PlayerRecord, SCHEMA_VERSION_V1,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};

include!("error.rs");
include!("state.rs");
include!("routes/operator.rs");
include!("routes/player.rs");
include!("routes/stream.rs");
include!("util.rs");

pub async fn serve(
    addr: SocketAddr,
    sqlite_path: impl AsRef<FsPath>,
    config: EngineConfig,
) -> Result<(), ServerError> {
    let state = AppState::open(sqlite_path, config)?;
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/game", get(get_overview))
        .route("/api/v1/game/registration", post(open_registration))
        .route("/api/v1/game/start", post(start_game))
        .route("/api/v1/game/reset", post(reset_game))
        .route("/api/v1/game/test", post(begin_test_game))
        .route("/api/v1/game/report", get(get_report))
        .route("/api/v1/game/deaths/simulate", post(simulate_death))
        .route("/api/v1/pools", get(list_pools))
        .route("/api/v1/pools/weapons", put(set_weapons))
        .route("/api/v1/pools/locations", put(set_locations))
        .route("/api/v1/players", post(register_player))
        .route("/api/v1/players/{account_id}/contract", get(get_contract))
        .route("/api/v1/players/{account_id}/death", post(signal_dead))
        .route(
            "/api/v1/players/{account_id}/death/confirm",
            post(confirm_death),
        )
        .route(
            "/api/v1/players/{account_id}/death/cancel",
            post(cancel_confirmation),
        )
        .route("/api/v1/stream", get(stream_notifications))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests;
