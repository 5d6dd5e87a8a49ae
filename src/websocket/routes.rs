//! Route registration for the `/battle` websocket endpoint and the
//! ambient `/metrics` endpoint (spec.md §6).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::server::BattleMediationServer;

use super::connection;

pub fn create_router(server: Arc<BattleMediationServer>) -> Router {
    Router::new()
        .route("/battle", get(battle_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(server)
}

async fn battle_handler(
    State(server): State<Arc<BattleMediationServer>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, server, addr))
}

async fn metrics_handler(State(server): State<Arc<BattleMediationServer>>) -> impl IntoResponse {
    Json(server.metrics().snapshot())
}
