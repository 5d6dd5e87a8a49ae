//! Per-connection lifecycle: mint a ConnectionID, drive a heartbeat, parse
//! inbound JSON envelopes, and run the disconnect policy on close
//! (spec.md §4.9/§5).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::socket::{CloseCode, OutboundFrame, SocketHandle};
use crate::protocol::messages::ClientMessage;
use crate::server::BattleMediationServer;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// One task owns both halves of the websocket for the connection's whole
/// life: it multiplexes periodic pings, app-originated outbound frames
/// (from `Room`/`MatchRunner` via `SocketHandle`), and inbound frames, so
/// the real ping/pong exchange and the app's send queue never race for
/// `ws_sender`.
pub async fn handle_socket(socket: WebSocket, server: Arc<BattleMediationServer>, addr: SocketAddr) {
    let connection_id = Uuid::new_v4();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let handle = SocketHandle::new(connection_id, outbound_tx);

    server.metrics().increment_connections();
    info!(%connection_id, client_addr = %addr, "websocket connection accepted");

    if ws_sender
        .send(Message::Text("|status|connected".to_string().into()))
        .await
        .is_err()
    {
        server.metrics().decrement_active_connections();
        return;
    }

    let max_missed_pongs = server.config().server.max_missed_pongs;
    let mut missed_pongs: u32 = 0;
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    'connection: loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                missed_pongs += 1;
                if missed_pongs > max_missed_pongs {
                    warn!(%connection_id, "closing connection after missed heartbeats");
                    let _ = ws_sender.send(Message::Close(Some(axum::extract::ws::CloseFrame {
                        code: 1001,
                        reason: "heartbeat timeout".into(),
                    }))).await;
                    break 'connection;
                }
                if ws_sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break 'connection;
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(OutboundFrame::Raw(bytes)) => {
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        if ws_sender.send(Message::Text(text.into())).await.is_err() {
                            break 'connection;
                        }
                    }
                    Some(OutboundFrame::Control(message)) => match serde_json::to_string(message.as_ref()) {
                        Ok(json) => {
                            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                break 'connection;
                            }
                        }
                        Err(err) => warn!(error = %err, "failed to serialise control envelope"),
                    },
                    Some(OutboundFrame::Close { code, reason }) => {
                        let axum_code = match code {
                            CloseCode::Normal => 1000,
                            CloseCode::GoingAway => 1001,
                        };
                        let _ = ws_sender.send(Message::Close(Some(axum::extract::ws::CloseFrame {
                            code: axum_code,
                            reason: reason.into(),
                        }))).await;
                        break 'connection;
                    }
                    None => break 'connection,
                }
            }
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound_text(&server, &handle, connection_id, &text).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                    }
                    Some(Ok(Message::Close(_))) | None => break 'connection,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(%connection_id, error = %err, "websocket read error");
                        break 'connection;
                    }
                }
            }
        }
    }

    server.metrics().decrement_active_connections();
    server.handle_disconnect(connection_id).await;
    debug!(%connection_id, "connection closed");
}

async fn handle_inbound_text(
    server: &Arc<BattleMediationServer>,
    handle: &SocketHandle,
    connection_id: Uuid,
    text: &str,
) {
    let parsed: Result<ClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(message) => {
            server
                .handle_client_message(connection_id, handle.clone(), message)
                .await;
        }
        Err(err) => {
            warn!(%connection_id, error = %err, "dropping frame that is not a valid envelope");
        }
    }
}
