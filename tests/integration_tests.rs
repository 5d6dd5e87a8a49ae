//! Component-level tests that drive `BattleMediationServer` directly
//! (no real websocket) to exercise cross-module flows: binding tracking,
//! the disconnect policy's two branches, and room-full/room-not-found
//! error reporting (spec.md §4.9, §5, §7).

mod test_helpers;

use battle_mediation_server::core::socket::{OutboundFrame, SocketHandle};
use battle_mediation_server::core::RoomStatus;
use battle_mediation_server::protocol::error_codes::ErrorCode;
use battle_mediation_server::protocol::messages::{ClientMessage, ServerMessage};
use battle_mediation_server::protocol::types::{Mode, PokemonSpec, Side, Team};
use battle_mediation_server::server::BattleMediationServer;
use test_helpers::test_config;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Mints a connection id and its `SocketHandle` together, as
/// `websocket::connection::handle_socket` does — `Room::side_of` and the
/// disconnect policy key off the socket id matching the connection id.
fn connection() -> (Uuid, SocketHandle, mpsc::UnboundedReceiver<OutboundFrame>) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    (id, SocketHandle::new(id, tx), rx)
}

fn team() -> Team {
    Team(vec![PokemonSpec {
        species: "Pikachu".to_string(),
        ability: None,
        item: None,
        moves: vec!["Thunderbolt".to_string()],
        nature: None,
        level: 50,
    }])
}

async fn expect_control(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> ServerMessage {
    loop {
        match tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a control envelope")
            .expect("channel closed")
        {
            OutboundFrame::Control(message) => return *message,
            OutboundFrame::Raw(_) | OutboundFrame::Close { .. } => continue,
        }
    }
}

#[tokio::test]
async fn last_socket_leaving_a_non_battling_room_deletes_it() {
    let server = BattleMediationServer::new(test_config());
    let (id1, socket1, mut rx1) = connection();
    server
        .handle_client_message(id1, socket1, ClientMessage::CreateRoom)
        .await;
    let room_id = match expect_control(&mut rx1).await {
        ServerMessage::RoomCreated { room_id } => room_id,
        other => panic!("unexpected envelope: {other:?}"),
    };

    let (id2, socket2, _rx2) = connection();
    server
        .handle_client_message(
            id2,
            socket2,
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            },
        )
        .await;

    server.handle_disconnect(id2).await;
    assert!(
        server.rooms().get(&room_id).is_some(),
        "room should survive while p1 is still connected"
    );
    match expect_control(&mut rx1).await {
        ServerMessage::OpponentDisconnected => {}
        other => panic!("expected opponent-disconnected, got {other:?}"),
    }

    server.handle_disconnect(id1).await;
    assert!(
        server.rooms().get(&room_id).is_none(),
        "room should be deleted once both sockets are gone"
    );
}

#[tokio::test]
async fn disconnect_mid_battle_unbinds_the_side_without_ending_the_match() {
    let server = BattleMediationServer::new(test_config());
    let (id1, socket1, mut rx1) = connection();
    server
        .handle_client_message(id1, socket1.clone(), ClientMessage::CreateRoom)
        .await;
    let room_id = match expect_control(&mut rx1).await {
        ServerMessage::RoomCreated { room_id } => room_id,
        other => panic!("unexpected envelope: {other:?}"),
    };

    let (id2, socket2, _rx2) = connection();
    server
        .handle_client_message(
            id2,
            socket2.clone(),
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            },
        )
        .await;

    server
        .handle_client_message(
            id1,
            socket1,
            ClientMessage::Start {
                mode: Mode::Pvp,
                format_id: Some("gen9ou".to_string()),
                team: Some(team()),
                room_id: Some(room_id.clone()),
                side: Some(Side::P1),
                seed: Some(1),
                difficulty: None,
            },
        )
        .await;
    server
        .handle_client_message(
            id2,
            socket2,
            ClientMessage::Start {
                mode: Mode::Pvp,
                format_id: Some("gen9ou".to_string()),
                team: Some(team()),
                room_id: Some(room_id.clone()),
                side: Some(Side::P2),
                seed: Some(1),
                difficulty: None,
            },
        )
        .await;

    let room = server.rooms().get(&room_id).expect("room still exists");
    assert_eq!(room.status(), RoomStatus::Battling);

    server.handle_disconnect(id1).await;

    assert_eq!(
        room.status(),
        RoomStatus::Battling,
        "a mid-battle disconnect must not tear the room down"
    );
    let match_runner = room
        .match_runner
        .lock()
        .expect("lock poisoned")
        .clone()
        .expect("match runner still attached");
    assert!(!match_runner.has_ended(), "disconnecting one side must not end the match");
    assert!(!match_runner.is_bound(Side::P1));
    assert!(match_runner.is_bound(Side::P2));
}

#[tokio::test]
async fn joining_a_full_room_reports_room_full() {
    let server = BattleMediationServer::new(test_config());
    let (id1, socket1, mut rx1) = connection();
    server
        .handle_client_message(id1, socket1, ClientMessage::CreateRoom)
        .await;
    let room_id = match expect_control(&mut rx1).await {
        ServerMessage::RoomCreated { room_id } => room_id,
        other => panic!("unexpected envelope: {other:?}"),
    };

    let (id2, socket2, _rx2) = connection();
    server
        .handle_client_message(
            id2,
            socket2,
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            },
        )
        .await;

    let (id3, socket3, mut rx3) = connection();
    server
        .handle_client_message(
            id3,
            socket3,
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            },
        )
        .await;

    match expect_control(&mut rx3).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::RoomFull));
        }
        other => panic!("expected a room-full error, got {other:?}"),
    }
}

#[tokio::test]
async fn joining_an_unknown_room_reports_room_not_found() {
    let server = BattleMediationServer::new(test_config());
    let (id1, socket1, mut rx1) = connection();
    server
        .handle_client_message(
            id1,
            socket1,
            ClientMessage::JoinRoom {
                room_id: "NOSUCHROOM".to_string(),
            },
        )
        .await;

    match expect_control(&mut rx1).await {
        ServerMessage::Error { error_code, .. } => {
            assert_eq!(error_code, Some(ErrorCode::RoomNotFound));
        }
        other => panic!("expected a room-not-found error, got {other:?}"),
    }
}

#[tokio::test]
async fn ai_match_choose_is_routed_to_the_match_runner() {
    let server = BattleMediationServer::new(test_config());
    let (id1, socket1, mut rx1) = connection();

    server
        .handle_client_message(
            id1,
            socket1.clone(),
            ClientMessage::Start {
                mode: Mode::Ai,
                format_id: Some("gen9ou".to_string()),
                team: Some(team()),
                room_id: None,
                side: None,
                seed: Some(5),
                difficulty: Some(1),
            },
        )
        .await;

    match expect_control(&mut rx1).await {
        ServerMessage::BattleStarted { .. } => {}
        other => panic!("expected battle-started, got {other:?}"),
    }

    server
        .handle_client_message(
            id1,
            socket1,
            ClientMessage::Choose {
                command: "move 1".to_string(),
            },
        )
        .await;

    // A valid choice against a live match produces no error envelope; the
    // AI side keeps playing on its own decision loop regardless.
    let saw_error = tokio::time::timeout(std::time::Duration::from_millis(300), async {
        loop {
            match rx1.recv().await {
                Some(OutboundFrame::Control(message)) => {
                    if matches!(*message, ServerMessage::Error { .. }) {
                        return true;
                    }
                }
                Some(_) => continue,
                None => return false,
            }
        }
    })
    .await
    .unwrap_or(false);
    assert!(!saw_error, "a valid choice against a live match should not error");
}
