//! Race-condition coverage for spec.md §4.7's concurrency note: two `start`
//! envelopes landing on the same room at once must still produce exactly
//! one match, serialised by `Room::coordination_lock`.

mod test_helpers;

use std::sync::Arc;

use battle_mediation_server::core::socket::{OutboundFrame, SocketHandle};
use battle_mediation_server::core::RoomStatus;
use battle_mediation_server::protocol::messages::{ClientMessage, ServerMessage};
use battle_mediation_server::protocol::types::{Mode, PokemonSpec, Side, Team};
use battle_mediation_server::server::BattleMediationServer;
use test_helpers::test_config;
use tokio::sync::{mpsc, Barrier};
use uuid::Uuid;

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

async fn created_room_id(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> String {
    loop {
        match tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for room-created")
            .expect("channel closed")
        {
            OutboundFrame::Control(message) => {
                if let ServerMessage::RoomCreated { room_id } = *message {
                    return room_id;
                }
            }
            OutboundFrame::Raw(_) | OutboundFrame::Close { .. } => continue,
        }
    }
}

#[tokio::test]
async fn simultaneous_start_envelopes_on_both_sides_start_the_match_exactly_once() {
    let server = BattleMediationServer::new(test_config());
    let (id1, socket1, mut rx1) = connection();
    let (id2, socket2, _rx2) = connection();

    server
        .handle_client_message(id1, socket1.clone(), ClientMessage::CreateRoom)
        .await;
    let room_id = created_room_id(&mut rx1).await;

    server
        .handle_client_message(
            id2,
            socket2.clone(),
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            },
        )
        .await;

    let barrier = Arc::new(Barrier::new(2));
    let server1 = server.clone();
    let room_id1 = room_id.clone();
    let barrier1 = barrier.clone();
    let task1 = tokio::spawn(async move {
        barrier1.wait().await;
        server1
            .handle_client_message(
                id1,
                socket1,
                ClientMessage::Start {
                    mode: Mode::Pvp,
                    format_id: Some("gen9ou".to_string()),
                    team: Some(team()),
                    room_id: Some(room_id1),
                    side: Some(Side::P1),
                    seed: Some(11),
                    difficulty: None,
                },
            )
            .await;
    });

    let server2 = server.clone();
    let room_id2 = room_id.clone();
    let barrier2 = barrier.clone();
    let task2 = tokio::spawn(async move {
        barrier2.wait().await;
        server2
            .handle_client_message(
                id2,
                socket2,
                ClientMessage::Start {
                    mode: Mode::Pvp,
                    format_id: Some("gen9ou".to_string()),
                    team: Some(team()),
                    room_id: Some(room_id2),
                    side: Some(Side::P2),
                    seed: Some(11),
                    difficulty: None,
                },
            )
            .await;
    });

    task1.await.unwrap();
    task2.await.unwrap();

    let room = server.rooms().get(&room_id).expect("room still exists");
    assert_eq!(room.status(), RoomStatus::Battling);
    assert_eq!(server.metrics().snapshot().matches_started_pvp, 1);
}

#[tokio::test]
async fn concurrent_choices_from_both_sides_do_not_panic_or_deadlock() {
    let server = BattleMediationServer::new(test_config());
    let (id1, socket1, mut rx1) = connection();
    let (id2, socket2, _rx2) = connection();

    server
        .handle_client_message(id1, socket1.clone(), ClientMessage::CreateRoom)
        .await;
    let room_id = created_room_id(&mut rx1).await;
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
            socket1.clone(),
            ClientMessage::Start {
                mode: Mode::Pvp,
                format_id: Some("gen9ou".to_string()),
                team: Some(team()),
                room_id: Some(room_id.clone()),
                side: Some(Side::P1),
                seed: Some(21),
                difficulty: None,
            },
        )
        .await;
    server
        .handle_client_message(
            id2,
            socket2.clone(),
            ClientMessage::Start {
                mode: Mode::Pvp,
                format_id: Some("gen9ou".to_string()),
                team: Some(team()),
                room_id: Some(room_id.clone()),
                side: Some(Side::P2),
                seed: Some(21),
                difficulty: None,
            },
        )
        .await;

    let barrier = Arc::new(Barrier::new(20));
    let mut handles = Vec::new();
    for i in 0..20 {
        let server = server.clone();
        let barrier = barrier.clone();
        let (id, socket) = if i % 2 == 0 {
            (id1, socket1.clone())
        } else {
            (id2, socket2.clone())
        };
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            server
                .handle_client_message(
                    id,
                    socket,
                    ClientMessage::Choose {
                        command: "move 1".to_string(),
                    },
                )
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let room = server.rooms().get(&room_id).expect("room still exists");
    assert!(
        room.status() == RoomStatus::Battling || room.status() == RoomStatus::Ended,
        "the match should still be in a well-defined state after a choice storm"
    );
}

#[tokio::test]
async fn concurrent_room_creation_never_collides_on_a_room_id() {
    let server = BattleMediationServer::new(test_config());
    let barrier = Arc::new(Barrier::new(30));
    let mut handles = Vec::new();
    for _ in 0..30 {
        let server = server.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let (id, socket, _rx) = connection();
            server
                .handle_client_message(id, socket, ClientMessage::CreateRoom)
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(
        server.rooms().len(),
        30,
        "every concurrent create-room must produce a distinct room"
    );
}
