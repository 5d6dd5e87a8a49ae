//! Handles an inbound `start` envelope in PvP mode (spec.md §4.7).

use std::sync::Arc;

use tracing::warn;

use crate::core::match_runner::MatchRunner;
use crate::core::room::Room;
use crate::core::room_registry::RoomRegistry;
use crate::core::socket::SocketHandle;
use crate::metrics::ServerMetrics;
use crate::protocol::messages::ServerMessage;
use crate::protocol::types::{ConnectionId, RoomId, Side, Team};
use crate::simulator::adapter::SimulatorAdapter;

pub struct StartPvpRequest {
    pub connection: ConnectionId,
    pub room_id: RoomId,
    pub side_hint: Option<Side>,
    pub format_id: String,
    pub seed: Option<u64>,
    pub team: Option<Team>,
}

pub struct PvpCoordinator {
    rooms: Arc<RoomRegistry>,
    simulator: Arc<SimulatorAdapter>,
    metrics: Arc<ServerMetrics>,
    max_team_size: usize,
}

impl PvpCoordinator {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        simulator: Arc<SimulatorAdapter>,
        metrics: Arc<ServerMetrics>,
        max_team_size: usize,
    ) -> Self {
        Self {
            rooms,
            simulator,
            metrics,
            max_team_size,
        }
    }

    pub async fn handle_start(&self, socket: SocketHandle, req: StartPvpRequest) {
        let Some(room) = self.rooms.get(&req.room_id) else {
            socket.send_control(ServerMessage::error("room not found"));
            return;
        };

        let _guard = room.coordination_lock.lock().await;

        if room.status() == crate::core::room::RoomStatus::Battling {
            self.handle_reconnect(&room, socket, req).await;
            return;
        }

        let side = match req.side_hint.or_else(|| room.side_of(req.connection)) {
            Some(side) => {
                if !room.is_socket_bound(side) {
                    room.bind_side(side, socket.clone());
                }
                side
            }
            None => match room.join(socket.clone()) {
                Ok(side) => side,
                Err(_) => {
                    socket.send_control(ServerMessage::error("room is full"));
                    return;
                }
            },
        };

        if let Some(team) = req.team {
            if let Err(err) = room.submit_team(side, team, self.max_team_size, &self.simulator.dex) {
                socket.send_control(ServerMessage::error(err.to_string()));
                return;
            }
        }

        room.broadcast_state();

        if room.status() != crate::core::room::RoomStatus::Battling
            && room.both_sockets_present()
            && room.both_teams_present()
            && room.start_battling()
        {
            self.start_match(&room, &req.format_id, req.seed).await;
        }
    }

    async fn handle_reconnect(&self, room: &Arc<Room>, socket: SocketHandle, req: StartPvpRequest) {
        let side = match req
            .side_hint
            .or_else(|| room.side_of(req.connection))
            .or_else(|| self.unbound_match_side(room))
        {
            Some(side) => side,
            None => {
                socket.send_control(ServerMessage::error("cannot determine side"));
                return;
            }
        };

        room.bind_side(side, socket.clone());
        if let Some(match_runner) = room.match_runner.lock().expect("lock poisoned").clone() {
            match_runner.bind(side, socket).await;
        } else {
            warn!(room_id = %room.room_id, "room is battling but has no match runner attached");
        }
    }

    fn unbound_match_side(&self, room: &Arc<Room>) -> Option<Side> {
        let match_runner = room.match_runner.lock().expect("lock poisoned").clone()?;
        let unbound: Vec<Side> = Side::ALL
            .into_iter()
            .filter(|&s| !match_runner.is_bound(s))
            .collect();
        match unbound.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    async fn start_match(&self, room: &Arc<Room>, format_id: &str, seed: Option<u64>) {
        let p1_team = room.team(Side::P1).expect("both teams present was checked");
        let p2_team = room.team(Side::P2).expect("both teams present was checked");

        match MatchRunner::spawn(
            room.room_id.clone(),
            format_id,
            seed,
            &self.simulator,
            "p1",
            p1_team,
            "p2",
            p2_team,
            self.metrics.clone(),
        )
        .await
        {
            Ok(match_runner) => {
                self.metrics
                    .increment_matches_started(crate::metrics::MatchMode::Pvp);
                if let Some(p1_socket) = room.socket(Side::P1) {
                    match_runner.bind(Side::P1, p1_socket).await;
                }
                if let Some(p2_socket) = room.socket(Side::P2) {
                    match_runner.bind(Side::P2, p2_socket).await;
                }
                *room.match_runner.lock().expect("lock poisoned") = Some(match_runner);

                let envelope = ServerMessage::BattleStarted {
                    room_id: room.room_id.clone(),
                };
                if let Some(socket) = room.socket(Side::P1) {
                    socket.send_control(envelope.clone());
                }
                if let Some(socket) = room.socket(Side::P2) {
                    socket.send_control(envelope);
                }
            }
            Err(err) => {
                warn!(room_id = %room.room_id, error = %err, "simulator unavailable; match not started");
                room.mark_ended();
                let envelope = ServerMessage::error_with_code(
                    "simulator unavailable",
                    crate::protocol::error_codes::ErrorCode::SimulatorUnavailable,
                );
                for side in Side::ALL {
                    if let Some(socket) = room.socket(side) {
                        socket.send_control(envelope.clone());
                    }
                }
            }
        }
    }
}
