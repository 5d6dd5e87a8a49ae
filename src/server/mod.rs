//! Wires the coordinators together, tracks which Room or MatchRunner each
//! connection is bound to, and drives the idle-maintenance sweep
//! (spec.md §4.9, §5).

pub mod maintenance;

use std::sync::Arc;

use dashmap::DashMap;

use crate::ai::LlmClient;
use crate::config::Config;
use crate::core::ai_coordinator::{AiCoordinator, StartAiRequest};
use crate::core::match_runner::MatchRunner;
use crate::core::pvp_coordinator::{PvpCoordinator, StartPvpRequest};
use crate::core::room::{Room, RoomStatus};
use crate::core::room_registry::RoomRegistry;
use crate::core::socket::SocketHandle;
use crate::metrics::ServerMetrics;
use crate::protocol::error_codes::ErrorCode;
use crate::protocol::messages::{ClientMessage, ServerMessage};
use crate::protocol::types::{ConnectionId, Mode, RoomId, Side, Team};
use crate::simulator::adapter::SimulatorAdapter;

/// What a connection is currently attached to — determines `choose`
/// routing and which branch of the disconnect policy applies.
enum Binding {
    Room(Arc<Room>),
    AiMatch(Arc<MatchRunner>),
}

pub struct BattleMediationServer {
    config: Config,
    metrics: Arc<ServerMetrics>,
    rooms: Arc<RoomRegistry>,
    pvp: PvpCoordinator,
    ai: AiCoordinator,
    connections: DashMap<ConnectionId, Binding>,
    ai_matches: DashMap<RoomId, Arc<MatchRunner>>,
}

impl BattleMediationServer {
    pub fn new(config: Config) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let rooms = Arc::new(RoomRegistry::new(
            config.server.room_code_length,
            metrics.clone(),
        ));
        let simulator = Arc::new(SimulatorAdapter::new());
        let llm_client = config
            .ai
            .llm_api_key
            .clone()
            .map(|key| Arc::new(LlmClient::new(key)));

        let pvp = PvpCoordinator::new(
            rooms.clone(),
            simulator.clone(),
            metrics.clone(),
            config.server.max_team_size,
        );
        let ai = AiCoordinator::new(
            simulator,
            metrics.clone(),
            llm_client,
            config.server.max_team_size,
        );

        Arc::new(Self {
            config,
            metrics,
            rooms,
            pvp,
            ai,
            connections: DashMap::new(),
            ai_matches: DashMap::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// Snapshot of synthetic-room-id -> `MatchRunner` for AI matches (no
    /// `Room` backs these), consumed by the idle sweep.
    pub(crate) fn ai_matches_snapshot(&self) -> Vec<(RoomId, Arc<MatchRunner>)> {
        self.ai_matches
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub(crate) fn remove_ai_matches(&self, room_ids: &[RoomId]) {
        for room_id in room_ids {
            self.ai_matches.remove(room_id);
        }
    }

    /// Dispatch table for spec.md §4.9 step 2. Unrecognised `type` values
    /// and malformed JSON never reach here — `websocket::connection`
    /// already logs and drops those at the parse boundary.
    pub async fn handle_client_message(
        &self,
        connection_id: ConnectionId,
        socket: SocketHandle,
        message: ClientMessage,
    ) {
        match message {
            ClientMessage::CreateRoom => self.handle_create_room(connection_id, socket),
            ClientMessage::JoinRoom { room_id } => {
                self.handle_join_room(connection_id, socket, room_id);
            }
            ClientMessage::Start {
                mode: Mode::Pvp,
                format_id,
                team,
                room_id,
                side,
                seed,
                difficulty: _,
            } => {
                self.handle_start_pvp(connection_id, socket, room_id, side, format_id, seed, team)
                    .await;
            }
            ClientMessage::Start {
                mode: Mode::Ai,
                format_id,
                team,
                seed,
                difficulty,
                ..
            } => {
                self.handle_start_ai(connection_id, socket, format_id, seed, team, difficulty)
                    .await;
            }
            ClientMessage::Choose { command } => self.handle_choose(connection_id, socket, &command),
        }
    }

    fn handle_create_room(&self, connection_id: ConnectionId, socket: SocketHandle) {
        let room = self.rooms.create();
        room.join(socket.clone())
            .expect("a freshly created room cannot be full");
        self.connections
            .insert(connection_id, Binding::Room(room.clone()));
        socket.send_control(ServerMessage::RoomCreated {
            room_id: room.room_id.clone(),
        });
        room.broadcast_state();
    }

    fn handle_join_room(
        &self,
        connection_id: ConnectionId,
        socket: SocketHandle,
        room_id: RoomId,
    ) {
        let Some(room) = self.rooms.get(&room_id) else {
            socket.send_control(ServerMessage::error_with_code(
                "room not found",
                ErrorCode::RoomNotFound,
            ));
            return;
        };
        match room.join(socket.clone()) {
            Ok(_side) => {
                self.connections
                    .insert(connection_id, Binding::Room(room.clone()));
                room.broadcast_state();
            }
            Err(_) => {
                self.metrics.increment_state_conflicts();
                socket.send_control(ServerMessage::error_with_code(
                    "room is full",
                    ErrorCode::RoomFull,
                ));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_start_pvp(
        &self,
        connection_id: ConnectionId,
        socket: SocketHandle,
        room_id: Option<RoomId>,
        side: Option<Side>,
        format_id: Option<String>,
        seed: Option<u64>,
        team: Option<Team>,
    ) {
        let Some(room_id) = room_id else {
            socket.send_control(ServerMessage::error_with_code(
                "roomID is required for pvp mode",
                ErrorCode::CannotDetermineSide,
            ));
            return;
        };
        let format_id = format_id.unwrap_or_else(|| self.config.server.default_format_id.clone());
        let req = StartPvpRequest {
            connection: connection_id,
            room_id: room_id.clone(),
            side_hint: side,
            format_id,
            seed,
            team,
        };
        self.pvp.handle_start(socket, req).await;
        if let Some(room) = self.rooms.get(&room_id) {
            self.connections.insert(connection_id, Binding::Room(room));
        }
    }

    async fn handle_start_ai(
        &self,
        connection_id: ConnectionId,
        socket: SocketHandle,
        format_id: Option<String>,
        seed: Option<u64>,
        team: Option<Team>,
        difficulty: Option<u8>,
    ) {
        let Some(team) = team else {
            socket.send_control(ServerMessage::error_with_code(
                "team is required for ai mode",
                ErrorCode::InvalidTeam,
            ));
            return;
        };
        let format_id = format_id.unwrap_or_else(|| self.config.server.default_format_id.clone());
        let req = StartAiRequest {
            format_id,
            seed,
            team,
            difficulty: difficulty.unwrap_or(1),
        };
        if let Some(runner) = self.ai.handle_start(socket, req).await {
            let room_id = runner.match_runner.room_id().to_string();
            self.ai_matches.insert(room_id, runner.match_runner.clone());
            self.connections
                .insert(connection_id, Binding::AiMatch(runner.match_runner.clone()));
        }
    }

    fn handle_choose(&self, connection_id: ConnectionId, socket: SocketHandle, command: &str) {
        let resolved = self.connections.get(&connection_id).and_then(|entry| {
            match entry.value() {
                Binding::AiMatch(match_runner) => Some((match_runner.clone(), Side::P1)),
                Binding::Room(room) => {
                    let side = room.side_of(connection_id)?;
                    let match_runner = room.match_runner.lock().expect("lock poisoned").clone()?;
                    Some((match_runner, side))
                }
            }
        });

        let Some((match_runner, side)) = resolved else {
            socket.send_control(ServerMessage::error_with_code(
                "no active match",
                ErrorCode::NoActiveMatch,
            ));
            return;
        };

        if let Err(err) = match_runner.forward_choice(side, command) {
            self.metrics.increment_transient_client_errors();
            socket.send_control(ServerMessage::error_with_code(err, ErrorCode::InvalidCommand));
        }
    }

    /// ConnectionController close handler (spec.md §5's three-step policy).
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        let Some((_, binding)) = self.connections.remove(&connection_id) else {
            return;
        };
        match binding {
            Binding::Room(room) => self.handle_room_disconnect(&room, connection_id),
            Binding::AiMatch(match_runner) => match_runner.unbind(Side::P1),
        }
    }

    fn handle_room_disconnect(&self, room: &Arc<Room>, connection_id: ConnectionId) {
        if room.status() == RoomStatus::Battling {
            if let Some(side) = room.side_of(connection_id) {
                if let Some(match_runner) = room.match_runner.lock().expect("lock poisoned").clone() {
                    match_runner.unbind(side);
                }
            }
            return;
        }

        if let Some(side) = room.remove_socket(connection_id) {
            if room.both_sockets_empty() {
                self.rooms.delete_if_empty_and_not_battling(&room.room_id);
            } else {
                room.notify_opponent_disconnected(side.other());
            }
        }
    }
}
