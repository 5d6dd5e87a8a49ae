//! The pairing/lobby state a match is born from (spec.md §4.6).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::core::match_runner::MatchRunner;
use crate::core::socket::SocketHandle;
use crate::protocol::messages::{RoomUpdatePayload, ServerMessage};
use crate::protocol::types::{RoomId, Side, Team};
use crate::protocol::validation::{validate_team, TeamValidationError};
use crate::simulator::dex::Dex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Ready,
    Battling,
    Ended,
}

impl RoomStatus {
    fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Ready => "ready",
            RoomStatus::Battling => "battling",
            RoomStatus::Ended => "ended",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("room is full")]
    RoomFull,
}

#[derive(Debug, Error)]
pub enum SubmitTeamError {
    #[error(transparent)]
    Invalid(#[from] TeamValidationError),
}

fn side_index(side: Side) -> usize {
    match side {
        Side::P1 => 0,
        Side::P2 => 1,
    }
}

struct Inner {
    status: RoomStatus,
    sockets: [Option<SocketHandle>; 2],
    teams: [Option<Team>; 2],
    last_activity: Instant,
}

/// A per-room lock serialises the whole mutating sequence for a `roomID`
/// (spec.md §4.7 concurrency note) — callers take `room.lock()` for the
/// duration of handling one envelope.
pub struct Room {
    pub room_id: RoomId,
    pub created_at: Instant,
    inner: Mutex<Inner>,
    pub match_runner: Mutex<Option<Arc<MatchRunner>>>,
    /// Serialises the whole `start`-envelope handling sequence so two
    /// simultaneous `start` messages can't both observe `waiting` and both
    /// try to begin the match (spec.md §4.7).
    pub coordination_lock: tokio::sync::Mutex<()>,
}

impl Room {
    pub fn new(room_id: RoomId) -> Self {
        let now = Instant::now();
        Self {
            room_id,
            created_at: now,
            inner: Mutex::new(Inner {
                status: RoomStatus::Waiting,
                sockets: [None, None],
                teams: [None, None],
                last_activity: now,
            }),
            match_runner: Mutex::new(None),
            coordination_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn status(&self) -> RoomStatus {
        self.inner.lock().expect("lock poisoned").status
    }

    pub fn touch(&self) {
        self.inner.lock().expect("lock poisoned").last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.inner.lock().expect("lock poisoned").last_activity.elapsed()
    }

    pub fn side_of(&self, connection: crate::protocol::types::ConnectionId) -> Option<Side> {
        let inner = self.inner.lock().expect("lock poisoned");
        Side::ALL
            .into_iter()
            .find(|&s| inner.sockets[side_index(s)].as_ref().map(|h| h.id()) == Some(connection))
    }

    pub fn is_socket_bound(&self, side: Side) -> bool {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.sockets[side_index(side)].is_some()
    }

    pub fn unbound_side(&self) -> Option<Side> {
        let inner = self.inner.lock().expect("lock poisoned");
        let unbound: Vec<Side> = Side::ALL
            .into_iter()
            .filter(|&s| inner.sockets[side_index(s)].is_none())
            .collect();
        match unbound.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Assigns `socket` to the first empty Side slot, `p1` then `p2`.
    pub fn join(&self, socket: SocketHandle) -> Result<Side, JoinError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.last_activity = Instant::now();
        for side in Side::ALL {
            if inner.sockets[side_index(side)].is_none() {
                inner.sockets[side_index(side)] = Some(socket);
                return Ok(side);
            }
        }
        Err(JoinError::RoomFull)
    }

    /// Directly places `socket` on `side`, replacing whatever was there
    /// (used by the reconnect branch of PvPCoordinator).
    pub fn bind_side(&self, side: Side, socket: SocketHandle) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.last_activity = Instant::now();
        inner.sockets[side_index(side)] = Some(socket);
    }

    pub fn remove_socket(&self, connection: crate::protocol::types::ConnectionId) -> Option<Side> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        for side in Side::ALL {
            if inner.sockets[side_index(side)].as_ref().map(|h| h.id()) == Some(connection) {
                inner.sockets[side_index(side)] = None;
                return Some(side);
            }
        }
        None
    }

    pub fn both_sockets_empty(&self) -> bool {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.sockets.iter().all(Option::is_none)
    }

    /// If `status == battling`, a no-op (teams are frozen inside the
    /// simulator). Otherwise validates and stores the team, and if both
    /// teams are now present, transitions to `ready` (spec.md §4.6).
    pub fn submit_team(
        &self,
        side: Side,
        team: Team,
        max_team_size: usize,
        dex: &Dex,
    ) -> Result<(), SubmitTeamError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.last_activity = Instant::now();
        if inner.status == RoomStatus::Battling {
            return Ok(());
        }
        validate_team(&team, max_team_size, dex)?;
        inner.teams[side_index(side)] = Some(team);
        if inner.teams[0].is_some() && inner.teams[1].is_some() {
            inner.status = RoomStatus::Ready;
        }
        Ok(())
    }

    pub fn team(&self, side: Side) -> Option<Team> {
        self.inner.lock().expect("lock poisoned").teams[side_index(side)].clone()
    }

    pub fn both_teams_present(&self) -> bool {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.teams[0].is_some() && inner.teams[1].is_some()
    }

    pub fn both_sockets_present(&self) -> bool {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.sockets[0].is_some() && inner.sockets[1].is_some()
    }

    pub fn socket(&self, side: Side) -> Option<SocketHandle> {
        self.inner.lock().expect("lock poisoned").sockets[side_index(side)].clone()
    }

    /// Transitions `waiting`/`ready` -> `battling`. Returns `false` if the
    /// room was not in a startable state (caller already holds the
    /// per-room lock implicitly via the coordinator's serialisation).
    pub fn start_battling(&self) -> bool {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.status == RoomStatus::Battling {
            return false;
        }
        inner.status = RoomStatus::Battling;
        true
    }

    pub fn mark_ended(&self) {
        self.inner.lock().expect("lock poisoned").status = RoomStatus::Ended;
    }

    /// Sends `{type:"room-update", ...}` to every currently bound socket
    /// (spec.md §4.6).
    pub fn broadcast_state(&self) {
        let inner = self.inner.lock().expect("lock poisoned");
        let payload = RoomUpdatePayload {
            room_id: self.room_id.clone(),
            status: inner.status.as_str().to_string(),
            p1_ready: inner.teams[0].is_some(),
            p2_ready: inner.teams[1].is_some(),
        };
        for socket in inner.sockets.iter().flatten() {
            socket.send_control(ServerMessage::RoomUpdate(payload.clone()));
        }
    }

    pub fn notify_opponent_disconnected(&self, remaining: Side) {
        let inner = self.inner.lock().expect("lock poisoned");
        if let Some(socket) = &inner.sockets[side_index(remaining)] {
            socket.send_control(ServerMessage::OpponentDisconnected);
        }
        debug!(room_id = %self.room_id, "opponent disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::socket::test_handle;
    use crate::protocol::types::PokemonSpec;

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

    #[test]
    fn join_assigns_p1_then_p2_then_fails() {
        let room = Room::new("ROOM1".to_string());
        let (s1, _r1) = test_handle();
        let (s2, _r2) = test_handle();
        let (s3, _r3) = test_handle();
        assert_eq!(room.join(s1).unwrap(), Side::P1);
        assert_eq!(room.join(s2).unwrap(), Side::P2);
        assert_eq!(room.join(s3), Err(JoinError::RoomFull));
    }

    #[test]
    fn submit_team_transitions_to_ready_once_both_present() {
        let room = Room::new("ROOM2".to_string());
        assert_eq!(room.status(), RoomStatus::Waiting);
        room.submit_team(Side::P1, team(), 6, &Dex).unwrap();
        assert_eq!(room.status(), RoomStatus::Waiting);
        room.submit_team(Side::P2, team(), 6, &Dex).unwrap();
        assert_eq!(room.status(), RoomStatus::Ready);
    }

    #[test]
    fn submit_team_while_battling_is_a_no_op() {
        let room = Room::new("ROOM3".to_string());
        room.start_battling();
        assert!(room.submit_team(Side::P1, team(), 6, &Dex).is_ok());
        assert!(room.team(Side::P1).is_none());
    }

    #[test]
    fn submit_team_with_unresolvable_species_is_rejected() {
        let room = Room::new("ROOM4".to_string());
        let bad_team = Team(vec![PokemonSpec {
            species: "Mewthree".to_string(),
            ability: None,
            item: None,
            moves: vec!["Thunderbolt".to_string()],
            nature: None,
            level: 50,
        }]);
        assert!(room.submit_team(Side::P1, bad_team, 6, &Dex).is_err());
        assert!(room.team(Side::P1).is_none());
    }
}
