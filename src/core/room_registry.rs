//! In-memory `roomID -> Room` map: creation, lookup, and idle sweep
//! (spec.md §4.6).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::info;

use crate::core::room::{Room, RoomStatus};
use crate::metrics::ServerMetrics;
use crate::protocol::room_id::generate_room_id;
use crate::protocol::types::RoomId;

pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Room>>,
    room_code_length: usize,
    metrics: Arc<ServerMetrics>,
}

impl RoomRegistry {
    pub fn new(room_code_length: usize, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            rooms: DashMap::new(),
            room_code_length,
            metrics,
        }
    }

    /// Mints an unguessable token (≈50 bits of entropy at the default
    /// length; see `protocol::room_id`) and stores a new `waiting` Room.
    pub fn create(&self) -> Arc<Room> {
        let room_id = generate_room_id(self.room_code_length);
        let room = Arc::new(Room::new(room_id.clone()));
        self.rooms.insert(room_id, room.clone());
        self.metrics.increment_rooms_created();
        room
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, room_id: &str) {
        if self.rooms.remove(room_id).is_some() {
            self.metrics.increment_rooms_deleted();
        }
    }

    /// Garbage-collects rooms with `status in {waiting, ready, ended}` and
    /// no bound sockets. A `battling` room is never deleted here — it is
    /// released only when its MatchRunner closes (spec.md §4.6).
    pub fn delete_if_empty_and_not_battling(&self, room_id: &str) {
        let should_delete = match self.rooms.get(room_id) {
            Some(room) => room.status() != RoomStatus::Battling && room.both_sockets_empty(),
            None => false,
        };
        if should_delete {
            self.remove(room_id);
        }
    }

    /// Background sweep: rooms idle beyond `idle_timeout` are deleted
    /// (unless `battling`, which is the MatchRunner's responsibility) and
    /// logged at INFO (spec.md §5).
    pub fn sweep_idle(&self, idle_timeout: Duration) {
        let stale: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|entry| {
                let room = entry.value();
                room.status() != RoomStatus::Battling && room.idle_for() > idle_timeout
            })
            .map(|entry| entry.key().clone())
            .collect();
        for room_id in stale {
            info!(room_id, "sweeping idle room");
            self.remove(&room_id);
        }
    }

    /// Rooms currently `battling`, for the maintenance task to check their
    /// attached `MatchRunner` for natural end or idle timeout (spec.md §5).
    pub fn battling_rooms(&self) -> Vec<Arc<Room>> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().status() == RoomStatus::Battling)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
