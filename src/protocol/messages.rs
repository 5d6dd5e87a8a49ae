use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{Mode, RoomId, Side, Team};

/// JSON control envelopes sent from client to server (spec.md §6).
///
/// Raw simulator protocol lines (`|`-prefixed) are a separate wire category,
/// handled directly by [`crate::websocket::sending`] — they are never
/// represented as a [`ClientMessage`] or [`ServerMessage`] variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "kebab-case")]
pub enum ClientMessage {
    CreateRoom,
    JoinRoom {
        room_id: RoomId,
    },
    Start {
        mode: Mode,
        #[serde(default)]
        format_id: Option<String>,
        #[serde(default)]
        team: Option<Team>,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        side: Option<Side>,
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default)]
        difficulty: Option<u8>,
    },
    Choose {
        command: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUpdatePayload {
    pub room_id: RoomId,
    pub status: String,
    pub p1_ready: bool,
    pub p2_ready: bool,
}

/// JSON control envelopes sent from server to client (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "kebab-case")]
pub enum ServerMessage {
    RoomCreated {
        room_id: RoomId,
    },
    RoomUpdate(RoomUpdatePayload),
    BattleStarted {
        room_id: RoomId,
    },
    BattleReconnected {
        side: Side,
        message: String,
    },
    OpponentDisconnected,
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            error_code: None,
        }
    }

    pub fn error_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        ServerMessage::Error {
            message: message.into(),
            error_code: Some(code),
        }
    }
}
