//! Wire protocol: control envelopes, error codes, room IDs, and validation.
//!
//! Raw `|`-prefixed simulator protocol lines are not modelled as Rust types
//! here — they are opaque byte-exact [`bytes::Bytes`] passed straight
//! through by [`crate::core::protocol_cache`] and [`crate::websocket::sending`].

pub mod error_codes;
pub mod messages;
pub mod room_id;
pub mod types;
pub mod validation;

pub use error_codes::{ErrorCode, MediationError};
pub use messages::{ClientMessage, RoomUpdatePayload, ServerMessage};
pub use room_id::generate_room_id;
pub use types::{AiConfig, ConnectionId, Mode, PokemonSpec, RoomId, Side, Team};
pub use validation::{validate_command, validate_team};
