//! Match/room orchestration: the ten components spec.md §2 enumerates,
//! minus [`crate::simulator::adapter::SimulatorAdapter`] and the AI tiers
//! (in [`crate::ai`]).

pub mod ai_coordinator;
pub mod ai_match_runner;
pub mod match_runner;
pub mod protocol_cache;
pub mod pvp_coordinator;
pub mod room;
pub mod room_registry;
pub mod socket;

pub use ai_coordinator::AiCoordinator;
pub use ai_match_runner::AiMatchRunner;
pub use match_runner::MatchRunner;
pub use pvp_coordinator::PvpCoordinator;
pub use room::{Room, RoomStatus};
pub use room_registry::RoomRegistry;
pub use socket::{CloseCode, OutboundFrame, SocketHandle};
