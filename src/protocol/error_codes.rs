use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire-visible error code, sent alongside an `error` envelope's message
/// (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    ConnectionConflict,
    CannotDetermineSide,
    InvalidTeam,
    InvalidCommand,
    NoActiveMatch,
    SimulatorUnavailable,
    InternalError,
}

/// The six error categories of spec.md §7, as a typed enum. Each
/// component-local error (e.g. [`crate::core::room::RoomError`]) converts
/// into one of these at the `ConnectionController` boundary, which decides
/// how to surface it (inline `error` envelope vs. socket close vs. process
/// exit) per the propagation policy.
#[derive(Debug, Error)]
pub enum MediationError {
    /// Bad JSON frame, unknown envelope type, command rejected by the
    /// simulator. Reported inline; connection stays open.
    #[error("{0}")]
    TransientClient(String),

    /// `join-room` on a full room, `start` with a connection conflict or an
    /// undetermined side. Reported inline; connection stays open.
    #[error("{0}")]
    StateConflict(String),

    /// Invalid team. Reported inline; Room is left in its prior status.
    #[error("{0}")]
    ValidationFailure(String),

    /// Simulator unavailable, or its streams ended before `|win|`/`|tie|`.
    /// Both sockets in the match are closed with `InternalError`.
    #[error("match ended fatally: {0}")]
    MatchFatal(String),

    /// Bind failure, file descriptor exhaustion. Surfaced at process level.
    #[error("resource exhausted: {0}")]
    Resource(String),
}

impl MediationError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            MediationError::TransientClient(_) => ErrorCode::InvalidCommand,
            MediationError::StateConflict(_) => ErrorCode::ConnectionConflict,
            MediationError::ValidationFailure(_) => ErrorCode::InvalidTeam,
            MediationError::MatchFatal(_) => ErrorCode::SimulatorUnavailable,
            MediationError::Resource(_) => ErrorCode::InternalError,
        }
    }

    /// Whether this error, reported to a client, should close the socket.
    /// Only `MatchFatal` does per spec.md §7's propagation policy.
    pub fn closes_connection(&self) -> bool {
        matches!(self, MediationError::MatchFatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_match_fatal_closes_the_connection() {
        assert!(!MediationError::TransientClient("x".into()).closes_connection());
        assert!(!MediationError::StateConflict("x".into()).closes_connection());
        assert!(!MediationError::ValidationFailure("x".into()).closes_connection());
        assert!(MediationError::MatchFatal("x".into()).closes_connection());
    }
}
