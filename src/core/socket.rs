//! A transport-agnostic handle to a connected client's outbound channel.
//!
//! [`Room`](crate::core::room::Room) and
//! [`MatchRunner`](crate::core::match_runner::MatchRunner) never touch an
//! `axum` websocket directly — they hold a [`SocketHandle`], which is just
//! the sending half of an unbounded channel. The real websocket (in
//! [`crate::websocket::connection`]) owns a task draining the matching
//! receiver and writing frames to the wire.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::protocol::messages::ServerMessage;
use crate::protocol::types::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    Normal,
    GoingAway,
}

#[derive(Debug)]
pub enum OutboundFrame {
    /// A raw, byte-exact simulator protocol line.
    Raw(Bytes),
    /// A control envelope, serialised to JSON by the connection task.
    Control(Box<ServerMessage>),
    Close { code: CloseCode, reason: String },
}

/// Cheaply cloneable; identity is the [`ConnectionId`], not the channel.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl SocketHandle {
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn send_raw(&self, line: Bytes) -> bool {
        self.sender.send(OutboundFrame::Raw(line)).is_ok()
    }

    pub fn send_control(&self, message: ServerMessage) -> bool {
        self.sender
            .send(OutboundFrame::Control(Box::new(message)))
            .is_ok()
    }

    pub fn close(&self, code: CloseCode, reason: impl Into<String>) {
        let _ = self.sender.send(OutboundFrame::Close {
            code,
            reason: reason.into(),
        });
    }
}

impl PartialEq for SocketHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SocketHandle {}

#[cfg(test)]
pub(crate) fn test_handle() -> (SocketHandle, mpsc::UnboundedReceiver<OutboundFrame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SocketHandle::new(uuid::Uuid::new_v4(), tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_with_different_ids_are_not_equal() {
        let (a, _rx_a) = test_handle();
        let (b, _rx_b) = test_handle();
        assert_ne!(a, b);
    }

    #[test]
    fn dropped_receiver_makes_handle_not_live() {
        let (handle, rx) = test_handle();
        assert!(handle.is_live());
        drop(rx);
        assert!(!handle.is_live());
    }
}
