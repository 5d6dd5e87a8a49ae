//! Owns one match end-to-end (spec.md §4.3/§4.4).

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::core::protocol_cache::{ProtocolCache, Stream};
use crate::core::socket::{CloseCode, SocketHandle};
use crate::metrics::{MatchEndReason, ServerMetrics};
use crate::protocol::messages::ServerMessage;
use crate::protocol::types::{RoomId, Side, Team};
use crate::protocol::validation::validate_command;
use crate::simulator::adapter::{BattleStreams, SimulatorAdapter, SimulatorError};
use crate::simulator::engine::{BattleReader, BattleWriter};

fn side_index(side: Side) -> usize {
    match side {
        Side::P1 => 0,
        Side::P2 => 1,
    }
}

/// Most recent `|request|<json>` for each side, cleared once a newer one
/// arrives (spec.md §3 `ChoiceRequest`).
#[derive(Debug, Default)]
struct ChoiceRequests {
    slots: [Option<Value>; 2],
}

pub struct MatchRunner {
    room_id: RoomId,
    sockets: Mutex<[Option<SocketHandle>; 2]>,
    cache: ProtocolCache,
    choice_requests: Mutex<ChoiceRequests>,
    writer: Mutex<Option<BattleWriter>>,
    ended: AtomicBool,
    pumps_remaining: AtomicU8,
    /// Set by the omniscient pump when it sees `|win|`/`|tie|`; read by
    /// whichever pump drains last to decide whether to call `close`.
    saw_terminal_line: AtomicBool,
    metrics: Arc<ServerMetrics>,
    request_notify: [Arc<Notify>; 2],
    /// Set when `unbind` leaves both sides null, cleared by `bind`; read by
    /// the idle sweep to decide whether to close with `Idle` (spec.md §5).
    both_unbound_since: Mutex<Option<std::time::Instant>>,
}

impl MatchRunner {
    /// Constructs the simulator and starts its three stream-pump tasks
    /// before returning, so no early protocol line can be dropped.
    pub async fn spawn(
        room_id: RoomId,
        format_id: &str,
        seed: Option<u64>,
        simulator: &SimulatorAdapter,
        p1_name: &str,
        p1_team: Team,
        p2_name: &str,
        p2_team: Team,
        metrics: Arc<ServerMetrics>,
    ) -> Result<Arc<Self>, SimulatorError> {
        let (writer, streams) = simulator.new_battle(
            &room_id, format_id, seed, p1_name, p1_team, p2_name, p2_team,
        )?;

        let runner = Arc::new(Self {
            room_id,
            sockets: Mutex::new([None, None]),
            cache: ProtocolCache::new(),
            choice_requests: Mutex::new(ChoiceRequests::default()),
            writer: Mutex::new(Some(writer)),
            ended: AtomicBool::new(false),
            pumps_remaining: AtomicU8::new(3),
            saw_terminal_line: AtomicBool::new(false),
            metrics,
            request_notify: [Arc::new(Notify::new()), Arc::new(Notify::new())],
            both_unbound_since: Mutex::new(None),
        });

        let BattleStreams { omniscient, p1, p2 } = streams;
        runner.clone().spawn_pump(Stream::Omniscient, omniscient);
        runner.clone().spawn_pump(Stream::Side(Side::P1), p1);
        runner.clone().spawn_pump(Stream::Side(Side::P2), p2);

        Ok(runner)
    }

    fn spawn_pump(self: Arc<Self>, stream: Stream, mut reader: BattleReader) {
        tokio::spawn(async move {
            while let Some(line) = reader.recv().await {
                if stream == Stream::Omniscient {
                    let text = String::from_utf8_lossy(&line);
                    if text.starts_with("|win|") || text.starts_with("|tie|") {
                        self.saw_terminal_line.store(true, Ordering::SeqCst);
                    }
                }
                self.cache.record(stream, line.clone());
                if let Stream::Side(side) = stream {
                    if let Some(json) = parse_request_json(&line) {
                        {
                            let mut requests = self.choice_requests.lock().expect("lock poisoned");
                            requests.slots[side_index(side)] = Some(json);
                        }
                        self.request_notify[side_index(side)].notify_one();
                    }
                }
                self.dispatch(stream, line);
            }
            // Whichever pump drains last checks the shared flag, not its own
            // local copy — the omniscient pump (which sees `|win|`/`|tie|`)
            // is rarely the last of the three to drain.
            if self.pumps_remaining.fetch_sub(1, Ordering::SeqCst) == 1
                && self.saw_terminal_line.load(Ordering::SeqCst)
            {
                self.close(MatchEndReason::EndOfBattle);
            }
        });
    }

    fn dispatch(&self, stream: Stream, line: bytes::Bytes) {
        let sockets = self.sockets.lock().expect("lock poisoned");
        match stream {
            Stream::Omniscient => {
                for slot in sockets.iter().flatten() {
                    slot.send_raw(line.clone());
                }
            }
            Stream::Side(side) => {
                if let Some(slot) = &sockets[side_index(side)] {
                    slot.send_raw(line);
                }
            }
        }
    }

    /// Attach or replace the socket on `side`. If this is a reconnect (the
    /// cache is non-empty), replays cached lines then sends
    /// `battle-reconnected` (spec.md §4.3). The replay is flushed and the
    /// new socket published into the dispatch slot under the same `sockets`
    /// lock `dispatch` takes, so a concurrently-running stream pump can
    /// never interleave a live line into, or ahead of, the replay.
    pub async fn bind(&self, side: Side, socket: SocketHandle) {
        *self.both_unbound_since.lock().expect("lock poisoned") = None;
        let previous = {
            let mut sockets = self.sockets.lock().expect("lock poisoned");

            if !self.cache.is_empty() {
                for line in self.cache.replay(side) {
                    socket.send_raw(line);
                }
                socket.send_control(ServerMessage::BattleReconnected {
                    side,
                    message: "replay complete".to_string(),
                });
            }

            let slot = &mut sockets[side_index(side)];
            let previous = slot.take();
            *slot = Some(socket.clone());
            previous
        };

        if let Some(old) = previous {
            if old.id() != socket.id() {
                old.close(CloseCode::Normal, "Replaced by new connection");
            }
        }

        debug!(room_id = %self.room_id, %side, "socket bound to match");
    }

    /// Write `command` verbatim into the simulator's input stream for
    /// `side` (spec.md §4.3). No parsing beyond `validate_command`.
    pub fn forward_choice(&self, side: Side, raw_command: &str) -> Result<(), String> {
        if self.ended.load(Ordering::SeqCst) {
            return Err("match has already ended".to_string());
        }
        let command = validate_command(raw_command).map_err(|e| e.to_string())?;
        let writer = self.writer.lock().expect("lock poisoned");
        match writer.as_ref() {
            Some(w) => {
                let _ = w.send(crate::simulator::engine::SimCommand::Choice { side, command });
                Ok(())
            }
            None => Err("match has already ended".to_string()),
        }
    }

    pub fn last_request(&self, side: Side) -> Option<Value> {
        let requests = self.choice_requests.lock().expect("lock poisoned");
        requests.slots[side_index(side)].clone()
    }

    /// Signalled each time a fresh `|request|` lands for `side`, consumed
    /// by [`crate::core::ai_match_runner::AiMatchRunner`]'s decision loop.
    pub fn request_notify(&self, side: Side) -> Arc<Notify> {
        self.request_notify[side_index(side)].clone()
    }

    /// Marks `endedAt`, releases the simulator handle, and closes both
    /// sockets (spec.md §4.3). Idempotent.
    pub fn close(&self, reason: MatchEndReason) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.metrics.increment_matches_ended(reason);
        self.writer.lock().expect("lock poisoned").take();
        let sockets = self.sockets.lock().expect("lock poisoned");
        for slot in sockets.iter().flatten() {
            slot.close(CloseCode::Normal, "Match ended");
        }
        debug!(room_id = %self.room_id, ?reason, "match closed");
    }

    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Unbinds the socket on `side` without ending the match (disconnect
    /// policy step 2, spec.md §5).
    pub fn unbind(&self, side: Side) {
        let mut sockets = self.sockets.lock().expect("lock poisoned");
        sockets[side_index(side)] = None;
        if sockets.iter().all(Option::is_none) {
            let mut marker = self.both_unbound_since.lock().expect("lock poisoned");
            if marker.is_none() {
                *marker = Some(std::time::Instant::now());
            }
        }
    }

    pub fn is_bound(&self, side: Side) -> bool {
        let sockets = self.sockets.lock().expect("lock poisoned");
        sockets[side_index(side)].is_some()
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// How long both sides have been unbound, if they currently are
    /// (spec.md §5 step 3's idle-match threshold).
    pub fn idle_for(&self) -> Option<std::time::Duration> {
        self.both_unbound_since
            .lock()
            .expect("lock poisoned")
            .map(|since| since.elapsed())
    }
}

fn parse_request_json(line: &bytes::Bytes) -> Option<Value> {
    let text = std::str::from_utf8(line).ok()?;
    let json_part = text.strip_prefix("|request|")?;
    match serde_json::from_str(json_part) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, "failed to parse |request| line as json");
            None
        }
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

    #[tokio::test]
    async fn bind_replays_cached_lines_on_reconnect() {
        let metrics = Arc::new(ServerMetrics::default());
        let simulator = SimulatorAdapter::new();
        let runner = MatchRunner::spawn(
            "ROOM".to_string(),
            "gen9ou",
            Some(1),
            &simulator,
            "Ash",
            team(),
            "Gary",
            team(),
            metrics,
        )
        .await
        .unwrap();

        let (first_socket, mut first_rx) = test_handle();
        runner.bind(Side::P1, first_socket).await;
        // drain a couple of lines so the cache is non-empty
        let _ = tokio::time::timeout(std::time::Duration::from_millis(200), first_rx.recv()).await;

        let (second_socket, mut second_rx) = test_handle();
        runner.bind(Side::P1, second_socket).await;

        let mut saw_reconnected = false;
        for _ in 0..20 {
            match tokio::time::timeout(std::time::Duration::from_millis(50), second_rx.recv())
                .await
            {
                Ok(Some(crate::core::socket::OutboundFrame::Control(msg))) => {
                    if matches!(*msg, ServerMessage::BattleReconnected { .. }) {
                        saw_reconnected = true;
                        break;
                    }
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_reconnected, "expected a battle-reconnected envelope");
    }

    #[tokio::test]
    async fn forward_choice_rejects_control_characters() {
        let metrics = Arc::new(ServerMetrics::default());
        let simulator = SimulatorAdapter::new();
        let runner = MatchRunner::spawn(
            "ROOM2".to_string(),
            "gen9ou",
            Some(2),
            &simulator,
            "Ash",
            team(),
            "Gary",
            team(),
            metrics,
        )
        .await
        .unwrap();

        assert!(runner.forward_choice(Side::P1, "move 1\u{0007}").is_err());
        assert!(runner.forward_choice(Side::P1, "move 1").is_ok());
    }

    #[tokio::test]
    async fn idle_marker_is_set_only_once_both_sides_are_unbound() {
        let metrics = Arc::new(ServerMetrics::default());
        let simulator = SimulatorAdapter::new();
        let runner = MatchRunner::spawn(
            "ROOM3".to_string(),
            "gen9ou",
            Some(3),
            &simulator,
            "Ash",
            team(),
            "Gary",
            team(),
            metrics,
        )
        .await
        .unwrap();

        let (p1_socket, _p1_rx) = test_handle();
        let (p2_socket, _p2_rx) = test_handle();
        runner.bind(Side::P1, p1_socket).await;
        runner.bind(Side::P2, p2_socket).await;
        assert!(runner.idle_for().is_none());

        runner.unbind(Side::P1);
        assert!(runner.idle_for().is_none(), "p2 still bound");

        runner.unbind(Side::P2);
        assert!(runner.idle_for().is_some());
    }
}
