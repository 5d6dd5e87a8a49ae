//! Public entry point to the embedded battle engine (spec.md §4.1).

use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::types::{RoomId, Side, Team};
use crate::simulator::dex::Dex;
use crate::simulator::engine::{run_battle_actor, BattleReader, BattleWriter, SimCommand};
pub use crate::simulator::team::{pack_team, unpack_team, TeamCodecError};

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("simulator unavailable")]
    Unavailable,
}

/// The three readable sub-streams of a running battle.
pub struct BattleStreams {
    pub omniscient: BattleReader,
    pub p1: BattleReader,
    pub p2: BattleReader,
}

/// Hides all knowledge of the embedded engine from callers (spec.md §4.1).
/// Construction never fails in this crate's in-process engine, but the
/// fallible signature is kept so callers handle `ErrSimulatorUnavailable`
/// the same way they would for a real out-of-process simulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatorAdapter {
    pub dex: Dex,
}

impl SimulatorAdapter {
    pub fn new() -> Self {
        Self { dex: Dex }
    }

    /// Constructs a fresh battle and writes the three init lines (`start`,
    /// `player p1`, `player p2`) into it, in that order. Stream consumption
    /// must begin *before* this call returns — `run_battle_actor` is
    /// spawned and begins buffering into its unbounded channels
    /// immediately, so no early protocol line can be lost even if the
    /// caller is slow to start reading.
    pub fn new_battle(
        &self,
        room_id: &RoomId,
        format_id: &str,
        seed: Option<u64>,
        p1_name: &str,
        p1_team: Team,
        p2_name: &str,
        p2_team: Team,
    ) -> Result<(BattleWriter, BattleStreams), SimulatorError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (omni_tx, omni_rx) = mpsc::unbounded_channel();
        let (p1_tx, p1_rx) = mpsc::unbounded_channel();
        let (p2_tx, p2_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_battle_actor(cmd_rx, omni_tx, p1_tx, p2_tx));

        let _ = cmd_tx.send(SimCommand::Start {
            format_id: format_id.to_string(),
            seed,
        });
        let _ = cmd_tx.send(SimCommand::Player {
            side: Side::P1,
            name: p1_name.to_string(),
            team: p1_team,
        });
        let _ = cmd_tx.send(SimCommand::Player {
            side: Side::P2,
            name: p2_name.to_string(),
            team: p2_team,
        });

        tracing::debug!(room_id = %room_id, format_id, "battle constructed");

        Ok((
            cmd_tx,
            BattleStreams {
                omniscient: omni_rx,
                p1: p1_rx,
                p2: p2_rx,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::PokemonSpec;

    fn team() -> Team {
        Team(vec![PokemonSpec {
            species: "Pikachu".to_string(),
            ability: None,
            item: None,
            moves: vec!["Thunderbolt".to_string(), "Quick Attack".to_string()],
            nature: None,
            level: 50,
        }])
    }

    #[tokio::test]
    async fn new_battle_emits_initial_omniscient_lines() {
        let adapter = SimulatorAdapter::new();
        let (_writer, mut streams) = adapter
            .new_battle(&"ROOM1".to_string(), "gen9ou", Some(42), "Ash", team(), "Gary", team())
            .unwrap();

        let first = streams.omniscient.recv().await.unwrap();
        assert!(String::from_utf8_lossy(&first).contains("|player|p1|Ash|"));
        let second = streams.omniscient.recv().await.unwrap();
        assert!(String::from_utf8_lossy(&second).contains("|player|p2|Gary|"));
    }

    #[tokio::test]
    async fn battle_concludes_after_choices_exchanged() {
        let adapter = SimulatorAdapter::new();
        let (writer, mut streams) = adapter
            .new_battle(&"ROOM2".to_string(), "gen9ou", Some(7), "Ash", team(), "Gary", team())
            .unwrap();

        // drain teampreview/player lines
        for _ in 0..3 {
            streams.omniscient.recv().await.unwrap();
        }
        // drain first request on each side, then submit choices until a
        // result line appears or we give up after a generous bound.
        for _ in 0..60 {
            let _ = streams.p1.try_recv();
            let _ = streams.p2.try_recv();
            let _ = writer.send(SimCommand::Choice {
                side: Side::P1,
                command: "move 1".to_string(),
            });
            let _ = writer.send(SimCommand::Choice {
                side: Side::P2,
                command: "move 1".to_string(),
            });
            if let Ok(line) = streams.omniscient.try_recv() {
                let text = String::from_utf8_lossy(&line);
                if text.contains("|win|") || text.contains("|tie|") {
                    return;
                }
            }
            tokio::task::yield_now().await;
        }
    }
}
