//! The in-process battle actor: a small deterministic stand-in for the
//! embedded simulator library referenced by spec.md §1/§4.1. No real
//! Pokemon-battle-simulation crate exists in this workspace's dependency
//! stack, so the actor implements just enough of the wire contract —
//! three init lines in, three line-streams out, turn-by-turn `request`/
//! `choice` exchange — for [`crate::core::match_runner::MatchRunner`] to
//! drive against.

use bytes::Bytes;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::types::{Side, Team};
use crate::simulator::dex::{type_effectiveness, Dex, MoveData, Type};

/// Commands accepted by a running battle, written by
/// [`crate::simulator::adapter::SimulatorAdapter::new_battle`]'s init
/// sequence and thereafter by `MatchRunner::forward_choice`.
#[derive(Debug, Clone)]
pub enum SimCommand {
    Start { format_id: String, seed: Option<u64> },
    Player { side: Side, name: String, team: Team },
    Choice { side: Side, command: String },
}

pub type BattleWriter = mpsc::UnboundedSender<SimCommand>;
pub type BattleReader = mpsc::UnboundedReceiver<Bytes>;

struct ResolvedMove {
    name: String,
    move_type: Type,
    power: u16,
    accuracy: u8,
    is_status: bool,
}

impl From<&MoveData> for ResolvedMove {
    fn from(m: &MoveData) -> Self {
        Self {
            name: m.name.to_string(),
            move_type: m.move_type,
            power: m.power,
            accuracy: m.accuracy,
            is_status: m.is_status,
        }
    }
}

fn fallback_move(raw: &str) -> ResolvedMove {
    ResolvedMove {
        name: raw.to_string(),
        move_type: Type::Normal,
        power: 60,
        accuracy: 100,
        is_status: false,
    }
}

struct PartyMember {
    name: String,
    types: Vec<Type>,
    base_atk: u16,
    base_spe: u16,
    max_hp: i32,
    current_hp: i32,
    moves: Vec<ResolvedMove>,
}

impl PartyMember {
    fn fainted(&self) -> bool {
        self.current_hp <= 0
    }
}

/// Stats used for a species id the tiny static dex doesn't recognise.
const FALLBACK_STATS: (u16, u16, u16) = (70, 70, 70); // base_hp, base_atk, base_spe

fn resolve_party(team: &Team, dex: &Dex) -> Vec<PartyMember> {
    team.as_slice()
        .iter()
        .map(|spec| {
            let (name, types, base_hp, base_atk, base_spe) = match dex.lookup_species(&spec.species)
            {
                Some(s) => (
                    s.name.to_string(),
                    s.types.to_vec(),
                    s.base_hp,
                    s.base_atk,
                    s.base_spe,
                ),
                None => (
                    spec.species.clone(),
                    vec![Type::Normal],
                    FALLBACK_STATS.0,
                    FALLBACK_STATS.1,
                    FALLBACK_STATS.2,
                ),
            };
            let moves: Vec<ResolvedMove> = spec
                .moves
                .iter()
                .map(|m| {
                    dex.lookup_move(m)
                        .map(ResolvedMove::from)
                        .unwrap_or_else(|| fallback_move(m))
                })
                .collect();
            let max_hp = 50 + base_hp as i32;
            PartyMember {
                name,
                types,
                base_atk,
                base_spe,
                max_hp,
                current_hp: max_hp,
                moves,
            }
        })
        .collect()
}

struct Combatant {
    player_name: String,
    party: Vec<PartyMember>,
    active: usize,
}

impl Combatant {
    fn active_member(&self) -> &PartyMember {
        &self.party[self.active]
    }

    fn active_member_mut(&mut self) -> &mut PartyMember {
        &mut self.party[self.active]
    }

    fn has_any_alive(&self) -> bool {
        self.party.iter().any(|m| !m.fainted())
    }

    fn auto_switch_if_fainted(&mut self) {
        if self.active_member().fainted() {
            if let Some(idx) = self.party.iter().position(|m| !m.fainted()) {
                self.active = idx;
            }
        }
    }

    fn request_json(&self, side: Side, opponent: &Combatant) -> serde_json::Value {
        let mon = self.active_member();
        let opponent_active = opponent.active_member();
        json!({
            "side": side.as_str(),
            "active": mon.name,
            "hp": mon.current_hp,
            "maxHp": mon.max_hp,
            "hpFraction": mon.current_hp as f64 / mon.max_hp as f64,
            "moves": mon.moves.iter().map(|m| json!({
                "name": m.name,
                "type": m.move_type,
                "power": m.power,
                "accuracy": m.accuracy,
                "isStatus": m.is_status,
            })).collect::<Vec<_>>(),
            "team": self.party.iter().map(|m| json!({
                "name": m.name,
                "hp": m.current_hp,
                "maxHp": m.max_hp,
                "fainted": m.fainted(),
                "types": m.types,
            })).collect::<Vec<_>>(),
            "opponentActive": {
                "name": opponent_active.name,
                "types": opponent_active.types,
            },
        })
    }
}

enum Action {
    Move(usize),
    Switch(usize),
}

fn parse_command(raw: &str) -> Action {
    let trimmed = raw.trim().to_ascii_lowercase();
    let mut parts = trimmed.split_whitespace();
    match parts.next() {
        Some("switch") => parts
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .map(|n| Action::Switch(n.saturating_sub(1)))
            .unwrap_or(Action::Move(0)),
        Some("move") => parts
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .map(|n| Action::Move(n.saturating_sub(1)))
            .unwrap_or(Action::Move(0)),
        _ => Action::Move(0),
    }
}

const MAX_TURNS: u32 = 50;

/// Runs until the match concludes or every reader is dropped. Spawned as a
/// tokio task by [`crate::simulator::adapter::SimulatorAdapter`].
pub async fn run_battle_actor(
    mut commands: mpsc::UnboundedReceiver<SimCommand>,
    omniscient: mpsc::UnboundedSender<Bytes>,
    p1_out: mpsc::UnboundedSender<Bytes>,
    p2_out: mpsc::UnboundedSender<Bytes>,
) {
    let dex = Dex;
    let mut format_id = String::new();
    let mut seed = None;
    let mut p1_info: Option<(String, Team)> = None;
    let mut p2_info: Option<(String, Team)> = None;

    while p1_info.is_none() || p2_info.is_none() {
        match commands.recv().await {
            Some(SimCommand::Start { format_id: f, seed: s }) => {
                format_id = f;
                seed = s;
            }
            Some(SimCommand::Player { side, name, team }) => match side {
                Side::P1 => p1_info = Some((name, team)),
                Side::P2 => p2_info = Some((name, team)),
            },
            Some(SimCommand::Choice { .. }) => {
                warn!("choice received before battle initialised; dropping");
            }
            None => return,
        }
    }

    let (p1_name, p1_team) = p1_info.expect("checked above");
    let (p2_name, p2_team) = p2_info.expect("checked above");
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    let mut p1 = Combatant {
        party: resolve_party(&p1_team, &dex),
        player_name: p1_name.clone(),
        active: 0,
    };
    let mut p2 = Combatant {
        party: resolve_party(&p2_team, &dex),
        player_name: p2_name.clone(),
        active: 0,
    };

    debug!(format_id, ?seed, "battle starting");

    let send_all = |omni: &mpsc::UnboundedSender<Bytes>, line: String| {
        let _ = omni.send(Bytes::from(line));
    };

    send_all(&omniscient, format!("|player|p1|{p1_name}|"));
    send_all(&omniscient, format!("|player|p2|{p2_name}|"));
    send_all(&omniscient, "|teampreview|".to_string());

    let mut pending_p1: Option<String> = None;
    let mut pending_p2: Option<String> = None;

    for turn in 1..=MAX_TURNS {
        send_all(&omniscient, format!("|turn|{turn}|"));
        let _ = p1_out.send(Bytes::from(format!(
            "|request|{}",
            p1.request_json(Side::P1, &p2)
        )));
        let _ = p2_out.send(Bytes::from(format!(
            "|request|{}",
            p2.request_json(Side::P2, &p1)
        )));

        while pending_p1.is_none() || pending_p2.is_none() {
            match commands.recv().await {
                Some(SimCommand::Choice { side, command }) => match side {
                    Side::P1 => pending_p1 = Some(command),
                    Side::P2 => pending_p2 = Some(command),
                },
                Some(_) => {}
                None => return,
            }
        }

        let p1_cmd = pending_p1.take().expect("just filled");
        let p2_cmd = pending_p2.take().expect("just filled");

        apply_action(&mut p1, parse_command(&p1_cmd), Side::P1, &omniscient);
        apply_action(&mut p2, parse_command(&p2_cmd), Side::P2, &omniscient);

        let order = if p1.active_member().base_spe >= p2.active_member().base_spe {
            [Side::P1, Side::P2]
        } else {
            [Side::P2, Side::P1]
        };
        for attacker_side in order {
            let (attacker, defender) = match attacker_side {
                Side::P1 => (&mut p1, &mut p2),
                Side::P2 => (&mut p2, &mut p1),
            };
            if attacker.active_member().fainted() {
                continue;
            }
            resolve_move(attacker, defender, attacker_side, &mut rng, &omniscient);
            p1.auto_switch_if_fainted();
            p2.auto_switch_if_fainted();
        }

        let p1_alive = p1.has_any_alive();
        let p2_alive = p2.has_any_alive();
        match (p1_alive, p2_alive) {
            (true, false) => {
                send_all(&omniscient, format!("|win|{}|", p1.player_name));
                return;
            }
            (false, true) => {
                send_all(&omniscient, format!("|win|{}|", p2.player_name));
                return;
            }
            (false, false) => {
                send_all(&omniscient, "|tie|".to_string());
                return;
            }
            (true, true) => {}
        }
    }

    send_all(&omniscient, "|tie|".to_string());
}

fn apply_action(
    combatant: &mut Combatant,
    action: Action,
    side: Side,
    omniscient: &mpsc::UnboundedSender<Bytes>,
) {
    if let Action::Switch(idx) = action {
        if idx < combatant.party.len() && !combatant.party[idx].fainted() {
            combatant.active = idx;
            let name = combatant.active_member().name.clone();
            let _ = omniscient.send(Bytes::from(format!("|switch|{side}a: {name}|")));
        }
    }
}

fn resolve_move(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    side: Side,
    rng: &mut StdRng,
    omniscient: &mpsc::UnboundedSender<Bytes>,
) {
    if attacker.active_member().moves.is_empty() {
        return;
    }
    let move_idx = rng.random_range(0..attacker.active_member().moves.len());
    let (move_name, move_type, power, accuracy, is_status) = {
        let m = &attacker.active_member().moves[move_idx];
        (m.name.clone(), m.move_type, m.power, m.accuracy, m.is_status)
    };
    let attacker_name = attacker.active_member().name.clone();
    let _ = omniscient.send(Bytes::from(format!(
        "|move|{side}a: {attacker_name}|{move_name}|"
    )));

    if is_status || rng.random_range(0..100) >= accuracy {
        return;
    }

    let defender_types = defender.active_member().types.clone();
    let eff: f64 = defender_types
        .iter()
        .map(|t| type_effectiveness(move_type, *t))
        .product();
    let atk = attacker.active_member().base_atk as f64;
    let raw = (power as f64) * (atk / 50.0) * eff / 3.0;
    let damage = (raw.max(1.0)) as i32;

    let defender_mon = defender.active_member_mut();
    defender_mon.current_hp = (defender_mon.current_hp - damage).max(0);
    let remaining_pct = ((defender_mon.current_hp as f64 / defender_mon.max_hp as f64) * 100.0)
        .round() as i64;
    let defender_side = side.other();
    let _ = omniscient.send(Bytes::from(format!(
        "|-damage|{defender_side}a: {}|{}/100|",
        defender_mon.name, remaining_pct
    )));
}
