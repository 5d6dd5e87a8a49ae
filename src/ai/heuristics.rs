//! Pure scoring helpers shared by AIChoiceEngine tiers 3–5 (spec.md §4.5:
//! "shared helpers, not part of the public contract").

use serde::Deserialize;

use crate::simulator::dex::{type_effectiveness, Type};

#[derive(Debug, Clone, Deserialize)]
pub struct MoveView {
    pub name: String,
    #[serde(rename = "type")]
    pub move_type: Type,
    pub power: u16,
    pub accuracy: u8,
    #[serde(rename = "isStatus")]
    pub is_status: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartyView {
    pub name: String,
    pub hp: i32,
    #[serde(rename = "maxHp")]
    pub max_hp: i32,
    pub fainted: bool,
    #[serde(default)]
    pub types: Vec<Type>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpponentActiveView {
    pub name: String,
    pub types: Vec<Type>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestView {
    pub side: String,
    pub active: String,
    pub hp: i32,
    #[serde(rename = "maxHp")]
    pub max_hp: i32,
    #[serde(rename = "hpFraction")]
    pub hp_fraction: f64,
    pub moves: Vec<MoveView>,
    pub team: Vec<PartyView>,
    #[serde(rename = "opponentActive")]
    pub opponent_active: OpponentActiveView,
}

fn type_multiplier(attacking: Type, defending_types: &[Type]) -> f64 {
    defending_types
        .iter()
        .map(|t| type_effectiveness(attacking, *t))
        .product()
}

/// Tier 2: raw type-effectiveness multiplier only.
pub fn type_score(mv: &MoveView, opponent_types: &[Type]) -> f64 {
    if mv.is_status {
        return 0.0;
    }
    type_multiplier(mv.move_type, opponent_types)
}

/// Tier 3 weighted score: `0.5*type + 0.3*normalisedPower + 0.2*accuracy`.
pub fn weighted_move_score(mv: &MoveView, opponent_types: &[Type]) -> f64 {
    if mv.is_status {
        return 0.0;
    }
    let type_component = type_multiplier(mv.move_type, opponent_types) / 4.0; // normalise vs 4x max
    let power_component = (mv.power as f64 / 150.0).min(1.0);
    let accuracy_component = mv.accuracy as f64 / 100.0;
    0.5 * type_component + 0.3 * power_component + 0.2 * accuracy_component
}

/// Tier 4/5 full heuristic: same weighting as tier 3, offered as a
/// separate function so evaluate_move's signature documents intent even
/// though the formula is currently shared.
pub fn evaluate_move(mv: &MoveView, opponent_types: &[Type]) -> f64 {
    weighted_move_score(mv, opponent_types)
}

/// Score for switching into `candidate` against `opponent_types`: purely
/// the defensive type matchup (lower incoming multiplier is better, so we
/// invert it into a score where higher is better).
pub fn evaluate_switch(candidate: &PartyView, opponent_types: &[Type]) -> f64 {
    if candidate.fainted {
        return f64::MIN;
    }
    let worst_incoming = candidate
        .types
        .iter()
        .map(|defending| {
            opponent_types
                .iter()
                .map(|attacking| type_effectiveness(*attacking, *defending))
                .product::<f64>()
        })
        .fold(0.0_f64, f64::max);
    let hp_fraction = if candidate.max_hp > 0 {
        candidate.hp as f64 / candidate.max_hp as f64
    } else {
        0.0
    };
    (2.0 - worst_incoming) + hp_fraction
}
