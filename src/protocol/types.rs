use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier minted when a websocket is accepted; stable for the
/// life of that socket (spec.md §3).
pub type ConnectionId = Uuid;

/// Short unguessable room token (spec.md §4.6).
pub type RoomId = String;

/// Viewpoint identifier inside a match. Distinct from [`ConnectionId`]: the
/// socket bound to a `Side` may be replaced over the match's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    P1,
    P2,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::P1, Side::P2];

    pub fn other(self) -> Side {
        match self {
            Side::P1 => Side::P2,
            Side::P2 => Side::P1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::P1 => "p1",
            Side::P2 => "p2",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One member of a [`Team`] (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokemonSpec {
    pub species: String,
    #[serde(default)]
    pub ability: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    pub moves: Vec<String>,
    #[serde(default)]
    pub nature: Option<String>,
    #[serde(default = "default_level")]
    pub level: u8,
}

fn default_level() -> u8 {
    50
}

/// An ordered sequence of 1..6 [`PokemonSpec`] (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team(pub Vec<PokemonSpec>);

impl Team {
    pub fn as_slice(&self) -> &[PokemonSpec] {
        &self.0
    }
}

/// Match mode requested in a `start` envelope (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Ai,
    Pvp,
}

/// Per-AIMatchRunner configuration (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct AiConfig {
    pub tier: u8,
}

impl AiConfig {
    pub fn new(tier: u8) -> Self {
        Self {
            tier: tier.clamp(1, 5),
        }
    }
}
