//! Static species/move/item metadata and the type chart (spec.md §4.1,
//! §4.5). A small, fixed dataset: the real simulator's dex is out of scope
//! (spec.md §1), but its *shape* — lookups by id, a type-effectiveness
//! table consumed by the AI tiers — is part of the in-scope contract.

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Flying,
}

impl Type {
    fn index(self) -> usize {
        self as usize
    }
}

const TYPE_COUNT: usize = 8;

/// `chart[attacker][defender]` multiplier.
#[rustfmt::skip]
const TYPE_CHART: [[f64; TYPE_COUNT]; TYPE_COUNT] = {
    // order: Normal Fire Water Electric Grass Ice Fighting Flying
    let n = 1.0; let h = 2.0; let l = 0.5; let z = 0.0;
    [
        [n, n, n, n, n, n, n, n],       // Normal
        [n, l, l, n, h, h, n, n],       // Fire
        [n, h, l, l, l, n, n, n],       // Water
        [n, n, h, l, l, n, n, h],       // Electric
        [n, l, h, n, l, n, n, l],       // Grass
        [n, l, l, n, h, l, n, h],       // Ice
        [h, n, n, n, n, h, n, l],       // Fighting
        [n, n, n, l, h, n, h, n],       // Flying
    ]
};

pub fn type_effectiveness(attacking: Type, defending: Type) -> f64 {
    TYPE_CHART[attacking.index()][defending.index()]
}

#[derive(Debug, Clone)]
pub struct MoveData {
    pub name: &'static str,
    pub move_type: Type,
    pub power: u16,
    pub accuracy: u8,
    pub is_status: bool,
}

#[derive(Debug, Clone)]
pub struct SpeciesData {
    pub name: &'static str,
    pub types: &'static [Type],
    pub base_hp: u16,
    pub base_atk: u16,
    pub base_spe: u16,
}

fn moves() -> &'static HashMap<String, MoveData> {
    static MOVES: OnceLock<HashMap<String, MoveData>> = OnceLock::new();
    MOVES.get_or_init(|| {
        let entries = [
            MoveData { name: "Thunderbolt", move_type: Type::Electric, power: 90, accuracy: 100, is_status: false },
            MoveData { name: "Quick Attack", move_type: Type::Normal, power: 40, accuracy: 100, is_status: false },
            MoveData { name: "Flamethrower", move_type: Type::Fire, power: 90, accuracy: 100, is_status: false },
            MoveData { name: "Surf", move_type: Type::Water, power: 90, accuracy: 100, is_status: false },
            MoveData { name: "Ice Beam", move_type: Type::Ice, power: 90, accuracy: 100, is_status: false },
            MoveData { name: "Vine Whip", move_type: Type::Grass, power: 45, accuracy: 100, is_status: false },
            MoveData { name: "Close Combat", move_type: Type::Fighting, power: 120, accuracy: 100, is_status: false },
            MoveData { name: "Aerial Ace", move_type: Type::Flying, power: 60, accuracy: 100, is_status: false },
            MoveData { name: "Tackle", move_type: Type::Normal, power: 40, accuracy: 100, is_status: false },
            MoveData { name: "Agility", move_type: Type::Normal, power: 0, accuracy: 100, is_status: true },
        ];
        entries
            .into_iter()
            .map(|m| (m.name.to_ascii_lowercase(), m))
            .collect()
    })
}

fn species() -> &'static HashMap<String, SpeciesData> {
    static SPECIES: OnceLock<HashMap<String, SpeciesData>> = OnceLock::new();
    SPECIES.get_or_init(|| {
        let entries = [
            SpeciesData { name: "Pikachu", types: &[Type::Electric], base_hp: 35, base_atk: 55, base_spe: 90 },
            SpeciesData { name: "Charizard", types: &[Type::Fire, Type::Flying], base_hp: 78, base_atk: 84, base_spe: 100 },
            SpeciesData { name: "Blastoise", types: &[Type::Water], base_hp: 79, base_atk: 83, base_spe: 78 },
            SpeciesData { name: "Venusaur", types: &[Type::Grass], base_hp: 80, base_atk: 82, base_spe: 80 },
            SpeciesData { name: "Machamp", types: &[Type::Fighting], base_hp: 90, base_atk: 130, base_spe: 55 },
            SpeciesData { name: "Lapras", types: &[Type::Water, Type::Ice], base_hp: 130, base_atk: 85, base_spe: 60 },
        ];
        entries
            .into_iter()
            .map(|s| (s.name.to_ascii_lowercase(), s))
            .collect()
    })
}

/// Static metadata lookups exposed by [`crate::simulator::adapter::SimulatorAdapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Dex;

impl Dex {
    pub fn lookup_move(&self, id: &str) -> Option<&'static MoveData> {
        moves().get(&id.trim().to_ascii_lowercase())
    }

    pub fn lookup_species(&self, id: &str) -> Option<&'static SpeciesData> {
        species().get(&id.trim().to_ascii_lowercase())
    }

    /// Items are not mechanically modelled; any non-empty id resolves.
    pub fn lookup_item(&self, id: &str) -> Option<&'static str> {
        if id.trim().is_empty() {
            None
        } else {
            Some("generic-item")
        }
    }

    /// Builds an auto-generated team of `size` known species for the
    /// AICoordinator's synthetic `p2` (spec.md §4.8). Good enough since the
    /// AI side never needs to pass team validation from a client.
    pub fn sample_team(&self, size: usize) -> crate::protocol::types::Team {
        use crate::protocol::types::PokemonSpec;
        let all: Vec<&'static SpeciesData> = species().values().collect();
        let moves_list: Vec<&'static MoveData> = moves().values().collect();
        let members = (0..size.min(all.len()))
            .map(|i| {
                let sp = all[i % all.len()];
                let picked_moves: Vec<String> = (0..2)
                    .map(|j| moves_list[(i + j) % moves_list.len()].name.to_string())
                    .collect();
                PokemonSpec {
                    species: sp.name.to_string(),
                    ability: None,
                    item: None,
                    moves: picked_moves,
                    nature: None,
                    level: 50,
                }
            })
            .collect();
        crate::protocol::types::Team(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_species_resolves() {
        assert!(Dex.lookup_species("pikachu").is_some());
        assert!(Dex.lookup_species("Pikachu").is_some());
    }

    #[test]
    fn unknown_species_does_not_resolve() {
        assert!(Dex.lookup_species("not-a-real-mon").is_none());
    }

    #[test]
    fn water_is_super_effective_against_fire() {
        assert_eq!(type_effectiveness(Type::Water, Type::Fire), 2.0);
    }

    #[test]
    fn electric_is_ineffective_against_ground_immune_flying_is_super() {
        assert_eq!(type_effectiveness(Type::Electric, Type::Flying), 2.0);
    }
}
