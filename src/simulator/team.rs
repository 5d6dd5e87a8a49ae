//! Team (de)serialization for the wire format `SimulatorAdapter.packTeam`/
//! `unpackTeam` exposes (spec.md §4.1). `Team` is already `serde`-derived,
//! so packing is just a JSON encode into an opaque byte buffer — mirroring
//! how the teacher crate treats its wire payloads as serde-to-bytes rather
//! than a bespoke binary format.

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::types::Team;

#[derive(Debug, Error)]
pub enum TeamCodecError {
    #[error("failed to encode team: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode team: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn pack_team(team: &Team) -> Result<Bytes, TeamCodecError> {
    serde_json::to_vec(team)
        .map(Bytes::from)
        .map_err(TeamCodecError::Encode)
}

pub fn unpack_team(bytes: &[u8]) -> Result<Team, TeamCodecError> {
    serde_json::from_slice(bytes).map_err(TeamCodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::PokemonSpec;

    #[test]
    fn pack_then_unpack_round_trips() {
        let team = Team(vec![PokemonSpec {
            species: "Pikachu".to_string(),
            ability: None,
            item: None,
            moves: vec!["Thunderbolt".to_string()],
            nature: None,
            level: 50,
        }]);
        let packed = pack_team(&team).unwrap();
        let unpacked = unpack_team(&packed).unwrap();
        assert_eq!(unpacked.as_slice().len(), 1);
        assert_eq!(unpacked.as_slice()[0].species, "Pikachu");
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(unpack_team(b"not json").is_err());
    }
}
