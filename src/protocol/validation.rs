use super::types::Team;
use crate::simulator::dex::Dex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TeamValidationError {
    #[error("team must contain between 1 and {max} pokemon")]
    WrongSize { max: usize },
    #[error("pokemon {index} has no species")]
    MissingSpecies { index: usize },
    #[error("duplicate species {species} in team")]
    DuplicateSpecies { species: String },
    #[error("pokemon {index} must have between 1 and 4 moves")]
    WrongMoveCount { index: usize },
    #[error("pokemon {index} has an empty move name")]
    EmptyMoveName { index: usize },
    #[error("pokemon {index} has unknown species {species}")]
    UnknownSpecies { index: usize, species: String },
    #[error("pokemon {index} has unknown move {move_name}")]
    UnknownMove { index: usize, move_name: String },
}

/// Validate a submitted [`Team`] (spec.md §3: non-empty, species resolvable,
/// no duplicate species, each move resolvable). Resolvability is checked
/// against `dex` directly — every caller that accepts a team from the wire
/// must resolve it here before storing or using it.
pub fn validate_team(team: &Team, max_team_size: usize, dex: &Dex) -> Result<(), TeamValidationError> {
    let members = team.as_slice();
    if members.is_empty() || members.len() > max_team_size {
        return Err(TeamValidationError::WrongSize { max: max_team_size });
    }

    let mut seen = std::collections::HashSet::new();
    for (index, member) in members.iter().enumerate() {
        if member.species.trim().is_empty() {
            return Err(TeamValidationError::MissingSpecies { index });
        }
        let normalized = member.species.trim().to_ascii_lowercase();
        if !seen.insert(normalized) {
            return Err(TeamValidationError::DuplicateSpecies {
                species: member.species.clone(),
            });
        }
        if dex.lookup_species(&member.species).is_none() {
            return Err(TeamValidationError::UnknownSpecies {
                index,
                species: member.species.clone(),
            });
        }
        if member.moves.is_empty() || member.moves.len() > 4 {
            return Err(TeamValidationError::WrongMoveCount { index });
        }
        if member.moves.iter().any(|m| m.trim().is_empty()) {
            return Err(TeamValidationError::EmptyMoveName { index });
        }
        for move_name in &member.moves {
            if dex.lookup_move(move_name).is_none() {
                return Err(TeamValidationError::UnknownMove {
                    index,
                    move_name: move_name.clone(),
                });
            }
        }
    }

    Ok(())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandValidationError {
    #[error("command is empty")]
    Empty,
    #[error("command contains a control character")]
    ControlCharacter,
}

/// Validate a `choose` command string (spec.md §4.3: "no parsing beyond
/// trimming whitespace and rejecting control characters").
pub fn validate_command(raw: &str) -> Result<String, CommandValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CommandValidationError::Empty);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(CommandValidationError::ControlCharacter);
    }
    Ok(trimmed.to_string())
}
