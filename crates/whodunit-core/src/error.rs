use crate::session::GamePhase;

/// Why a session operation was refused. Every variant is raised before any
/// state is touched, so a failed operation leaves the session unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    // Not found
    #[error("Game not found")]
    SessionNotFound,
    #[error("Player not in any game")]
    NotInSession,
    #[error("Player not found in game")]
    PlayerNotFound,
    #[error("Character not found")]
    CharacterNotFound,
    #[error("Clue not found")]
    ClueNotFound,
    #[error("No scenario available")]
    ScenarioNotFound,

    // Authorization
    #[error("Only the host can {0}")]
    NotHost(&'static str),
    #[error("Invalid or expired session token")]
    InvalidSessionToken,

    // Precondition
    #[error("Game has already started")]
    SessionAlreadyStarted,
    #[error("Game has already started")]
    AlreadyStarted,
    #[error("Player name already taken")]
    NameTaken,
    #[error("Character already assigned")]
    CharacterTaken,
    #[error("This action requires the {expected} phase (current phase: {actual})")]
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("You have already submitted an accusation")]
    DuplicateAccusation,
    #[error("Connection is already in a game")]
    AlreadyInSession,
    #[error("That seat is still connected")]
    SeatInUse,

    // Capacity
    #[error("Game is full")]
    SessionFull,
    #[error("Need at least {required} players to start")]
    NotEnoughPlayers { required: usize },
}

impl SessionError {
    /// Stable machine-readable identifier sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::NotInSession => "not_in_session",
            Self::PlayerNotFound => "player_not_found",
            Self::CharacterNotFound => "character_not_found",
            Self::ClueNotFound => "clue_not_found",
            Self::ScenarioNotFound => "scenario_not_found",
            Self::NotHost(_) => "not_host",
            Self::InvalidSessionToken => "invalid_session_token",
            Self::SessionAlreadyStarted => "session_already_started",
            Self::AlreadyStarted => "already_started",
            Self::NameTaken => "name_taken",
            Self::CharacterTaken => "character_taken",
            Self::WrongPhase { .. } => "wrong_phase",
            Self::DuplicateAccusation => "duplicate_accusation",
            Self::AlreadyInSession => "already_in_session",
            Self::SeatInUse => "seat_in_use",
            Self::SessionFull => "session_full",
            Self::NotEnoughPlayers { .. } => "not_enough_players",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            SessionError::NotHost("start the game").to_string(),
            "Only the host can start the game"
        );
        assert_eq!(
            SessionError::NotEnoughPlayers { required: 4 }.to_string(),
            "Need at least 4 players to start"
        );
        assert_eq!(
            SessionError::WrongPhase {
                expected: GamePhase::Accusation,
                actual: GamePhase::Lobby,
            }
            .to_string(),
            "This action requires the accusation phase (current phase: lobby)"
        );
    }

    #[test]
    fn kinds_are_snake_case() {
        assert_eq!(SessionError::SessionFull.kind(), "session_full");
        assert_eq!(SessionError::NotHost("x").kind(), "not_host");
    }
}
