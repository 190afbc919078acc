use rand::Rng;

use crate::error::SessionError;
use crate::player::PlayerId;
use crate::session::{GamePhase, GameSession};
use crate::time::Timestamp;

impl GameSession {
    /// Host starts the game: characters are handed out to players without
    /// one and the session moves to the introduction.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        requester: PlayerId,
        rng: &mut R,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        self.ensure_host(requester, "start the game")?;
        if self.players.len() < self.scenario.min_players {
            return Err(SessionError::NotEnoughPlayers {
                required: self.scenario.min_players,
            });
        }
        if self.phase != GamePhase::Lobby {
            return Err(SessionError::AlreadyStarted);
        }

        self.auto_assign_characters(rng);
        self.phase = GamePhase::Introduction;
        self.started_at = Some(now);
        Ok(())
    }

    /// Host moves the session to any phase. The host paces the game, so no
    /// transition order is enforced. Returns the previous phase.
    pub fn change_phase(
        &mut self,
        requester: PlayerId,
        phase: GamePhase,
    ) -> Result<GamePhase, SessionError> {
        self.ensure_host(requester, "change phases")?;
        Ok(std::mem::replace(&mut self.phase, phase))
    }

    /// Host reveals the solution.
    pub fn reveal_solution(&mut self, requester: PlayerId) -> Result<(), SessionError> {
        self.ensure_host(requester, "reveal the solution")?;
        self.phase = GamePhase::Reveal;
        Ok(())
    }
}
