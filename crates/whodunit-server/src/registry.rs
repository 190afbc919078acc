use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use whodunit_core::catalog::ScenarioCatalog;
use whodunit_core::code::{generate_session_code, normalize_code};
use whodunit_core::error::SessionError;
use whodunit_core::messaging::{Accusation, AccusationClaim, ChatMessage};
use whodunit_core::player::{ConnectionId, Player, PlayerId};
use whodunit_core::session::{GamePhase, GameSession};
use whodunit_core::time::{Timestamp, now_millis};

/// What a connection gets back after taking a seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub code: String,
    pub player_id: PlayerId,
    pub session_token: String,
}

/// A player who left or dropped, and the session they were in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub code: String,
    pub display_name: String,
}

/// A session removed by the sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictedSession {
    pub code: String,
    pub phase: GamePhase,
    pub connection_ids: Vec<ConnectionId>,
}

/// Age limits applied by [`SessionRegistry::sweep`], in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    pub max_age_ms: u64,
    pub finished_retention_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_games: usize,
    pub total_players: usize,
    pub games_by_phase: BTreeMap<GamePhase, usize>,
}

/// Owns every live session plus the connection -> session-code index.
///
/// All methods are synchronous; callers serialize access through the lock in
/// `AppState`. Every failing operation leaves the registry unchanged.
pub struct SessionRegistry {
    sessions: HashMap<String, GameSession>,
    connections: HashMap<ConnectionId, String>,
    catalog: Arc<ScenarioCatalog>,
}

impl SessionRegistry {
    pub fn new(catalog: Arc<ScenarioCatalog>) -> Self {
        Self {
            sessions: HashMap::new(),
            connections: HashMap::new(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Create a session hosted by `connection_id`. Unknown or absent scenario
    /// ids fall back to the catalog default.
    pub fn create_session(
        &mut self,
        connection_id: ConnectionId,
        display_name: String,
        scenario_id: Option<&str>,
    ) -> Result<Seat, SessionError> {
        if self.connections.contains_key(&connection_id) {
            return Err(SessionError::AlreadyInSession);
        }
        let scenario = self
            .catalog
            .resolve(scenario_id)
            .ok_or(SessionError::ScenarioNotFound)?;

        let now = now_millis();
        let code = self.generate_unique_code();
        let host = Player::new(connection_id, display_name, now);
        let seat = Seat {
            code: code.clone(),
            player_id: host.id,
            session_token: host.session_token.clone(),
        };
        let session = GameSession::new(code.clone(), scenario, host, now);

        tracing::info!(
            code = %code,
            scenario = %session.scenario.id,
            player_id = %seat.player_id,
            "Session created"
        );
        self.sessions.insert(code.clone(), session);
        self.connections.insert(connection_id, code);
        Ok(seat)
    }

    /// Join the lobby of session `code` (case-insensitive).
    pub fn join_session(
        &mut self,
        code: &str,
        connection_id: ConnectionId,
        display_name: String,
    ) -> Result<Seat, SessionError> {
        if self.connections.contains_key(&connection_id) {
            return Err(SessionError::AlreadyInSession);
        }
        let code = normalize_code(code);
        let session = self
            .sessions
            .get_mut(&code)
            .ok_or(SessionError::SessionNotFound)?;

        let player = Player::new(connection_id, display_name, now_millis());
        let session_token = player.session_token.clone();
        let player_id = session.add_player(player)?;

        tracing::info!(code = %code, player_id = %player_id, "Player joined");
        self.connections.insert(connection_id, code.clone());
        Ok(Seat {
            code,
            player_id,
            session_token,
        })
    }

    /// Remove the player seated on `connection_id`. Returns `None` if the
    /// connection was not seated, or if the session emptied and was deleted.
    pub fn leave_session(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let code = self.connections.remove(&connection_id)?;
        let session = self.sessions.get_mut(&code)?;

        let player_id = session
            .players
            .iter()
            .find(|p| p.connection_id == connection_id)
            .map(|p| p.id)?;
        let removed = session.remove_player(player_id)?;
        tracing::info!(code = %code, player_id = %player_id, "Player left");

        if session.is_empty() {
            self.sessions.remove(&code);
            tracing::info!(code = %code, "Session deleted (empty)");
            return None;
        }

        Some(Departure {
            code,
            display_name: removed.display_name,
        })
    }

    /// Mark the seat on `connection_id` as disconnected. The mapping is kept
    /// so the sweeper can reclaim it; a reconnect moves it.
    pub fn handle_disconnect(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let code = self.connections.get(&connection_id)?;
        let session = self.sessions.get_mut(code)?;
        let player = session.mark_disconnected(connection_id)?;
        tracing::info!(code = %code, player_id = %player.id, "Player disconnected");
        Some(Departure {
            code: code.clone(),
            display_name: player.display_name.clone(),
        })
    }

    /// Re-attach a preserved seat to `connection_id` using its session token.
    pub fn reconnect_session(
        &mut self,
        code: &str,
        session_token: &str,
        connection_id: ConnectionId,
    ) -> Result<Seat, SessionError> {
        if self.connections.contains_key(&connection_id) {
            return Err(SessionError::AlreadyInSession);
        }
        let code = normalize_code(code);
        let session = self
            .sessions
            .get_mut(&code)
            .ok_or(SessionError::SessionNotFound)?;
        let (player_id, previous) = session.reattach(session_token, connection_id)?;

        if self.connections.get(&previous) == Some(&code) {
            self.connections.remove(&previous);
        }
        self.connections.insert(connection_id, code.clone());
        tracing::info!(code = %code, player_id = %player_id, "Player reconnected");

        Ok(Seat {
            code,
            player_id,
            session_token: session_token.to_string(),
        })
    }

    /// The session `connection_id` is seated in.
    pub fn resolve_session_for_connection(
        &self,
        connection_id: ConnectionId,
    ) -> Result<&GameSession, SessionError> {
        let code = self
            .connections
            .get(&connection_id)
            .ok_or(SessionError::NotInSession)?;
        self.sessions.get(code).ok_or(SessionError::SessionNotFound)
    }

    /// The player currently attached to `connection_id` within `session`.
    pub fn resolve_player(
        connection_id: ConnectionId,
        session: &GameSession,
    ) -> Result<PlayerId, SessionError> {
        session
            .player_by_connection(connection_id)
            .map(|p| p.id)
            .ok_or(SessionError::PlayerNotFound)
    }

    /// Resolve the caller's session and player, then run `op` on them.
    /// Returns the session code alongside `op`'s result for broadcasting.
    fn with_player<T>(
        &mut self,
        connection_id: ConnectionId,
        op: impl FnOnce(&mut GameSession, PlayerId) -> Result<T, SessionError>,
    ) -> Result<(String, T), SessionError> {
        let code = self
            .connections
            .get(&connection_id)
            .ok_or(SessionError::NotInSession)?;
        let session = self
            .sessions
            .get_mut(code)
            .ok_or(SessionError::SessionNotFound)?;
        let player_id = Self::resolve_player(connection_id, session)?;
        let value = op(session, player_id)?;
        Ok((code.clone(), value))
    }

    pub fn start_game(&mut self, connection_id: ConnectionId) -> Result<String, SessionError> {
        let (code, ()) = self.with_player(connection_id, |session, player_id| {
            session.start(player_id, &mut rand::rng(), now_millis())
        })?;
        tracing::info!(code = %code, "Game started");
        Ok(code)
    }

    pub fn assign_character(
        &mut self,
        connection_id: ConnectionId,
        target: PlayerId,
        character_id: &str,
    ) -> Result<String, SessionError> {
        let (code, ()) = self.with_player(connection_id, |session, player_id| {
            session.assign_character(player_id, target, character_id)
        })?;
        tracing::debug!(code = %code, target = %target, character_id, "Character assigned");
        Ok(code)
    }

    /// Returns the session code and the phase that was replaced.
    pub fn change_phase(
        &mut self,
        connection_id: ConnectionId,
        phase: GamePhase,
    ) -> Result<(String, GamePhase), SessionError> {
        let (code, previous) = self.with_player(connection_id, |session, player_id| {
            session.change_phase(player_id, phase)
        })?;
        tracing::info!(code = %code, from = %previous, to = %phase, "Phase changed");
        Ok((code, previous))
    }

    /// Returns the session code and whether the clue was newly released.
    pub fn release_clue(
        &mut self,
        connection_id: ConnectionId,
        clue_id: &str,
    ) -> Result<(String, bool), SessionError> {
        self.with_player(connection_id, |session, player_id| {
            session.release_clue(player_id, clue_id, now_millis())
        })
    }

    pub fn send_message(
        &mut self,
        connection_id: ConnectionId,
        content: String,
        is_private: bool,
        recipient_id: Option<PlayerId>,
    ) -> Result<(String, ChatMessage), SessionError> {
        self.with_player(connection_id, |session, player_id| {
            session.post_message(player_id, content, is_private, recipient_id, now_millis())
        })
    }

    pub fn submit_accusation(
        &mut self,
        connection_id: ConnectionId,
        claim: AccusationClaim,
    ) -> Result<(String, Accusation), SessionError> {
        let (code, accusation) = self.with_player(connection_id, |session, player_id| {
            session
                .submit_accusation(player_id, claim, now_millis())
                .cloned()
        })?;
        tracing::info!(code = %code, player_id = %accusation.player_id, "Accusation submitted");
        Ok((code, accusation))
    }

    pub fn reveal_solution(&mut self, connection_id: ConnectionId) -> Result<String, SessionError> {
        let (code, ()) = self.with_player(connection_id, |session, player_id| {
            session.reveal_solution(player_id)
        })?;
        tracing::info!(code = %code, "Solution revealed");
        Ok(code)
    }

    /// Delete sessions older than `policy.max_age_ms`, and finished sessions
    /// older than `policy.finished_retention_ms`, together with every
    /// connection mapping pointing at them.
    pub fn sweep(&mut self, now: Timestamp, policy: &SweepPolicy) -> Vec<EvictedSession> {
        let expired: Vec<String> = self
            .sessions
            .values()
            .filter(|s| {
                let age = s.age(now);
                age > policy.max_age_ms
                    || (s.phase == GamePhase::Finished && age > policy.finished_retention_ms)
            })
            .map(|s| s.code.clone())
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for code in expired {
            let Some(session) = self.sessions.remove(&code) else {
                continue;
            };
            let connection_ids: Vec<ConnectionId> = session.connection_ids().collect();
            for id in &connection_ids {
                if self.connections.get(id) == Some(&code) {
                    self.connections.remove(id);
                }
            }
            evicted.push(EvictedSession {
                code,
                phase: session.phase,
                connection_ids,
            });
        }
        evicted
    }

    pub fn stats(&self) -> SessionStats {
        let mut games_by_phase: BTreeMap<GamePhase, usize> =
            GamePhase::ALL.iter().map(|&p| (p, 0)).collect();
        let mut total_players = 0;
        for session in self.sessions.values() {
            *games_by_phase.entry(session.phase).or_default() += 1;
            total_players += session.player_count();
        }
        SessionStats {
            total_games: self.sessions.len(),
            total_players,
            games_by_phase,
        }
    }

    pub fn session(&self, code: &str) -> Option<&GameSession> {
        self.sessions.get(&normalize_code(code))
    }

    pub fn session_exists(&self, code: &str) -> bool {
        self.session(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session code a connection is mapped to, if any.
    pub fn code_for_connection(&self, connection_id: ConnectionId) -> Option<&str> {
        self.connections.get(&connection_id).map(String::as_str)
    }

    /// Generate a code not used by any live session, retrying on collision.
    fn generate_unique_code(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let code = generate_session_code(&mut rng);
            if !self.sessions.contains_key(&code) {
                return code;
            }
        }
    }

    #[cfg(test)]
    fn session_mut(&mut self, code: &str) -> Option<&mut GameSession> {
        self.sessions.get_mut(code)
    }
}
