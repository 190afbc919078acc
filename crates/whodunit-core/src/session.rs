use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::messaging::{Accusation, ChatMessage, RevealedClue};
use crate::player::{ConnectionId, Player, PlayerId};
use crate::scenario::Scenario;
use crate::time::Timestamp;

/// Stage of a session's game flow.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Lobby,
    Introduction,
    Investigation,
    Accusation,
    Reveal,
    Finished,
}

impl GamePhase {
    pub const ALL: [GamePhase; 6] = [
        GamePhase::Lobby,
        GamePhase::Introduction,
        GamePhase::Investigation,
        GamePhase::Accusation,
        GamePhase::Reveal,
        GamePhase::Finished,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Introduction => "introduction",
            Self::Investigation => "investigation",
            Self::Accusation => "accusation",
            Self::Reveal => "reveal",
            Self::Finished => "finished",
        }
    }

    /// Whether the solution may be shown to players.
    pub fn solution_visible(self) -> bool {
        matches!(self, Self::Reveal | Self::Finished)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One running game. The roster is kept in join order, which decides host
/// succession and default character assignment order.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: Uuid,
    pub code: String,
    pub scenario: Arc<Scenario>,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub host_id: PlayerId,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub revealed_clues: Vec<RevealedClue>,
    pub accusations: Vec<Accusation>,
    pub chat_messages: Vec<ChatMessage>,
}

impl GameSession {
    /// Create a session in the lobby with `host` as its only player.
    pub fn new(code: String, scenario: Arc<Scenario>, mut host: Player, now: Timestamp) -> Self {
        host.is_host = true;
        Self {
            id: Uuid::new_v4(),
            code,
            scenario,
            host_id: host.id,
            players: vec![host],
            phase: GamePhase::Lobby,
            created_at: now,
            started_at: None,
            revealed_clues: Vec::new(),
            accusations: Vec::new(),
            chat_messages: Vec::new(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// The player currently attached to `connection_id`. Seats whose
    /// connection dropped are not reachable through the stale id.
    pub fn player_by_connection(&self, connection_id: ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id && p.is_connected)
    }

    pub fn host(&self) -> Option<&Player> {
        self.player(self.host_id)
    }

    pub fn is_host(&self, player_id: PlayerId) -> bool {
        self.host_id == player_id
    }

    /// Fail with `NotHost` unless `player_id` is the host.
    pub fn ensure_host(&self, player_id: PlayerId, action: &'static str) -> Result<(), SessionError> {
        if self.is_host(player_id) {
            Ok(())
        } else {
            Err(SessionError::NotHost(action))
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.scenario.max_players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_name_taken(&self, display_name: &str) -> bool {
        self.players.iter().any(|p| p.display_name == display_name)
    }

    /// Admit a new non-host player. Only possible in the lobby.
    pub fn add_player(&mut self, mut player: Player) -> Result<PlayerId, SessionError> {
        if self.phase != GamePhase::Lobby {
            return Err(SessionError::SessionAlreadyStarted);
        }
        if self.is_full() {
            return Err(SessionError::SessionFull);
        }
        if self.is_name_taken(&player.display_name) {
            return Err(SessionError::NameTaken);
        }
        player.is_host = false;
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    /// Remove a player permanently. If the host leaves, the earliest-joined
    /// remaining player becomes host.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == player_id)?;
        let removed = self.players.remove(index);

        if removed.id == self.host_id
            && let Some(next) = self.players.first()
        {
            self.host_id = next.id;
            for p in &mut self.players {
                p.is_host = p.id == self.host_id;
            }
        }
        Some(removed)
    }

    /// Flag the seat behind `connection_id` as disconnected. The seat, its
    /// character and any host role are kept.
    pub fn mark_disconnected(&mut self, connection_id: ConnectionId) -> Option<&Player> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.connection_id == connection_id && p.is_connected)?;
        player.is_connected = false;
        Some(player)
    }

    /// Re-attach the disconnected seat owning `session_token` to a new
    /// connection. A seat that is still connected cannot be taken over.
    /// Returns the player id and the connection id it replaced.
    pub fn reattach(
        &mut self,
        session_token: &str,
        connection_id: ConnectionId,
    ) -> Result<(PlayerId, ConnectionId), SessionError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.session_token == session_token)
            .ok_or(SessionError::InvalidSessionToken)?;
        if player.is_connected {
            return Err(SessionError::SeatInUse);
        }
        let previous = player.connection_id;
        player.connection_id = connection_id;
        player.is_connected = true;
        Ok((player.id, previous))
    }

    /// Connection ids of every seat, connected or not.
    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().map(|p| p.connection_id)
    }

    pub fn connected_players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.iter().filter(|p| p.is_connected)
    }

    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.created_at)
    }
}
