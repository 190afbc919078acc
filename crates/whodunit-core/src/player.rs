use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::Timestamp;

/// Stable per-session player identifier, generated by the server.
pub type PlayerId = Uuid;

/// Ephemeral transport connection identifier. A player's connection id
/// changes when they reconnect.
pub type ConnectionId = Uuid;

/// A seat in a game session. Kept across disconnects; removed only on leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub character_id: Option<String>,
    pub is_host: bool,
    pub is_connected: bool,
    pub joined_at: Timestamp,
    /// Secret handed to this player only, used to reclaim the seat.
    pub session_token: String,
}

impl Player {
    pub fn new(connection_id: ConnectionId, display_name: String, joined_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection_id,
            display_name,
            character_id: None,
            is_host: false,
            is_connected: true,
            joined_at,
            session_token: Uuid::new_v4().to_string(),
        }
    }
}

/// The broadcast-safe view of a player (no session token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub character_id: Option<String>,
    pub is_host: bool,
    pub is_connected: bool,
    pub joined_at: Timestamp,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name.clone(),
            character_id: p.character_id.clone(),
            is_host: p.is_host,
            is_connected: p.is_connected,
            joined_at: p.joined_at,
        }
    }
}
