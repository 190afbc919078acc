//! Per-viewer projections of a session, safe to send over the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messaging::{Accusation, ChatMessage, RevealedClue};
use crate::player::{PlayerId, PlayerView};
use crate::scenario::{Character, Clue, Solution};
use crate::session::{GamePhase, GameSession};
use crate::time::Timestamp;

/// Hidden details of a character, shown to its holder and at the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterBrief {
    pub private_info: String,
    pub secrets: Vec<String>,
    pub relationships: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public_info: String,
    pub avatar: Option<String>,
    pub brief: Option<CharacterBrief>,
}

impl CharacterView {
    pub fn public(c: &Character) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            description: c.description.clone(),
            public_info: c.public_info.clone(),
            avatar: c.avatar.clone(),
            brief: None,
        }
    }

    pub fn with_brief(c: &Character) -> Self {
        Self {
            brief: Some(CharacterBrief {
                private_info: c.private_info.clone(),
                secrets: c.secrets.clone(),
                relationships: c.relationships.clone(),
            }),
            ..Self::public(c)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub min_players: usize,
    pub max_players: usize,
    pub characters: Vec<CharacterView>,
    /// Released clues, in release order.
    pub clues: Vec<Clue>,
    pub solution: Option<Solution>,
}

/// Most recent chat messages carried by a snapshot. The full log is
/// streamed through `ReceiveMessage` as it is posted.
pub const SNAPSHOT_CHAT_TAIL: usize = 50;

/// Everything one viewer is allowed to know about a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub code: String,
    pub phase: GamePhase,
    pub host_id: PlayerId,
    pub players: Vec<PlayerView>,
    pub scenario: ScenarioView,
    pub revealed_clues: Vec<RevealedClue>,
    pub accusations: Vec<Accusation>,
    /// The last [`SNAPSHOT_CHAT_TAIL`] messages visible to the viewer, oldest first.
    pub chat_messages: Vec<ChatMessage>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
}

impl SessionSnapshot {
    /// Project `session` for `viewer`. `None` means an outside observer who
    /// sees only public information.
    ///
    /// Session tokens never appear. Unreleased clues are omitted. The
    /// solution and every character's brief are included only once the
    /// solution has been revealed; before that a player sees only the brief
    /// of the character they hold. Direct messages are kept only for their
    /// sender and recipient, and only the most recent visible messages are
    /// included.
    pub fn for_viewer(session: &GameSession, viewer: Option<PlayerId>) -> Self {
        let scenario = &session.scenario;
        let revealed = session.phase.solution_visible();
        let own_character = viewer
            .and_then(|v| session.player(v))
            .and_then(|p| p.character_id.as_deref());

        let characters = scenario
            .characters
            .iter()
            .map(|c| {
                if revealed || own_character == Some(c.id.as_str()) {
                    CharacterView::with_brief(c)
                } else {
                    CharacterView::public(c)
                }
            })
            .collect();

        let clues = session
            .revealed_clues
            .iter()
            .filter_map(|r| scenario.clue(&r.clue_id).cloned())
            .collect();

        Self {
            id: session.id,
            code: session.code.clone(),
            phase: session.phase,
            host_id: session.host_id,
            players: session.players.iter().map(PlayerView::from).collect(),
            scenario: ScenarioView {
                id: scenario.id.clone(),
                title: scenario.title.clone(),
                description: scenario.description.clone(),
                min_players: scenario.min_players,
                max_players: scenario.max_players,
                characters,
                clues,
                solution: revealed.then(|| scenario.solution.clone()),
            },
            revealed_clues: session.revealed_clues.clone(),
            accusations: session.accusations.clone(),
            chat_messages: recent_chat(session, viewer),
            created_at: session.created_at,
            started_at: session.started_at,
        }
    }
}

fn recent_chat(session: &GameSession, viewer: Option<PlayerId>) -> Vec<ChatMessage> {
    let mut tail: Vec<ChatMessage> = session
        .chat_messages
        .iter()
        .rev()
        .filter(|m| m.visible_to(viewer))
        .take(SNAPSHOT_CHAT_TAIL)
        .cloned()
        .collect();
    tail.reverse();
    tail
}
