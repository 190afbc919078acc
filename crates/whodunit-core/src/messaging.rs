use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::player::PlayerId;
use crate::session::{GamePhase, GameSession};
use crate::time::Timestamp;

/// A chat line. A message is delivered privately only when it is flagged
/// private *and* names a recipient; otherwise everyone in the session sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: PlayerId,
    pub sender_name: String,
    pub content: String,
    pub timestamp: Timestamp,
    pub is_private: bool,
    pub recipient_id: Option<PlayerId>,
}

impl ChatMessage {
    /// The recipient if this is a direct message.
    pub fn direct_recipient(&self) -> Option<PlayerId> {
        if self.is_private { self.recipient_id } else { None }
    }

    /// Whether `viewer` may read this message.
    pub fn visible_to(&self, viewer: Option<PlayerId>) -> bool {
        match self.direct_recipient() {
            None => true,
            Some(recipient) => viewer.is_some_and(|v| v == self.sender_id || v == recipient),
        }
    }
}

/// What a player claims happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccusationClaim {
    pub murderer: String,
    pub motive: String,
    pub method: String,
}

/// A submitted accusation. At most one per player per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accusation {
    pub player_id: PlayerId,
    pub player_name: String,
    pub murderer: String,
    pub motive: String,
    pub method: String,
    pub submitted_at: Timestamp,
}

/// A clue the host has released, with the time it was first released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedClue {
    pub clue_id: String,
    pub revealed_at: Timestamp,
}

impl GameSession {
    /// Append a chat message from `sender_id`. Allowed in every phase.
    pub fn post_message(
        &mut self,
        sender_id: PlayerId,
        content: String,
        is_private: bool,
        recipient_id: Option<PlayerId>,
        now: Timestamp,
    ) -> Result<ChatMessage, SessionError> {
        let sender = self.player(sender_id).ok_or(SessionError::PlayerNotFound)?;
        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender_id,
            sender_name: sender.display_name.clone(),
            content,
            timestamp: now,
            is_private,
            recipient_id,
        };
        self.chat_messages.push(message.clone());
        Ok(message)
    }

    /// Record `player_id`'s accusation. Only during the accusation phase,
    /// and only once per player.
    pub fn submit_accusation(
        &mut self,
        player_id: PlayerId,
        claim: AccusationClaim,
        now: Timestamp,
    ) -> Result<&Accusation, SessionError> {
        let player = self.player(player_id).ok_or(SessionError::PlayerNotFound)?;
        if self.phase != GamePhase::Accusation {
            return Err(SessionError::WrongPhase {
                expected: GamePhase::Accusation,
                actual: self.phase,
            });
        }
        if self.has_accused(player_id) {
            return Err(SessionError::DuplicateAccusation);
        }

        let accusation = Accusation {
            player_id,
            player_name: player.display_name.clone(),
            murderer: claim.murderer,
            motive: claim.motive,
            method: claim.method,
            submitted_at: now,
        };
        self.accusations.push(accusation);
        Ok(&self.accusations[self.accusations.len() - 1])
    }

    pub fn has_accused(&self, player_id: PlayerId) -> bool {
        self.accusations.iter().any(|a| a.player_id == player_id)
    }

    /// Host releases a clue. Returns `false` if it was already released, in
    /// which case the original timestamp is kept.
    pub fn release_clue(
        &mut self,
        requester: PlayerId,
        clue_id: &str,
        now: Timestamp,
    ) -> Result<bool, SessionError> {
        self.ensure_host(requester, "release clues")?;
        if self.scenario.clue(clue_id).is_none() {
            return Err(SessionError::ClueNotFound);
        }
        if self.is_clue_revealed(clue_id) {
            return Ok(false);
        }
        self.revealed_clues.push(RevealedClue {
            clue_id: clue_id.to_string(),
            revealed_at: now,
        });
        Ok(true)
    }

    pub fn is_clue_revealed(&self, clue_id: &str) -> bool {
        self.revealed_clues.iter().any(|c| c.clue_id == clue_id)
    }
}
