//! Character allocation: host-driven assignment and the random fill used
//! when a game starts.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::SessionError;
use crate::player::PlayerId;
use crate::session::GameSession;

impl GameSession {
    /// Host gives `character_id` to `target`, replacing any character the
    /// target held before. A character belongs to at most one player.
    pub fn assign_character(
        &mut self,
        requester: PlayerId,
        target: PlayerId,
        character_id: &str,
    ) -> Result<(), SessionError> {
        self.ensure_host(requester, "assign characters")?;
        if self.player(target).is_none() {
            return Err(SessionError::PlayerNotFound);
        }
        if self.scenario.character(character_id).is_none() {
            return Err(SessionError::CharacterNotFound);
        }
        if self.players.iter().any(|p| {
            p.id != target && p.character_id.as_deref() == Some(character_id)
        }) {
            return Err(SessionError::CharacterTaken);
        }

        if let Some(player) = self.player_mut(target) {
            player.character_id = Some(character_id.to_string());
        }
        Ok(())
    }

    /// Give each player without a character a distinct unclaimed one, chosen
    /// uniformly at random. Players are served in join order until the pool
    /// runs out. Returns how many players received a character.
    pub fn auto_assign_characters<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut pool: Vec<String> = {
            let claimed: HashSet<&str> = self
                .players
                .iter()
                .filter_map(|p| p.character_id.as_deref())
                .collect();
            self.scenario
                .characters
                .iter()
                .filter(|c| !claimed.contains(c.id.as_str()))
                .map(|c| c.id.clone())
                .collect()
        };
        pool.shuffle(rng);

        let mut pool = pool.into_iter();
        let mut assigned = 0;
        for player in self.players.iter_mut().filter(|p| p.character_id.is_none()) {
            let Some(character_id) = pool.next() else {
                break;
            };
            player.character_id = Some(character_id);
            assigned += 1;
        }
        assigned
    }

    /// Player holding `character_id`, if any.
    pub fn character_holder(&self, character_id: &str) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.character_id.as_deref() == Some(character_id))
            .map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::test_helpers::{full_session, rng};

    #[test]
    fn assign_then_reassign_same_character_is_noop() {
        let (mut session, players) = full_session(2);
        session
            .assign_character(players[0], players[1], "char_maid")
            .unwrap();
        session
            .assign_character(players[0], players[1], "char_maid")
            .unwrap();
        assert_eq!(session.character_holder("char_maid"), Some(players[1]));
    }

    #[test]
    fn assign_replaces_previous_character() {
        let (mut session, players) = full_session(2);
        session
            .assign_character(players[0], players[1], "char_maid")
            .unwrap();
        session
            .assign_character(players[0], players[1], "char_butler")
            .unwrap();
        assert_eq!(session.character_holder("char_maid"), None);
        assert_eq!(session.character_holder("char_butler"), Some(players[1]));
    }

    #[test]
    fn assign_taken_character_fails() {
        let (mut session, players) = full_session(3);
        session
            .assign_character(players[0], players[1], "char_maid")
            .unwrap();
        let err = session
            .assign_character(players[0], players[2], "char_maid")
            .unwrap_err();
        assert_eq!(err, SessionError::CharacterTaken);
        assert!(session.player(players[2]).unwrap().character_id.is_none());
    }

    #[test]
    fn assign_validates_inputs() {
        let (mut session, players) = full_session(2);
        assert_eq!(
            session.assign_character(players[1], players[1], "char_maid"),
            Err(SessionError::NotHost("assign characters"))
        );
        assert_eq!(
            session.assign_character(players[0], uuid::Uuid::new_v4(), "char_maid"),
            Err(SessionError::PlayerNotFound)
        );
        assert_eq!(
            session.assign_character(players[0], players[1], "char_nobody"),
            Err(SessionError::CharacterNotFound)
        );
    }

    #[test]
    fn auto_assign_gives_distinct_unclaimed_characters() {
        let (mut session, players) = full_session(5);
        session
            .assign_character(players[0], players[3], "char_doctor")
            .unwrap();

        let assigned = session.auto_assign_characters(&mut rng());
        assert_eq!(assigned, 4);

        let ids: Vec<_> = session
            .players
            .iter()
            .map(|p| p.character_id.clone().unwrap())
            .collect();
        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len());
        assert_eq!(
            session.player(players[3]).unwrap().character_id.as_deref(),
            Some("char_doctor")
        );
    }

    #[test]
    fn auto_assign_stops_when_pool_is_empty() {
        let (mut session, _) = full_session(6);
        let mut scenario = (*session.scenario).clone();
        scenario.characters.truncate(4);
        session.scenario = std::sync::Arc::new(scenario);

        assert_eq!(session.auto_assign_characters(&mut rng()), 4);
        let without: Vec<_> = session
            .players
            .iter()
            .filter(|p| p.character_id.is_none())
            .map(|p| p.display_name.as_str())
            .collect();
        // Join order decides who misses out
        assert_eq!(without, ["Player4", "Player5"]);
    }

    #[test]
    fn auto_assign_is_not_always_join_order() {
        let mut seen = HashSet::new();
        for seed in 0..20 {
            let (mut session, _) = full_session(4);
            session.auto_assign_characters(&mut crate::test_helpers::seeded(seed));
            seen.insert(session.players[0].character_id.clone());
        }
        assert!(seen.len() > 1);
    }
}
