use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// A playable role defined by a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public_info: String,
    pub private_info: String,
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Character id -> how this character relates to them.
    #[serde(default)]
    pub relationships: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Presentation hint for a clue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClueKind {
    #[default]
    Text,
    Image,
    Document,
}

/// A piece of evidence the host can release during play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub kind: ClueKind,
    pub category: String,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

/// The scripted answer the accusations are judged against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub murderer: String,
    pub motive: String,
    pub method: String,
    pub explanation: String,
}

/// An immutable scenario definition. Loaded once and shared between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub description: String,
    pub characters: Vec<Character>,
    pub clues: Vec<Clue>,
    pub solution: Solution,
    pub min_players: usize,
    pub max_players: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioError {
    #[error("scenario id is empty")]
    EmptyId,
    #[error("invalid player bounds: min {min}, max {max}")]
    InvalidPlayerBounds { min: usize, max: usize },
    #[error("duplicate character id: {0}")]
    DuplicateCharacter(String),
    #[error("duplicate clue id: {0}")]
    DuplicateClue(String),
    #[error("scenario {0} is already registered")]
    DuplicateScenario(String),
    #[error("failed to parse scenario: {0}")]
    Parse(String),
}

impl Scenario {
    /// Parse and validate a scenario from JSON.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario =
            serde_json::from_str(json).map_err(|e| ScenarioError::Parse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Structural checks: player bounds are sane and ids are unique.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.id.trim().is_empty() {
            return Err(ScenarioError::EmptyId);
        }
        if self.max_players == 0 || self.min_players > self.max_players {
            return Err(ScenarioError::InvalidPlayerBounds {
                min: self.min_players,
                max: self.max_players,
            });
        }
        let mut seen = HashSet::new();
        for c in &self.characters {
            if !seen.insert(c.id.as_str()) {
                return Err(ScenarioError::DuplicateCharacter(c.id.clone()));
            }
        }
        let mut seen = HashSet::new();
        for c in &self.clues {
            if !seen.insert(c.id.as_str()) {
                return Err(ScenarioError::DuplicateClue(c.id.clone()));
            }
        }
        Ok(())
    }

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn clue(&self, id: &str) -> Option<&Clue> {
        self.clues.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BUILTIN_SCENARIO_JSON;

    #[test]
    fn builtin_scenario_parses() {
        let s = Scenario::from_json(BUILTIN_SCENARIO_JSON).unwrap();
        assert_eq!(s.id, "scenario_missing_heiress");
        assert_eq!(s.characters.len(), 6);
        assert_eq!(s.clues.len(), 6);
        assert_eq!(s.min_players, 4);
        assert_eq!(s.max_players, 6);
        assert!(s.character("char_doctor").is_some());
        assert!(s.clue("clue_medical_records").is_some());
    }

    #[test]
    fn rejects_inverted_player_bounds() {
        let mut s = Scenario::from_json(BUILTIN_SCENARIO_JSON).unwrap();
        s.min_players = 7;
        assert_eq!(
            s.validate(),
            Err(ScenarioError::InvalidPlayerBounds { min: 7, max: 6 })
        );
    }

    #[test]
    fn rejects_duplicate_clue_ids() {
        let mut s = Scenario::from_json(BUILTIN_SCENARIO_JSON).unwrap();
        let dup = s.clues[0].clone();
        s.clues.push(dup);
        assert!(matches!(s.validate(), Err(ScenarioError::DuplicateClue(_))));
    }

    #[test]
    fn clue_defaults_apply() {
        let json = r#"{"id":"c1","title":"T","content":"C","category":"Misc"}"#;
        let clue: Clue = serde_json::from_str(json).unwrap();
        assert_eq!(clue.kind, ClueKind::Text);
        assert!(clue.is_public);
        assert!(clue.image_url.is_none());
    }
}
