use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use whodunit_core::code::{is_valid_session_code, normalize_code};
use whodunit_core::scenario::Scenario;
use whodunit_core::snapshot::CharacterView;

use crate::error::AppError;
use crate::registry::SessionStats;
use crate::state::AppState;

/// One entry of the scenario listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub min_players: usize,
    pub max_players: usize,
    pub character_count: usize,
    pub clue_count: usize,
}

impl From<&Scenario> for ScenarioSummary {
    fn from(s: &Scenario) -> Self {
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            min_players: s.min_players,
            max_players: s.max_players,
            character_count: s.characters.len(),
            clue_count: s.clues.len(),
        }
    }
}

/// Public scenario detail. Clues and the solution stay server-side.
#[derive(Debug, Serialize)]
pub struct ScenarioDetail {
    #[serde(flatten)]
    pub summary: ScenarioSummary,
    pub characters: Vec<CharacterView>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodeRequest {
    #[serde(default)]
    pub game_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateCodeResponse {
    pub is_valid: bool,
    pub game_code: String,
    pub exists: bool,
}

/// GET /api/v1/games/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.registry.read().await.stats())
}

/// GET /api/v1/games/scenarios
pub async fn list_scenarios(State(state): State<AppState>) -> Json<Vec<ScenarioSummary>> {
    Json(
        state
            .catalog
            .list()
            .iter()
            .map(|s| ScenarioSummary::from(s.as_ref()))
            .collect(),
    )
}

/// GET /api/v1/games/scenarios/{id}
pub async fn get_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScenarioDetail>, AppError> {
    let scenario = state
        .catalog
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Scenario {id} not found")))?;
    Ok(Json(ScenarioDetail {
        summary: ScenarioSummary::from(scenario.as_ref()),
        characters: scenario.characters.iter().map(CharacterView::public).collect(),
    }))
}

/// POST /api/v1/games/validate-code
pub async fn validate_code(
    State(state): State<AppState>,
    Json(body): Json<ValidateCodeRequest>,
) -> Result<Json<ValidateCodeResponse>, AppError> {
    let raw = body
        .game_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("game_code is required".to_string()))?;

    let is_valid = is_valid_session_code(raw);
    let game_code = normalize_code(raw);
    let exists = is_valid && state.registry.read().await.session_exists(&game_code);
    Ok(Json(ValidateCodeResponse {
        is_valid,
        game_code,
        exists,
    }))
}

#[cfg(test)]
mod tests {
    use whodunit_core::test_helpers::heiress;

    use super::*;

    #[test]
    fn summary_counts_content() {
        let scenario = heiress();
        let summary = ScenarioSummary::from(scenario.as_ref());
        assert_eq!(summary.id, scenario.id);
        assert_eq!(summary.character_count, 6);
        assert_eq!(summary.clue_count, 6);
    }

    #[test]
    fn detail_hides_private_content() {
        let scenario = heiress();
        let detail = ScenarioDetail {
            summary: ScenarioSummary::from(scenario.as_ref()),
            characters: scenario.characters.iter().map(CharacterView::public).collect(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], scenario.title.as_str());
        assert!(json.get("solution").is_none());
        assert!(json.get("clues").is_none());
        let secret = &scenario.characters[0].private_info;
        assert!(!json.to_string().contains(secret.as_str()));
    }
}
