use std::path::Path;
use std::sync::Arc;

use crate::scenario::{Scenario, ScenarioError};

/// JSON source of the scenario that ships with the server.
pub const BUILTIN_SCENARIO_JSON: &str = include_str!("../scenarios/missing_heiress.json");

/// Read-only store of scenario definitions, in registration order.
/// The first registered scenario is the default.
#[derive(Debug, Default, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<Arc<Scenario>>,
}

impl ScenarioCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog containing only the built-in scenario.
    pub fn builtin() -> Result<Self, ScenarioError> {
        let mut catalog = Self::empty();
        catalog.insert(Scenario::from_json(BUILTIN_SCENARIO_JSON)?)?;
        Ok(catalog)
    }

    /// Register a scenario. Ids must be unique within the catalog.
    pub fn insert(&mut self, scenario: Scenario) -> Result<(), ScenarioError> {
        scenario.validate()?;
        if self.get(&scenario.id).is_some() {
            return Err(ScenarioError::DuplicateScenario(scenario.id));
        }
        self.scenarios.push(Arc::new(scenario));
        Ok(())
    }

    /// Load every `*.json` file in `dir`, in file-name order. Files that fail
    /// to read, parse, or validate are skipped with a warning.
    /// Returns the number of scenarios added.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot read scenario directory");
                return 0;
            },
        };

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            let result = std::fs::read_to_string(&path)
                .map_err(|e| ScenarioError::Parse(e.to_string()))
                .and_then(|json| Scenario::from_json(&json))
                .and_then(|scenario| self.insert(scenario));
            match result {
                Ok(()) => added += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping scenario file");
                },
            }
        }
        added
    }

    pub fn get(&self, id: &str) -> Option<Arc<Scenario>> {
        self.scenarios.iter().find(|s| s.id == id).cloned()
    }

    pub fn default_scenario(&self) -> Option<Arc<Scenario>> {
        self.scenarios.first().cloned()
    }

    /// Look up `id`, falling back to the default scenario when the id is
    /// absent or unknown. `None` only when the catalog is empty.
    pub fn resolve(&self, id: Option<&str>) -> Option<Arc<Scenario>> {
        id.and_then(|id| self.get(id))
            .or_else(|| self.default_scenario())
    }

    pub fn list(&self) -> &[Arc<Scenario>] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_with_id(id: &str) -> Scenario {
        let mut s = Scenario::from_json(BUILTIN_SCENARIO_JSON).unwrap();
        s.id = id.to_string();
        s
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let default_id = "scenario_missing_heiress";
        assert_eq!(catalog.resolve(None).unwrap().id, default_id);
        assert_eq!(catalog.resolve(Some("nope")).unwrap().id, default_id);
        assert_eq!(catalog.resolve(Some(default_id)).unwrap().id, default_id);
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        let catalog = ScenarioCatalog::empty();
        assert!(catalog.resolve(None).is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut catalog = ScenarioCatalog::builtin().unwrap();
        let err = catalog
            .insert(scenario_with_id("scenario_missing_heiress"))
            .unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateScenario(_)));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut catalog = ScenarioCatalog::builtin().unwrap();
        catalog.insert(scenario_with_id("second")).unwrap();
        let ids: Vec<_> = catalog.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["scenario_missing_heiress", "second"]);
        assert_eq!(catalog.default_scenario().unwrap().id, "scenario_missing_heiress");
    }

    #[test]
    fn load_dir_skips_bad_files() {
        let dir = std::env::temp_dir().join(format!("whodunit-scenarios-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = serde_json::to_string(&scenario_with_id("from_disk")).unwrap();
        std::fs::write(dir.join("a_good.json"), good).unwrap();
        std::fs::write(dir.join("b_broken.json"), "{ not json").unwrap();
        let dup = serde_json::to_string(&scenario_with_id("from_disk")).unwrap();
        std::fs::write(dir.join("c_dup.json"), dup).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut catalog = ScenarioCatalog::builtin().unwrap();
        let added = catalog.load_dir(&dir);
        assert_eq!(added, 1);
        assert!(catalog.get("from_disk").is_some());
        assert_eq!(catalog.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_dir_adds_nothing() {
        let mut catalog = ScenarioCatalog::empty();
        assert_eq!(catalog.load_dir(Path::new("/definitely/not/here")), 0);
    }
}
