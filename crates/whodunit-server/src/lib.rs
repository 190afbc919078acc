pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod hub;
pub mod registry;
pub mod state;
pub mod validate;
pub mod ws;

use std::path::Path;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use whodunit_core::catalog::ScenarioCatalog;
use whodunit_core::scenario::ScenarioError;
use whodunit_core::time::now_millis;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig, catalog: ScenarioCatalog) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let state = AppState::new(config, catalog);

    let game_routes = Router::new()
        .route("/stats", get(api::get_stats))
        .route("/scenarios", get(api::list_scenarios))
        .route("/scenarios/{id}", get(api::get_scenario))
        .route("/validate-code", post(api::validate_code));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ws", get(ws::ws_handler))
        .nest("/api/v1/games", game_routes)
        .fallback_service(ServeDir::new(&web_root))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}

/// The built-in scenarios plus any found in `config.scenario_dir`.
pub fn load_catalog(config: &ServerConfig) -> Result<ScenarioCatalog, ScenarioError> {
    let mut catalog = ScenarioCatalog::builtin()?;
    if let Some(dir) = &config.scenario_dir {
        let added = catalog.load_dir(Path::new(dir));
        tracing::info!(dir = %dir, added, "Loaded extra scenarios");
    }
    Ok(catalog)
}

/// Background task that evicts stale sessions and tells their players.
pub fn spawn_session_sweeper(state: AppState) {
    tokio::spawn(async move {
        let policy = state.config.sessions.sweep_policy();
        let mut interval = tokio::time::interval(state.config.sessions.sweep_interval());
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let mut registry = state.registry.write().await;
            let evicted = registry.sweep(now_millis(), &policy);
            if evicted.is_empty() {
                continue;
            }
            let hub = state.hub.read().await;
            for session in &evicted {
                hub.notify_evicted(session);
                tracing::info!(
                    code = %session.code,
                    phase = %session.phase,
                    players = session.connection_ids.len(),
                    "Evicted stale session"
                );
            }
            tracing::info!(evicted = evicted.len(), remaining = registry.len(), "Session sweep done");
        }
    });
}
