use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub sessions: SessionInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub active: usize,
    pub players: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ws = state.ws_connection_count.load(Ordering::Relaxed);
    let stats = state.registry.read().await.stats();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { websocket: ws },
        sessions: SessionInfo {
            active: stats.total_games,
            players: stats.total_players,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            connections: ConnectionInfo { websocket: 5 },
            sessions: SessionInfo {
                active: 1,
                players: 3,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"websocket\":5"));
        assert!(json.contains("\"sessions\":{\"active\":1,\"players\":3}"));
    }
}
