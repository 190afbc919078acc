use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use whodunit_core::catalog::ScenarioCatalog;

use crate::config::ServerConfig;
use crate::hub::ConnectionHub;
use crate::registry::SessionRegistry;

pub type SharedRegistry = Arc<RwLock<SessionRegistry>>;
pub type SharedHub = Arc<RwLock<ConnectionHub>>;

/// Lock order: `registry` before `hub` whenever both are held.
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub hub: SharedHub,
    pub catalog: Arc<ScenarioCatalog>,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig, catalog: ScenarioCatalog) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            registry: Arc::new(RwLock::new(SessionRegistry::new(Arc::clone(&catalog)))),
            hub: Arc::new(RwLock::new(ConnectionHub::new())),
            catalog,
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Counts an open WebSocket for as long as it lives.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_open_connections() {
        let count = Arc::new(AtomicUsize::new(0));
        let a = ConnectionGuard::new(Arc::clone(&count));
        let b = ConnectionGuard::new(Arc::clone(&count));
        assert_eq!(count.load(Ordering::Relaxed), 2);
        drop(a);
        assert_eq!(count.load(Ordering::Relaxed), 1);
        drop(b);
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }
}
