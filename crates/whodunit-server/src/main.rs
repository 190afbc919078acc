use tracing_subscriber::EnvFilter;

use whodunit_server::config::ServerConfig;
use whodunit_server::{build_app, load_catalog, spawn_session_sweeper};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("WHODUNIT_LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Whodunit server starting");

    let config = ServerConfig::load();
    config.validate();

    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load scenario catalog");
            std::process::exit(1);
        },
    };
    tracing::info!(scenarios = catalog.len(), "Scenario catalog ready");

    let listen_addr = config.listen_addr.clone();
    let (app, state) = build_app(config, catalog);
    spawn_session_sweeper(state);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %listen_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        },
    };
    tracing::info!(addr = %listen_addr, "Listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
