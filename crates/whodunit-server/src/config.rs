use std::time::Duration;

use serde::Deserialize;

use crate::registry::SweepPolicy;

/// Top-level server configuration, loaded from `whodunit.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    /// Extra scenario JSON files are loaded from here at startup.
    pub scenario_dir: Option<String>,
    pub limits: LimitsConfig,
    pub sessions: SessionsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            scenario_dir: None,
            limits: LimitsConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 500,
            ws_rate_limit_per_sec: 20.0,
            player_message_buffer: 64,
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Any session older than this is evicted.
    pub max_age_secs: u64,
    /// Finished sessions older than this are evicted.
    pub finished_retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 2 * 60 * 60,
            finished_retention_secs: 30 * 60,
            sweep_interval_secs: 30 * 60,
        }
    }
}

impl SessionsConfig {
    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            max_age_ms: self.max_age_secs.saturating_mul(1000),
            finished_retention_ms: self.finished_retention_secs.saturating_mul(1000),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl ServerConfig {
    /// Every invalid setting, as a human-readable problem.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            problems.push(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        if self.limits.max_ws_connections == 0 {
            problems.push("limits.max_ws_connections must be > 0".to_string());
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            problems.push("limits.ws_rate_limit_per_sec must be > 0".to_string());
        }
        if self.limits.player_message_buffer == 0 {
            problems.push("limits.player_message_buffer must be > 0".to_string());
        }
        if self.sessions.max_age_secs == 0 {
            problems.push("sessions.max_age_secs must be > 0".to_string());
        }
        if self.sessions.sweep_interval_secs == 0 {
            problems.push("sessions.sweep_interval_secs must be > 0".to_string());
        }
        if self.sessions.finished_retention_secs > self.sessions.max_age_secs {
            problems.push(
                "sessions.finished_retention_secs must not exceed sessions.max_age_secs"
                    .to_string(),
            );
        }
        problems
    }

    /// Validate configuration, exiting the process on invalid values.
    pub fn validate(&self) {
        let problems = self.problems();
        for problem in &problems {
            tracing::error!("{problem}");
        }
        if !problems.is_empty() {
            std::process::exit(1);
        }
    }

    /// Load config from `whodunit.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("whodunit.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from whodunit.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse whodunit.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No whodunit.toml found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `WHODUNIT_*` overrides read through `var`.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("WHODUNIT_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(root) = var("WHODUNIT_WEB_ROOT")
            && !root.is_empty()
        {
            self.web_root = root;
        }
        if let Some(dir) = var("WHODUNIT_SCENARIO_DIR")
            && !dir.is_empty()
        {
            self.scenario_dir = Some(dir);
        }
        if let Some(val) = var("WHODUNIT_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Some(val) = var("WHODUNIT_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.ws_rate_limit_per_sec = n;
        }
    }
}
