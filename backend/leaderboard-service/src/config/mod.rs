use crate::services::LeaderboardOptions;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid leaderboard settings: {0}")]
    Leaderboard(#[from] envy::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    /// Defaults bound to every leaderboard handle.
    pub leaderboard: LeaderboardOptions,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub http_host: String,
    pub http_port: u16,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    /// Process-local, lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(other.to_string()),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(env::vars())
    }

    /// Build the configuration from explicit key/value pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let leaderboard: LeaderboardOptions =
            envy::prefixed("LEADERBOARD_").from_iter(vars.clone())?;
        if leaderboard.page_size < 1 {
            return Err(ConfigError::InvalidValue {
                name: "LEADERBOARD_PAGE_SIZE",
                value: leaderboard.page_size.to_string(),
            });
        }

        Ok(Config {
            service: ServiceConfig {
                http_host: var_or(&vars, "HTTP_HOST", "0.0.0.0"),
                http_port: parse_var(&vars, "HTTP_PORT", 8080)?,
                service_name: var_or(&vars, "SERVICE_NAME", "leaderboard-service"),
            },
            store: StoreConfig {
                backend: parse_var(&vars, "STORE_BACKEND", StoreBackend::Redis)?,
                redis_url: var_or(&vars, "REDIS_URL", "redis://localhost:6379"),
            },
            leaderboard,
        })
    }
}

fn var_or(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    vars.get(name)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: value.clone(),
        }),
    }
}
