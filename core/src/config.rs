use std::{env, fs, net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

pub const DEFAULT_MAX_OWNED_TEAMS: i64 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    /// Upper bound on collaborative (non-personal) teams a single user may own.
    #[serde(default = "default_max_owned_teams")]
    pub max_owned_teams: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_path: default_database_path(),
            database_max_connections: default_database_max_connections(),
            max_owned_teams: default_max_owned_teams(),
        }
    }
}

impl AppConfig {
    const CONFIG_ENV: &'static str = "MINDER_CONFIG_FILE";
    const BIND_ADDRESS_ENV: &'static str = "MINDER_BIND_ADDRESS";
    const DATABASE_PATH_ENV: &'static str = "MINDER_DATABASE_PATH";
    const DATABASE_MAX_CONNECTIONS_ENV: &'static str = "MINDER_DATABASE_MAX_CONNECTIONS";
    const MAX_OWNED_TEAMS_ENV: &'static str = "MINDER_MAX_OWNED_TEAMS";

    /// Load configuration from defaults layered with optional config files and
    /// environment variables.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    pub fn load_with(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::resolve_config_path(config_path)? {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            config = Self::from_toml(&contents)
                .with_context(|| format!("invalid config file: {}", path.display()))?;
        }

        if let Ok(addr) = env::var(Self::BIND_ADDRESS_ENV) {
            config.bind_address = addr
                .parse()
                .with_context(|| format!("invalid {name}", name = Self::BIND_ADDRESS_ENV))?;
        }

        if let Ok(path) = env::var(Self::DATABASE_PATH_ENV) {
            config.database_path = path;
        }

        if let Ok(value) = env::var(Self::DATABASE_MAX_CONNECTIONS_ENV) {
            config.database_max_connections = value.trim().parse().with_context(|| {
                format!("invalid {name}", name = Self::DATABASE_MAX_CONNECTIONS_ENV)
            })?;
        }

        if let Ok(value) = env::var(Self::MAX_OWNED_TEAMS_ENV) {
            config.max_owned_teams = value
                .trim()
                .parse()
                .with_context(|| format!("invalid {name}", name = Self::MAX_OWNED_TEAMS_ENV))?;
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            return Self::validate_path(path);
        }

        if let Ok(path) = env::var(Self::CONFIG_ENV) {
            return Self::validate_path(PathBuf::from(path));
        }

        let mut candidates = vec![PathBuf::from("minder.toml")];
        if let Some(dir) = Self::default_config_dir() {
            candidates.push(dir.join("config.toml"));
        }

        for candidate in candidates {
            if candidate.exists() {
                return Ok(Some(candidate));
            }
        }

        Ok(None)
    }

    fn validate_path(path: PathBuf) -> Result<Option<PathBuf>> {
        if path.exists() {
            Ok(Some(path))
        } else {
            Err(anyhow!(
                "configuration file does not exist: {}",
                path.display()
            ))
        }
    }

    fn default_config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".minder"))
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_database_path() -> String {
    "./data/minder.db".to_owned()
}

fn default_database_max_connections() -> u32 {
    4
}

fn default_max_owned_teams() -> i64 {
    DEFAULT_MAX_OWNED_TEAMS
}

fn home_dir() -> Option<PathBuf> {
    if let Some(path) = env::var_os("HOME") {
        return Some(PathBuf::from(path));
    }

    if let Some(path) = env::var_os("USERPROFILE") {
        return Some(PathBuf::from(path));
    }

    None
}
