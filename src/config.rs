//! Process configuration: defaults, overridden from the environment.

use std::{net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

pub const ENV_BIND: &str = "CALENDAR_BIND";
pub const ENV_DB_PATH: &str = "CALENDAR_DB_PATH";
pub const ENV_STATIC_DIR: &str = "CALENDAR_STATIC_DIR";
pub const ENV_LOG: &str = "CALENDAR_LOG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub log_filter: String, // EnvFilter directive, RUST_LOG wins when set
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_path: PathBuf::from("data/db.json"),
            static_dir: PathBuf::from("static"),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and apply `CALENDAR_*` overrides on top of the defaults.
    pub fn from_env() -> Result<Self, CalendarError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CalendarError> {
        let mut cfg = Self::default();

        if let Some(bind) = lookup(ENV_BIND) {
            cfg.bind = bind.parse().map_err(|_| {
                CalendarError::Configuration(format!("{ENV_BIND}: invalid socket address {bind:?}"))
            })?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            cfg.db_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_STATIC_DIR) {
            cfg.static_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            cfg.log_filter = filter;
        }

        Ok(cfg)
    }
}
