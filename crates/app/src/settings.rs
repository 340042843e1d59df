//! Application settings, read from `config/bankcore.toml` and overridden by
//! `BANKCORE__*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/bankcore.toml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./bankcore.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub max_id_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_id_attempts: engine::DEFAULT_MAX_ID_ATTEMPTS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub engine: EngineSettings,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(false))
            .add_source(Environment::with_prefix("BANKCORE").separator("__"))
            .build()?
            .try_deserialize()
    }
}
