use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::seed::SeedOptions;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub seed: SeedOptions,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Any `EnvFilter` directive, e.g. `info` or `taskdb=debug`.
    pub level: Option<String>,
}

impl LogConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise
    /// `~/.taskdb/config.toml` if present, otherwise defaults.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => {
                let path = Path::new(path);
                if !path.exists() {
                    bail!("config file {} does not exist", path.display());
                }
                Self::load_from(path)
            }
            None => {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
                let path = format!("{home}/.taskdb/config.toml");
                Self::load_from(Path::new(&path))
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db) = &self.database.path {
            if db.trim().is_empty() {
                bail!("failed to parse {}: database.path must not be empty", path.display());
            }
        }
        if let Some(level) = &self.log.level {
            if let Err(e) = tracing_subscriber::EnvFilter::try_new(level) {
                bail!("failed to parse {}: log.level '{level}': {e}", path.display());
            }
        }
        Ok(())
    }
}
