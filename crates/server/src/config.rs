use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::store::SourceRecord;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_rest_addr")]
    pub rest_addr: SocketAddr,
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub id: i64,
    pub name: String,
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: default_rest_addr(),
            remote_timeout_ms: default_remote_timeout_ms(),
            sources: default_sources(),
        }
    }
}

impl ServerConfig {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn source_records(&self) -> impl Iterator<Item = SourceRecord> + '_ {
        self.sources.iter().map(|s| SourceRecord {
            id: s.id,
            name: s.name.clone(),
            url: s.url.clone(),
        })
    }
}

fn default_rest_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8888))
}

fn default_remote_timeout_ms() -> u64 {
    10_000
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig {
        id: 1,
        name: "local".into(),
        url: "http://localhost:8086".into(),
    }]
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_from_file(path: &Path) -> Result<ServerConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(yaml: &str) -> Result<ServerConfig, LoadError> {
    let cfg: ServerConfig = serde_yaml::from_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &ServerConfig) -> Result<(), LoadError> {
    if cfg.remote_timeout_ms == 0 {
        return Err(LoadError::Validation("remote_timeout_ms must be > 0".into()));
    }
    let mut seen = HashSet::new();
    for source in &cfg.sources {
        if !seen.insert(source.id) {
            return Err(LoadError::Validation(format!(
                "duplicate source id {}",
                source.id
            )));
        }
        if source.url.is_empty() {
            return Err(LoadError::Validation(format!(
                "source {} url must not be empty",
                source.id
            )));
        }
    }
    Ok(())
}
