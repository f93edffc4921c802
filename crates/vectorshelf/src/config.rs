//! TOML-backed configuration, loaded once at startup and handed around as
//! an `Arc<Config>`. Every field is optional in the file; defaults fill in
//! anything missing, and [`load_config`] validates the result before
//! returning it.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub embedding_provider: EmbeddingProviderConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding_provider: EmbeddingProviderConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

/// `kind = "mock"` needs no credential and is the default so the service
/// boots without external dependencies; `kind = "openai"` talks to a real
/// embeddings endpoint and requires `api_key`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingProviderConfig {
    pub kind: String,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            kind: "mock".into(),
            api_key: None,
            model: "text-embedding-3-small".into(),
            base_url: "https://api.openai.com/v1".into(),
            dimensions: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty means "all origins".
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".into(),
            log_format: "console".into(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: Config = toml::from_str(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        bail!("server.port must be non-zero");
    }
    match config.embedding_provider.kind.as_str() {
        "mock" => {}
        "openai" => {
            if config.embedding_provider.api_key.is_none() {
                bail!("embedding_provider.api_key is required when kind = \"openai\"");
            }
        }
        other => bail!("unknown embedding_provider.kind: {other}"),
    }
    if config.embedding_provider.dimensions == 0 {
        bail!("embedding_provider.dimensions must be non-zero");
    }
    match config.logging.log_level.to_ascii_uppercase().as_str() {
        "DEBUG" | "INFO" | "WARNING" | "ERROR" | "CRITICAL" => {}
        other => bail!("unknown log_level: {other}"),
    }
    match config.logging.log_format.as_str() {
        "json" | "console" => {}
        other => bail!("unknown log_format: {other}"),
    }
    Ok(())
}
