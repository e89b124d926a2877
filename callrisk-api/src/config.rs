//! Bootstrap configuration for callrisk-api
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--host, --port, --model, --language, --log-level)
//! 2. Environment variables (CALLRISK_HOST, CALLRISK_PORT, CALLRISK_MODEL,
//!    CALLRISK_LANGUAGE, CALLRISK_CORS_ORIGIN, RUST_LOG)
//! 3. TOML configuration file (--config, CALLRISK_CONFIG, or
//!    `~/.config/callrisk/config.toml`)
//! 4. Built-in defaults
//!
//! A missing TOML file is not fatal: defaults are used and `main` logs a
//! warning. A file that exists but does not parse is fatal.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 5730
//! model_path = "/var/lib/callrisk/model.json"
//!
//! [logging]
//! level = "debug"
//!
//! [engine]
//! strategies = ["learned", "heuristic"]
//! workers = 8
//! ```

use std::path::{Path, PathBuf};

use callrisk_engine::{EngineConfig, Error, Result};
use serde::{Deserialize, Serialize};

use crate::api::MAX_TOP_N;

pub const ENV_CONFIG: &str = "CALLRISK_CONFIG";
pub const ENV_HOST: &str = "CALLRISK_HOST";
pub const ENV_PORT: &str = "CALLRISK_PORT";
pub const ENV_MODEL: &str = "CALLRISK_MODEL";
pub const ENV_LANGUAGE: &str = "CALLRISK_LANGUAGE";
pub const ENV_CORS_ORIGIN: &str = "CALLRISK_CORS_ORIGIN";
pub const ENV_LOG: &str = "RUST_LOG";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5730;
const DEFAULT_CORS_ORIGIN: &str = "*";

/// Contents of the TOML file; every key optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Model artifact loaded at startup and on reload
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Language set (stopwords, lexicon, weights); built-in Dutch if absent
    #[serde(default)]
    pub language_path: Option<PathBuf>,

    #[serde(default)]
    pub cors_origin: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model: Option<PathBuf>,
    pub language: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Where the TOML layer came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Named or default file does not exist; defaults used
    Missing(PathBuf),
    /// No file named and no platform config directory
    Defaults,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub model_path: Option<PathBuf>,
    pub language_path: Option<PathBuf>,
    pub cors_origin: String,
    pub log_level: String,
    pub engine: EngineConfig,
    pub source: ConfigSource,
}

impl Settings {
    /// Resolve every key (CLI > ENV > TOML > default) and validate
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let (toml, source) = load_toml_layer(cli.config.as_deref())?;

        let port = match (cli.port, env_value(ENV_PORT)) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw.parse().map_err(|_| {
                Error::Config(format!("{} must be a port number, got '{}'", ENV_PORT, raw))
            })?,
            (None, None) => toml.port.unwrap_or(DEFAULT_PORT),
        };

        let settings = Self {
            host: cli
                .host
                .clone()
                .or_else(|| env_value(ENV_HOST))
                .or(toml.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            model_path: cli
                .model
                .clone()
                .or_else(|| env_value(ENV_MODEL).map(PathBuf::from))
                .or(toml.model_path),
            language_path: cli
                .language
                .clone()
                .or_else(|| env_value(ENV_LANGUAGE).map(PathBuf::from))
                .or(toml.language_path),
            cors_origin: env_value(ENV_CORS_ORIGIN)
                .or(toml.cors_origin)
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            log_level: cli
                .log_level
                .clone()
                .or_else(|| env_value(ENV_LOG))
                .unwrap_or(toml.logging.level),
            engine: toml.engine,
            source,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.engine.default_top_n > MAX_TOP_N {
            return Err(Error::Config(format!(
                "engine.default_top_n must be <= {}, got {}",
                MAX_TOP_N, self.engine.default_top_n
            )));
        }
        Ok(())
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("callrisk").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

fn load_toml_layer(cli_path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| env_value(ENV_CONFIG).map(PathBuf::from))
        .or_else(default_config_path);

    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            Ok((config, ConfigSource::File(path)))
        }
        Some(path) => Ok((TomlConfig::default(), ConfigSource::Missing(path))),
        None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
    }
}

/// Environment variable, ignoring empty values
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_parses_all_sections() {
        let config: TomlConfig = toml::from_str(
            r#"
            host = "0.0.0.0"
            port = 6000
            model_path = "/srv/model.json"

            [logging]
            level = "debug"

            [engine]
            workers = 2
            strategies = ["heuristic"]
            "#,
        )
        .unwrap();
        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.port, Some(6000));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.strategies, vec!["heuristic"]);
        assert_eq!(config.engine.max_bigrams, 20);
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.host.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_top_n_default_above_limit_rejected() {
        let settings = Settings {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: None,
            language_path: None,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            log_level: "info".to_string(),
            engine: EngineConfig {
                default_top_n: MAX_TOP_N + 1,
                ..Default::default()
            },
            source: ConfigSource::Defaults,
        };
        assert!(settings.validate().is_err());
    }
}
