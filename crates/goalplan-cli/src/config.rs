//! Configuration file management for goalplan.
//!
//! Provides a TOML-based config file at `~/.config/goalplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use goalplan_core::generator::{OllamaGenerator, resolve_binary};
use goalplan_core::pipeline::PipelineConfig;
use goalplan_core::warmup::DEFAULT_WARMUP_TIMEOUT;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub model: ModelSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    /// Browser origins allowed to call the API.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Path to the `ollama` executable. Looked up on `PATH` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    /// Model identifier passed to `ollama run`.
    pub name: String,
    pub timeout_secs: u64,
    pub retry_timeout_secs: u64,
    pub warmup_timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            binary: None,
            name: OllamaGenerator::DEFAULT_MODEL.to_string(),
            timeout_secs: PipelineConfig::DEFAULT_TIMEOUT.as_secs(),
            retry_timeout_secs: PipelineConfig::DEFAULT_RETRY_TIMEOUT.as_secs(),
            warmup_timeout_secs: DEFAULT_WARMUP_TIMEOUT.as_secs(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the goalplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/goalplan` or `~/.config/goalplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("goalplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("goalplan")
}

/// Return the path to the goalplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values supplied on the command line. `None` defers to the next source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub binary: Option<PathBuf>,
    pub model: Option<String>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct GoalplanConfig {
    pub bind: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub binary: PathBuf,
    pub model: String,
    pub pipeline: PipelineConfig,
    pub warmup_timeout: Duration,
}

impl GoalplanConfig {
    /// Resolve configuration from the CLI, the process environment and the
    /// config file (if one exists).
    ///
    /// A config file that exists but does not parse is an error; a missing
    /// one is not.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let path = config_path();
        let file = if path.exists() {
            Some(load_config(&path)?)
        } else {
            None
        };
        Self::resolve_with(cli, file.as_ref(), |key| std::env::var(key).ok())
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - Bind: `--bind` > `GOALPLAN_BIND` > `server.bind` > `127.0.0.1`
    /// - Port: `--port` > `GOALPLAN_PORT` > `server.port` > `8000`
    /// - Binary: `--ollama-bin` > `GOALPLAN_OLLAMA_BIN` > `model.binary` > `PATH` lookup > install default
    /// - Model: `--model` > `GOALPLAN_MODEL` > `model.name` > `mistral`
    pub fn resolve_with(
        cli: &CliOverrides,
        file: Option<&ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = ConfigFile::default();
        let file = file.unwrap_or(&defaults);

        let bind = cli
            .bind
            .clone()
            .or_else(|| env("GOALPLAN_BIND"))
            .unwrap_or_else(|| file.server.bind.clone());

        let port = match (cli.port, env("GOALPLAN_PORT")) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .with_context(|| format!("GOALPLAN_PORT is not a valid port: {raw:?}"))?,
            (None, None) => file.server.port,
        };

        let explicit_binary = cli
            .binary
            .clone()
            .or_else(|| env("GOALPLAN_OLLAMA_BIN").map(PathBuf::from))
            .or_else(|| file.model.binary.clone());
        let binary = resolve_binary(explicit_binary.as_deref());

        let model = cli
            .model
            .clone()
            .or_else(|| env("GOALPLAN_MODEL"))
            .unwrap_or_else(|| file.model.name.clone());

        Ok(Self {
            bind,
            port,
            allowed_origins: file.server.allowed_origins.clone(),
            binary,
            model,
            pipeline: PipelineConfig {
                timeout: secs(file.model.timeout_secs),
                retry_timeout: secs(file.model.retry_timeout_secs),
            },
            warmup_timeout: secs(file.model.warmup_timeout_secs),
        })
    }
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
