//! Configuration file management for skillmap.
//!
//! Provides a TOML-based config file at `~/.config/skillmap/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use skillmap_core::generator::LlmConfig;
use skillmap_db::config::DbConfig;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "SKILLMAP_MODEL";
pub const BASE_URL_ENV: &str = "SKILLMAP_LLM_BASE_URL";

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Serve a minimal plan instead of an error when the model fails.
    #[serde(default = "default_true")]
    pub fallback: bool,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            fallback: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_base_url() -> String {
    LlmConfig::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    LlmConfig::DEFAULT_MODEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

pub fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://ts-backend:8080",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the skillmap config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/skillmap` or
/// `~/.config/skillmap`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("skillmap");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("skillmap")
}

/// Return the path to the skillmap config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse a config file. Returns an error if it does not exist.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse config file")
}

/// Serialize and write a config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since it may hold an API key.
pub fn save_config_to(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(config, &config_path())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct SkillmapConfig {
    pub db_config: DbConfig,
    pub llm_config: LlmConfig,
    pub fallback: bool,
    pub server: ServerSettings,
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl SkillmapConfig {
    /// Resolve configuration from the user's config file (if any), the
    /// environment and the CLI flag.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let path = config_path();
        let file_config = if path.exists() {
            Some(load_config_from(&path)?)
        } else {
            None
        };
        Ok(Self::resolve_with(cli_db_url, file_config))
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `SKILLMAP_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - API key: `OPENAI_API_KEY` > `llm.api_key` > none
    /// - Model: `SKILLMAP_MODEL` > `llm.model` > `gpt-4`
    /// - Base URL: `SKILLMAP_LLM_BASE_URL` > `llm.base_url` > OpenAI
    pub fn resolve_with(cli_db_url: Option<&str>, file_config: Option<ConfigFile>) -> Self {
        let (llm_file, server_file, file_db_url) = match file_config {
            Some(cfg) => (cfg.llm, cfg.server, Some(cfg.database.url)),
            None => (LlmSection::default(), ServerSection::default(), None),
        };

        let db_url = cli_db_url
            .map(str::to_string)
            .or_else(|| env_non_empty(DbConfig::ENV_VAR))
            .or(file_db_url)
            .unwrap_or_else(|| DbConfig::DEFAULT_URL.to_string());

        let llm_config = LlmConfig {
            base_url: env_non_empty(BASE_URL_ENV).unwrap_or(llm_file.base_url),
            model: env_non_empty(MODEL_ENV).unwrap_or(llm_file.model),
            api_key: env_non_empty(API_KEY_ENV).or(llm_file.api_key),
            ..LlmConfig::default()
        };

        Self {
            db_config: DbConfig::new(db_url),
            llm_config,
            fallback: llm_file.fallback,
            server: ServerSettings {
                bind: server_file.bind,
                port: server_file.port,
                cors_origins: server_file.cors_origins,
            },
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
