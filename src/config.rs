//! Configuration loading for the loader plugin.
//!
//! Loads `loader.toml` from `$AIVK_LOADER_CONFIG` or `~/.aivk/loader.toml`.
//! Every section uses `#[serde(default)]`, so a missing, empty or partial
//! file is valid.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::root::{CALLER_ROOT_DEPTH, DEFAULT_MODULES_DIR};

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "AIVK_LOADER_CONFIG";

/// Top-level loader configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Companion module and sibling module layout (`[loader]`).
    pub loader: LoaderSettings,
    /// Root discovery (`[locator]`).
    pub locator: LocatorConfig,
    /// Log level (`[logging]`).
    pub logging: LoggingConfig,
}

impl LoaderConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`Self::load`] with a custom env resolver (avoids `set_var` in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = Self::config_path_with(&env)?;
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(&env);
        Ok(config)
    }

    /// Load from a TOML file only; a missing file yields defaults.
    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading loader config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no loader config found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config file path: `$AIVK_LOADER_CONFIG`, else
    /// `~/.aivk/loader.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if no env override is set and the home directory
    /// cannot be determined.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
        if let Some(p) = env(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(p));
        }
        Ok(config_dir()?.join("loader.toml"))
    }

    /// Apply environment variable overrides on top of the current values.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("AIVK_LOADER_COMPANION") {
            if v.trim().is_empty() {
                tracing::warn!(var = "AIVK_LOADER_COMPANION", "ignoring empty env override");
            } else {
                self.loader.companion = v.trim().to_owned();
            }
        }
        if let Some(v) = env("AIVK_LOADER_MODULES_DIR") {
            self.loader.modules_dir = PathBuf::from(v);
        }
        if let Some(v) = env("AIVK_LOADER_CALLER_DEPTH") {
            match v.parse() {
                Ok(n) => self.locator.caller_depth = n,
                Err(_) => tracing::warn!(
                    var = "AIVK_LOADER_CALLER_DEPTH",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("AIVK_LOADER_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML for this schema.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: LoaderConfig =
            toml::from_str(toml_str).context("failed to parse loader config TOML")?;
        Ok(config)
    }
}

/// `[loader]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Module whose status gates `on_load`.
    pub companion: String,
    /// Directory holding sibling modules, relative to the root unless absolute.
    pub modules_dir: PathBuf,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            companion: "loader".to_owned(),
            modules_dir: PathBuf::from(DEFAULT_MODULES_DIR),
        }
    }
}

/// `[locator]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Ancestor levels above a caller's file where the root walk starts.
    pub caller_depth: usize,
    /// Share one mount per canonical root path.
    pub cache_mounts: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            caller_depth: CALLER_ROOT_DEPTH,
            cache_mounts: true,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Load the loader config from an explicit TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<LoaderConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    LoaderConfig::from_toml(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))
}

/// Resolve the per-user config directory (`~/.aivk/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".aivk"))
}
