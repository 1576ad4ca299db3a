pub mod validator;

use crate::ledger::LEDGER_FILE_NAME;
use crate::planner::DEFAULT_RENAME_PREFIX;
use crate::utils::paths::{expand_tilde, xdg_config_home, xdg_data_home};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "DOTX_CONFIG_PATH";

/// Name of the dotx directory under the XDG config and data homes.
pub const APP_DIR_NAME: &str = "dotx";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    /// Extra ignore patterns applied to every package
    #[serde(default)]
    pub ignore: PatternConfig,

    /// Extra always-create patterns applied to every package
    #[serde(default)]
    pub always_create: PatternConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Name prefix replaced by `.` when installing
    #[serde(default = "default_rename_prefix")]
    pub rename_prefix: String,
    /// Install target used when `--target` is not given
    #[serde(default)]
    pub target: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PatternConfig {
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Record installations at all
    #[serde(default = "default_ledger_enabled")]
    pub enabled: bool,
    /// Ledger file location override
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rename_prefix: default_rename_prefix(),
            target: None,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: default_ledger_enabled(),
            path: None,
        }
    }
}

impl Config {
    /// Location of the config file: `$DOTX_CONFIG_PATH`, else
    /// `$XDG_CONFIG_HOME/dotx/config.toml`, else `~/.config/dotx/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return expand_tilde(Path::new(&path));
        }
        Ok(xdg_config_home()?.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a file. A missing file yields the defaults and
    /// is not created.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot read the configuration file
    /// - Configuration file contains invalid TOML or invalid values
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        validator::ConfigValidator::new().warn_unknown_fields(&content, path);

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let prefix = &self.core.rename_prefix;
        if prefix.is_empty() {
            bail!("core.rename_prefix must not be empty");
        }
        if prefix.contains('/') || prefix.starts_with('.') {
            bail!("core.rename_prefix must be a plain name prefix, got {prefix:?}");
        }
        Ok(())
    }

    /// Ledger file location: `ledger.path`, else
    /// `$XDG_DATA_HOME/dotx/installed.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined
    pub fn ledger_path(&self) -> Result<PathBuf> {
        match &self.ledger.path {
            Some(path) => expand_tilde(path),
            None => Ok(xdg_data_home()?.join(APP_DIR_NAME).join(LEDGER_FILE_NAME)),
        }
    }

    /// Configured default target with `~` expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined
    pub fn target(&self) -> Result<Option<PathBuf>> {
        self.core.target.as_deref().map(expand_tilde).transpose()
    }
}

// Default functions for serde
fn default_rename_prefix() -> String {
    DEFAULT_RENAME_PREFIX.to_string()
}

const fn default_ledger_enabled() -> bool {
    true
}
