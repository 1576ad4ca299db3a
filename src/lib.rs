#![warn(missing_docs)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Simple counters cannot overflow
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # dotx - Link Farm Manager
//!
//! dotx installs a package (a directory tree of dotfiles) into a target
//! directory by creating symlinks that mirror the package's structure, and
//! takes those links back out again.
//!
//! ## Features
//!
//! - **Minimal links**: a directory is linked whole unless something forces a
//!   real directory at the destination
//! - **Renaming**: `dot-bashrc` in a package installs as `.bashrc`
//! - **Conflict refusal**: nothing is touched if any file would be overwritten
//! - **Ignore and always-create rules**: gitignore-style pattern files
//! - **Installation ledger**: records what was installed from where
//!
//! ## Architecture
//!
//! - [`planner`]: walks package and target and decides what to do per path
//! - [`plan`]: the plan model, marking helpers, and the executor
//! - [`patterns`]: ignore and always-create rules
//! - [`ledger`]: the persisted installation ledger
//! - [`config`]: configuration file
//! - [`commands`]: command implementations
//! - [`output`]: output formatting, styling, and progress display
//!
//! ## Example Usage
//!
//! ```no_run
//! use dotx::DotxContext;
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = DotxContext::new()?;
//! dotx::commands::install::execute(&ctx, &[PathBuf::from("dotfiles/bash")])?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
#[allow(missing_docs)]
pub mod commands;

/// Configuration parsing, validation, and management.
#[allow(missing_docs)]
pub mod config;

/// Typed errors for plan execution and the ledger.
pub mod error;

/// Installation ledger.
#[allow(missing_docs)]
pub mod ledger;

/// Output formatting and progress display.
#[allow(missing_docs)]
pub mod output;

/// Ignore and always-create pattern rules.
pub mod patterns;

/// Plan data model, marking helpers, and execution.
#[allow(missing_docs)]
pub mod plan;

/// Install and uninstall planners.
pub mod planner;

/// Utility functions and helpers.
#[allow(missing_docs)]
pub mod utils;

use anyhow::{Context, Result};
use patterns::{AlwaysCreateRules, IgnoreRules};
use std::path::{Path, PathBuf};

/// Current version of the dotx binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Central context for all dotx operations.
///
/// Holds the target directory, the loaded configuration, and the global
/// command-line switches. Commands receive it explicitly.
#[derive(Debug, Clone)]
pub struct DotxContext {
    /// Directory packages are installed into.
    pub target: PathBuf,

    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,

    /// Directory holding the user-wide pattern files.
    pub config_dir: PathBuf,

    /// Path to the installation ledger.
    pub ledger_path: PathBuf,

    /// Ignore patterns given on the command line.
    pub extra_ignores: Vec<String>,

    /// Describe operations without performing them.
    pub dry_run: bool,

    /// List every installed or removed path.
    pub verbose: bool,

    /// Whether to run in non-interactive mode (no prompts).
    pub non_interactive: bool,
}

impl DotxContext {
    /// Creates a context from the configuration at the default location.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or if the
    /// configuration file cannot be read.
    pub fn new() -> Result<Self> {
        let config_path = config::Config::default_path()?;
        Self::with_config_path(config_path)
    }

    /// Creates a context from the configuration at `config_path`.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or no target
    /// directory can be determined.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self> {
        let config = config::Config::load(&config_path)?;

        let target = match config.target()? {
            Some(target) => target,
            None => dirs::home_dir().context("Could not find home directory")?,
        };
        let target = utils::make_absolute(&target)?;

        let config_dir = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let ledger_path = utils::make_absolute(&config.ledger_path()?)?;

        Ok(Self {
            target,
            config_path,
            config,
            config_dir,
            ledger_path,
            extra_ignores: Vec::new(),
            dry_run: false,
            verbose: false,
            non_interactive: false,
        })
    }

    /// Creates a non-interactive context with explicit locations, for tests.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded.
    pub fn new_explicit(target: PathBuf, config_path: PathBuf, ledger_path: PathBuf) -> Result<Self> {
        let mut context = Self::with_config_path(config_path)?;
        context.target = target;
        context.ledger_path = ledger_path;
        context.non_interactive = true;
        Ok(context)
    }

    /// Overrides the target directory (`--target`).
    ///
    /// # Errors
    /// Returns an error if a relative path cannot be made absolute.
    pub fn set_target(&mut self, target: &Path) -> Result<()> {
        self.target = utils::make_absolute(&utils::expand_tilde(target)?)?;
        Ok(())
    }

    /// Name prefix replaced by `.` at the destination.
    #[must_use]
    pub fn rename_prefix(&self) -> &str {
        &self.config.core.rename_prefix
    }

    /// Ignore rules for the package at `source_root`: built-ins, the user
    /// file, configured and command-line patterns, then the package's files.
    #[must_use]
    pub fn ignore_rules(&self, source_root: &Path) -> IgnoreRules {
        let mut extra = self.config.ignore.patterns.clone();
        extra.extend(self.extra_ignores.iter().cloned());
        IgnoreRules::load(source_root, Some(&self.config_dir), &extra)
    }

    /// Always-create rules for the package at `source_root`.
    #[must_use]
    pub fn always_create_rules(&self, source_root: &Path) -> AlwaysCreateRules {
        AlwaysCreateRules::load(
            source_root,
            Some(&self.config_dir),
            &self.config.always_create.patterns,
        )
    }

    /// Checks that the target directory exists.
    ///
    /// # Errors
    /// Returns an error if the target is missing or not a directory.
    pub fn check_target(&self) -> Result<()> {
        if !self.target.is_dir() {
            anyhow::bail!(
                "Target directory does not exist: {}",
                self.target.display()
            );
        }
        Ok(())
    }
}
