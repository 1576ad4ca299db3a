//! Command-line interface definitions for dotx.
//!
//! This module contains all CLI argument parsing structures using clap's derive macros.
//! The CLI definitions are shared between the main binary and build tools (like xtask)
//! for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes and doc comments,
//! so we allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for dotx.
#[derive(Parser)]
#[command(
    name = "dotx",
    version = crate::VERSION,
    about = "Install dotfile packages as symlinks and take them back out",
    long_about = "A link farm manager: mirrors package directories into a target directory \
                  with as few symlinks as possible, renaming dot-foo to .foo on the way"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Directory to install into (default: config target, else $HOME)
    #[arg(long, global = true, env = "DOTX_TARGET", value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Show what would be done without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Show every installed or removed path
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log planner decisions
    #[arg(long, global = true)]
    pub debug: bool,

    /// Write log output to FILE instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Extra ignore pattern (repeatable)
    #[arg(short = 'i', long = "ignore", global = true, value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Assume yes for confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Install packages into the target directory
    Install {
        /// Package directories to install
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<PathBuf>,
    },

    /// Remove the links a package installed
    Uninstall {
        /// Package directories to uninstall
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<PathBuf>,
    },

    /// List installed packages
    List {
        /// Print reinstall commands instead of a table
        #[arg(long)]
        as_commands: bool,
    },

    /// Check recorded installations against the filesystem
    Verify {
        /// Package directory to verify (all packages if omitted)
        package: Option<PathBuf>,
    },

    /// Show the recorded installations of a package
    Show {
        /// Package directory
        package: PathBuf,
    },

    /// Rebuild the ledger by scanning the target for symlinks
    Sync {
        /// Maximum scan depth (default: 1 for the target, 3 for .config)
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Additional directory to scan (repeatable)
        #[arg(long = "scan-path", value_name = "PATH")]
        scan_paths: Vec<PathBuf>,

        /// Only scan the top level of the target, skipping .config
        #[arg(long)]
        simple: bool,

        /// Only record packages under this directory (repeatable)
        #[arg(long = "package-root", value_name = "PATH")]
        package_roots: Vec<PathBuf>,

        /// Remove ledger entries whose targets no longer exist
        #[arg(long)]
        clean: bool,
    },

    /// Print the source directory of an installed package
    Path {
        /// Package name
        name: String,

        /// Package root to disambiguate packages with the same name
        #[arg(long, value_name = "PATH")]
        package_root: Option<PathBuf>,
    },

    /// Print the package that installed a file
    Which {
        /// Installed file
        file: PathBuf,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dotx", "install", "pkg", "--dry-run", "-i", "*.bak", "-i", "README.md", "--target",
            "/tmp/t",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.ignore, vec!["*.bak", "README.md"]);
        assert_eq!(cli.target, Some(PathBuf::from("/tmp/t")));
        assert!(matches!(cli.command, Commands::Install { ref packages } if packages.len() == 1));
    }

    #[test]
    fn test_install_requires_a_package() {
        assert!(Cli::try_parse_from(["dotx", "install"]).is_err());
    }

    #[test]
    fn test_sync_repeatable_options() {
        let cli = Cli::try_parse_from([
            "dotx",
            "sync",
            "--package-root",
            "/a",
            "--package-root",
            "/b",
            "--scan-path",
            "/c",
            "--max-depth",
            "2",
            "--clean",
        ])
        .unwrap();
        match cli.command {
            Commands::Sync {
                max_depth,
                scan_paths,
                package_roots,
                clean,
                simple,
            } => {
                assert_eq!(max_depth, Some(2));
                assert_eq!(scan_paths, vec![PathBuf::from("/c")]);
                assert_eq!(package_roots.len(), 2);
                assert!(clean);
                assert!(!simple);
            }
            _ => panic!("expected sync"),
        }
    }
}
