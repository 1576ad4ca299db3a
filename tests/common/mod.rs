#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use dotx::DotxContext;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway world: a home directory to install into, a dotfiles
/// directory holding packages, and private config and data directories.
pub struct TestEnv {
    pub temp_dir: TempDir,
    /// Canonical temp root, so paths compare equal to resolved ones
    pub root: PathBuf,
    pub home: PathBuf,
    pub dotfiles: PathBuf,
    pub config_path: PathBuf,
    pub ledger_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().canonicalize()?;
        let home = root.join("home");
        let dotfiles = root.join("dotfiles");
        fs::create_dir_all(&home)?;
        fs::create_dir_all(&dotfiles)?;

        Ok(Self {
            config_path: root.join("config/dotx/config.toml"),
            ledger_path: root.join("data/dotx/installed.toml"),
            temp_dir,
            root,
            home,
            dotfiles,
        })
    }

    /// Path of package `name` under the dotfiles directory.
    pub fn package(&self, name: &str) -> PathBuf {
        self.dotfiles.join(name)
    }

    /// Creates a file (and its parents) relative to the dotfiles directory.
    pub fn touch(&self, relative: &str) -> Result<PathBuf> {
        touch(&self.dotfiles, relative)
    }

    /// Creates a file (and its parents) relative to the home directory.
    pub fn touch_home(&self, relative: &str) -> Result<PathBuf> {
        touch(&self.home, relative)
    }

    pub fn write_config(&self, content: &str) -> Result<()> {
        fs::create_dir_all(self.config_path.parent().unwrap())?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Library context targeting the test home.
    pub fn context(&self) -> Result<DotxContext> {
        DotxContext::new_explicit(
            self.home.clone(),
            self.config_path.clone(),
            self.ledger_path.clone(),
        )
    }

    /// The `dotx` binary, isolated from the real home and config.
    pub fn cmd(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("dotx")?;
        cmd.env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", self.root.join("config"))
            .env("XDG_DATA_HOME", self.root.join("data"))
            .env("DOTX_CONFIG_PATH", &self.config_path)
            .env_remove("DOTX_TARGET")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        Ok(cmd)
    }
}

pub fn touch(root: &Path, relative: &str) -> Result<PathBuf> {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(&path, format!("contents of {relative}\n"))?;
    Ok(path)
}

/// Whether `path` is a symlink (without following it).
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|metadata| metadata.file_type().is_symlink())
}

/// Whether `path` is a real directory (not a symlink to one).
pub fn is_real_dir(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|metadata| metadata.file_type().is_dir())
}

/// Every symlink below `root`, not descending into linked directories.
pub fn symlinks_under(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(walkdir::DirEntry::path_is_symlink)
        .map(walkdir::DirEntry::into_path)
        .collect()
}
