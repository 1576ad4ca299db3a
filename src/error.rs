//! Typed errors raised while executing plans and maintaining the ledger.
//!
//! Command code works in `anyhow::Result`; these variants exist so callers can
//! tell a destination that drifted between planning and execution apart from
//! an ordinary filesystem failure.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the plan executor and the installation ledger.
#[derive(Debug, Error)]
pub enum DotxError {
    /// The destination is not in the state the plan was computed against.
    ///
    /// Raised when an `Unlink` target is no longer a symlink, or a `Create` or
    /// `Link` target is already occupied. Planning and execution are not
    /// atomic, so another process touching the destination can cause this.
    #[error(
        "internal planner/filesystem state mismatch at {}: expected {expected}",
        .path.display()
    )]
    StateMismatch {
        /// Destination path whose state changed.
        path: PathBuf,
        /// What the plan assumed about that path.
        expected: &'static str,
    },

    /// Any other filesystem failure.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path the failing operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The ledger could not be read, locked, or written.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// The ledger file was written by an incompatible version.
    #[error(
        "incompatible ledger format at {}.\n\n\
         To upgrade:\n  \
         1. Delete the old ledger: rm {}\n  \
         2. Rebuild it from your existing installations:\n     \
         dotx sync --package-root ~/dotfiles",
        .path.display(),
        .path.display()
    )]
    IncompatibleLedger {
        /// Location of the ledger file.
        path: PathBuf,
    },
}

impl DotxError {
    /// Wraps an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for the planning/execution drift case.
    #[must_use]
    pub const fn is_state_mismatch(&self) -> bool {
        matches!(self, Self::StateMismatch { .. })
    }
}

/// Result alias for library operations that return [`DotxError`].
pub type Result<T> = std::result::Result<T, DotxError>;
