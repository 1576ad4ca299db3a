//! Console output for the dotx CLI.
//!
//! Routine messages are dimmed, warnings and errors bold, and nothing but
//! errors and warnings is printed in quiet mode. Messages go to stderr so
//! that stdout carries only command results (`list --as-commands`, `path`,
//! dry-run commands) and can be piped.

mod progress;
mod table;

use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

pub use progress::Progress;
pub use table::{Align, Table};

/// How much the CLI prints. Ordered from least to most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Only warnings and errors.
    Quiet = 0,
    /// Standard messages.
    Normal = 1,
    /// Standard messages plus one line per filesystem operation.
    Verbose = 2,
}

impl Verbosity {
    /// Picks the level from the `--quiet` and `--verbose` flags. Quiet wins.
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, true) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }

    const fn from_u8(level: u8) -> Self {
        match level {
            0 => Self::Quiet,
            2 => Self::Verbose,
            _ => Self::Normal,
        }
    }
}

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Normal as u8);

/// Sets the level every printing function in this module checks.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

#[must_use]
pub fn get_verbosity() -> Verbosity {
    Verbosity::from_u8(VERBOSITY.load(Ordering::Relaxed))
}

/// Writes `line` to stderr when the current level is at least `minimum`.
fn emit(minimum: Verbosity, line: impl std::fmt::Display) {
    if get_verbosity() >= minimum {
        eprintln!("{line}");
    }
}

/// Green, hidden when quiet.
pub fn success(message: &str) {
    emit(Verbosity::Normal, message.green());
}

/// Bold red, always shown.
pub fn error(message: &str) {
    emit(Verbosity::Quiet, message.red().bold());
}

/// Bold yellow, always shown.
pub fn warning(message: &str) {
    emit(Verbosity::Quiet, message.yellow().bold());
}

/// Dimmed, hidden when quiet.
pub fn info(message: &str) {
    emit(Verbosity::Normal, message.dimmed());
}

/// Dimmed, shown only with `--verbose`.
pub fn verbose(message: &str) {
    emit(Verbosity::Verbose, message.dimmed());
}

/// Bold title above a table or listing.
pub fn header(title: &str) {
    emit(Verbosity::Normal, title.bold());
}

/// Starts a progress bar, unless output is quiet or verbose (verbose mode
/// lists every operation instead).
#[must_use]
pub fn start_progress(title: &str, total: usize) -> Progress {
    if get_verbosity() == Verbosity::Normal {
        Progress::new(title, total)
    } else {
        Progress::hidden(title, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(Verbosity::Quiet < Verbosity::Normal);
        assert!(Verbosity::Normal < Verbosity::Verbose);
    }

    #[test]
    #[serial]
    fn test_verbosity_round_trip() {
        let levels = [Verbosity::Quiet, Verbosity::Normal, Verbosity::Verbose];
        for level in &levels {
            set_verbosity(*level);
            assert_eq!(get_verbosity(), *level);
        }
        set_verbosity(Verbosity::Normal);
    }
}
