//! In-place progress display for installs and uninstalls.

use colored::Colorize;
use std::io::{self, IsTerminal, Write};

/// Operation counter that redraws one stderr line, git style:
/// `Installing: 100% (6/6), done.`
///
/// Off a terminal, or when hidden, it only counts.
pub struct Progress {
    title: String,
    total: usize,
    current: usize,
    visible: bool,
    /// Redraws happen only when this changes
    last_percent: usize,
}

impl Progress {
    /// Creates a counter drawn only when stderr is a terminal.
    #[must_use]
    pub fn new(title: &str, total: usize) -> Self {
        let progress = Self::with_visibility(title, total, io::stderr().is_terminal() && total > 0);
        progress.draw();
        progress
    }

    /// Creates a counter that never draws.
    #[must_use]
    pub fn hidden(title: &str, total: usize) -> Self {
        Self::with_visibility(title, total, false)
    }

    fn with_visibility(title: &str, total: usize, visible: bool) -> Self {
        Self {
            title: title.to_string(),
            total,
            current: 0,
            visible,
            last_percent: 0,
        }
    }

    /// Moves to `current` completed operations, clamped to the total.
    pub fn update(&mut self, current: usize) {
        self.current = current.min(self.total);
        let percent = percent(self.current, self.total);
        if percent != self.last_percent {
            self.last_percent = percent;
            self.draw();
        }
    }

    /// Draws the final `done.` line.
    pub fn finish(mut self) {
        self.update(self.total);
        if self.visible {
            eprintln!("\r{}, done.", self.line());
            self.visible = false;
        }
    }

    fn line(&self) -> String {
        format!(
            "{}: {}% ({}/{})",
            self.title.dimmed(),
            self.last_percent,
            self.current,
            self.total
        )
    }

    fn draw(&self) {
        if self.visible {
            eprint!("\r{}", self.line());
            let _ = io::stderr().flush();
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        // An error cut the run short; end the partial line.
        if self.visible {
            eprintln!();
        }
    }
}

fn percent(current: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        current * 100 / total
    }
}
