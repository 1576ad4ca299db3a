//! Plain column tables for `list` and `show`.

use colored::{Color, Colorize};

/// Column alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Column {
    header: String,
    align: Align,
    color: Option<Color>,
}

/// A table of plain-text cells rendered with aligned columns.
///
/// Cells hold uncolored text so widths can be measured; colors are applied
/// per column while rendering.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, header: &str, align: Align, color: Option<Color>) -> Self {
        self.columns.push(Column {
            header: header.to_string(),
            align,
            color,
        });
        self
    }

    /// Adds a row. Missing cells render empty, extra cells are dropped.
    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(index))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(column.header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Renders header and rows, one line each, without trailing newline.
    #[must_use]
    pub fn render(&self, colored: bool) -> Vec<String> {
        let widths = self.widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 1);

        let header = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| {
                let padded = pad(&column.header, *width, column.align);
                if colored {
                    padded.bold().to_string()
                } else {
                    padded
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(header.trim_end().to_string());

        for row in &self.rows {
            let line = self
                .columns
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(index, (column, width))| {
                    let cell = row.get(index).map_or("", String::as_str);
                    let padded = pad(cell, *width, column.align);
                    match column.color {
                        Some(color) if colored => padded.color(color).to_string(),
                        _ => padded,
                    }
                })
                .collect::<Vec<_>>()
                .join("  ");
            lines.push(line.trim_end().to_string());
        }

        lines
    }

    /// Prints the table to stdout.
    pub fn print(&self) {
        for line in self.render(true) {
            println!("{line}");
        }
    }
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{text:<width$}"),
        Align::Right => format!("{text:>width$}"),
    }
}
