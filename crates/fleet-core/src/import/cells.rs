//! Raw tabular input as handed over by the file-import collaborator

use serde::{Deserialize, Serialize};

/// One spreadsheet or CSV cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// The cell as text. Whole numbers render without a fractional part so a
    /// numeric unit number like `1042` does not come back as `1042.0`.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

pub type Row = Vec<Cell>;

/// Rows of cells, header row (if any) first
pub type RowMatrix = Vec<Row>;

/// Build a matrix from string literals
pub fn rows_from<R, C>(rows: R) -> RowMatrix
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = C>,
    C: Into<Cell>,
{
    rows.into_iter()
        .map(|row| row.into_iter().map(Into::into).collect())
        .collect()
}

/// Decode comma-separated text into rows.
///
/// Lines split on `\n` or `\r\n`; blank lines are dropped. Double quotes
/// group a field and `""` inside quotes is a literal quote. Fields do not span
/// lines.
pub fn parse_delimited(text: &str) -> RowMatrix {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            split_delimited_line(line)
                .into_iter()
                .map(Cell::Text)
                .collect()
        })
        .collect()
}

/// Split a single CSV line into its fields
pub fn split_delimited_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => current.push(ch),
            }
        } else {
            match ch {
                ',' => fields.push(std::mem::take(&mut current)),
                '"' => in_quotes = true,
                _ => current.push(ch),
            }
        }
    }

    fields.push(current);
    fields
}
