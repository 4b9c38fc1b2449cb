//! Structured rows produced by formatters and their text rendering
use crate::error::{BundleGrepError, Result};
use serde::Serialize;
use serde_json::{Value, json};

pub const EMPTY_OUTPUT_MESSAGE: &str = "Nothing to display\n";

const HORIZONTAL_SEP: &str = "-";
const VERTICAL_SEP: &str = "|";
const JOIN_SEP: &str = "+";

/// Rows under a fixed header. One header cell makes a plain column list,
/// more make a bordered table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowList {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowList {
    pub fn new(header: Vec<String>) -> Result<Self> {
        if header.is_empty() {
            return Err(BundleGrepError::Other(
                "Empty header was provided to define a row list".to_string(),
            ));
        }
        Ok(Self {
            header,
            rows: Vec::new(),
        })
    }

    pub fn add_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.header.len() {
            return Err(BundleGrepError::RowWidth {
                expected: self.header.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn add_cell(&mut self, cell: impl Into<String>) -> Result<()> {
        self.add_row(vec![cell.into()])
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_column(&self) -> bool {
        self.header.len() == 1
    }

    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return EMPTY_OUTPUT_MESSAGE.to_string();
        }
        if self.is_column() {
            let mut output = String::new();
            output.push_str(&self.header[0]);
            output.push('\n');
            for row in &self.rows {
                output.push_str(&row[0]);
                output.push('\n');
            }
            return output;
        }

        let widths = self.column_widths();
        let mut output = String::new();
        push_line(&widths, &mut output);
        push_row(&self.header, &widths, &mut output);
        push_line(&widths, &mut output);
        for row in &self.rows {
            push_row(row, &widths, &mut output);
        }
        push_line(&widths, &mut output);
        output
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }
}

fn push_line(widths: &[usize], output: &mut String) {
    for width in widths {
        output.push_str(JOIN_SEP);
        output.push_str(&HORIZONTAL_SEP.repeat(width + 2));
    }
    output.push_str(JOIN_SEP);
    output.push('\n');
}

fn push_row(cells: &[String], widths: &[usize], output: &mut String) {
    for (cell, width) in cells.iter().zip(widths) {
        output.push_str(&format!("{VERTICAL_SEP} {cell:<width$} "));
    }
    output.push_str(VERTICAL_SEP);
    output.push('\n');
}

/// Result of formatting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Printable {
    Rows(RowList),
    Composed(Vec<Printable>),
    Empty,
}

impl Printable {
    /// True when there is not a single row anywhere inside.
    pub fn is_empty(&self) -> bool {
        match self {
            Printable::Rows(rows) => rows.is_empty(),
            Printable::Composed(parts) => parts.iter().all(Printable::is_empty),
            Printable::Empty => true,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Printable::Rows(rows) => rows.render(),
            Printable::Composed(parts) if !parts.is_empty() => {
                parts.iter().map(Printable::render).collect()
            }
            Printable::Composed(_) | Printable::Empty => EMPTY_OUTPUT_MESSAGE.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Printable::Rows(rows) => json!({
                "header": rows.header(),
                "rows": rows.rows(),
            }),
            Printable::Composed(parts) => {
                Value::Array(parts.iter().map(Printable::to_json).collect())
            }
            Printable::Empty => Value::Null,
        }
    }
}

impl From<RowList> for Printable {
    fn from(rows: RowList) -> Self {
        Printable::Rows(rows)
    }
}
