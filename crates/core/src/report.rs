//! The spreadsheet-shaped report table.
//!
//! Layout, top to bottom:
//! - row 0: `["Expenses", sub1, "", sub2, "", ...]`
//! - row 1: `["", "Description", "Amount", ...]`
//! - body rows: `["", desc, "$ x.xx", ...]`, ragged columns left blank
//! - last row: `["Total", "", "$ x.xx" | "$ -", ...]`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::money::Money;

/// Rows before the first body row.
pub const HEADER_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
}

impl Cell {
    pub fn blank() -> Self {
        Cell::Text(String::new())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }

    /// Reads an amount back out of a cell. Text cells keep only digits, `.` and `-`
    /// before parsing, so `"$ -54.30"` reads as `-54.30`.
    pub fn amount(&self) -> Option<Money> {
        match self {
            Cell::Number(n) => Some(Money::new(*n)),
            Cell::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                    .collect();
                Decimal::from_str(&cleaned).ok().map(Money::new)
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

pub type OutputRow = Vec<Cell>;

/// An owned report table. Reconciliation mutates it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    rows: Vec<OutputRow>,
}

impl Report {
    pub fn from_rows(rows: Vec<OutputRow>) -> Self {
        Report { rows }
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&OutputRow> {
        self.rows.first()
    }

    pub fn totals(&self) -> Option<&OutputRow> {
        if self.rows.len() > HEADER_ROWS {
            self.rows.last()
        } else {
            None
        }
    }

    /// Sub-category names from the header row, paired with their Description column index.
    pub fn columns(&self) -> Vec<(String, usize)> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        (1..header.len())
            .step_by(2)
            .filter_map(|i| header[i].as_text().map(|name| (name.to_string(), i)))
            .collect()
    }

    /// Body rows only: no header rows, no totals row.
    pub fn body(&self) -> &[OutputRow] {
        let end = self.rows.len().saturating_sub(1);
        if end <= HEADER_ROWS {
            return &[];
        }
        &self.rows[HEADER_ROWS..end]
    }

    pub fn body_mut(&mut self) -> &mut [OutputRow] {
        let end = self.rows.len().saturating_sub(1);
        if end <= HEADER_ROWS {
            return &mut [];
        }
        &mut self.rows[HEADER_ROWS..end]
    }

    /// Inserts `row` directly above the totals row.
    pub fn insert_before_totals(&mut self, row: OutputRow) {
        let at = self.rows.len().saturating_sub(1);
        self.rows.insert(at, row);
    }

    /// Re-sums each Amount column over the body rows and rewrites the totals row.
    pub fn recompute_totals(&mut self) {
        let width = self.header().map_or(0, Vec::len);
        let mut sums = vec![Money::zero(); width];
        for row in self.body() {
            for i in (2..row.len().min(width)).step_by(2) {
                if let Some(amount) = row[i].amount() {
                    sums[i] = sums[i] + amount;
                }
            }
        }
        if self.rows.len() <= HEADER_ROWS {
            return;
        }
        if let Some(totals) = self.rows.last_mut() {
            for i in (2..width).step_by(2) {
                let cell = Cell::Text(sums[i].to_total_cell());
                match totals.get_mut(i) {
                    Some(slot) => *slot = cell,
                    None => totals.push(cell),
                }
            }
        }
    }

    /// Serializes as CSV; fields containing a comma are quoted.
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).trim_end_matches('\n').to_string())
    }
}
