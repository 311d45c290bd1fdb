use serde::Serialize;
use splitbook_core::{Categories, Cell, Money, OutputRow, Report, EXPENSES};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Categories have no '{0}' main category to lay out the report")]
    MissingMainCategory(String),
}

/// One classified line: what goes into a Description/Amount cell pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub description: String,
    pub amount: Money,
}

/// main category → sub-category → entries, in classification order.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedBuckets {
    buckets: HashMap<String, HashMap<String, Vec<Entry>>>,
}

impl ClassifiedBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, main: &str, sub: &str, entry: Entry) {
        self.buckets
            .entry(main.to_string())
            .or_default()
            .entry(sub.to_string())
            .or_default()
            .push(entry);
    }

    pub fn entries(&self, main: &str, sub: &str) -> &[Entry] {
        self.buckets
            .get(main)
            .and_then(|subs| subs.get(sub))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total(&self, main: &str, sub: &str) -> Money {
        self.entries(main, sub).iter().map(|e| e.amount).sum()
    }

    /// Number of entries filed under `main`, across all its sub-categories.
    pub fn count(&self, main: &str) -> usize {
        self.buckets
            .get(main)
            .map_or(0, |subs| subs.values().map(Vec::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(|subs| subs.values().all(Vec::is_empty))
    }
}

pub struct ReportBuilder;

impl ReportBuilder {
    /// Lays out the Expenses sub-categories as column pairs. Buckets under any
    /// other main category are not rendered.
    pub fn build(buckets: &ClassifiedBuckets, categories: &Categories) -> Result<Report, ReportError> {
        let expenses = categories
            .expenses()
            .ok_or_else(|| ReportError::MissingMainCategory(EXPENSES.to_string()))?;
        let subs: Vec<&str> = expenses.sub_names().collect();

        let mut header: OutputRow = vec![Cell::from(EXPENSES)];
        let mut labels: OutputRow = vec![Cell::blank()];
        for sub in &subs {
            header.extend([Cell::from(*sub), Cell::blank()]);
            labels.extend([Cell::from("Description"), Cell::from("Amount")]);
        }

        let mut rows = vec![header, labels];

        let depth = subs
            .iter()
            .map(|sub| buckets.entries(EXPENSES, sub).len())
            .max()
            .unwrap_or(0);

        for i in 0..depth {
            let mut row: OutputRow = vec![Cell::blank()];
            for sub in &subs {
                match buckets.entries(EXPENSES, sub).get(i) {
                    Some(entry) => row.extend([
                        Cell::from(entry.description.as_str()),
                        Cell::Text(entry.amount.to_cell()),
                    ]),
                    None => row.extend([Cell::blank(), Cell::blank()]),
                }
            }
            rows.push(row);
        }

        let mut totals: OutputRow = vec![Cell::from("Total")];
        for sub in &subs {
            totals.extend([
                Cell::blank(),
                Cell::Text(buckets.total(EXPENSES, sub).to_total_cell()),
            ]);
        }
        rows.push(totals);

        Ok(Report::from_rows(rows))
    }
}
