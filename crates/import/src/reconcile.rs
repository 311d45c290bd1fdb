use splitbook_core::{Cell, OutputRow, Report, SharedTransaction};
use tracing::{debug, info};

/// Column used when a shared expense's hint names no known sub-category.
const FALLBACK_COLUMN: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Overwrote the cell pair at `(row, description column)`.
    Matched { row: usize, column: usize },
    /// Inserted a new row above the totals, in the given description column.
    Inserted { column: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub matched: usize,
    pub inserted: usize,
}

pub struct SharedExpenseReconciler;

impl SharedExpenseReconciler {
    /// Merges `shared` into `report` in input order.
    ///
    /// Only text Amount cells are compared; numeric cells are never matched.
    /// Only the body rows present on entry are scanned; rows inserted by this call
    /// are not matched against. Not idempotent: running it twice with the same input
    /// can re-match the cells it just wrote or insert duplicate rows. The totals row
    /// is left as it was.
    pub fn reconcile(report: &mut Report, shared: &[SharedTransaction]) -> ReconcileSummary {
        let columns: Vec<(String, usize)> = report
            .columns()
            .into_iter()
            .map(|(name, i)| (name.to_lowercase(), i))
            .collect();
        let width = report.header().map_or(0, Vec::len);
        let scanned = report.body().len();

        let mut summary = ReconcileSummary::default();
        for item in shared {
            match Self::apply(report, &columns, width, scanned, item) {
                Outcome::Matched { row, column } => {
                    debug!("'{}' matched row {row}, column {column}", item.description);
                    summary.matched += 1;
                }
                Outcome::Inserted { column } => {
                    debug!("'{}' inserted in column {column}", item.description);
                    summary.inserted += 1;
                }
            }
        }

        info!(
            "Reconciled {} shared expenses: {} matched, {} inserted",
            shared.len(),
            summary.matched,
            summary.inserted
        );
        summary
    }

    fn apply(
        report: &mut Report,
        columns: &[(String, usize)],
        width: usize,
        scanned: usize,
        item: &SharedTransaction,
    ) -> Outcome {
        let replacement = Cell::Text(item.brandon.to_cell());

        for (r, row) in report.body_mut().iter_mut().take(scanned).enumerate() {
            let hit = (2..row.len()).step_by(2).find(|&i| {
                row[i].as_text().is_some()
                    && row[i].amount().is_some_and(|a| a.within_cent(item.total))
            });
            if let Some(i) = hit {
                row[i - 1] = Cell::from(item.description.as_str());
                row[i] = replacement;
                return Outcome::Matched {
                    row: r + splitbook_core::HEADER_ROWS,
                    column: i - 1,
                };
            }
        }

        let target = columns
            .iter()
            .find(|(name, _)| *name == item.expense.to_lowercase())
            .map_or(FALLBACK_COLUMN, |(_, i)| *i);

        let mut row: OutputRow = vec![Cell::blank()];
        for i in (1..width).step_by(2) {
            if i == target {
                row.extend([Cell::from(item.description.as_str()), replacement.clone()]);
            } else {
                row.extend([Cell::blank(), Cell::blank()]);
            }
        }
        report.insert_before_totals(row);
        Outcome::Inserted { column: target }
    }
}
