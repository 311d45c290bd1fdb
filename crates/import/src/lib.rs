pub mod csv;
pub mod matcher;
pub mod reconcile;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod util;

pub use self::csv::{CsvError, ParseMode};
pub use matcher::{CategoryMatcher, Classification, ClassifySummary};
pub use reconcile::{ReconcileSummary, SharedExpenseReconciler};
pub use report::{ClassifiedBuckets, Entry, ReportBuilder, ReportError};
pub use resolver::{CategoryResolver, ConsoleResolver, NoResolver};
pub use rules::{Placement, PreMatchRule, RuleError, SplitPart, SplitRule};

/// The engine's entry points: parse, categorize, reconcile.
pub mod engine {
    use splitbook_core::{Categories, Report, SharedTransaction, Transaction};

    use crate::*;

    /// Strict: blank input is an error.
    pub fn parse_transactions(text: &str) -> Result<Vec<Transaction>, CsvError> {
        crate::csv::parse_transactions(text, ParseMode::Strict)
    }

    /// Lenient: blank input is no transactions.
    pub fn parse_transactions_lenient(text: &str) -> Vec<Transaction> {
        crate::csv::parse_transactions_lenient(text)
    }

    pub fn parse_shared(text: &str) -> Vec<SharedTransaction> {
        crate::csv::parse_shared(text)
    }

    /// Classifies `transactions` with the built-in pre-match rules and lays out the report.
    pub fn categorize<R>(
        transactions: &[Transaction],
        categories: &Categories,
        resolver: &mut R,
    ) -> Result<Report, ReportError>
    where
        R: CategoryResolver + ?Sized,
    {
        categorize_with_rules(transactions, categories, rules::builtin(), resolver)
    }

    pub fn categorize_with_rules<R>(
        transactions: &[Transaction],
        categories: &Categories,
        rules: Vec<Box<dyn PreMatchRule>>,
        resolver: &mut R,
    ) -> Result<Report, ReportError>
    where
        R: CategoryResolver + ?Sized,
    {
        // Fail before prompting anyone if the report cannot be laid out.
        if categories.expenses().is_none() {
            return ReportBuilder::build(&ClassifiedBuckets::new(), categories);
        }
        let matcher = CategoryMatcher::with_rules(categories, rules);
        let (buckets, _) = matcher.classify_all(transactions, resolver);
        ReportBuilder::build(&buckets, categories)
    }

    /// Merges shared expenses into `report` in place and hands it back.
    pub fn reconcile(mut report: Report, shared: &[SharedTransaction]) -> Report {
        SharedExpenseReconciler::reconcile(&mut report, shared);
        report
    }
}
