use splitbook_core::{Categories, Transaction, EXPENSES};
use tracing::{debug, info, warn};

use crate::report::{ClassifiedBuckets, Entry};
use crate::resolver::CategoryResolver;
use crate::rules::{self, Placement, PreMatchRule};
use crate::util::normalize;

/// Transactions whose raw description carries this marker are internal records, not spending.
const INTERNAL_MARKER: &str = "date=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A pre-match rule placed the transaction, possibly as several entries.
    Ruled(Vec<Placement>),
    /// First keyword hit in taxonomy order.
    Keyword { main: String, sub: String },
    Unmatched,
}

/// Counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    pub ruled: usize,
    pub keyword: usize,
    pub resolved: usize,
    pub skipped: usize,
    pub dropped: usize,
}

/// Keywords normalized once per taxonomy.
struct CompiledSub {
    main: String,
    sub: String,
    keywords: Vec<String>,
}

pub struct CategoryMatcher<'a> {
    categories: &'a Categories,
    compiled: Vec<CompiledSub>,
    rules: Vec<Box<dyn PreMatchRule>>,
}

impl<'a> CategoryMatcher<'a> {
    /// A matcher with the built-in pre-match rules.
    pub fn new(categories: &'a Categories) -> Self {
        Self::with_rules(categories, rules::builtin())
    }

    pub fn with_rules(categories: &'a Categories, rules: Vec<Box<dyn PreMatchRule>>) -> Self {
        let compiled = categories
            .mains()
            .iter()
            .flat_map(|main| {
                main.subs.iter().map(move |sub| CompiledSub {
                    main: main.name.clone(),
                    sub: sub.name.clone(),
                    keywords: sub
                        .keywords
                        .iter()
                        .map(|k| normalize(k))
                        .collect(),
                })
            })
            .collect();
        Self {
            categories,
            compiled,
            rules,
        }
    }

    pub fn classify(&self, tx: &Transaction) -> Classification {
        for rule in &self.rules {
            if let Some(placements) = rule.apply(tx) {
                debug!("Rule '{}' claimed '{}'", rule.name(), tx.entry_text());
                return Classification::Ruled(placements);
            }
        }

        let haystack = normalize(&tx.prompt_text());
        self.compiled
            .iter()
            .find(|c| c.keywords.iter().any(|k| haystack.contains(k.as_str())))
            .map_or(Classification::Unmatched, |c| Classification::Keyword {
                main: c.main.clone(),
                sub: c.sub.clone(),
            })
    }

    /// Classifies a batch into buckets, asking `resolver` about anything unmatched.
    pub fn classify_all<R>(
        &self,
        transactions: &[Transaction],
        resolver: &mut R,
    ) -> (ClassifiedBuckets, ClassifySummary)
    where
        R: CategoryResolver + ?Sized,
    {
        let mut buckets = ClassifiedBuckets::new();
        let mut summary = ClassifySummary::default();

        for tx in transactions {
            match self.classify(tx) {
                Classification::Ruled(placements) => {
                    for p in placements {
                        buckets.push(&p.main, &p.sub, p.entry);
                    }
                    summary.ruled += 1;
                }
                Classification::Keyword { main, sub } => {
                    buckets.push(&main, &sub, entry_for(tx));
                    summary.keyword += 1;
                }
                Classification::Unmatched => {
                    if tx.description.contains(INTERNAL_MARKER) {
                        debug!("Skipping internal record '{}'", tx.description);
                        summary.skipped += 1;
                        continue;
                    }
                    let label = resolver.resolve(&tx.prompt_text());
                    let known = self
                        .categories
                        .expenses()
                        .is_some_and(|e| e.sub(&label).is_some());
                    if known {
                        buckets.push(EXPENSES, &label, entry_for(tx));
                        summary.resolved += 1;
                    } else {
                        warn!(
                            "Unknown category input: \"{label}\". Transaction '{}' skipped.",
                            tx.entry_text()
                        );
                        summary.dropped += 1;
                    }
                }
            }
        }

        info!(
            "Classified {} transactions: {} by rule, {} by keyword, {} resolved, {} skipped, {} dropped",
            transactions.len(),
            summary.ruled,
            summary.keyword,
            summary.resolved,
            summary.skipped,
            summary.dropped
        );
        (buckets, summary)
    }
}

fn entry_for(tx: &Transaction) -> Entry {
    Entry {
        description: tx.entry_text(),
        amount: tx.amount,
    }
}
