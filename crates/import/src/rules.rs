//! Pre-match rules run before keyword search. A rule that fires decides the
//! transaction's placement outright, possibly splitting it across several
//! sub-categories.

use serde::{Deserialize, Serialize};
use splitbook_core::{Money, Transaction, EXPENSES};
use thiserror::Error;

use crate::report::Entry;
use crate::util::normalize;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Rule '{0}' must have exactly one remainder part (a part without an amount)")]
    Remainder(String),
}

/// Where one entry produced by a rule is filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub main: String,
    pub sub: String,
    pub entry: Entry,
}

pub trait PreMatchRule: Send + Sync {
    fn name(&self) -> &str;

    /// `Some` when the rule claims the transaction.
    fn apply(&self, tx: &Transaction) -> Option<Vec<Placement>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPart {
    #[serde(default = "default_main")]
    pub main: String,
    pub sub: String,
    pub description: String,
    /// Fixed amount for this part; the single part without one takes what is left.
    #[serde(default)]
    pub amount: Option<Money>,
}

fn default_main() -> String {
    EXPENSES.to_string()
}

/// Splits one recurring bill into fixed parts when both the sub-description
/// keyword and the exact amount match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRule {
    pub name: String,
    pub sub_description_contains: String,
    pub amount_equals: Money,
    pub parts: Vec<SplitPart>,
}

impl SplitRule {
    fn validate(&self) -> Result<(), RuleError> {
        let remainders = self.parts.iter().filter(|p| p.amount.is_none()).count();
        if remainders == 1 {
            Ok(())
        } else {
            Err(RuleError::Remainder(self.name.clone()))
        }
    }

    fn matches(&self, tx: &Transaction) -> bool {
        let needle = normalize(&self.sub_description_contains);
        !needle.is_empty()
            && tx.amount == self.amount_equals
            && normalize(&tx.sub_description).contains(&needle)
    }
}

impl PreMatchRule for SplitRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, tx: &Transaction) -> Option<Vec<Placement>> {
        if !self.matches(tx) {
            return None;
        }
        let fixed: Money = self.parts.iter().filter_map(|p| p.amount).sum();
        let placements = self
            .parts
            .iter()
            .map(|p| Placement {
                main: p.main.clone(),
                sub: p.sub.clone(),
                entry: Entry {
                    description: p.description.clone(),
                    amount: p.amount.unwrap_or(tx.amount - fixed),
                },
            })
            .collect();
        Some(placements)
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<SplitRule>,
}

/// Parses `[[rule]]` tables.
pub fn from_toml(content: &str) -> Result<Vec<SplitRule>, RuleError> {
    let file: RuleFile = toml::from_str(content)?;
    for rule in &file.rule {
        rule.validate()?;
    }
    Ok(file.rule)
}

/// The Virgin Plus bundle: $153.34 is $60.16 of internet + TV, the rest is the phone.
pub fn virgin_plus() -> SplitRule {
    SplitRule {
        name: "virgin plus bundle".to_string(),
        sub_description_contains: "virgin plus".to_string(),
        amount_equals: Money::from_cents(-15334),
        parts: vec![
            SplitPart {
                main: EXPENSES.to_string(),
                sub: "Living Expenses".to_string(),
                description: "Internet + TV".to_string(),
                amount: Some(Money::from_cents(-6016)),
            },
            SplitPart {
                main: EXPENSES.to_string(),
                sub: "Phone Bill".to_string(),
                description: "Phone Bill".to_string(),
                amount: None,
            },
        ],
    }
}

pub fn builtin() -> Vec<Box<dyn PreMatchRule>> {
    vec![Box::new(virgin_plus())]
}
