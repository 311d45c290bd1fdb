use serde::{Deserialize, Serialize};

use super::money::Money;

/// One row of a bank CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub date: String,
    pub description: String,
    pub sub_description: String,
    /// "Debit" / "Credit" as printed by the bank.
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Money,
    /// `None` when the export had no usable balance, which is not the same as a zero balance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Money>,
}

impl Transaction {
    pub fn new(description: impl Into<String>, sub_description: impl Into<String>, amount: Money) -> Self {
        Transaction {
            date: String::new(),
            description: description.into(),
            sub_description: sub_description.into(),
            kind: String::new(),
            amount,
            balance: None,
        }
    }

    /// The text a person sees when asked to pick a category: `"<sub> <desc>"`.
    pub fn prompt_text(&self) -> String {
        format!("{} {}", self.sub_description, self.description)
    }

    /// The description written into report cells: `"<desc> <sub>"`.
    pub fn entry_text(&self) -> String {
        format!("{} {}", self.description, self.sub_description)
    }
}

/// An externally tracked shared expense, to be merged into a finished report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedTransaction {
    pub description: String,
    /// Amount expected to match an existing report entry.
    pub total: Money,
    /// One party's share; replaces the matched amount.
    pub brandon: Money,
    /// Lower-cased sub-category hint.
    pub expense: String,
}
