use splitbook_core::{Money, SharedTransaction, Transaction};
use thiserror::Error;
use tracing::{debug, warn};

pub const DATE: &str = "date";
pub const DESCRIPTION: &str = "description";
pub const SUB_DESCRIPTION: &str = "sub-description";
pub const TYPE: &str = "type of transaction";
pub const AMOUNT: &str = "amount";
pub const BALANCE: &str = "balance";

/// Columns the strict parser refuses to run without.
const REQUIRED_COLUMNS: &[&str] = &[DESCRIPTION, AMOUNT];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CsvError {
    #[error("Empty input: the CSV has no non-blank lines")]
    EmptyInput,
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

/// How the transaction parser treats input it cannot use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Blank input and missing required columns are errors.
    #[default]
    Strict,
    /// Blank input yields no records; missing columns read as empty fields.
    Lenient,
}

/// Header positions, located by case-insensitive name.
#[derive(Debug, Default)]
struct HeaderIndex {
    date: Option<usize>,
    description: Option<usize>,
    sub_description: Option<usize>,
    kind: Option<usize>,
    amount: Option<usize>,
    balance: Option<usize>,
}

impl HeaderIndex {
    fn from_fields(fields: &[String]) -> Self {
        let find = |name: &str| fields.iter().position(|f| f.to_lowercase() == name);
        HeaderIndex {
            date: find(DATE),
            description: find(DESCRIPTION),
            sub_description: find(SUB_DESCRIPTION),
            kind: find(TYPE),
            amount: find(AMOUNT),
            balance: find(BALANCE),
        }
    }

    fn missing(&self) -> Option<&'static str> {
        REQUIRED_COLUMNS.iter().copied().find(|name| match *name {
            DESCRIPTION => self.description.is_none(),
            AMOUNT => self.amount.is_none(),
            _ => false,
        })
    }
}

/// Splits the text into trimmed, non-blank lines and each line on `,`.
/// Quotes carry no meaning beyond one optional pair around a field.
fn read_records(text: &str) -> Vec<Vec<String>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }
    let joined = lines.join("\n");

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(::csv::Trim::All)
        .from_reader(joined.as_bytes());

    let mut records = Vec::with_capacity(lines.len());
    for (line, result) in reader.records().enumerate() {
        match result {
            Ok(record) => records.push(record.iter().map(unquote).collect()),
            Err(e) => warn!("Skipping unreadable CSV line {}: {e}", line + 1),
        }
    }
    records
}

fn unquote(field: &str) -> String {
    let field = field.strip_prefix('"').unwrap_or(field);
    let field = field.strip_suffix('"').unwrap_or(field);
    field.to_string()
}

fn field(record: &[String], col: Option<usize>) -> String {
    col.and_then(|i| record.get(i)).cloned().unwrap_or_default()
}

fn parse_amount(raw: &str, line: usize) -> Money {
    Money::parse(raw).unwrap_or_else(|| {
        debug!("Line {line}: amount '{raw}' is not a number, using 0");
        Money::zero()
    })
}

/// Parses a bank export whose first non-blank line is a header row.
pub fn parse_transactions(text: &str, mode: ParseMode) -> Result<Vec<Transaction>, CsvError> {
    let records = read_records(text);
    let Some((header, rows)) = records.split_first() else {
        return match mode {
            ParseMode::Strict => Err(CsvError::EmptyInput),
            ParseMode::Lenient => Ok(Vec::new()),
        };
    };

    let index = HeaderIndex::from_fields(header);
    if mode == ParseMode::Strict {
        if let Some(name) = index.missing() {
            return Err(CsvError::MissingColumn(name.to_string()));
        }
    }

    let transactions = rows
        .iter()
        .enumerate()
        .map(|(i, record)| Transaction {
            date: field(record, index.date),
            description: field(record, index.description),
            sub_description: field(record, index.sub_description),
            kind: field(record, index.kind),
            amount: parse_amount(&field(record, index.amount), i + 2),
            balance: Money::parse(&field(record, index.balance)),
        })
        .collect();

    Ok(transactions)
}

/// Like [`parse_transactions`] in lenient mode, which cannot fail.
pub fn parse_transactions_lenient(text: &str) -> Vec<Transaction> {
    parse_transactions(text, ParseMode::Lenient).unwrap_or_default()
}

/// Parses a shared-expense sheet: a header line (ignored), then positional
/// `date, expense, description, total, brandon` columns.
pub fn parse_shared(text: &str) -> Vec<SharedTransaction> {
    let records = read_records(text);
    if records.len() <= 1 {
        return Vec::new();
    }

    records[1..]
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let line = i + 2;
            SharedTransaction {
                expense: field(record, Some(1)).to_lowercase(),
                description: field(record, Some(2)),
                total: parse_amount(&field(record, Some(3)), line),
                brandon: parse_amount(&field(record, Some(4)), line),
            }
        })
        .collect()
}
