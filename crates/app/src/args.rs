//! Command-line interface for splitbook.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// splitbook: categorize a bank CSV export into an expense report.
///
/// Each transaction is filed under a sub-category by keyword, and whatever no keyword
/// matches is asked about on the console. The result is a side-by-side table with one
/// Description/Amount column pair per Expenses sub-category and a totals row. A
/// shared-expense sheet can then be merged in, replacing matched amounts with your share.
#[derive(Debug, Parser, Clone)]
#[command(name = "splitbook", version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Categorize a transactions CSV and write the report.
    Categorize(CategorizeArgs),
    /// Parse a transactions CSV (and optionally a shared-expense CSV) and print the records as JSON.
    Parse(ParseArgs),
    /// Manage the named category lists kept in the local database.
    Lists(ListsArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, global = true, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The category-list database. Defaults to splitbook.db in the platform data directory.
    #[arg(long, global = true, env = "SPLITBOOK_DB")]
    db: Option<PathBuf>,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn db(&self) -> Option<&Path> {
        self.db.as_deref()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct CategorizeArgs {
    /// The bank export: a header row, then one transaction per line.
    file: PathBuf,

    /// A shared-expense CSV to merge into the report.
    #[arg(long)]
    shared: Option<PathBuf>,

    /// Where to write the report. Defaults to categorized_output_<timestamp>.<format>.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// A categories file (.json or .toml). Takes precedence over --list.
    #[arg(long)]
    categories: Option<PathBuf>,

    /// The name of a stored category list.
    #[arg(long)]
    list: Option<String>,

    /// A TOML file of split rules to use instead of the built-in ones.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Drop unmatched transactions instead of asking for a category.
    #[arg(long)]
    non_interactive: bool,

    /// Re-sum the totals row after merging shared expenses.
    #[arg(long)]
    recompute_totals: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

impl CategorizeArgs {
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn shared(&self) -> Option<&Path> {
        self.shared.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn categories(&self) -> Option<&Path> {
        self.categories.as_deref()
    }

    pub fn list(&self) -> Option<&str> {
        self.list.as_deref()
    }

    pub fn rules(&self) -> Option<&Path> {
        self.rules.as_deref()
    }

    pub fn non_interactive(&self) -> bool {
        self.non_interactive
    }

    pub fn recompute_totals(&self) -> bool {
        self.recompute_totals
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ParseArgs {
    /// The bank export to parse.
    file: PathBuf,

    /// A shared-expense CSV to parse alongside it.
    #[arg(long)]
    shared: Option<PathBuf>,
}

impl ParseArgs {
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn shared(&self) -> Option<&Path> {
        self.shared.as_deref()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ListsArgs {
    #[command(subcommand)]
    command: ListsCommand,
}

impl ListsArgs {
    pub fn command(&self) -> &ListsCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ListsCommand {
    /// List the stored category lists.
    Ls,
    /// List the stored lists whose name contains QUERY, ignoring case.
    Search { query: String },
    /// Print a stored list's categories as JSON.
    Show { name: String },
    /// Store the categories in FILE under NAME, replacing any list with that name.
    Save {
        name: String,
        file: PathBuf,
        /// Also make this the default list.
        #[arg(long)]
        default: bool,
    },
    /// Delete a stored list. The default list cannot be deleted.
    Delete { name: String },
    /// Make a stored list the default.
    SetDefault { name: String },
    /// Store the built-in categories as the default list if no list is the default.
    Seed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorize_defaults() {
        let args = Args::try_parse_from(["splitbook", "categorize", "bank.csv"]).unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
        match args.command() {
            Command::Categorize(c) => {
                assert_eq!(c.file(), Path::new("bank.csv"));
                assert_eq!(c.format(), OutputFormat::Csv);
                assert!(!c.non_interactive());
                assert!(c.output().is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn categorize_with_everything() {
        let args = Args::try_parse_from([
            "splitbook",
            "categorize",
            "bank.csv",
            "--shared",
            "shared.csv",
            "-o",
            "out.json",
            "--list",
            "Household",
            "--non-interactive",
            "--recompute-totals",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        let Command::Categorize(c) = args.command() else {
            panic!("expected categorize");
        };
        assert_eq!(c.shared(), Some(Path::new("shared.csv")));
        assert_eq!(c.output(), Some(Path::new("out.json")));
        assert_eq!(c.list(), Some("Household"));
        assert!(c.non_interactive());
        assert!(c.recompute_totals());
        assert_eq!(c.format(), OutputFormat::Json);
    }

    #[test]
    fn categories_file_and_list_can_both_be_given() {
        let args = Args::try_parse_from([
            "splitbook",
            "categorize",
            "bank.csv",
            "--categories",
            "cats.json",
            "--list",
            "Household",
        ])
        .unwrap();
        let Command::Categorize(c) = args.command() else {
            panic!("expected categorize");
        };
        assert_eq!(c.categories(), Some(Path::new("cats.json")));
        assert_eq!(c.list(), Some("Household"));
    }

    #[test]
    fn input_file_is_required() {
        assert!(Args::try_parse_from(["splitbook", "categorize"]).is_err());
    }

    #[test]
    fn lists_subcommands() {
        let args = Args::try_parse_from(["splitbook", "lists", "save", "Mine", "cats.toml", "--default"]).unwrap();
        let Command::Lists(l) = args.command() else {
            panic!("expected lists");
        };
        match l.command() {
            ListsCommand::Save { name, file, default } => {
                assert_eq!(name, "Mine");
                assert_eq!(file, Path::new("cats.toml"));
                assert!(default);
            }
            other => panic!("unexpected {other:?}"),
        }

        let args = Args::try_parse_from(["splitbook", "--db", "x.db", "lists", "set-default", "Mine"]).unwrap();
        assert_eq!(args.common().db(), Some(Path::new("x.db")));

        let args = Args::try_parse_from(["splitbook", "lists", "search", "house"]).unwrap();
        let Command::Lists(l) = args.command() else {
            panic!("expected lists");
        };
        assert!(matches!(l.command(), ListsCommand::Search { query } if query == "house"));
        assert!(Args::try_parse_from(["splitbook", "lists", "search"]).is_err());
    }
}
