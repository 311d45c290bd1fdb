use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use splitbook_core::{Categories, Report};
use splitbook_import::{engine, rules, CategoryResolver, ConsoleResolver, NoResolver, PreMatchRule};
use splitbook_storage::{self as storage, CategoryList, DbPool};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::args::{CategorizeArgs, Common, ListsCommand, OutputFormat, ParseArgs};
use crate::table;

pub fn default_db_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "splitbook", "splitbook")
        .context("Could not determine the platform data directory")?;
    Ok(dirs.data_dir().join("splitbook.db"))
}

fn db_path(common: &Common) -> Result<PathBuf> {
    match common.db() {
        Some(path) => Ok(path.to_path_buf()),
        None => default_db_path(),
    }
}

async fn open_store(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create directory {}", parent.display()))?;
    }
    storage::create_db(path)
        .await
        .with_context(|| format!("Could not open database {}", path.display()))
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))
}

/// `categorize`: parse, classify, optionally reconcile, then write and print the report.
pub async fn categorize(common: &Common, args: &CategorizeArgs) -> Result<()> {
    let text = read_input(args.file())?;
    let transactions = engine::parse_transactions(&text)
        .with_context(|| format!("Could not parse {}", args.file().display()))?;
    info!(
        "Parsed {} transactions from {}",
        transactions.len(),
        args.file().display()
    );

    let categories = select_categories(args.categories(), args.list(), &db_path(common)?).await?;
    let rules = load_rules(args.rules())?;

    let mut resolver: Box<dyn CategoryResolver> = if args.non_interactive() {
        Box::new(NoResolver)
    } else {
        Box::new(ConsoleResolver::stdio())
    };
    let mut report =
        engine::categorize_with_rules(&transactions, &categories, rules, resolver.as_mut())?;

    if let Some(path) = args.shared() {
        let shared = engine::parse_shared(&read_input(path)?);
        info!("Parsed {} shared expenses from {}", shared.len(), path.display());
        report = engine::reconcile(report, &shared);
    }
    if args.recompute_totals() {
        report.recompute_totals();
    }

    let output = args
        .output()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(args.format()));
    std::fs::write(&output, render(&report, args.format())?)
        .with_context(|| format!("Could not write {}", output.display()))?;
    info!("Wrote {} rows to {}", report.len(), output.display());

    print!("{}", table::render(&report));
    Ok(())
}

/// `--categories` file, then `--list` by name, then the stored default, then the built-in set.
pub async fn select_categories(
    file: Option<&Path>,
    list: Option<&str>,
    db: &Path,
) -> Result<Categories> {
    if let Some(path) = file {
        debug!("Loading categories from {}", path.display());
        return Categories::load(path)
            .with_context(|| format!("Could not load categories from {}", path.display()));
    }

    if let Some(name) = list {
        let pool = open_store(db).await?;
        return Ok(find_list(&pool, name).await?.categories);
    }

    if db.exists() {
        let pool = open_store(db).await?;
        if let Some(stored) = storage::get_default_category_list(&pool).await? {
            debug!("Using default category list '{}'", stored.name);
            return Ok(stored.categories);
        }
    }

    debug!("Using built-in categories");
    Ok(Categories::builtin())
}

fn load_rules(path: Option<&Path>) -> Result<Vec<Box<dyn PreMatchRule>>> {
    let Some(path) = path else {
        return Ok(rules::builtin());
    };
    let loaded = rules::from_toml(&read_input(path)?)
        .with_context(|| format!("Could not load split rules from {}", path.display()))?;
    info!("Loaded {} split rules from {}", loaded.len(), path.display());
    Ok(loaded
        .into_iter()
        .map(|r| Box::new(r) as Box<dyn PreMatchRule>)
        .collect())
}

pub fn default_output_path(format: OutputFormat) -> PathBuf {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    PathBuf::from(format!("categorized_output_{stamp}.{}", format.extension()))
}

fn render(report: &Report, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Csv => report.to_csv()?,
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    })
}

/// `parse`: print the parsed records as JSON without categorizing them.
pub fn parse(args: &ParseArgs) -> Result<()> {
    let transactions = engine::parse_transactions_lenient(&read_input(args.file())?);
    let count = transactions.len();
    let mut out = json!({ "transactions": transactions, "count": count });

    if let Some(path) = args.shared() {
        let shared = engine::parse_shared(&read_input(path)?);
        let shared_count = shared.len();
        out["shared"] = json!(shared);
        out["sharedCount"] = json!(shared_count);
    }

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn find_list(pool: &DbPool, name: &str) -> Result<CategoryList> {
    storage::get_category_list_by_name(pool, name)
        .await?
        .with_context(|| format!("No category list named '{name}'"))
}

fn print_lists(lists: &[CategoryList]) {
    for list in lists {
        let marker = if list.is_default { "*" } else { " " };
        println!(
            "{marker} {:>4}  {}  (updated {})",
            list.id,
            list.name,
            list.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
}

/// `lists ...`: manage stored category lists.
pub async fn lists(common: &Common, command: &ListsCommand) -> Result<()> {
    let pool = open_store(&db_path(common)?).await?;

    match command {
        ListsCommand::Ls => print_lists(&storage::get_all_category_lists(&pool).await?),
        ListsCommand::Search { query } => {
            let found = storage::search_category_lists(&pool, query).await?;
            if found.is_empty() {
                info!("No category list name contains '{query}'");
            }
            print_lists(&found);
        }
        ListsCommand::Show { name } => {
            let list = find_list(&pool, name).await?;
            println!("{}", list.categories.to_json()?);
        }
        ListsCommand::Save {
            name,
            file,
            default,
        } => {
            let categories = Categories::load(file)
                .with_context(|| format!("Could not load categories from {}", file.display()))?;
            let saved = match storage::get_category_list_by_name(&pool, name).await? {
                Some(existing) => {
                    storage::update_category_list(&pool, existing.id, None, Some(&categories))
                        .await?
                }
                None => storage::create_category_list(&pool, name, &categories, false).await?,
            };
            if *default {
                storage::set_default_category_list(&pool, saved.id).await?;
            }
            info!("Saved category list '{}' (id {})", saved.name, saved.id);
        }
        ListsCommand::Delete { name } => {
            let list = find_list(&pool, name).await?;
            storage::delete_category_list(&pool, list.id).await?;
            info!("Deleted category list '{name}'");
        }
        ListsCommand::SetDefault { name } => {
            let list = find_list(&pool, name).await?;
            storage::set_default_category_list(&pool, list.id).await?;
            info!("'{name}' is now the default category list");
        }
        ListsCommand::Seed => match storage::seed_default_category_list(&pool).await? {
            Some(list) => info!("Seeded '{}' as the default category list", list.name),
            None => info!("The database already has a default category list; nothing seeded"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Args, Command};
    use clap::Parser;
    use splitbook_core::EXPENSES;

    const BANK: &str = "Date,Description,Sub-Description,Type of Transaction,Amount,Balance\n\
                        2024-01-01,Walmart,,Debit,-54.30,1000.00\n\
                        2024-01-02,Mystery Shop,,Debit,-5.00,995.00\n";

    fn categorize_args(argv: &[&str]) -> (Common, CategorizeArgs) {
        let args = Args::try_parse_from(argv).unwrap();
        match args.command() {
            Command::Categorize(c) => (args.common().clone(), c.clone()),
            other => panic!("unexpected {other:?}"),
        }
    }

    // ── select_categories ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn builtin_when_nothing_else_is_available() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("missing.db");
        let cats = select_categories(None, None, &db).await.unwrap();
        assert_eq!(cats, Categories::builtin());
        assert!(!db.exists());
    }

    #[tokio::test]
    async fn stored_default_beats_builtin_and_list_beats_default() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("lists.db");
        let pool = storage::create_db(&db).await.unwrap();
        let pets = Categories::new().with_main(EXPENSES, [("Pets", vec!["vet"])]);
        let gifts = Categories::new().with_main(EXPENSES, [("Gifts", vec!["card"])]);
        storage::create_category_list(&pool, "Pets only", &pets, true).await.unwrap();
        storage::create_category_list(&pool, "Gifts only", &gifts, false).await.unwrap();
        pool.close().await;

        assert_eq!(select_categories(None, None, &db).await.unwrap(), pets);
        assert_eq!(select_categories(None, Some("Gifts only"), &db).await.unwrap(), gifts);
        assert!(select_categories(None, Some("Nope"), &db).await.is_err());
    }

    #[tokio::test]
    async fn categories_file_beats_everything() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cats.toml");
        std::fs::write(&file, "[Expenses]\nBoats = [\"marina\"]\n").unwrap();
        let cats = select_categories(Some(&file), Some("ignored"), &dir.path().join("x.db"))
            .await
            .unwrap();
        assert_eq!(cats.expenses().unwrap().sub_names().collect::<Vec<_>>(), vec!["Boats"]);
    }

    // ── categorize ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn non_interactive_categorize_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("bank.csv");
        let out = dir.path().join("out.csv");
        std::fs::write(&bank, BANK).unwrap();
        let db = dir.path().join("none.db");

        let (common, args) = categorize_args(&[
            "splitbook",
            "--db",
            db.to_str().unwrap(),
            "categorize",
            bank.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--non-interactive",
        ]);
        categorize(&common, &args).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Expenses,Living Expenses,,Groceries,,"));
        assert!(lines[2].contains("Walmart ,$ -54.30"));
        assert!(!written.contains("Mystery"));
    }

    #[tokio::test]
    async fn shared_merge_and_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("bank.csv");
        let shared = dir.path().join("shared.csv");
        let out = dir.path().join("out.json");
        std::fs::write(&bank, BANK).unwrap();
        std::fs::write(
            &shared,
            "Date,Expense,Description,Total,Brandon\n2024-01-01,groceries,split groceries,-54.30,-27.15\n",
        )
        .unwrap();
        let db = dir.path().join("none.db");

        let (common, args) = categorize_args(&[
            "splitbook",
            "--db",
            db.to_str().unwrap(),
            "categorize",
            bank.to_str().unwrap(),
            "--shared",
            shared.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--non-interactive",
            "--recompute-totals",
            "--format",
            "json",
        ]);
        categorize(&common, &args).await.unwrap();

        let report: Report = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let groceries = report
            .columns()
            .into_iter()
            .find(|(n, _)| n == "Groceries")
            .map(|(_, i)| i)
            .unwrap();
        assert_eq!(report.rows()[2][groceries].to_string(), "split groceries");
        assert_eq!(report.rows()[2][groceries + 1].to_string(), "$ -27.15");
        assert_eq!(report.totals().unwrap()[groceries + 1].to_string(), "$ -27.15");
    }

    #[tokio::test]
    async fn empty_input_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("bank.csv");
        std::fs::write(&bank, "\n\n").unwrap();
        let (common, args) = categorize_args(&[
            "splitbook",
            "--db",
            dir.path().join("none.db").to_str().unwrap(),
            "categorize",
            bank.to_str().unwrap(),
            "--non-interactive",
        ]);
        assert!(categorize(&common, &args).await.is_err());
    }

    // ── lists ─────────────────────────────────────────────────────────────────

    async fn run_lists(argv: &[&str]) -> Result<()> {
        let args = Args::try_parse_from(argv).unwrap();
        match args.command() {
            Command::Lists(l) => lists(args.common(), l.command()).await,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn lists_seed_search_and_protected_delete() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("lists.db");
        let db = db.to_str().unwrap();

        run_lists(&["splitbook", "--db", db, "lists", "seed"]).await.unwrap();
        run_lists(&["splitbook", "--db", db, "lists", "search", "default"]).await.unwrap();

        let err = run_lists(&["splitbook", "--db", db, "lists", "delete", storage::DEFAULT_LIST_NAME])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<storage::StorageError>(),
            Some(storage::StorageError::DefaultListProtected(_))
        ));

        let pool = storage::create_db(Path::new(db)).await.unwrap();
        let found = storage::search_category_lists(&pool, "DEFAULT").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_default);
    }

    #[test]
    fn default_output_name_carries_timestamp_and_extension() {
        let path = default_output_path(OutputFormat::Csv);
        let name = path.to_str().unwrap();
        assert!(name.starts_with("categorized_output_20"));
        assert!(name.ends_with("Z.csv"));
        assert!(default_output_path(OutputFormat::Json)
            .to_str()
            .unwrap()
            .ends_with(".json"));
    }
}
