use chrono::{DateTime, Utc};
use serde::Serialize;
use splitbook_core::Categories;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

/// Name of the list seeded into a store without a default.
pub const DEFAULT_LIST_NAME: &str = "Default Categories";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored categories are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("A category list named '{0}' already exists")]
    DuplicateName(String),
    #[error("Category list not found: {0}")]
    NotFound(String),
    #[error("Cannot delete the default category list '{0}'")]
    DefaultListProtected(String),
}

/// A named taxonomy kept in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryList {
    pub id: i64,
    pub name: String,
    pub categories: Categories,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type ListRow = (i64, String, String, bool, DateTime<Utc>, DateTime<Utc>);

const SELECT_LIST: &str =
    "SELECT id, name, categories, is_default, created_at, updated_at FROM category_lists";

impl TryFrom<ListRow> for CategoryList {
    type Error = StorageError;

    fn try_from(r: ListRow) -> Result<Self, Self::Error> {
        Ok(CategoryList {
            id: r.0,
            name: r.1,
            categories: serde_json::from_str(&r.2)?,
            is_default: r.3,
            created_at: r.4,
            updated_at: r.5,
        })
    }
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS category_lists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            categories TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Stores a new list. Fails with [`StorageError::DuplicateName`] if the name is taken.
pub async fn create_category_list(
    pool: &DbPool,
    name: &str,
    categories: &Categories,
    is_default: bool,
) -> Result<CategoryList, StorageError> {
    if get_category_list_by_name(pool, name).await?.is_some() {
        return Err(StorageError::DuplicateName(name.to_string()));
    }

    let json = serde_json::to_string(categories)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;
    if is_default {
        sqlx::query("UPDATE category_lists SET is_default = 0 WHERE is_default = 1")
            .execute(&mut *tx)
            .await?;
    }
    let id = sqlx::query(
        "INSERT INTO category_lists (name, categories, is_default, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(&json)
    .bind(is_default)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();
    tx.commit().await?;

    Ok(CategoryList {
        id,
        name: name.to_string(),
        categories: categories.clone(),
        is_default,
        created_at: now,
        updated_at: now,
    })
}

/// Renames and/or replaces the taxonomy of list `id`.
pub async fn update_category_list(
    pool: &DbPool,
    id: i64,
    name: Option<&str>,
    categories: Option<&Categories>,
) -> Result<CategoryList, StorageError> {
    let mut list = get_category_list(pool, id)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("id {id}")))?;

    if let Some(name) = name {
        if name != list.name {
            if get_category_list_by_name(pool, name).await?.is_some() {
                return Err(StorageError::DuplicateName(name.to_string()));
            }
            list.name = name.to_string();
        }
    }
    if let Some(categories) = categories {
        list.categories = categories.clone();
    }
    list.updated_at = Utc::now();

    sqlx::query("UPDATE category_lists SET name = ?, categories = ?, updated_at = ? WHERE id = ?")
        .bind(&list.name)
        .bind(serde_json::to_string(&list.categories)?)
        .bind(list.updated_at)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(list)
}

pub async fn get_category_list(pool: &DbPool, id: i64) -> Result<Option<CategoryList>, StorageError> {
    let row = sqlx::query_as::<_, ListRow>(&format!("{SELECT_LIST} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(CategoryList::try_from).transpose()
}

pub async fn get_category_list_by_name(
    pool: &DbPool,
    name: &str,
) -> Result<Option<CategoryList>, StorageError> {
    let row = sqlx::query_as::<_, ListRow>(&format!("{SELECT_LIST} WHERE name = ?"))
        .bind(name)
        .fetch_optional(pool)
        .await?;
    row.map(CategoryList::try_from).transpose()
}

pub async fn get_default_category_list(pool: &DbPool) -> Result<Option<CategoryList>, StorageError> {
    let row = sqlx::query_as::<_, ListRow>(&format!("{SELECT_LIST} WHERE is_default = 1 LIMIT 1"))
        .fetch_optional(pool)
        .await?;
    row.map(CategoryList::try_from).transpose()
}

pub async fn get_all_category_lists(pool: &DbPool) -> Result<Vec<CategoryList>, StorageError> {
    let rows = sqlx::query_as::<_, ListRow>(&format!("{SELECT_LIST} ORDER BY name"))
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(CategoryList::try_from).collect()
}

/// Returns whether a list was removed. The default list cannot be deleted.
pub async fn delete_category_list(pool: &DbPool, id: i64) -> Result<bool, StorageError> {
    match get_category_list(pool, id).await? {
        None => return Ok(false),
        Some(list) if list.is_default => return Err(StorageError::DefaultListProtected(list.name)),
        Some(_) => {}
    }
    let result = sqlx::query("DELETE FROM category_lists WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Marks list `id` as the default and clears the flag everywhere else.
pub async fn set_default_category_list(pool: &DbPool, id: i64) -> Result<CategoryList, StorageError> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE category_lists SET is_default = 0 WHERE is_default = 1")
        .execute(&mut *tx)
        .await?;
    let updated = sqlx::query("UPDATE category_lists SET is_default = 1, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if updated == 0 {
        tx.rollback().await?;
        return Err(StorageError::NotFound(format!("id {id}")));
    }
    tx.commit().await?;

    get_category_list(pool, id)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("id {id}")))
}

/// Case-insensitive substring search on list names, sorted by name.
pub async fn search_category_lists(pool: &DbPool, query: &str) -> Result<Vec<CategoryList>, StorageError> {
    // SQLite's LIKE ignores ASCII case.
    let pattern = format!("%{}%", escape_like(query));
    let rows = sqlx::query_as::<_, ListRow>(&format!(
        "{SELECT_LIST} WHERE name LIKE ? ESCAPE '\\' ORDER BY name"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(CategoryList::try_from).collect()
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Seeds the built-in taxonomy as the default list when no list is the default.
/// A non-default list already named [`DEFAULT_LIST_NAME`] is promoted instead.
/// Returns the new default, or `None` if the store already had one.
pub async fn seed_default_category_list(pool: &DbPool) -> Result<Option<CategoryList>, StorageError> {
    if get_default_category_list(pool).await?.is_some() {
        return Ok(None);
    }
    if let Some(existing) = get_category_list_by_name(pool, DEFAULT_LIST_NAME).await? {
        return set_default_category_list(pool, existing.id).await.map(Some);
    }
    create_category_list(pool, DEFAULT_LIST_NAME, &Categories::builtin(), true)
        .await
        .map(Some)
}
