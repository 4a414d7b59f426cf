//! Runtime schema discovery and additive provisioning.
//!
//! Deployments drift: some dish tables carry `recipe`, some `instructions`,
//! some `cal` instead of `calories`. Everything that writes asks the live
//! catalog first and only touches columns that exist.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::db::{Flavor, Pool, validate_identifier};
use crate::error::Result;
use crate::value::{Row, Value};

/// Lowercase column names of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnSet(BTreeSet<String>);

impl ColumnSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: &str) -> bool {
        self.0.insert(column.to_lowercase())
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(&column.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for column in iter {
            set.insert(column.as_ref());
        }
        set
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        f.write_str(&names.join(", "))
    }
}

/// Columns the live database has for `schema.table`.
///
/// A table that does not exist yields an empty set, not an error.
pub async fn discover_columns(pool: &Pool, schema: &str, table: &str) -> Result<ColumnSet> {
    validate_identifier(schema)?;
    validate_identifier(table)?;

    let (sql, values) = match pool.flavor() {
        Flavor::PostgreSql => (
            "SELECT column_name::text AS column_name FROM information_schema.columns \
             WHERE table_schema::text = ? AND table_name::text = ?",
            [Value::from(schema), Value::from(table)],
        ),
        Flavor::Sqlite => (
            "SELECT name AS column_name FROM pragma_table_info(?, ?)",
            [Value::from(table), Value::from(schema)],
        ),
    };

    let rows = pool.query(sql, &values).await?.rows;
    let columns: ColumnSet = rows
        .iter()
        .filter_map(|row: &Row| row.get("column_name").and_then(|v| v.as_str()))
        .collect();
    tracing::debug!(schema, table, columns = %columns, "discovered columns");
    Ok(columns)
}

/// Add `column` to the table when it is missing.
///
/// Never drops or alters anything. Failures (for example, missing ALTER
/// privilege) are logged and reported as `false`; the caller carries on
/// without the column.
pub async fn ensure_column(
    pool: &Pool,
    schema: &str,
    table: &str,
    column: &str,
    sql_type: &str,
) -> Result<bool> {
    validate_identifier(column)?;
    let qualified = pool.flavor().qualify(schema, table)?;

    let sql = match pool.flavor() {
        Flavor::PostgreSql => {
            format!("ALTER TABLE {qualified} ADD COLUMN IF NOT EXISTS {column} {sql_type}")
        }
        Flavor::Sqlite => {
            // no IF NOT EXISTS for columns in SQLite
            match discover_columns(pool, schema, table).await {
                Ok(existing) if existing.contains(column) => return Ok(true),
                Ok(_) => {}
                Err(e) if e.is_connectivity() => return Err(e),
                Err(e) => {
                    tracing::warn!(table, column, error = %e, "could not check for column");
                    return Ok(false);
                }
            }
            format!("ALTER TABLE {qualified} ADD COLUMN {column} {sql_type}")
        }
    };

    match pool.execute(&sql, &[]).await {
        Ok(_) => {
            tracing::debug!(table, column, sql_type, "column ensured");
            Ok(true)
        }
        Err(e) if e.is_connectivity() => Err(e),
        Err(e) => {
            tracing::warn!(table, column, error = %e, "could not add column, continuing without it");
            Ok(false)
        }
    }
}

/// Create `ux_<table>_<column>` unless it already exists.
///
/// Failures, including duplicate values that prevent the index, are tolerated.
pub async fn ensure_unique_index(
    pool: &Pool,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<bool> {
    validate_identifier(column)?;
    let qualified = pool.flavor().qualify(schema, table)?;
    let index = format!("ux_{table}_{column}");

    let sql = match pool.flavor() {
        Flavor::PostgreSql => {
            format!("CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {qualified} ({column})")
        }
        Flavor::Sqlite if schema == "main" => {
            format!("CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table} ({column})")
        }
        Flavor::Sqlite => {
            format!("CREATE UNIQUE INDEX IF NOT EXISTS {schema}.{index} ON {table} ({column})")
        }
    };

    match pool.execute(&sql, &[]).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_connectivity() => Err(e),
        Err(e) => {
            tracing::warn!(table, column, error = %e, "could not ensure unique index");
            Ok(false)
        }
    }
}

/// Columns of the table [`ensure_table`] creates.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "id",
    "name",
    "category",
    "ingredients",
    "recipe",
    "calories",
    "protein",
    "carbs",
    "fats",
    "fiber",
    "created_at",
];

/// The column set a freshly created dish table would have.
#[must_use]
pub fn canonical_columns() -> ColumnSet {
    CANONICAL_COLUMNS.iter().collect()
}

/// Create the canonical dish table if it does not exist.
pub async fn ensure_table(pool: &Pool, schema: &str, table: &str) -> Result<()> {
    let qualified = pool.flavor().qualify(schema, table)?;
    let sql = match pool.flavor() {
        Flavor::PostgreSql => format!(
            "CREATE TABLE IF NOT EXISTS {qualified} (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                category VARCHAR(100),
                ingredients TEXT,
                recipe TEXT,
                calories DECIMAL(10,2),
                protein DECIMAL(10,2),
                carbs DECIMAL(10,2),
                fats DECIMAL(10,2),
                fiber DECIMAL(10,2),
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )"
        ),
        Flavor::Sqlite => format!(
            "CREATE TABLE IF NOT EXISTS {qualified} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                category TEXT,
                ingredients TEXT,
                recipe TEXT,
                calories REAL,
                protein REAL,
                carbs REAL,
                fats REAL,
                fiber REAL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )"
        ),
    };
    pool.execute(&sql, &[]).await?;
    tracing::info!(schema, table, "dish table ensured");
    Ok(())
}
