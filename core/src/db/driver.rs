use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::value::{Row, Value};

/// Which engine a driver talks to.
///
/// Both engines accept the `$n` placeholders produced by the rewrite, so the
/// flavor only matters for catalog queries and DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    PostgreSql,
    Sqlite,
}

impl Flavor {
    #[must_use]
    pub fn default_schema(self) -> &'static str {
        match self {
            Flavor::PostgreSql => "public",
            Flavor::Sqlite => "main",
        }
    }

    /// Column type used for additive decimal columns.
    #[must_use]
    pub fn decimal_type(self) -> &'static str {
        match self {
            Flavor::PostgreSql => "DECIMAL(10,2)",
            Flavor::Sqlite => "REAL",
        }
    }

    /// Schema-qualified table reference. Both parts must be plain identifiers.
    pub fn qualify(self, schema: &str, table: &str) -> Result<String> {
        validate_identifier(schema)?;
        validate_identifier(table)?;
        Ok(match self {
            Flavor::PostgreSql => format!("{schema}.{table}"),
            Flavor::Sqlite if schema == "main" => table.to_string(),
            Flavor::Sqlite => format!("{schema}.{table}"),
        })
    }
}

/// Reject anything that is not `[A-Za-z_][A-Za-z0-9_]*`.
///
/// Schema, table and column names are interpolated into statements, so
/// they are restricted to bare identifiers.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Raw engine response, before it is shaped into a `QueryResult`.
#[derive(Debug, Default)]
pub struct QueryOutput {
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub insert_id: Option<i64>,
}

impl QueryOutput {
    #[must_use]
    pub fn count(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            affected_rows: rows.len() as u64,
            rows,
            insert_id: None,
        }
    }
}

/// Opens connections to one database.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    fn flavor(&self) -> Flavor;

    /// Human-readable `host:port/database` style target for diagnostics.
    /// Never contains credentials.
    fn target(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Upper bound imposed by the engine itself, if any.
    fn max_connections(&self) -> Option<usize> {
        None
    }

    /// Whether idle connections may be closed and reopened later without
    /// losing data.
    fn evictable(&self) -> bool {
        true
    }
}

/// One open connection. Statements arrive already rewritten to `$n` form.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    async fn exec(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput>;

    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("filipino_dishes").is_ok());
        assert!(validate_identifier("_tmp1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1table").is_err());
        assert!(validate_identifier("dishes; DROP TABLE users").is_err());
        assert!(validate_identifier("public.dishes").is_err());
    }

    #[test]
    fn test_qualify() {
        assert_eq!(
            Flavor::PostgreSql.qualify("public", "dishes").unwrap(),
            "public.dishes"
        );
        assert_eq!(Flavor::Sqlite.qualify("main", "dishes").unwrap(), "dishes");
        assert!(Flavor::PostgreSql.qualify("public", "di shes").is_err());
    }
}
