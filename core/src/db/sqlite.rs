//! SQLite driver over `rusqlite`.
//!
//! Mainly used for local runs and tests. `$n` placeholders are SQLite named
//! parameters; they receive indexes in order of first appearance, which is
//! the order the rewrite produces, so binding stays positional.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use rusqlite::types::ValueRef;
use url::Url;

use super::driver::{Connection, Driver, Flavor, QueryOutput};
use crate::error::{Error, Result};
use crate::value::{Row, Value};

#[derive(Debug, Clone)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Parse `sqlite://path/to/file.db`, `sqlite:relative.db` or `sqlite::memory:`.
    pub fn new(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        if parsed.scheme() != "sqlite" {
            return Err(Error::InvalidUrl(format!(
                "expected a sqlite:// url, got scheme '{}'",
                parsed.scheme()
            )));
        }

        let path = match parsed.host_str() {
            // sqlite://data/meals.db parses "data" as the host
            Some(host) if !host.is_empty() => format!("{host}{}", parsed.path()),
            _ => parsed.path().to_string(),
        };

        match path.as_str() {
            ":memory:" | "" => Ok(Self::InMemory),
            _ => Ok(Self::File(PathBuf::from(path))),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn flavor(&self) -> Flavor {
        Flavor::Sqlite
    }

    fn target(&self) -> String {
        match self {
            Sqlite::InMemory => "sqlite::memory:".to_string(),
            Sqlite::File(path) => format!("sqlite:{}", path.display()),
        }
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let connection = match self {
            Sqlite::File(path) => rusqlite::Connection::open(path),
            Sqlite::InMemory => rusqlite::Connection::open_in_memory(),
        }
        .map_err(|e| Error::Connect {
            target: self.target(),
            source: Box::new(e),
        })?;
        Ok(Box::new(SqliteConnection { connection }))
    }

    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }

    fn evictable(&self) -> bool {
        // closing the only in-memory connection drops the database
        !matches!(self, Self::InMemory)
    }
}

#[derive(Debug)]
struct SqliteConnection {
    connection: rusqlite::Connection,
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn exec(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        exec_sync(&self.connection, sql, params)
    }
}

fn exec_sync(connection: &rusqlite::Connection, sql: &str, params: &[Value]) -> Result<QueryOutput> {
    let mut stmt = connection.prepare_cached(sql)?;
    let bind = rusqlite::params_from_iter(params.iter().map(to_sqlite));

    if stmt.column_count() == 0 {
        let affected = stmt.execute(bind)?;
        let insert_id = sql
            .trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
            .then(|| connection.last_insert_rowid());
        return Ok(QueryOutput {
            rows: Vec::new(),
            affected_rows: affected as u64,
            insert_id,
        });
    }

    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt.query(bind)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut columns = IndexMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.insert(name.clone(), from_sqlite(row.get_ref(idx)?));
        }
        out.push(Row::new(columns));
    }
    Ok(QueryOutput::rows(out))
}

fn to_sqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(v) => Sql::Integer(i64::from(*v)),
        Value::Int(v) => Sql::Integer(*v),
        Value::Float(v) => Sql::Real(*v),
        Value::Text(v) => Sql::Text(v.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(v) | ValueRef::Blob(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing() {
        assert!(matches!(Sqlite::new("sqlite::memory:").unwrap(), Sqlite::InMemory));
        match Sqlite::new("sqlite:///tmp/meals.db").unwrap() {
            Sqlite::File(path) => assert_eq!(path, PathBuf::from("/tmp/meals.db")),
            Sqlite::InMemory => panic!("expected a file database"),
        }
        match Sqlite::new("sqlite://data/meals.db").unwrap() {
            Sqlite::File(path) => assert_eq!(path, PathBuf::from("data/meals.db")),
            Sqlite::InMemory => panic!("expected a file database"),
        }
        assert!(Sqlite::new("postgres://localhost/db").is_err());
    }

    #[test]
    fn test_in_memory_limits() {
        let driver = Sqlite::in_memory();
        assert_eq!(driver.max_connections(), Some(1));
        assert!(!driver.evictable());
        assert!(Sqlite::open("meals.db").evictable());
    }

    #[tokio::test]
    async fn test_exec_numbered_placeholders() {
        let mut conn = Sqlite::in_memory().connect().await.unwrap();
        conn.exec("CREATE TABLE t (a INTEGER, b TEXT)", &[]).await.unwrap();

        let out = conn
            .exec(
                "INSERT INTO t (a, b) VALUES ($1, $2)",
                &[Value::Int(1), Value::from("adobo")],
            )
            .await
            .unwrap();
        assert_eq!(out.affected_rows, 1);
        assert_eq!(out.insert_id, Some(1));

        let out = conn
            .exec("SELECT a, b FROM t WHERE b = $1", &[Value::from("adobo")])
            .await
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].get("a"), Some(&Value::Int(1)));
        assert_eq!(out.rows[0].get("b"), Some(&Value::from("adobo")));
    }

    #[tokio::test]
    async fn test_update_reports_no_insert_id() {
        let mut conn = Sqlite::in_memory().connect().await.unwrap();
        conn.exec("CREATE TABLE t (a INTEGER)", &[]).await.unwrap();
        conn.exec("INSERT INTO t (a) VALUES (1), (2)", &[]).await.unwrap();

        let out = conn
            .exec("UPDATE t SET a = a + $1", &[Value::Int(10)])
            .await
            .unwrap();
        assert_eq!(out.affected_rows, 2);
        assert_eq!(out.insert_id, None);
    }
}
