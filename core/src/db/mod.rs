//! Compatibility query layer: `?` placeholders in, `(rows, meta)` out.

mod driver;
pub mod placeholder;
mod pool;
pub mod postgres;
pub mod sqlite;

pub use driver::{Connection, Driver, Flavor, QueryOutput, validate_identifier};
pub use pool::{Pool, PoolConfig, PoolConnection, PoolState, QueryResult, ResultMeta};

use crate::error::{Error, Result};

/// Pick a driver from a connection URL.
///
/// `postgres://` and `postgresql://` select PostgreSQL; `sqlite://path`,
/// `sqlite:path` and `sqlite::memory:` select SQLite.
pub fn driver_from_url(url: &str) -> Result<Box<dyn Driver>> {
    let scheme = url.split_once(':').map(|(scheme, _)| scheme);
    match scheme {
        Some("postgres" | "postgresql") => Ok(Box::new(postgres::PostgreSql::from_url(url)?)),
        Some("sqlite") => Ok(Box::new(sqlite::Sqlite::new(url)?)),
        _ => Err(Error::InvalidUrl(format!(
            "unsupported database url scheme (expected postgres:// or sqlite://): {}",
            redact(url)
        ))),
    }
}

/// Strip anything between `://` and `@` so credentials never reach logs.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(start), Some(at)) if at > start => format!("{}://***{}", &url[..start], &url[at..]),
        _ => url.to_string(),
    }
}
