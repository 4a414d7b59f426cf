use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use activecore_core::db::postgres::PostgreSql;
use activecore_core::db::{Driver, PoolConfig, driver_from_url};

/// Connection settings read from the environment once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub schema: Option<String>,
    pub pool: PoolConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Each missing key logs a warning and takes
    /// its default; a present but unparseable value is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let idle_ms: u64 = try_load(&lookup, "DB_IDLE_TIMEOUT_MS", "60000")?;
        let connect_ms: u64 = try_load(&lookup, "DB_CONNECT_TIMEOUT_MS", "2000")?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            host: try_load(&lookup, "DB_HOST", "localhost")?,
            port: try_load(&lookup, "DB_PORT", "5432")?,
            user: try_load(&lookup, "DB_USER", "postgres")?,
            password: lookup("DB_PASSWORD").unwrap_or_else(|| {
                tracing::warn!("DB_PASSWORD not set, connecting without a password");
                String::new()
            }),
            dbname: try_load(&lookup, "DB_NAME", "activecore")?,
            schema: lookup("DB_SCHEMA").filter(|s| !s.trim().is_empty()),
            pool: PoolConfig {
                max_size: try_load(&lookup, "DB_POOL_MAX", "10")?,
                idle_timeout: Duration::from_millis(idle_ms),
                connect_timeout: Duration::from_millis(connect_ms),
            },
        })
    }

    /// `DATABASE_URL` wins; otherwise a PostgreSQL driver from the `DB_*` parts.
    pub fn driver(&self) -> Result<Box<dyn Driver>> {
        if let Some(url) = &self.database_url {
            return driver_from_url(url).context("Invalid DATABASE_URL");
        }
        Ok(Box::new(PostgreSql::from_parts(
            &self.host,
            self.port,
            &self.user,
            &self.password,
            &self.dbname,
            self.pool.connect_timeout,
        )))
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        tracing::warn!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value '{raw}': {e}"))
}
