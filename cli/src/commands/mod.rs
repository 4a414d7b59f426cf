mod columns;
mod helpers;
mod import;

use anyhow::{Context, Result};

use activecore_core::db::Pool;

use crate::config::Config;

pub(crate) use columns::cmd_columns;
pub(crate) use import::{ImportArgs, cmd_import};

/// Open the pool described by `config` and run its probe connection.
pub(super) async fn connect(config: &Config) -> Result<Pool> {
    let driver = config.driver()?;
    let target = driver.target();
    Pool::connect(driver, config.pool.clone())
        .await
        .with_context(|| format!("Cannot reach database at {target}"))
}

/// `--schema`, then `DB_SCHEMA`, then the engine default.
pub(super) fn resolve_schema(flag: Option<String>, config: &Config, pool: &Pool) -> String {
    flag.or_else(|| config.schema.clone())
        .unwrap_or_else(|| pool.flavor().default_schema().to_string())
}
