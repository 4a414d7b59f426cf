use anyhow::{Context, Result};
use serde::Serialize;

use activecore_core::schema::{ColumnSet, discover_columns};

use super::helpers::{print_columns, print_json};
use super::{connect, resolve_schema};
use crate::config::Config;

#[derive(Serialize)]
struct ColumnsOutput<'a> {
    schema: &'a str,
    table: &'a str,
    columns: &'a ColumnSet,
}

/// Print the column set an import into `table` would plan against.
pub(crate) async fn cmd_columns(
    config: &Config,
    schema: Option<String>,
    table: &str,
    json: bool,
) -> Result<ColumnSet> {
    let pool = connect(config).await?;
    let schema = resolve_schema(schema, config, &pool);

    let result = discover_columns(&pool, &schema, table).await;
    pool.end().await;
    let columns =
        result.with_context(|| format!("Failed to read columns of {schema}.{table}"))?;

    if json {
        print_json(&ColumnsOutput {
            schema: &schema,
            table,
            columns: &columns,
        })?;
    } else {
        print_columns(table, &columns);
    }
    Ok(columns)
}
