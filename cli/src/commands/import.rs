use std::path::PathBuf;

use anyhow::{Result, bail};

use activecore_core::import::{ImportOptions, ImportSummary, prepare, run_import};
use activecore_core::source::{SourceFormat, read_source};

use super::helpers::{print_json, print_summary};
use super::{connect, resolve_schema};
use crate::config::Config;

pub(crate) struct ImportArgs {
    pub file: PathBuf,
    pub format: Option<SourceFormat>,
    pub schema: Option<String>,
    pub table: String,
    pub create_table: bool,
    pub no_provision: bool,
    pub dry_run: bool,
    pub json: bool,
}

pub(crate) async fn cmd_import(config: &Config, args: ImportArgs) -> Result<ImportSummary> {
    if !args.file.is_file() {
        bail!("Source file not found: {}", args.file.display());
    }

    let prepared = prepare(read_source(&args.file, args.format)?);
    if prepared.records.is_empty() {
        bail!(
            "No usable rows in {} ({} considered, {} skipped)",
            args.file.display(),
            prepared.considered,
            prepared.skipped.len()
        );
    }

    let pool = connect(config).await?;
    let opts = ImportOptions {
        schema: resolve_schema(args.schema, config, &pool),
        table: args.table,
        create_table: args.create_table,
        provision_columns: !args.no_provision,
        dry_run: args.dry_run,
    };

    let result = run_import(&pool, &prepared, &opts).await;
    pool.end().await;
    let summary = result?;

    if args.json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }
    Ok(summary)
}
