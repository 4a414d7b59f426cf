mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use activecore_core::import::DEFAULT_TABLE;
use activecore_core::source::SourceFormat;

use crate::commands::{ImportArgs, cmd_columns, cmd_import};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "activecore",
    version,
    about = "Import meal and recipe files into the dish table",
    long_about = "Import meal sheets and scraped recipes into the dish table.\n\n\
        Connection settings come from DATABASE_URL or DB_HOST, DB_PORT, DB_USER,\n\
        DB_PASSWORD and DB_NAME. Set RUST_LOG=info for progress output."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a source file and upsert its dishes
    Import {
        /// Source file (.tsv meal sheet or .json recipe dump)
        #[arg(default_value = "data/meals.tsv")]
        file: PathBuf,
        /// Source format: tsv or json (default: from the file extension)
        #[arg(long)]
        format: Option<SourceFormat>,
        /// Schema of the target table (default: DB_SCHEMA, then the engine default)
        #[arg(long)]
        schema: Option<String>,
        /// Target table
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,
        /// Create the dish table if it does not exist
        #[arg(long)]
        create_table: bool,
        /// Do not add missing recipe/fiber columns
        #[arg(long)]
        no_provision: bool,
        /// Parse and plan without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the columns discovered on the target table
    Columns {
        /// Schema of the target table (default: DB_SCHEMA, then the engine default)
        #[arg(long)]
        schema: Option<String>,
        /// Target table
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Import {
            file,
            format,
            schema,
            table,
            create_table,
            no_provision,
            dry_run,
            json,
        } => {
            let args = ImportArgs {
                file,
                format,
                schema,
                table,
                create_table,
                no_provision,
                dry_run,
                json,
            };
            cmd_import(&config, args).await.map(|_| ())
        }
        Commands::Columns {
            schema,
            table,
            json,
        } => cmd_columns(&config, schema, &table, json).await.map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import_defaults() {
        let cli = Cli::try_parse_from(["activecore", "import"]).unwrap();
        let Commands::Import {
            file,
            format,
            table,
            create_table,
            dry_run,
            ..
        } = cli.command
        else {
            panic!("expected import");
        };
        assert_eq!(file, PathBuf::from("data/meals.tsv"));
        assert!(format.is_none());
        assert_eq!(table, DEFAULT_TABLE);
        assert!(!create_table);
        assert!(!dry_run);
    }

    #[test]
    fn test_parse_import_format() {
        let cli = Cli::try_parse_from([
            "activecore",
            "import",
            "recipes.txt",
            "--format",
            "json",
            "--dry-run",
        ])
        .unwrap();
        let Commands::Import { format, dry_run, .. } = cli.command else {
            panic!("expected import");
        };
        assert_eq!(format, Some(SourceFormat::Json));
        assert!(dry_run);

        assert!(Cli::try_parse_from(["activecore", "import", "--format", "xml"]).is_err());
    }
}
