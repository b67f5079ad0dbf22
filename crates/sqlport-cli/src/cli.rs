//! sqlport command line: dump SQLite schemas and browse tables

mod commands;
mod logging;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use sqlport_core::{DumpSettings, InsertStyle};
use sqlport_dump::CancellationToken;

use commands::{DumpArgs, TemplateKind};
use logging::LoggingConfig;

#[derive(Debug, Parser)]
#[command(name = "sqlport")]
#[command(about = "Dump database schemas and data as portable SQL scripts")]
#[command(version)]
struct Cli {
    /// Settings file; defaults to the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write JSON logs to the log directory
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InsertStyleArg {
    MultiRow,
    SingleRow,
}

impl From<InsertStyleArg> for InsertStyle {
    fn from(style: InsertStyleArg) -> Self {
        match style {
            InsertStyleArg::MultiRow => InsertStyle::MultiRow,
            InsertStyleArg::SingleRow => InsertStyle::SingleRow,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a schema, or some of its objects, to a SQL script
    Dump {
        /// Database file
        db: String,

        /// Object to include; repeat for several. Omit to dump the whole schema
        #[arg(short, long = "table")]
        tables: Vec<String>,

        /// Include table rows as INSERT statements
        #[arg(long)]
        with_data: bool,

        /// Rows per INSERT batch
        #[arg(long)]
        batch_size: Option<u64>,

        #[arg(long, value_enum)]
        insert_style: Option<InsertStyleArg>,

        /// Do not emit DROP ... IF EXISTS before each CREATE
        #[arg(long)]
        no_drop: bool,

        /// Directory the dump file is written to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        #[arg(long, default_value = "main")]
        schema: String,
    },

    /// Print the CREATE statement of a table
    Source {
        db: String,
        table: String,
        #[arg(long, default_value = "main")]
        schema: String,
    },

    /// Print the first rows of a table
    Page {
        db: String,
        table: String,
        /// Rows to fetch; defaults to the configured page size
        #[arg(short, long)]
        limit: Option<u64>,
        #[arg(long, default_value = "main")]
        schema: String,
    },

    /// Print an INSERT, UPDATE or DELETE template for a table
    Template {
        db: String,
        table: String,
        #[arg(short, long, value_enum, default_value = "insert")]
        kind: TemplateKind,
        #[arg(long, default_value = "main")]
        schema: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init(LoggingConfig::for_verbosity(cli.verbose, cli.json_logs)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            None
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<DumpSettings> {
    match path {
        Some(path) => DumpSettings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => DumpSettings::load().context("Failed to load settings"),
    }
}

/// Cancels the token on Ctrl-C; the dump stops at the next batch boundary
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            child.cancel();
        }
    });
    token
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings(cli.config.as_ref())?;

    match cli.command {
        Command::Dump {
            db,
            tables,
            with_data,
            batch_size,
            insert_style,
            no_drop,
            out,
            schema,
        } => {
            if let Some(size) = batch_size {
                anyhow::ensure!(size > 0, "--batch-size must be greater than 0");
                settings.dump_batch_size = size;
            }
            if let Some(style) = insert_style {
                settings.insert_style = style.into();
            }
            if no_drop {
                settings.drop_before_create = false;
            }
            let args = DumpArgs {
                db,
                schema,
                tables,
                with_data,
                out,
            };
            commands::dump(args, settings, cancel_on_ctrl_c()).await
        }
        Command::Source { db, table, schema } => commands::source(&db, &schema, &table).await,
        Command::Page {
            db,
            table,
            limit,
            schema,
        } => {
            let limit = limit.unwrap_or(settings.default_page_size);
            anyhow::ensure!(limit > 0, "--limit must be greater than 0");
            commands::page(&db, &schema, &table, limit).await
        }
        Command::Template {
            db,
            table,
            kind,
            schema,
        } => commands::template(&db, &schema, &table, kind).await,
    }
}
