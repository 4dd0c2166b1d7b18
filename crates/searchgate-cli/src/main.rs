//! searchgate - quota-aware search provider gateway
//!
//! Runs the HTTP gateway and manages the registered search providers.

mod api;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "searchgate")]
#[command(author, version, about = "Quota-aware search provider gateway", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, value_enum, ignore_case = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Override database path (or set SEARCHGATE_DB_PATH env var)
    #[arg(long, env = "SEARCHGATE_DB_PATH", global = true)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve(commands::serve::ServeArgs),

    /// Manage search providers
    Provider {
        #[command(subcommand)]
        action: commands::provider::ProviderAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The server logs requests; admin commands stay quiet unless RUST_LOG says otherwise
    let default_filter = match cli.command {
        Commands::Serve(_) => "info",
        Commands::Provider { .. } => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let db_path = match &cli.db {
        Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
        None => searchgate_core::db::get_db_path()?,
    };
    let db = searchgate_core::Database::open(db_path.clone()).await?;

    let ctx = commands::Context {
        db,
        db_path,
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(&ctx, args).await,
        Commands::Provider { action } => commands::provider::execute(&ctx, action).await,
    }
}
