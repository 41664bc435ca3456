use anyhow::Result;
use bot_state_migrate::config;
use bot_state_migrate::db;
use bot_state_migrate::migrator::{Migrator, RunStatus};
use bot_state_migrate::prompt;
use bot_state_migrate::store::SqliteStore;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import legacy JSON bot state (bots, message mappings, verified users, blacklist) into SQLite"
)]
struct Args {
    /// Folder holding bots.json, msg_map.json, verified_users.json and blacklist.json.
    /// Prompted for when omitted.
    source_dir: Option<String>,

    /// Path to YAML config file (default: ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target database; overrides DATABASE_URL and the config data dir
    #[arg(long)]
    database_url: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    let database_url = args.database_url.unwrap_or_else(|| cfg.database_url());

    println!("Telegram bot JSON -> SQLite migration");
    println!();

    let source_dir = match args.source_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => prompt::expand_home(dir),
        _ => prompt::ask_source_dir()?,
    };

    let migrator = Migrator::new(source_dir)
        .with_target(database_url.clone())
        .with_max_displayed_errors(cfg.migration.max_displayed_errors);
    info!(source_dir = %migrator.source_dir().display(), database_url = %database_url, "starting migration");

    let assume_yes = args.yes;
    let status = migrator
        .run(
            |_| {
                if assume_yes {
                    return Ok(true);
                }
                prompt::confirm("Continue?")
            },
            || SqliteStore::open(&database_url),
        )
        .await?;

    match status {
        RunStatus::Completed(_, store) => {
            let totals = db::table_counts(store.pool()).await?;
            println!(
                "Database now holds {} bots, {} mappings, {} verified users, {} blacklist entries.",
                totals.bots, totals.message_mappings, totals.verified_users, totals.blacklist
            );
            println!("The legacy JSON files can be removed once the bot runs on the database.");
            Ok(ExitCode::SUCCESS)
        }
        RunStatus::MissingSource | RunStatus::Declined => Ok(ExitCode::FAILURE),
    }
}
