//! Batch user importer: reads a JSON export of user records and upserts them
//! into the hosted `users` table, uploading referenced profile pictures to
//! the storage bucket and rewriting the field to the public URL.
//!
//! Environment:
//! - SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY: storage endpoint + credential
//! - SUPABASE_DB_URL / DATABASE_URL / DB_URL: Postgres DSN for the table
//! - STORAGE_BUCKET: bucket for profile pictures (default "avatars")
//! - DRY_RUN: log what would happen without writing remotely
//!
//! Exit code is 0 when the batch reaches the end of the input, regardless of
//! how many individual records failed; pre-flight problems (missing config,
//! missing or unparseable source file) exit 1 before any remote call.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

use user_import::config::ImportConfig;
use user_import::importer::run_import;
use user_import::record::UserRecord;
use user_import::store::object::BucketClient;
use user_import::store::table::UsersTable;
use user_import::util::env::{env_flag, init_env};

#[derive(Parser, Debug)]
#[command(
    name = "import_users",
    about = "Upsert a JSON export of user records into the hosted users table"
)]
struct Args {
    /// Path to the JSON export (array of user records).
    #[arg(long, default_value = "users.json", env = "USERS_JSON")]
    source: PathBuf,

    /// Directory holding the local profile-picture files.
    #[arg(long, default_value = "local-files", env = "LOCAL_FILES_DIR")]
    files_root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_env();
    init_tracing();
    let args = Args::parse();

    // Fatal tier: configuration and source problems abort before any remote call.
    let config = ImportConfig::from_env()?;
    let raw = std::fs::read_to_string(&args.source)
        .with_context(|| format!("read source file {}", args.source.display()))?;
    let records: Vec<UserRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parse user records from {}", args.source.display()))?;

    let dry_run = env_flag("DRY_RUN", false);
    let objects = BucketClient::new(&config);
    let users = UsersTable::connect(&config.database_url).await?;

    println!(
        "[import_users] importing {} record(s) from {}{}",
        records.len(),
        args.source.display(),
        if dry_run { " (DRY_RUN)" } else { "" }
    );
    let summary = run_import(&records, &objects, &users, &args.files_root, dry_run).await;
    println!(
        "[import_users] done: succeeded={} failed={} uploaded={}",
        summary.succeeded, summary.failed, summary.uploaded
    );
    Ok(())
}

fn init_tracing() {
    let _ = SubscriberBuilder::default()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}
