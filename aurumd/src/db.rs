//! Database CLI subcommands for aurumd.
//!
//! Provides `db migrate`, `db status`, and `db init` commands.

use anyhow::{anyhow, Result};
use std::env;

use aurum_db::{init_demo_catalog, migrate, status};

/// Run database CLI subcommands.
///
/// Supported commands:
/// - `aurumd db migrate` - Run pending migrations
/// - `aurumd db status` - Check migration status
/// - `aurumd db init` - Seed the demo catalog
pub async fn run_db_command(args: Vec<String>) -> Result<()> {
    if args.len() < 3 {
        return Err(anyhow!("Usage: aurumd db <migrate|status|init>"));
    }

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow!("DATABASE_URL environment variable is required for db commands"))?;

    let pool = sqlx::PgPool::connect(&database_url).await?;

    match args[2].as_str() {
        "migrate" => {
            migrate(&pool).await?;
        },
        "status" => {
            status(&pool).await?;
        },
        "init" => {
            init_demo_catalog(&pool).await?;
        },
        other => {
            return Err(anyhow!("Unknown db command: {}. Expected: migrate, status, init", other));
        },
    }

    Ok(())
}
