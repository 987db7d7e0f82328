//! Schema migration command

use anyhow::{Context, Result};
use clap::Parser;

use stowctl_server::db::migrations::{self, MIGRATIONS};

use super::{open_pool, DatabaseArgs};

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Show applied and pending migrations without changing anything
    #[arg(long)]
    pub status: bool,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let config = args.db.load_config()?;
    let pool = open_pool(&config).await?;

    if args.status {
        let applied = migrations::applied_versions(&pool)
            .await
            .context("Failed to read migration state")?;

        for m in MIGRATIONS {
            let mark = if applied.contains(&m.version) {
                "applied"
            } else {
                "pending"
            };
            println!("{:>3}  {:<12} {}", m.version, m.name, mark);
        }
        return Ok(());
    }

    let applied = migrations::run(&pool)
        .await
        .context("Failed to apply migrations")?;

    if applied.is_empty() {
        println!("Database is up to date");
    } else {
        println!("Applied {} migration(s) to {}", applied.len(), config.database_url);
    }

    Ok(())
}
