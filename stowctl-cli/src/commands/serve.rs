//! HTTP server command
//!
//! Refuses to start against a database with pending migrations unless
//! `--migrate` is given.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::Parser;

use stowctl_server::db::migrations;
use stowctl_server::run_server;

use super::{open_pool, DatabaseArgs};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Address to bind to (default: 127.0.0.1:8000, or STOWCTL_BIND)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Apply pending migrations before serving
    #[arg(long)]
    pub migrate: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = args.db.load_config()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.cors_permissive {
        config.cors_permissive = true;
    }

    let pool = open_pool(&config).await?;

    if args.migrate {
        migrations::run(&pool)
            .await
            .context("Failed to apply migrations")?;
    } else {
        let pending = migrations::pending(&pool)
            .await
            .context("Failed to read migration state")?;
        if !pending.is_empty() {
            bail!(
                "{} pending migration(s) for {}. Run: stowctl migrate",
                pending.len(),
                config.database_url
            );
        }
    }

    tracing::info!("Starting stowctl server on {}", config.bind_addr);

    // Run server (blocks until shutdown)
    run_server(pool, config).await.context("Server error")?;

    Ok(())
}
