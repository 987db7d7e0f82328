//! Subcommand implementations

pub mod migrate;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use stowctl_server::db::{create_pool, SqlitePool};
use stowctl_server::ServerConfig;

pub use migrate::run_migrate;
pub use serve::run_serve;

/// Options shared by every command that opens the database
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Base directory for the database and static/images
    /// (default: $STOWCTL_BASE_DIR or ~/.stowctl)
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Database URL (overrides config file and STOWCTL_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,
}

impl DatabaseArgs {
    /// Resolve configuration: defaults, config file, environment, then flags.
    pub fn load_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load_with_base(self.base_dir.clone())
            .context("Failed to load configuration")?;
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        Ok(config)
    }
}

/// Make sure the base directory exists, then open the pool.
async fn open_pool(config: &ServerConfig) -> Result<SqlitePool> {
    std::fs::create_dir_all(&config.base_dir)
        .with_context(|| format!("Failed to create {}", config.base_dir.display()))?;

    create_pool(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))
}
