use crate::config::RamifyConfig;
use crate::database::Database;
use anyhow::{Context, Result};
use std::fs;

pub struct BootstrapResources {
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub database: Database,
}

/// Creates the data and log directories, opens the database and applies the
/// schema. Safe to run against an existing home directory.
pub fn initialize(config: &RamifyConfig) -> Result<BootstrapResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;
    create_dir_if_missing(&config.paths.logs_dir, &mut directories_created)?;

    let database = Database::connect(&config.paths)
        .with_context(|| format!("failed to open {}", config.paths.db_path.display()))?;
    let database_initialized = database.ensure_migrations()?;

    Ok(BootstrapResources {
        directories_created,
        database_initialized,
        database,
    })
}

fn create_dir_if_missing(path: &std::path::Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        created.push(path.display().to_string());
    }
    Ok(())
}
