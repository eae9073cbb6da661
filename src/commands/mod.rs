//! Inspection commands for relorm database files.
//!
//! The binary opens a database exactly as it is on disk: no entity types are
//! registered and migrations are switched off, so inspecting never changes
//! the schema.
//!
//! ## Usage
//!
//! ```text
//! relorm --database ./app.db tables
//! relorm --database ./app.db columns users
//! relorm --config ./relorm.json history
//! relorm --database ./app.db query "SELECT * FROM users WHERE id = ?" 1
//! ```

pub mod migrations;
pub mod query;
pub mod tables;

use crate::db::Database;
use crate::libs::config::DbConfig;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List tables")]
    Tables,
    #[command(about = "List the columns of a table", arg_required_else_help = true)]
    Columns(tables::ColumnsArgs),
    #[command(about = "Show schema migration history")]
    History,
    #[command(about = "Show the stored schema version")]
    Version,
    #[command(about = "Run a SQL statement", arg_required_else_help = true)]
    Query(query::QueryArgs),
}

/// Where to find the database.
#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseArgs {
    /// Path of the database file
    #[arg(long, short = 'd', global = true)]
    pub database: Option<PathBuf>,
    /// JSON configuration naming the database
    #[arg(long, short = 'c', global = true, conflicts_with = "database")]
    pub config: Option<PathBuf>,
}

impl DatabaseArgs {
    pub fn db_config(&self) -> Result<DbConfig> {
        if let Some(path) = &self.database {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let mut config = DbConfig::new(&name, 0);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                config = config.with_directory(parent);
            } else {
                config = config.with_directory(".");
            }
            return Ok(config);
        }

        match &self.config {
            Some(path) => DbConfig::read(path),
            None => DbConfig::read_default(),
        }
    }

    /// Opens the configured database without migrating it.
    pub fn open(&self) -> Result<Database> {
        Ok(Database::builder(self.db_config()?).without_migrations().build())
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn menu() -> Result<()> {
        let cli = Self::parse();
        let db = cli.database.open()?;

        match cli.command {
            Commands::Tables => tables::tables(&db),
            Commands::Columns(args) => tables::columns(&db, args),
            Commands::History => migrations::history(&db),
            Commands::Version => migrations::version(&db),
            Commands::Query(args) => query::cmd(&db, args),
        }
    }
}
