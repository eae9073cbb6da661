//! Display implementation for engine messages.
//!
//! All message text lives here, so log output and the inspection binary stay
//! consistent.

use super::types::Message;
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            // === SCHEMA MESSAGES ===
            Message::DuplicatePrimaryKey(column) => {
                format!("Column '{}' is declared as a second primary key and will be stored as an ordinary column", column)
            }
            Message::EntityWithoutTable(entity) => format!("Entity {} declares no table and is excluded from migration", entity),
            Message::UnknownForeignKey { relation, table, column } => {
                format!("Relation '{}' names foreign key '{}' which table '{}' does not declare", relation, column, table)
            }
            Message::FieldSkipped { column, error } => format!("Skipped field '{}': {}", column, error),

            // === CONNECTION MESSAGES ===
            Message::DatabaseOpened(path) => format!("Opened database {}", path),
            Message::DatabaseClosed(path) => format!("Closed database {}", path),
            Message::ExecutingSql(sql) => format!("SQL: {}", sql),

            // === MIGRATION MESSAGES ===
            Message::MigrationStarted { from, to } => format!("Upgrading database schema from v{} to v{}", from, to),
            Message::MigrationStatement(sql) => format!("Migration: {}", sql),
            Message::OrphanTable(table) => format!("Table '{}' has no registered entity and is left untouched", table),
            Message::OrphanColumn { table, column } => {
                format!("Column '{}.{}' is no longer declared and is left untouched", table, column)
            }
            Message::MigrationCompleted { version, statements } => {
                format!("Database schema at v{} ({} statements applied)", version, statements)
            }
            Message::DatabaseUpToDate(version) => format!("Database schema is up to date at v{}", version),
            Message::DatabaseDowngrade { stored, requested } => {
                format!("Database schema v{} is newer than requested v{}; leaving it unchanged", stored, requested)
            }
            Message::MigrationFailed(error) => format!("Schema migration failed: {}", error),

            // === OPERATION MESSAGES ===
            Message::OperationFailed { operation, error } => format!("{} failed: {}", operation, error),
            Message::CascadeSkipped { relation, reason } => format!("Skipped cascade through relation '{}': {}", relation, reason),
            Message::CascadeDepthReached(table) => format!("Cascade stopped at table '{}': relation chain too deep", table),

            // === INSPECTION MESSAGES ===
            Message::TablesHeader => "Tables:".to_string(),
            Message::NoTables => "Database has no tables".to_string(),
            Message::ColumnsHeader(table) => format!("Columns of '{}':", table),
            Message::TableNotFound(table) => format!("Table '{}' not found", table),
            Message::MigrationHistoryHeader => "Migration history:".to_string(),
            Message::NoMigrationHistory => "No schema migrations recorded".to_string(),
            Message::DatabaseVersion { path, version } => format!("{}: schema version {}", path, version),
            Message::RowsAffected(count) => format!("{} rows affected", count),
            Message::NoRowsReturned => "Query returned no rows".to_string(),
            Message::StatementFailed => "Statement failed, see log for details".to_string(),
        };
        write!(f, "{}", text)
    }
}
