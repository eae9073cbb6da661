use crate::{
    db::Database,
    libs::{messages::Message, view::View},
    msg_error_anyhow, msg_print,
};
use anyhow::Result;

pub fn version(db: &Database) -> Result<()> {
    let version = db.schema_version().ok_or_else(|| msg_error_anyhow!(Message::StatementFailed))?;

    msg_print!(Message::DatabaseVersion {
        path: db.config().path().display().to_string(),
        version,
    });
    Ok(())
}

pub fn history(db: &Database) -> Result<()> {
    let history = db.try_migration_history()?;
    if history.is_empty() {
        msg_print!(Message::NoMigrationHistory);
        return Ok(());
    }

    msg_print!(Message::MigrationHistoryHeader, true);
    View::history(&history)
}
