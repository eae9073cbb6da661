use crate::{
    db::Database,
    libs::{messages::Message, view::View},
    msg_bail_anyhow, msg_print,
};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Table to describe
    pub table: String,
}

pub fn tables(db: &Database) -> Result<()> {
    let names = db.try_table_names()?;
    if names.is_empty() {
        msg_print!(Message::NoTables);
        return Ok(());
    }

    let tables: Vec<(String, usize)> = names
        .into_iter()
        .map(|name| {
            let columns = db.column_names(&name).len();
            (name, columns)
        })
        .collect();

    msg_print!(Message::TablesHeader);
    View::tables(&tables)
}

pub fn columns(db: &Database, args: ColumnsArgs) -> Result<()> {
    let names = db.try_table_names()?;
    let Some(table) = names.into_iter().find(|name| name.eq_ignore_ascii_case(&args.table)) else {
        msg_bail_anyhow!(Message::TableNotFound(args.table));
    };

    msg_print!(Message::ColumnsHeader(table.clone()));
    View::columns(&db.column_names(&table))
}
