use crate::db::migrations::MigrationRecord;
use crate::libs::mapper;
use anyhow::Result;
use prettytable::{row, Cell, Row, Table};

pub struct View {}

impl View {
    pub fn tables(tables: &[(String, usize)]) -> Result<()> {
        let mut table = Table::new();

        table.add_row(row!["#", "TABLE", "COLUMNS"]);
        for (index, (name, columns)) in tables.iter().enumerate() {
            table.add_row(row![index + 1, name, columns]);
        }
        table.printstd();

        Ok(())
    }

    pub fn columns(columns: &[String]) -> Result<()> {
        let mut table = Table::new();

        table.add_row(row!["#", "COLUMN"]);
        for (index, column) in columns.iter().enumerate() {
            table.add_row(row![index + 1, column]);
        }
        table.printstd();

        Ok(())
    }

    pub fn history(records: &[MigrationRecord]) -> Result<()> {
        let mut table = Table::new();

        table.add_row(row!["VERSION", "FROM", "STATEMENTS", "APPLIED AT"]);
        for record in records {
            table.add_row(row![
                record.version,
                record.previous_version,
                record.statements,
                record.applied_at.format("%Y-%m-%d %H:%M:%S")
            ]);
        }
        table.printstd();

        Ok(())
    }

    /// Renders result rows; the header comes from the first row's columns.
    pub fn rows(rows: &[mapper::Row]) -> Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        let mut table = Table::new();

        table.add_row(Row::new(first.columns().map(|c| Cell::new(&c.to_uppercase())).collect()));
        for row in rows {
            table.add_row(Row::new(row.values().map(|v| Cell::new(&v.to_string())).collect()));
        }
        table.printstd();

        Ok(())
    }
}
