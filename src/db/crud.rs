//! Row-level statements shared by the entity operations and the cascades.
//!
//! Everything here works on table names and [`Row`]s; nothing knows about
//! entity types. Every statement is logged at debug level before it runs.

use crate::libs::error::{OrmError, OrmResult};
use crate::libs::mapper::Row;
use crate::libs::messages::macros::is_debug_mode;
use crate::libs::messages::Message;
use crate::libs::sql::{quote_ident, render_sql};
use crate::libs::value::Value;
use crate::msg_debug;
use rusqlite::{params_from_iter, Connection};

pub(crate) fn log_sql(sql: &str, args: &[Value]) {
    if is_debug_mode() {
        msg_debug!(Message::ExecutingSql(render_sql(sql, args)));
    } else {
        msg_debug!(Message::ExecutingSql(sql.to_string()));
    }
}

/// Runs `f` inside a transaction unless one is already open on `conn`.
pub(crate) fn atomically<T>(conn: &Connection, f: impl FnOnce(&Connection) -> OrmResult<T>) -> OrmResult<T> {
    if !conn.is_autocommit() {
        return f(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let value = f(&*tx)?;
    tx.commit()?;
    Ok(value)
}

pub(crate) fn execute(conn: &Connection, sql: &str, args: &[Value]) -> OrmResult<usize> {
    log_sql(sql, args);
    Ok(conn.execute(sql, params_from_iter(args.iter()))?)
}

pub(crate) fn query_rows(conn: &Connection, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
    log_sql(sql, args);
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| Row::from_sqlite(row, &names))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// First column of the first row, read as an integer. Zero when there is no row.
pub(crate) fn query_i64(conn: &Connection, sql: &str, args: &[Value]) -> OrmResult<i64> {
    let rows = query_rows(conn, sql, args)?;
    Ok(rows.first().and_then(|row| row.values().next()).and_then(Value::as_i64).unwrap_or(0))
}

/// Inserts `row` and returns the new rowid.
pub(crate) fn insert_row(conn: &Connection, table: &str, row: &Row) -> OrmResult<i64> {
    let sql = if row.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
    } else {
        let columns: Vec<String> = row.columns().map(quote_ident).collect();
        let placeholders = vec!["?"; row.len()].join(", ");
        format!("INSERT INTO {} ({}) VALUES ({})", quote_ident(table), columns.join(", "), placeholders)
    };

    let args: Vec<Value> = row.values().cloned().collect();
    execute(conn, &sql, &args)?;
    Ok(conn.last_insert_rowid())
}

/// Updates the rows matching every `keys` column of `row` with its remaining
/// columns, minus `frozen`. A row with nothing left to set is a no-op.
pub(crate) fn update_row(conn: &Connection, table: &str, row: &Row, keys: &[&str], frozen: &[&str]) -> OrmResult<usize> {
    let mut where_args = Vec::with_capacity(keys.len());
    for key in keys {
        match row.get(key) {
            Some(value) if !value.is_null() => where_args.push(value.clone()),
            _ => return Err(OrmError::MissingKeyValue { column: key.to_string() }),
        }
    }

    let is_fixed = |column: &str| keys.iter().chain(frozen).any(|k| k.eq_ignore_ascii_case(column));
    let (set_columns, mut args): (Vec<String>, Vec<Value>) = row
        .iter()
        .filter(|(column, _)| !is_fixed(*column))
        .map(|(column, value)| (format!("{} = ?", quote_ident(column)), value.clone()))
        .unzip();

    if set_columns.is_empty() {
        return Ok(0);
    }

    let conditions: Vec<String> = keys.iter().map(|k| format!("{} = ?", quote_ident(k))).collect();
    let sql = format!("UPDATE {} SET {} WHERE {}", quote_ident(table), set_columns.join(", "), conditions.join(" AND "));
    args.extend(where_args);
    execute(conn, &sql, &args)
}

pub(crate) fn select_eq(conn: &Connection, table: &str, column: &str, value: &Value) -> OrmResult<Vec<Row>> {
    let sql = format!("SELECT * FROM {} WHERE {} = ?", quote_ident(table), quote_ident(column));
    query_rows(conn, &sql, std::slice::from_ref(value))
}

pub(crate) fn delete_eq(conn: &Connection, table: &str, column: &str, value: &Value) -> OrmResult<usize> {
    let sql = format!("DELETE FROM {} WHERE {} = ?", quote_ident(table), quote_ident(column));
    execute(conn, &sql, std::slice::from_ref(value))
}

pub(crate) fn delete_in(conn: &Connection, table: &str, column: &str, values: &[Value]) -> OrmResult<usize> {
    if values.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!("DELETE FROM {} WHERE {} IN ({})", quote_ident(table), quote_ident(column), placeholders);
    execute(conn, &sql, values)
}

pub(crate) fn delete_all(conn: &Connection, table: &str) -> OrmResult<usize> {
    execute(conn, &format!("DELETE FROM {}", quote_ident(table)), &[])
}
