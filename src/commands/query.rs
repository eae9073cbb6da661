use crate::{
    db::Database,
    libs::{messages::Message, value::Value, view::View},
    msg_bail_anyhow, msg_print,
};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// SQL text with `?` placeholders
    pub sql: String,
    /// Values bound to the placeholders, in order
    pub args: Vec<String>,
}

/// Runs a SELECT and prints its rows, or any other statement and prints the affected count.
pub fn cmd(db: &Database, args: QueryArgs) -> Result<()> {
    let values: Vec<Value> = args.args.into_iter().map(parse_arg).collect();

    if returns_rows(&args.sql) {
        let rows = db.try_query_rows(&args.sql, &values)?;
        if rows.is_empty() {
            msg_print!(Message::NoRowsReturned);
            return Ok(());
        }
        return View::rows(&rows);
    }

    let affected = db.exec_sql(&args.sql, &values);
    if affected < 0 {
        msg_bail_anyhow!(Message::StatementFailed);
    }
    msg_print!(Message::RowsAffected(affected));
    Ok(())
}

fn returns_rows(sql: &str) -> bool {
    let keyword = sql.trim_start().split_whitespace().next().unwrap_or_default().to_ascii_uppercase();
    matches!(keyword.as_str(), "SELECT" | "WITH" | "PRAGMA" | "VALUES" | "EXPLAIN")
}

/// Integers and reals bind as numbers, `null` as NULL, anything else as text.
fn parse_arg(arg: String) -> Value {
    if arg.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(value) = arg.parse::<i64>() {
        return Value::Long(value);
    }
    if let Ok(value) = arg.parse::<f64>() {
        return Value::Double(value);
    }
    Value::Text(arg)
}
