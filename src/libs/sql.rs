//! SQL text helpers: identifier quoting, query options and a small SELECT builder.

use crate::libs::value::Value;

/// Quotes an identifier for SQLite, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders `sql` with every `?` replaced by its argument, for logging only.
pub fn render_sql(sql: &str, args: &[Value]) -> String {
    let mut rendered = String::with_capacity(sql.len());
    let mut args = args.iter();

    for ch in sql.chars() {
        if ch != '?' {
            rendered.push(ch);
            continue;
        }
        match args.next() {
            Some(Value::Null) => rendered.push_str("NULL"),
            Some(Value::Text(text)) => {
                rendered.push('\'');
                rendered.push_str(&text.replace('\'', "''"));
                rendered.push('\'');
            }
            Some(value) => rendered.push_str(&value.to_string()),
            None => rendered.push('?'),
        }
    }

    rendered
}

/// Clauses of a SELECT against one table. Unset clauses are omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub columns: Option<Vec<String>>,
    pub selection: Option<String>,
    pub args: Vec<Value>,
    pub group_by: Option<String>,
    pub having: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// `selection` is a WHERE predicate with `?` placeholders bound from `args`.
    pub fn selection(mut self, selection: &str, args: Vec<Value>) -> Self {
        self.selection = Some(selection.to_string());
        self.args = args;
        self
    }

    pub fn group_by(mut self, group_by: &str) -> Self {
        self.group_by = Some(group_by.to_string());
        self
    }

    pub fn having(mut self, having: &str) -> Self {
        self.having = Some(having.to_string());
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    /// Raw LIMIT clause, e.g. `"10"` or `"20, 10"`.
    pub fn limit(mut self, limit: &str) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    /// One-based page of `page_size` rows. Pages below 1 are treated as the first.
    pub fn page(self, page: u32, page_size: u32) -> Self {
        let offset = u64::from(page.max(1) - 1) * u64::from(page_size);
        self.limit(&format!("{}, {}", offset, page_size))
    }

    pub fn to_sql(&self, table: &str) -> String {
        let columns = match &self.columns {
            Some(columns) if !columns.is_empty() => columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            _ => "*".to_string(),
        };

        let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(table));
        push_clause(&mut sql, "WHERE", &self.selection);
        push_clause(&mut sql, "GROUP BY", &self.group_by);
        if self.group_by.is_some() {
            push_clause(&mut sql, "HAVING", &self.having);
        }
        push_clause(&mut sql, "ORDER BY", &self.order_by);
        push_clause(&mut sql, "LIMIT", &self.limit);
        sql
    }
}

fn push_clause(sql: &mut String, keyword: &str, clause: &Option<String>) {
    if let Some(clause) = clause.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        sql.push(' ');
        sql.push_str(keyword);
        sql.push(' ');
        sql.push_str(clause);
    }
}

/// Fluent SELECT builder producing SQL text plus its bound arguments.
///
/// ```rust
/// use relorm::libs::sql::SqlBuilder;
///
/// let (sql, args) = SqlBuilder::new()
///     .select(&["id", "name"])
///     .from("users")
///     .where_eq("name", "Ann")
///     .order_by("id DESC")
///     .limit(5)
///     .build();
///
/// assert_eq!(sql, r#"SELECT "id", "name" FROM "users" WHERE "name" = ? ORDER BY id DESC LIMIT 5"#);
/// assert_eq!(args.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    columns: Vec<String>,
    table: String,
    conditions: Vec<String>,
    args: Vec<Value>,
    group_by: Option<String>,
    order_by: Option<String>,
    limit: Option<u64>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn from(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.and_eq(column, value)
    }

    pub fn and_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(format!("{} = ?", quote_ident(column)));
        self.args.push(value.into());
        self
    }

    pub fn group_by(mut self, group_by: &str) -> Self {
        self.group_by = Some(group_by.to_string());
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> (String, Vec<Value>) {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(&self.table));
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        push_clause(&mut sql, "GROUP BY", &self.group_by);
        push_clause(&mut sql, "ORDER BY", &self.order_by);
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        (sql, self.args)
    }
}
