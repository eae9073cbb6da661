//! Additive schema migration.
//!
//! Compares the tables and columns the registered entities describe with the
//! ones the live database has, and issues only `CREATE TABLE` and
//! `ALTER TABLE ... ADD COLUMN`. Tables and columns nobody declares any more
//! are reported and left in place; nothing is ever dropped or renamed.
//!
//! ## Features
//!
//! - **Version Tracking**: The schema version lives in `PRAGMA user_version`
//! - **Three-way Diff**: Tables, then columns, are classified as actual-only,
//!   desired-only or present in both
//! - **History Tracking**: Every upgrade is recorded in the `orm_migrations` table
//!
//! ## Usage
//!
//! ```rust
//! use relorm::db::migrations::{stored_version, Migrator};
//! use relorm::libs::schema::{descriptor_of, Entity, EntitySchema};
//! use rusqlite::Connection;
//!
//! #[derive(Default)]
//! struct Tag {
//!     id: Option<i64>,
//!     label: Option<String>,
//! }
//!
//! impl Entity for Tag {
//!     fn schema() -> EntitySchema<Self> {
//!         EntitySchema::<Self>::builder()
//!             .table("tags")
//!             .primary_key("id", |t| &t.id, |t, v| t.id = v)
//!             .column("label", |t| &t.label, |t, v| t.label = v)
//!             .build()
//!     }
//! }
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let descriptors = vec![descriptor_of::<Tag>()];
//! Migrator::new(&descriptors).upgrade(&conn, 1).unwrap();
//! assert_eq!(stored_version(&conn).unwrap(), 1);
//! ```

use crate::libs::error::OrmResult;
use crate::libs::messages::Message;
use crate::libs::schema::{ColumnDescriptor, EntityDescriptor};
use crate::libs::sql::quote_ident;
use crate::libs::value::SqlType;
use crate::{msg_debug, msg_error, msg_info, msg_success, msg_warning};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const HISTORY_TABLE: &str = "orm_migrations";

const CREATE_HISTORY_TABLE: &str = "
CREATE TABLE IF NOT EXISTS orm_migrations (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL,
    previous_version INTEGER NOT NULL,
    statements INTEGER NOT NULL,
    applied_at BIGINT NOT NULL
)";

const INSERT_HISTORY: &str = "INSERT INTO orm_migrations (version, previous_version, statements, applied_at) VALUES (?1, ?2, ?3, ?4)";

const SELECT_HISTORY: &str = "SELECT version, previous_version, statements, applied_at FROM orm_migrations ORDER BY id";

const LIST_TABLES: &str = "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

/// Where a name was found when comparing the live schema with the declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiffClass {
    /// Only in the database. Left untouched.
    ActualOnly = 1,
    /// Only declared. Created or added.
    DesiredOnly = 2,
    /// In both. Tables in this class get a column-level diff.
    Both = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub name: String,
    pub class: DiffClass,
}

/// Classifies every name, comparing case-insensitively. Declared spelling wins.
pub fn diff(actual: &[String], desired: &[String]) -> Vec<DiffEntry> {
    let mut entries: BTreeMap<String, DiffEntry> = BTreeMap::new();

    for name in actual {
        entries.insert(
            name.to_lowercase(),
            DiffEntry {
                name: name.clone(),
                class: DiffClass::ActualOnly,
            },
        );
    }
    for name in desired {
        entries
            .entry(name.to_lowercase())
            .and_modify(|entry| {
                entry.name = name.clone();
                entry.class = DiffClass::Both;
            })
            .or_insert_with(|| DiffEntry {
                name: name.clone(),
                class: DiffClass::DesiredOnly,
            });
    }

    entries.into_values().collect()
}

/// Statements needed to bring the database up to the declared schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    pub statements: Vec<String>,
    pub orphan_tables: Vec<String>,
    pub orphan_columns: Vec<(String, String)>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// One applied upgrade, as recorded in the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub version: u32,
    pub previous_version: u32,
    pub statements: usize,
    pub applied_at: DateTime<Utc>,
}

pub struct Migrator<'a> {
    descriptors: &'a [Arc<EntityDescriptor>],
}

impl<'a> Migrator<'a> {
    pub fn new(descriptors: &'a [Arc<EntityDescriptor>]) -> Self {
        Self { descriptors }
    }

    /// Upgrades the database to `target` if its stored version is older.
    ///
    /// Returns the history record of the upgrade, or `None` when nothing ran.
    /// Each statement commits on its own; a failure stops the upgrade before
    /// the stored version is raised, so the next open retries the remainder.
    pub fn upgrade(&self, conn: &Connection, target: u32) -> OrmResult<Option<MigrationRecord>> {
        let stored = stored_version(conn)?;
        if stored > target {
            msg_warning!(Message::DatabaseDowngrade { stored, requested: target });
            return Ok(None);
        }
        if stored == target {
            msg_debug!(Message::DatabaseUpToDate(stored));
            return Ok(None);
        }

        msg_info!(Message::MigrationStarted { from: stored, to: target });
        let plan = self.plan(conn)?;
        for table in &plan.orphan_tables {
            msg_info!(Message::OrphanTable(table.clone()));
        }
        for (table, column) in &plan.orphan_columns {
            msg_info!(Message::OrphanColumn {
                table: table.clone(),
                column: column.clone(),
            });
        }

        let applied = self.apply(conn, &plan).inspect_err(|e| msg_error!(Message::MigrationFailed(e.to_string())))?;

        let record = MigrationRecord {
            version: target,
            previous_version: stored,
            statements: applied,
            applied_at: now_millis(),
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(CREATE_HISTORY_TABLE)?;
        tx.execute(
            INSERT_HISTORY,
            params![record.version, record.previous_version, record.statements as i64, record.applied_at.timestamp_millis()],
        )?;
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;

        msg_success!(Message::MigrationCompleted {
            version: target,
            statements: applied,
        });
        Ok(Some(record))
    }

    /// Diffs the declared schema against the live one without changing anything.
    pub fn plan(&self, conn: &Connection) -> OrmResult<MigrationPlan> {
        let desired = self.desired_tables();
        let desired_names: Vec<String> = desired.iter().map(|(name, _)| name.clone()).collect();
        let actual_names: Vec<String> = table_names(conn)?.into_iter().filter(|t| !t.eq_ignore_ascii_case(HISTORY_TABLE)).collect();

        let mut plan = MigrationPlan::default();

        for entry in diff(&actual_names, &desired_names) {
            match entry.class {
                DiffClass::ActualOnly => plan.orphan_tables.push(entry.name),
                DiffClass::DesiredOnly => {
                    if let Some((_, columns)) = desired.iter().find(|(name, _)| name.eq_ignore_ascii_case(&entry.name)) {
                        plan.statements.push(create_table_sql(&entry.name, columns));
                    }
                }
                DiffClass::Both => {
                    let Some((_, columns)) = desired.iter().find(|(name, _)| name.eq_ignore_ascii_case(&entry.name)) else {
                        continue;
                    };
                    let actual_columns = column_names(conn, &entry.name)?;
                    let desired_columns: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

                    for column in diff(&actual_columns, &desired_columns) {
                        match column.class {
                            DiffClass::ActualOnly => plan.orphan_columns.push((entry.name.clone(), column.name)),
                            DiffClass::DesiredOnly => {
                                if let Some(descriptor) = columns.iter().find(|c| c.name.eq_ignore_ascii_case(&column.name)) {
                                    plan.statements.push(add_column_sql(&entry.name, descriptor));
                                }
                            }
                            DiffClass::Both => {}
                        }
                    }
                }
            }
        }

        Ok(plan)
    }

    /// Executes the plan's statements in order. Returns how many ran.
    pub fn apply(&self, conn: &Connection, plan: &MigrationPlan) -> OrmResult<usize> {
        for statement in &plan.statements {
            msg_debug!(Message::MigrationStatement(statement.clone()));
            conn.execute_batch(statement)?;
        }
        Ok(plan.statements.len())
    }

    /// Declared tables in registration order. Entities sharing a table
    /// contribute the union of their columns.
    fn desired_tables(&self) -> Vec<(String, Vec<ColumnDescriptor>)> {
        let mut tables: Vec<(String, Vec<ColumnDescriptor>)> = Vec::new();

        for descriptor in self.descriptors {
            let Some(table) = descriptor.table_name() else {
                continue;
            };
            match tables.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(table)) {
                Some((_, columns)) => {
                    for column in descriptor.columns() {
                        if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(&column.name)) {
                            columns.push(column.clone());
                        }
                    }
                }
                None => tables.push((table.to_string(), descriptor.columns().to_vec())),
            }
        }

        tables
    }
}

fn column_definition(column: &ColumnDescriptor) -> String {
    if column.primary_key {
        // Integer keys alias the rowid so omitted keys are generated by SQLite.
        let sql_type = match column.sql_type {
            SqlType::Integer | SqlType::BigInt | SqlType::Int => SqlType::Integer,
            other => other,
        };
        format!("{} {} PRIMARY KEY", quote_ident(&column.name), sql_type)
    } else {
        format!("{} {}", quote_ident(&column.name), column.sql_type)
    }
}

pub fn create_table_sql(table: &str, columns: &[ColumnDescriptor]) -> String {
    let columns: Vec<String> = columns.iter().map(column_definition).collect();
    format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_ident(table), columns.join(", "))
}

pub fn add_column_sql(table: &str, column: &ColumnDescriptor) -> String {
    format!("ALTER TABLE {} ADD COLUMN {} {}", quote_ident(table), quote_ident(&column.name), column.sql_type)
}

/// User tables of the database, in name order.
pub fn table_names(conn: &Connection) -> OrmResult<Vec<String>> {
    let mut stmt = conn.prepare(LIST_TABLES)?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Columns of `table`, read from a zero-row probe query.
pub fn column_names(conn: &Connection, table: &str) -> OrmResult<Vec<String>> {
    let stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(table)))?;
    Ok(stmt.column_names().into_iter().map(String::from).collect())
}

pub fn stored_version(conn: &Connection) -> OrmResult<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(u32::try_from(version).unwrap_or(0))
}

/// Applied upgrades, oldest first. Empty when no upgrade ever ran.
pub fn migration_history(conn: &Connection) -> OrmResult<Vec<MigrationRecord>> {
    if !table_names(conn)?.iter().any(|t| t == HISTORY_TABLE) {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(SELECT_HISTORY)?;
    let history = stmt
        .query_map([], |row| {
            let statements: i64 = row.get(2)?;
            let applied_at: i64 = row.get(3)?;
            Ok(MigrationRecord {
                version: row.get(0)?,
                previous_version: row.get(1)?,
                statements: usize::try_from(statements).unwrap_or(0),
                applied_at: Utc.timestamp_millis_opt(applied_at).single().unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(history)
}

fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis()).single().unwrap_or(now)
}
