//! Typed CRUD façade for one entity type.
//!
//! Public methods never return errors. A failure is logged and turned into a
//! sentinel: `-1` for counts and row ids, `None` for single lookups, `false`
//! for existence checks and an empty `Vec` for lists. Each of them has a
//! crate-internal `try_*` twin returning [`OrmResult`] so the failure cause
//! stays visible to the engine and its tests.
//!
//! Every call opens a session and holds the connection lock from the first
//! statement through the last cascade. [`Dao::lock`] widens that bracket over
//! several calls.
//!
//! ## Usage
//!
//! ```rust
//! use relorm::db::Database;
//! use relorm::libs::config::DbConfig;
//! use relorm::libs::schema::{Entity, EntitySchema};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Note {
//!     id: Option<i64>,
//!     body: Option<String>,
//! }
//!
//! impl Entity for Note {
//!     fn schema() -> EntitySchema<Self> {
//!         EntitySchema::<Self>::builder()
//!             .table("notes")
//!             .primary_key("id", |n| &n.id, |n, v| n.id = v)
//!             .column("body", |n| &n.body, |n, v| n.body = v)
//!             .build()
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let db = Database::builder(DbConfig::new("notes.db", 1).with_directory(dir.path()))
//!     .register::<Note>()
//!     .build();
//! let notes = db.dao::<Note>();
//!
//! let id = notes.insert(&Note { id: None, body: Some("hello".into()) });
//! assert_eq!(notes.query_one(id).unwrap().body.as_deref(), Some("hello"));
//! ```

use crate::db::crud;
use crate::db::pool::{ConnectionPool, ConnectionSlot, Session};
use crate::db::resolver;
use crate::libs::error::{OrmError, OrmResult};
use crate::libs::mapper::{self, Row};
use crate::libs::messages::Message;
use crate::libs::relation::{Action, RelationGraph};
use crate::libs::schema::{describe, Entity, EntitySchema};
use crate::libs::sql::{quote_ident, QueryOptions, SqlBuilder};
use crate::libs::value::Value;
use crate::msg_error;
use parking_lot::ReentrantMutexGuard;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Arc;

/// Logs `result`'s error, if any, and substitutes `sentinel`.
pub(crate) fn or_sentinel<T>(operation: &'static str, result: OrmResult<T>, sentinel: T) -> T {
    result.unwrap_or_else(|error| {
        msg_error!(Message::OperationFailed {
            operation,
            error: error.to_string(),
        });
        sentinel
    })
}

fn count(rows: usize) -> i64 {
    i64::try_from(rows).unwrap_or(i64::MAX)
}

pub(crate) fn map_rows(rows: Vec<Row>) -> Vec<HashMap<String, String>> {
    rows.into_iter()
        .map(|row| {
            row.iter()
                .filter_map(|(column, value)| value.as_text().map(|text| (column.to_lowercase(), text)))
                .collect()
        })
        .collect()
}

pub struct Dao<E: Entity> {
    pool: ConnectionPool,
    schema: Arc<EntitySchema<E>>,
    graph: Arc<RelationGraph>,
}

impl<E: Entity> Clone for Dao<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            schema: self.schema.clone(),
            graph: self.graph.clone(),
        }
    }
}

impl<E: Entity> Dao<E> {
    /// `graph` is reused when it already holds `E`'s relations, otherwise it is
    /// rebuilt with `E` added to the walked descriptors.
    pub(crate) fn new(pool: ConnectionPool, graph: Arc<RelationGraph>) -> Self {
        let schema = describe::<E>();
        let descriptor = schema.descriptor().clone();
        let covered = descriptor.relations().is_empty() || graph.covers(&descriptor);
        let graph = if covered {
            graph
        } else {
            let mut roots = graph.descriptors().to_vec();
            roots.push(descriptor);
            Arc::new(RelationGraph::build(&roots))
        };

        Self { pool, schema, graph }
    }

    pub fn schema(&self) -> &EntitySchema<E> {
        &self.schema
    }

    /// SELECT builder already bound to this entity's table.
    pub fn sql_builder(&self) -> SqlBuilder {
        SqlBuilder::new().from(self.schema.descriptor().table_name().unwrap_or_default())
    }

    /// Holds the connection lock and a session until the returned bracket is dropped.
    pub fn lock(&self) -> LockedDao<'_, E> {
        let guard = self.pool.lock();
        LockedDao {
            dao: self,
            session: self.pool.open(),
            _guard: guard,
        }
    }

    fn run<T>(&self, f: impl FnOnce(&Connection) -> OrmResult<T>) -> OrmResult<T> {
        let session = self.pool.open();
        session.with_conn(f)
    }

    fn table(&self) -> OrmResult<&str> {
        self.schema.descriptor().require_table()
    }

    fn primary_key(&self) -> OrmResult<&str> {
        self.table()?;
        self.schema.descriptor().require_primary_key()
    }

    fn known_column<'a>(&self, column: &'a str) -> OrmResult<&'a str> {
        let table = self.table()?;
        if self.schema.descriptor().has_column(column) {
            Ok(column)
        } else {
            Err(OrmError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }

    // === WRITE OPERATIONS ===

    /// Inserts `entity`, letting SQLite generate the primary key. Returns the rowid or `-1`.
    pub fn insert(&self, entity: &E) -> i64 {
        self.insert_with(entity, true)
    }

    /// Inserts `entity`. With `auto_key` the primary key field is left out of the row.
    pub fn insert_with(&self, entity: &E, auto_key: bool) -> i64 {
        or_sentinel("insert", self.try_insert(entity, auto_key), -1)
    }

    /// Inserts every entity in one transaction. Returns how many were inserted or `-1`.
    pub fn insert_list(&self, entities: &[E]) -> i64 {
        self.insert_list_with(entities, true)
    }

    pub fn insert_list_with(&self, entities: &[E], auto_key: bool) -> i64 {
        or_sentinel("insert list", self.try_insert_list(entities, auto_key), -1)
    }

    /// Updates the row with `entity`'s primary key. Returns affected rows or `-1`.
    pub fn update(&self, entity: &E) -> i64 {
        or_sentinel("update", self.try_update(entity), -1)
    }

    /// Updates the rows whose `column` equals `entity`'s value for it.
    pub fn update_by_column(&self, column: &str, entity: &E) -> i64 {
        or_sentinel("update by column", self.try_update_by_column(column, entity), -1)
    }

    pub fn update_list(&self, entities: &[E]) -> i64 {
        or_sentinel("update list", self.try_update_list(entities), -1)
    }

    /// Deletes by primary key, then the dependent rows of delete-enabled relations.
    pub fn delete(&self, id: impl Into<Value>) -> i64 {
        or_sentinel("delete", self.try_delete(id.into()), -1)
    }

    /// Deletes by primary key set. Related tables are not touched.
    pub fn delete_ids<V: Into<Value> + Clone>(&self, ids: &[V]) -> i64 {
        let ids: Vec<Value> = ids.iter().cloned().map(Into::into).collect();
        or_sentinel("delete ids", self.try_delete_ids(&ids), -1)
    }

    /// Deletes rows matching a predicate. Related tables are not touched.
    pub fn delete_where(&self, selection: &str, args: &[Value]) -> i64 {
        or_sentinel("delete where", self.try_delete_where(selection, args), -1)
    }

    /// Deletes `entity` by its primary key value, cascading like [`Dao::delete`].
    pub fn delete_one(&self, entity: &E) -> i64 {
        or_sentinel("delete one", self.try_delete_one(entity), -1)
    }

    pub fn delete_one_by_column(&self, column: &str, entity: &E) -> i64 {
        or_sentinel("delete one by column", self.try_delete_one_by_column(column, entity), -1)
    }

    /// Deletes the given entities by primary key. Related tables are not touched.
    pub fn delete_list(&self, entities: &[E]) -> i64 {
        or_sentinel("delete list", self.try_delete_list(entities), -1)
    }

    /// Empties the table and every table reachable through delete-enabled relations.
    pub fn delete_all(&self) -> i64 {
        or_sentinel("delete all", self.try_delete_all(), -1)
    }

    // === READ OPERATIONS ===

    pub fn query_one(&self, id: impl Into<Value>) -> Option<E> {
        or_sentinel("query one", self.try_query_one(id.into()), None)
    }

    /// First row whose `column` equals `value`.
    pub fn query_one_by(&self, column: &str, value: impl Into<Value>) -> Option<E> {
        or_sentinel("query one by", self.try_query_one_by(column, value.into()), None)
    }

    pub fn query_list(&self) -> Vec<E> {
        self.query_list_with(&QueryOptions::new())
    }

    pub fn query_list_where(&self, selection: &str, args: Vec<Value>) -> Vec<E> {
        self.query_list_with(&QueryOptions::new().selection(selection, args))
    }

    pub fn query_list_with(&self, options: &QueryOptions) -> Vec<E> {
        or_sentinel("query list", self.try_query_list(options), Vec::new())
    }

    /// One-based page of `page_size` entities in rowid order.
    pub fn query_page(&self, page: u32, page_size: u32) -> Vec<E> {
        self.query_list_with(&QueryOptions::new().order_by("rowid").page(page, page_size))
    }

    /// Maps the rows of an arbitrary SELECT onto entities.
    pub fn query_raw(&self, sql: &str, args: &[Value]) -> Vec<E> {
        or_sentinel("query raw", self.try_query_raw(sql, args), Vec::new())
    }

    pub fn query_count(&self) -> i64 {
        self.query_count_where("", &[])
    }

    pub fn query_count_where(&self, selection: &str, args: &[Value]) -> i64 {
        or_sentinel("query count", self.try_query_count(selection, args), -1)
    }

    /// Whether `sql` yields at least one row.
    pub fn is_exist(&self, sql: &str, args: &[Value]) -> bool {
        or_sentinel("is exist", self.run(|conn| Ok(!crud::query_rows(conn, sql, args)?.is_empty())), false)
    }

    /// Rows of an arbitrary SELECT as lowercased column → text maps. NULL columns are omitted.
    pub fn query_map_list(&self, sql: &str, args: &[Value]) -> Vec<HashMap<String, String>> {
        or_sentinel("query map list", self.run(|conn| Ok(map_rows(crud::query_rows(conn, sql, args)?))), Vec::new())
    }

    /// Runs any statement without relation cascades. Returns affected rows or `-1`.
    pub fn exec_sql(&self, sql: &str, args: &[Value]) -> i64 {
        or_sentinel("exec sql", self.run(|conn| crud::execute(conn, sql, args).map(count)), -1)
    }

    // === FALLIBLE TWINS ===

    pub(crate) fn try_insert(&self, entity: &E, auto_key: bool) -> OrmResult<i64> {
        self.run(|conn| crud::atomically(conn, |conn| self.insert_in(conn, entity, auto_key)))
    }

    pub(crate) fn try_insert_list(&self, entities: &[E], auto_key: bool) -> OrmResult<i64> {
        self.run(|conn| {
            crud::atomically(conn, |conn| {
                for entity in entities {
                    self.insert_in(conn, entity, auto_key)?;
                }
                Ok(count(entities.len()))
            })
        })
    }

    pub(crate) fn try_update(&self, entity: &E) -> OrmResult<i64> {
        let pk = self.primary_key()?;
        self.run(|conn| crud::atomically(conn, |conn| self.update_in(conn, pk, entity)))
    }

    pub(crate) fn try_update_by_column(&self, column: &str, entity: &E) -> OrmResult<i64> {
        let column = self.known_column(column)?;
        self.run(|conn| crud::atomically(conn, |conn| self.update_in(conn, column, entity)))
    }

    pub(crate) fn try_update_list(&self, entities: &[E]) -> OrmResult<i64> {
        let pk = self.primary_key()?;
        self.run(|conn| {
            crud::atomically(conn, |conn| {
                let mut affected = 0;
                for entity in entities {
                    affected += self.update_in(conn, pk, entity)?;
                }
                Ok(affected)
            })
        })
    }

    pub(crate) fn try_delete(&self, id: Value) -> OrmResult<i64> {
        let pk = self.primary_key()?;
        self.run(|conn| crud::atomically(conn, |conn| self.delete_in(conn, pk, &id)))
    }

    pub(crate) fn try_delete_ids(&self, ids: &[Value]) -> OrmResult<i64> {
        let table = self.table()?;
        let pk = self.primary_key()?;
        self.run(|conn| crud::delete_in(conn, table, pk, ids).map(count))
    }

    pub(crate) fn try_delete_where(&self, selection: &str, args: &[Value]) -> OrmResult<i64> {
        let table = self.table()?;
        let mut sql = format!("DELETE FROM {}", quote_ident(table));
        if !selection.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(selection);
        }
        self.run(|conn| crud::execute(conn, &sql, args).map(count))
    }

    pub(crate) fn try_delete_one(&self, entity: &E) -> OrmResult<i64> {
        let pk = self.primary_key()?;
        let id = self.key_value(entity, pk)?;
        self.run(|conn| crud::atomically(conn, |conn| self.delete_in(conn, pk, &id)))
    }

    pub(crate) fn try_delete_one_by_column(&self, column: &str, entity: &E) -> OrmResult<i64> {
        let column = self.known_column(column)?;
        let value = self.key_value(entity, column)?;
        self.run(|conn| crud::atomically(conn, |conn| self.delete_in(conn, column, &value)))
    }

    pub(crate) fn try_delete_list(&self, entities: &[E]) -> OrmResult<i64> {
        let pk = self.primary_key()?;
        let ids = entities.iter().map(|e| self.key_value(e, pk)).collect::<OrmResult<Vec<_>>>()?;
        self.try_delete_ids(&ids)
    }

    pub(crate) fn try_delete_all(&self) -> OrmResult<i64> {
        let table = self.table()?;
        self.run(|conn| {
            crud::atomically(conn, |conn| {
                let mut deleted = crud::delete_all(conn, table)?;
                for related in self.graph.reachable_from(self.schema.descriptor(), Action::Delete) {
                    deleted += crud::delete_all(conn, &related)?;
                }
                Ok(count(deleted))
            })
        })
    }

    pub(crate) fn try_query_one(&self, id: Value) -> OrmResult<Option<E>> {
        let pk = self.primary_key()?;
        self.run(|conn| self.query_one_in(conn, pk, &id))
    }

    pub(crate) fn try_query_one_by(&self, column: &str, value: Value) -> OrmResult<Option<E>> {
        let column = self.known_column(column)?;
        self.run(|conn| self.query_one_in(conn, column, &value))
    }

    pub(crate) fn try_query_list(&self, options: &QueryOptions) -> OrmResult<Vec<E>> {
        let sql = options.to_sql(self.table()?);
        self.run(|conn| self.entities(conn, crud::query_rows(conn, &sql, &options.args)?))
    }

    pub(crate) fn try_query_raw(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<E>> {
        self.run(|conn| self.entities(conn, crud::query_rows(conn, sql, args)?))
    }

    pub(crate) fn try_query_count(&self, selection: &str, args: &[Value]) -> OrmResult<i64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(self.table()?));
        if !selection.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(selection);
        }
        self.run(|conn| crud::query_i64(conn, &sql, args))
    }

    // === CONNECTION-LEVEL STEPS ===

    fn key_value(&self, entity: &E, column: &str) -> OrmResult<Value> {
        mapper::to_row(&self.schema, entity, true)
            .remove(column)
            .ok_or_else(|| OrmError::MissingKeyValue { column: column.to_string() })
    }

    fn insert_in(&self, conn: &Connection, entity: &E, auto_key: bool) -> OrmResult<i64> {
        let table = self.table()?;
        let row = mapper::to_row(&self.schema, entity, !auto_key);
        let row_id = crud::insert_row(conn, table, &row)?;

        if !self.schema.relations.is_empty() {
            let mut owner = mapper::to_row(&self.schema, entity, true);
            if let (true, Some(pk)) = (auto_key, self.schema.descriptor().primary_key()) {
                owner.set(pk, row_id);
            }
            resolver::insert_related(conn, &self.schema, entity, &owner, auto_key)?;
        }

        Ok(row_id)
    }

    fn update_in(&self, conn: &Connection, key: &str, entity: &E) -> OrmResult<i64> {
        let table = self.table()?;
        let row = mapper::to_row(&self.schema, entity, true);
        let frozen: Vec<&str> = self.schema.descriptor().primary_key().into_iter().collect();
        let affected = crud::update_row(conn, table, &row, &[key], &frozen)?;

        resolver::update_related(conn, &self.schema, entity, &row)?;
        Ok(count(affected))
    }

    /// Deletes the rows whose `column` equals `value` and cascades for each of them.
    fn delete_in(&self, conn: &Connection, column: &str, value: &Value) -> OrmResult<i64> {
        let table = self.table()?;
        let owners = crud::select_eq(conn, table, column, value)?;
        let deleted = crud::delete_eq(conn, table, column, value)?;

        for owner in owners {
            resolver::delete_related(conn, &self.graph, self.schema.descriptor(), owner)?;
        }
        Ok(count(deleted))
    }

    fn query_one_in(&self, conn: &Connection, column: &str, value: &Value) -> OrmResult<Option<E>> {
        let table = self.table()?;
        let sql = format!("SELECT * FROM {} WHERE {} = ? LIMIT 1", quote_ident(table), quote_ident(column));
        let rows = crud::query_rows(conn, &sql, std::slice::from_ref(value))?;
        Ok(self.entities(conn, rows)?.into_iter().next())
    }

    fn entities(&self, conn: &Connection, rows: Vec<Row>) -> OrmResult<Vec<E>> {
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            let mut entity = mapper::from_row(&self.schema, &row);
            resolver::attach_related(conn, &self.schema, &mut entity, &row)?;
            entities.push(entity);
        }
        Ok(entities)
    }
}

/// Several operations under one lock acquisition and one session.
///
/// Other threads block on the engine until the bracket is dropped; the owning
/// thread may keep using any [`Dao`] in the meantime.
pub struct LockedDao<'a, E: Entity> {
    dao: &'a Dao<E>,
    session: Session,
    _guard: ReentrantMutexGuard<'a, ConnectionSlot>,
}

impl<E: Entity> LockedDao<'_, E> {
    pub fn insert(&self, entity: &E) -> i64 {
        self.insert_with(entity, true)
    }

    pub fn insert_with(&self, entity: &E, auto_key: bool) -> i64 {
        let result = self.session.with_conn(|conn| self.dao.insert_in(conn, entity, auto_key));
        or_sentinel("insert", result, -1)
    }

    pub fn query_one(&self, id: impl Into<Value>) -> Option<E> {
        let id = id.into();
        let result = self.dao.primary_key().and_then(|pk| self.session.with_conn(|conn| self.dao.query_one_in(conn, pk, &id)));
        or_sentinel("query one", result, None)
    }

    pub fn update(&self, entity: &E) -> i64 {
        let result = self.dao.primary_key().and_then(|pk| self.session.with_conn(|conn| self.dao.update_in(conn, pk, entity)));
        or_sentinel("update", result, -1)
    }

    pub fn update_by_column(&self, column: &str, entity: &E) -> i64 {
        let result = self
            .dao
            .known_column(column)
            .and_then(|column| self.session.with_conn(|conn| self.dao.update_in(conn, column, entity)));
        or_sentinel("update by column", result, -1)
    }

    pub fn delete_one_by_column(&self, column: &str, entity: &E) -> i64 {
        let result = self.dao.known_column(column).and_then(|column| {
            let value = self.dao.key_value(entity, column)?;
            self.session.with_conn(|conn| self.dao.delete_in(conn, column, &value))
        });
        or_sentinel("delete one by column", result, -1)
    }

    pub fn query_list(&self) -> Vec<E> {
        let options = QueryOptions::new();
        let result = self.dao.table().and_then(|table| {
            let sql = options.to_sql(table);
            self.session.with_conn(|conn| self.dao.entities(conn, crud::query_rows(conn, &sql, &[])?))
        });
        or_sentinel("query list", result, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::libs::config::DbConfig;
    use crate::libs::error::ErrorKind;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Item {
        id: Option<i64>,
        name: Option<String>,
        qty: Option<i32>,
    }

    impl Entity for Item {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("items")
                .primary_key("id", |i| &i.id, |i, v| i.id = v)
                .column("name", |i| &i.name, |i, v| i.name = v)
                .column("qty", |i| &i.qty, |i, v| i.qty = v)
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct Keyless {
        label: Option<String>,
    }

    impl Entity for Keyless {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("keyless")
                .column("label", |k| &k.label, |k, v| k.label = v)
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct Loose {
        label: Option<String>,
    }

    impl Entity for Loose {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder().column("label", |l| &l.label, |l, v| l.label = v).build()
        }
    }

    struct DaoTestContext {
        _temp_dir: TempDir,
        db: Database,
    }

    impl TestContext for DaoTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let db = Database::builder(DbConfig::new("dao.db", 1).with_directory(temp_dir.path()))
                .register::<Item>()
                .register::<Keyless>()
                .build();
            Self { _temp_dir: temp_dir, db }
        }
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_missing_primary_key_is_a_schema_error(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Keyless>();
        let error = dao.try_query_one(Value::Long(1)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Schema);
        assert!(dao.query_one(1i64).is_none());
        assert_eq!(dao.delete(1i64), -1);
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_missing_table_is_a_schema_error(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Loose>();
        assert!(matches!(dao.try_insert(&Loose::default(), true), Err(OrmError::MissingTable)));
        assert_eq!(dao.insert(&Loose::default()), -1);
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_update_without_key_value_fails(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Item>();
        let item = Item {
            name: Some("nail".into()),
            ..Default::default()
        };

        assert!(matches!(dao.try_update(&item), Err(OrmError::MissingKeyValue { .. })));
        assert_eq!(dao.update(&item), -1);
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_unknown_column_is_rejected(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Item>();
        let error = dao.try_query_one_by("colour", Value::Text("red".into())).unwrap_err();
        assert!(matches!(error, OrmError::UnknownColumn { .. }));
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_storage_errors_become_sentinels(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Item>();

        let error = dao.try_query_raw("SELECT * FROM nowhere", &[]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Storage);
        assert!(dao.query_raw("SELECT * FROM nowhere", &[]).is_empty());
        assert_eq!(dao.exec_sql("NOT SQL", &[]), -1);
        assert!(!dao.is_exist("SELECT * FROM nowhere", &[]));
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_failed_batch_rolls_back(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Item>();
        dao.insert_with(
            &Item {
                id: Some(2),
                name: Some("taken".into()),
                qty: None,
            },
            false,
        );

        let batch = vec![
            Item {
                id: Some(1),
                name: Some("fresh".into()),
                qty: None,
            },
            Item {
                id: Some(2),
                name: Some("duplicate".into()),
                qty: None,
            },
        ];

        assert_eq!(dao.insert_list_with(&batch, false), -1);
        assert_eq!(dao.query_count(), 1);
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_update_touches_only_supplied_columns(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Item>();
        let id = dao.insert(&Item {
            id: None,
            name: Some("bolt".into()),
            qty: Some(5),
        });

        let affected = dao.update(&Item {
            id: Some(id),
            name: None,
            qty: Some(9),
        });

        assert_eq!(affected, 1);
        assert_eq!(
            dao.query_one(id),
            Some(Item {
                id: Some(id),
                name: Some("bolt".into()),
                qty: Some(9),
            })
        );
    }

    #[test_context(DaoTestContext)]
    #[test]
    fn test_map_list_lowercases_and_skips_nulls(ctx: &mut DaoTestContext) {
        let dao = ctx.db.dao::<Item>();
        dao.insert(&Item {
            id: None,
            name: Some("washer".into()),
            qty: None,
        });

        let maps = dao.query_map_list("SELECT id AS ID, name AS Name, qty FROM items", &[]);
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].get("name").map(String::as_str), Some("washer"));
        assert_eq!(maps[0].get("id").map(String::as_str), Some("1"));
        assert!(!maps[0].contains_key("qty"));
    }
}
