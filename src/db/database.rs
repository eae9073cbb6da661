use crate::db::crud;
use crate::db::dao::{map_rows, or_sentinel, Dao};
use crate::db::migrations::{self, MigrationRecord};
use crate::db::pool::{ConnectionPool, Session};
use crate::libs::config::DbConfig;
use crate::libs::error::OrmResult;
use crate::libs::mapper::Row;
use crate::libs::relation::RelationGraph;
use crate::libs::schema::{descriptor_of, Entity, EntityDescriptor};
use crate::libs::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Collects the entity types a database manages.
pub struct DatabaseBuilder {
    config: DbConfig,
    descriptors: Vec<Arc<EntityDescriptor>>,
    migrate: bool,
}

impl DatabaseBuilder {
    pub fn register<E: Entity>(mut self) -> Self {
        self.descriptors.push(descriptor_of::<E>());
        self
    }

    /// Opens the database as it is on disk, never altering its schema.
    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    /// Tables reachable through relations of registered entities are managed too.
    pub fn build(self) -> Database {
        let graph = Arc::new(RelationGraph::build(&self.descriptors));
        let pool = ConnectionPool::new(self.config, graph.descriptors().to_vec(), self.migrate);
        Database { pool, graph }
    }
}

/// Entry point: one database file, its registered entities and the shared connection.
///
/// Nothing touches the disk until the first operation; the schema is upgraded
/// when the physical connection is opened.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
    graph: Arc<RelationGraph>,
}

impl Database {
    pub fn builder(config: DbConfig) -> DatabaseBuilder {
        DatabaseBuilder {
            config,
            descriptors: Vec::new(),
            migrate: true,
        }
    }

    pub fn config(&self) -> &DbConfig {
        self.pool.config()
    }

    pub fn dao<E: Entity>(&self) -> Dao<E> {
        Dao::new(self.pool.clone(), self.graph.clone())
    }

    /// Keeps the physical connection open until the returned session is dropped.
    pub fn open_session(&self) -> Session {
        self.pool.open()
    }

    pub fn is_open(&self) -> bool {
        self.pool.is_open()
    }

    pub fn is_locked(&self) -> bool {
        self.pool.is_locked()
    }

    pub fn session_count(&self) -> usize {
        self.pool.session_count()
    }

    pub fn relation_graph(&self) -> &RelationGraph {
        &self.graph
    }

    /// Rows of an arbitrary SELECT as lowercased column → text maps.
    pub fn query_map_list(&self, sql: &str, args: &[Value]) -> Vec<HashMap<String, String>> {
        or_sentinel("query map list", self.run(|conn| Ok(map_rows(crud::query_rows(conn, sql, args)?))), Vec::new())
    }

    pub fn exec_sql(&self, sql: &str, args: &[Value]) -> i64 {
        let result = self.run(|conn| crud::execute(conn, sql, args));
        or_sentinel("exec sql", result.map(|rows| i64::try_from(rows).unwrap_or(i64::MAX)), -1)
    }

    pub fn table_names(&self) -> Vec<String> {
        or_sentinel("list tables", self.try_table_names(), Vec::new())
    }

    pub fn column_names(&self, table: &str) -> Vec<String> {
        or_sentinel("list columns", self.run(|conn| migrations::column_names(conn, table)), Vec::new())
    }

    /// Schema version stored in the database file, or `None` if it cannot be read.
    pub fn schema_version(&self) -> Option<u32> {
        or_sentinel("read schema version", self.run(migrations::stored_version).map(Some), None)
    }

    pub fn migration_history(&self) -> Vec<MigrationRecord> {
        or_sentinel("read migration history", self.try_migration_history(), Vec::new())
    }

    pub(crate) fn try_table_names(&self) -> OrmResult<Vec<String>> {
        self.run(migrations::table_names)
    }

    pub(crate) fn try_migration_history(&self) -> OrmResult<Vec<MigrationRecord>> {
        self.run(migrations::migration_history)
    }

    pub(crate) fn try_query_rows(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.run(|conn| crud::query_rows(conn, sql, args))
    }

    fn run<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> OrmResult<T>) -> OrmResult<T> {
        self.pool.open().with_conn(f)
    }
}
