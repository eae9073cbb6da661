//! Persistence engine.
//!
//! Composes the schema registry, the entity mapper and the relation resolver
//! against one shared SQLite connection.
//!
//! ## Features
//!
//! - **Connection Management**: One physical connection shared by reference-counted sessions
//! - **Additive Migration**: Tables and columns are created, never dropped
//! - **Typed CRUD**: Sentinel-returning operations per entity type
//! - **Relation Cascades**: Query, insert, update and delete follow declared relations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relorm::db::Database;
//! use relorm::libs::config::DbConfig;
//!
//! let db = Database::builder(DbConfig::new("app.db", 1)).build();
//! let _session = db.open_session();
//! println!("{:?}", db.table_names());
//! ```

/// Row-level SQL statements.
mod crud;

/// Typed CRUD façade and lock brackets.
pub mod dao;

/// Database handle and builder.
pub mod database;

/// Additive schema migration and version bookkeeping.
pub mod migrations;

/// Shared connection and session reference counting.
pub mod pool;

/// Relation cascades.
mod resolver;

pub use dao::{Dao, LockedDao};
pub use database::{Database, DatabaseBuilder};
pub use pool::Session;
