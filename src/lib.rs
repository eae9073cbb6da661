//! # Relorm - relation-aware object mapping for SQLite
//!
//! An embedded persistence engine: entity types declare their table once,
//! the on-disk schema is evolved additively to match, and CRUD operations
//! cascade across declared relations.
//!
//! ## Features
//!
//! - **Schema Registry**: Typed accessor tables built from entity declarations
//! - **Additive Migration**: Missing tables and columns are created, nothing is dropped
//! - **Entity Mapping**: Entities marshal to rows and back through a fixed type table
//! - **Relation Cascades**: One-to-one, one-to-many and many-to-many relations
//!   follow query, insert, update and delete according to their action masks
//! - **Shared Connection**: Reference-counted sessions over one locked connection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relorm::commands::Cli;
//!
//! fn main() -> anyhow::Result<()> {
//!     Cli::menu()
//! }
//! ```

pub mod commands;
pub mod db;
pub mod libs;
