//! Core library modules.
//!
//! ## Features
//!
//! - **Entity Model**: Schema registry, field types, relations
//! - **Mapping**: Rows and entity conversion, SQL text helpers
//! - **Core Infrastructure**: Configuration, data storage, messaging, errors
//! - **User Interface**: Table rendering for the inspection binary

pub mod config;
pub mod data_storage;
pub mod error;
pub mod mapper;
pub mod messages;
pub mod relation;
pub mod schema;
pub mod sql;
pub mod value;
pub mod view;
