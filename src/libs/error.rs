//! Error taxonomy for the persistence engine.
//!
//! Every fallible step inside the engine returns [`OrmError`]. The public
//! [`Dao`](crate::db::dao::Dao) façade never lets one escape: it logs the
//! error and hands the caller a sentinel (`-1`, `None`, `false` or an empty
//! collection). Keeping the variants tagged lets the engine and its tests
//! tell the four failure classes apart even though callers only see sentinels.

use std::path::PathBuf;
use thiserror::Error;

/// The four failure classes the engine recovers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing table name, primary key or key value.
    Schema,
    /// Any failure reported by SQLite.
    Storage,
    /// A stored value could not be coerced into a field's type.
    Mapping,
    /// A relation could not locate its foreign-key value.
    Relation,
}

#[derive(Debug, Error)]
pub enum OrmError {
    #[error("entity has no table name")]
    MissingTable,

    #[error("table '{table}' has no primary key column")]
    MissingPrimaryKey { table: String },

    #[error("entity has no value for key column '{column}'")]
    MissingKeyValue { column: String },

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to prepare database directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("column '{column}' expected {expected}, found {found}")]
    Mapping {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("relation '{relation}' has no foreign key value on the owning entity")]
    MissingForeignKeyValue { relation: String },

    #[error("relation '{relation}' names foreign key '{column}' missing from table '{table}'")]
    UnknownForeignKey {
        relation: String,
        table: String,
        column: String,
    },
}

impl OrmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrmError::MissingTable
            | OrmError::MissingPrimaryKey { .. }
            | OrmError::MissingKeyValue { .. }
            | OrmError::UnknownColumn { .. } => ErrorKind::Schema,
            OrmError::Storage(_) | OrmError::Open { .. } | OrmError::Directory { .. } => ErrorKind::Storage,
            OrmError::Mapping { .. } => ErrorKind::Mapping,
            OrmError::MissingForeignKeyValue { .. } | OrmError::UnknownForeignKey { .. } => ErrorKind::Relation,
        }
    }
}

pub type OrmResult<T> = std::result::Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classifies_variants() {
        assert_eq!(OrmError::MissingTable.kind(), ErrorKind::Schema);
        assert_eq!(OrmError::Storage(rusqlite::Error::InvalidQuery).kind(), ErrorKind::Storage);
        assert_eq!(
            OrmError::Mapping {
                column: "age".into(),
                expected: "integer",
                found: "text"
            }
            .kind(),
            ErrorKind::Mapping
        );
        assert_eq!(OrmError::MissingForeignKeyValue { relation: "id".into() }.kind(), ErrorKind::Relation);
    }
}
