//! Entity registration and the schema registry.
//!
//! An entity declares its table once, through [`Entity::schema`], by handing
//! typed accessor functions to a [`SchemaBuilder`]. The builder turns them into
//! an [`EntitySchema`]: the plain [`EntityDescriptor`] used for migrations and
//! SQL generation, plus the accessor table the mapper and the relation
//! resolver use to read and write fields without reflection.
//!
//! ## Usage
//!
//! ```rust
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
//! let schema = relorm::libs::schema::describe::<Note>();
//! assert_eq!(schema.descriptor().table_name(), Some("notes"));
//! ```

use crate::libs::error::{OrmError, OrmResult};
use crate::libs::messages::Message;
use crate::libs::relation::{ManyField, OneField, Relation, RelationDescriptor, RelationField, RelationKind};
use crate::libs::value::{FieldValue, SqlType, Value};
use crate::msg_warning;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A persisted record type.
///
/// `Default` supplies the blank instance that rows are unmarshalled into.
pub trait Entity: Default + 'static {
    fn schema() -> EntitySchema<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: SqlType,
    pub primary_key: bool,
}

/// Table-level metadata derived from an entity declaration.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    table_name: Option<String>,
    columns: Vec<ColumnDescriptor>,
    primary_key: Option<String>,
    relations: Vec<RelationDescriptor>,
}

impl EntityDescriptor {
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn require_table(&self) -> OrmResult<&str> {
        self.table_name().ok_or(OrmError::MissingTable)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn require_primary_key(&self) -> OrmResult<&str> {
        self.primary_key().ok_or_else(|| OrmError::MissingPrimaryKey {
            table: self.table_name().unwrap_or_default().to_string(),
        })
    }

    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }
}

pub(crate) struct ColumnAccess<E> {
    pub name: String,
    pub read: Box<dyn Fn(&E) -> Value + Send + Sync>,
    pub write: Box<dyn Fn(&mut E, &Value) -> OrmResult<()> + Send + Sync>,
}

/// Descriptor plus the typed accessor table for one entity type.
pub struct EntitySchema<E> {
    pub(crate) descriptor: Arc<EntityDescriptor>,
    pub(crate) columns: Vec<ColumnAccess<E>>,
    pub(crate) relations: Vec<Box<dyn RelationField<E>>>,
}

impl<E: Entity> EntitySchema<E> {
    pub fn builder() -> SchemaBuilder<E> {
        SchemaBuilder {
            table: None,
            columns: Vec::new(),
            access: Vec::new(),
            primary_key: None,
            relations: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }
}

pub struct SchemaBuilder<E> {
    table: Option<String>,
    columns: Vec<ColumnDescriptor>,
    access: Vec<ColumnAccess<E>>,
    primary_key: Option<String>,
    relations: Vec<Box<dyn RelationField<E>>>,
}

impl<E: Entity> SchemaBuilder<E> {
    pub fn table(mut self, name: &str) -> Self {
        if !name.trim().is_empty() {
            self.table = Some(name.to_string());
        }
        self
    }

    pub fn column<T: FieldValue + 'static>(self, name: &str, get: fn(&E) -> &T, set: fn(&mut E, T)) -> Self {
        self.push_column(name, T::sql_type(), false, get, set)
    }

    /// Registers a column whose storage type overrides the type table.
    pub fn column_as<T: FieldValue + 'static>(self, name: &str, sql_type: SqlType, get: fn(&E) -> &T, set: fn(&mut E, T)) -> Self {
        self.push_column(name, sql_type, false, get, set)
    }

    /// Registers the primary-key column. Only the first one counts.
    pub fn primary_key<T: FieldValue + 'static>(self, name: &str, get: fn(&E) -> &T, set: fn(&mut E, T)) -> Self {
        self.push_column(name, T::sql_type(), true, get, set)
    }

    pub fn one_to_one<R: Entity>(mut self, relation: Relation, get: fn(&E) -> &Option<R>, set: fn(&mut E, Option<R>)) -> Self {
        self.relations.push(Box::new(OneField::new(relation, get, set)));
        self
    }

    pub fn one_to_many<R: Entity>(mut self, relation: Relation, get: fn(&E) -> &Vec<R>, set: fn(&mut E, Vec<R>)) -> Self {
        self.relations.push(Box::new(ManyField::new(relation, RelationKind::OneToMany, get, set)));
        self
    }

    pub fn many_to_many<R: Entity>(mut self, relation: Relation, get: fn(&E) -> &Vec<R>, set: fn(&mut E, Vec<R>)) -> Self {
        self.relations.push(Box::new(ManyField::new(relation, RelationKind::ManyToMany, get, set)));
        self
    }

    pub fn build(self) -> EntitySchema<E> {
        let descriptor = EntityDescriptor {
            table_name: self.table,
            columns: self.columns,
            primary_key: self.primary_key,
            relations: self.relations.iter().map(|r| r.descriptor().clone()).collect(),
        };

        EntitySchema {
            descriptor: Arc::new(descriptor),
            columns: self.access,
            relations: self.relations,
        }
    }

    fn push_column<T: FieldValue + 'static>(mut self, name: &str, sql_type: SqlType, primary_key: bool, get: fn(&E) -> &T, set: fn(&mut E, T)) -> Self {
        let primary_key = if primary_key && self.primary_key.is_some() {
            msg_warning!(Message::DuplicatePrimaryKey(name.to_string()));
            false
        } else {
            primary_key
        };
        if primary_key {
            self.primary_key = Some(name.to_string());
        }

        self.columns.push(ColumnDescriptor {
            name: name.to_string(),
            sql_type,
            primary_key,
        });

        let column = name.to_string();
        self.access.push(ColumnAccess {
            name: name.to_string(),
            read: Box::new(move |entity| get(entity).to_value()),
            write: Box::new(move |entity, value| {
                set(entity, T::from_value(&column, value)?);
                Ok(())
            }),
        });
        self
    }
}

static SCHEMAS: OnceLock<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> = OnceLock::new();

/// Returns the cached schema for `E`, deriving it on first use.
pub fn describe<E: Entity>() -> Arc<EntitySchema<E>> {
    let cache = SCHEMAS.get_or_init(Default::default);
    let key = TypeId::of::<E>();

    if let Some(found) = cache.read().get(&key).cloned() {
        if let Ok(schema) = found.downcast::<EntitySchema<E>>() {
            return schema;
        }
    }

    // Derived outside the lock; relation accessors resolve related schemas lazily.
    let schema = Arc::new(E::schema());
    if schema.descriptor.table_name().is_none() {
        msg_warning!(Message::EntityWithoutTable(std::any::type_name::<E>().to_string()));
    }

    let stored = cache.write().entry(key).or_insert_with(|| schema.clone()).clone();
    stored.downcast::<EntitySchema<E>>().unwrap_or(schema)
}

pub fn descriptor_of<E: Entity>() -> Arc<EntityDescriptor> {
    describe::<E>().descriptor.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::relation::ActionMask;

    #[derive(Debug, Default)]
    struct Sample {
        id: Option<i32>,
        title: String,
        weight: Option<f64>,
        code: Option<i64>,
        slug: Option<String>,
        children: Vec<Child>,
    }

    #[derive(Debug, Default)]
    struct Child {
        sample_id: Option<i32>,
    }

    impl Entity for Child {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("children")
                .column("sample_id", |c| &c.sample_id, |c, v| c.sample_id = v)
                .build()
        }
    }

    impl Entity for Sample {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("samples")
                .primary_key("id", |s| &s.id, |s, v| s.id = v)
                .column("title", |s| &s.title, |s, v| s.title = v)
                .column("weight", |s| &s.weight, |s, v| s.weight = v)
                .column_as("code", SqlType::Integer, |s| &s.code, |s, v| s.code = v)
                .primary_key("slug", |s| &s.slug, |s, v| s.slug = v)
                .one_to_many(
                    Relation::new("id", "sample_id").actions(ActionMask::QUERY),
                    |s| &s.children,
                    |s, v| s.children = v,
                )
                .build()
        }
    }

    #[derive(Debug, Default)]
    struct Untabled {
        value: Option<String>,
    }

    impl Entity for Untabled {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder().column("value", |u| &u.value, |u, v| u.value = v).build()
        }
    }

    #[test]
    fn test_descriptor_columns_in_declaration_order() {
        let schema = describe::<Sample>();
        let descriptor = schema.descriptor();

        assert_eq!(descriptor.table_name(), Some("samples"));
        assert_eq!(descriptor.column_names(), vec!["id", "title", "weight", "code", "slug"]);
        assert_eq!(descriptor.column("weight").unwrap().sql_type, SqlType::Double);
        assert_eq!(descriptor.column("code").unwrap().sql_type, SqlType::Integer);
    }

    #[test]
    fn test_only_first_primary_key_counts() {
        let descriptor = descriptor_of::<Sample>();
        assert_eq!(descriptor.primary_key(), Some("id"));
        assert_eq!(descriptor.columns().iter().filter(|c| c.primary_key).count(), 1);
    }

    #[test]
    fn test_relations_are_described() {
        let descriptor = descriptor_of::<Sample>();
        let relation = &descriptor.relations()[0];

        assert_eq!(relation.kind(), RelationKind::OneToMany);
        assert_eq!(relation.foreign_key(), "sample_id");
        assert_eq!(relation.related_descriptor().table_name(), Some("children"));
    }

    #[test]
    fn test_missing_table_is_a_schema_error() {
        let descriptor = descriptor_of::<Untabled>();
        assert!(descriptor.table_name().is_none());
        assert!(matches!(descriptor.require_table(), Err(OrmError::MissingTable)));
        assert!(matches!(descriptor.require_primary_key(), Err(OrmError::MissingPrimaryKey { .. })));
    }

    #[test]
    fn test_describe_is_cached() {
        let first = describe::<Sample>();
        let second = describe::<Sample>();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
