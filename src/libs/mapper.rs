//! Conversion between entities and rows.
//!
//! Marshalling leaves NULL fields out of the row, so an update only touches the
//! columns the caller actually supplied. Unmarshalling ignores row columns the
//! entity does not declare and skips fields whose stored value cannot be coerced.

use crate::libs::messages::Message;
use crate::libs::schema::{Entity, EntitySchema};
use crate::libs::value::Value;
use crate::msg_debug;

/// Ordered column/value pairs. Column lookups ignore ASCII case, like SQLite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|i| &self.values[i].1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Sets `column`, replacing any previous value while keeping its position.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.position(column) {
            Some(i) => self.values[i].1 = value,
            None => self.values.push((column.to_string(), value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.position(column).map(|i| self.values.remove(i).1)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn from_sqlite(row: &rusqlite::Row, names: &[String]) -> rusqlite::Result<Row> {
        let mut values = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            values.push((name.clone(), Value::from(row.get_ref(i)?)));
        }
        Ok(Row { values })
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.values.iter().position(|(c, _)| c.eq_ignore_ascii_case(column))
    }
}

/// Marshals `entity`. The primary key is left out unless `include_pk` is set.
pub fn to_row<E: Entity>(schema: &EntitySchema<E>, entity: &E, include_pk: bool) -> Row {
    let primary_key = schema.descriptor.primary_key();
    let mut row = Row::new();

    for column in &schema.columns {
        if !include_pk && primary_key.is_some_and(|pk| pk.eq_ignore_ascii_case(&column.name)) {
            continue;
        }
        let value = (column.read)(entity);
        if !value.is_null() {
            row.values.push((column.name.clone(), value));
        }
    }

    row
}

/// Builds a fresh entity from `row`.
pub fn from_row<E: Entity>(schema: &EntitySchema<E>, row: &Row) -> E {
    let mut entity = E::default();

    for column in &schema.columns {
        let Some(value) = row.get(&column.name) else {
            continue;
        };
        if let Err(error) = (column.write)(&mut entity, value) {
            msg_debug!(Message::FieldSkipped {
                column: column.name.clone(),
                error: error.to_string(),
            });
        }
    }

    entity
}
