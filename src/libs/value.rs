//! Scalar values and the fixed field-type table.
//!
//! [`Value`] is the single currency exchanged between entities, rows and
//! SQLite. [`FieldValue`] is implemented for every Rust type an entity field
//! may hold; it fixes the column's storage type and the coercions used when
//! reading a stored value back. Types without an implementation simply cannot
//! be registered as columns.

use crate::libs::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use std::fmt;

/// SQL storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SqlType {
    #[default]
    Text,
    Integer,
    BigInt,
    Float,
    Int,
    Double,
    Blob,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Int => "INT",
            SqlType::Double => "DOUBLE",
            SqlType::Blob => "BLOB",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed scalar held by a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Blob(_) => "blob",
        }
    }

    /// Integer view of the value, parsing text when needed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::Boolean(v) => Some(*v as i64),
            Value::Date(v) => Some(v.timestamp_millis()),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Double(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view of the value. Blobs and NULL have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::Blob(_) => None,
            Value::Text(v) => Some(v.clone()),
            Value::Date(v) => Some(v.timestamp_millis().to_string()),
            other => Some(other.to_string()),
        }
    }

    fn mismatch(&self, column: &str, expected: &'static str) -> OrmError {
        OrmError::Mapping {
            column: column.to_string(),
            expected,
            found: self.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Text(v) => f.write_str(v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.timestamp_millis()),
            Value::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            Value::Long(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v as f64)),
            Value::Double(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Boolean(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            Value::Date(v) => ToSqlOutput::Owned(SqlValue::Integer(v.timestamp_millis())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Long(v),
            ValueRef::Real(v) => Value::Double(v),
            ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value.into())
            }
        })*
    };
}

value_from! {
    String => Text,
    &str => Text,
    i16 => Integer,
    i32 => Integer,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
    Vec<u8> => Blob,
    DateTime<Utc> => Date,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A Rust type usable as an entity column.
///
/// `to_value` returning [`Value::Null`] means "absent": the mapper leaves the
/// column out of the row so partial updates only touch supplied fields.
pub trait FieldValue: Sized {
    fn sql_type() -> SqlType;
    fn to_value(&self) -> Value;
    fn from_value(column: &str, value: &Value) -> OrmResult<Self>;
}

impl FieldValue for String {
    fn sql_type() -> SqlType {
        SqlType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        value.as_text().ok_or_else(|| value.mismatch(column, "text"))
    }
}

macro_rules! integer_field {
    ($($ty:ty => $sql:ident, $variant:ident, $name:literal);* $(;)?) => {
        $(impl FieldValue for $ty {
            fn sql_type() -> SqlType {
                SqlType::$sql
            }

            fn to_value(&self) -> Value {
                Value::$variant((*self).into())
            }

            fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
                value
                    .as_i64()
                    .and_then(|v| <$ty>::try_from(v).ok())
                    .ok_or_else(|| value.mismatch(column, $name))
            }
        })*
    };
}

integer_field! {
    i32 => Integer, Integer, "integer";
    i64 => BigInt, Long, "long";
    i16 => Int, Integer, "short";
}

impl FieldValue for f32 {
    fn sql_type() -> SqlType {
        SqlType::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        value.as_f64().map(|v| v as f32).ok_or_else(|| value.mismatch(column, "float"))
    }
}

impl FieldValue for f64 {
    fn sql_type() -> SqlType {
        SqlType::Double
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        value.as_f64().ok_or_else(|| value.mismatch(column, "double"))
    }
}

impl FieldValue for bool {
    fn sql_type() -> SqlType {
        SqlType::Text
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    // Anything other than "true" or a non-zero number reads back as false.
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Boolean(v) => Ok(*v),
            Value::Text(v) => Ok(v == "true" || v == "1"),
            Value::Integer(_) | Value::Long(_) => Ok(value.as_i64() != Some(0)),
            other => Err(other.mismatch(column, "boolean")),
        }
    }
}

impl FieldValue for char {
    fn sql_type() -> SqlType {
        SqlType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        value
            .as_text()
            .and_then(|v| v.chars().next())
            .ok_or_else(|| value.mismatch(column, "char"))
    }
}

impl FieldValue for Vec<u8> {
    fn sql_type() -> SqlType {
        SqlType::Blob
    }

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Blob(v) => Ok(v.clone()),
            Value::Text(v) => Ok(v.clone().into_bytes()),
            other => Err(other.mismatch(column, "blob")),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn sql_type() -> SqlType {
        SqlType::BigInt
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        if let Value::Date(v) = value {
            return Ok(*v);
        }
        value
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(|| value.mismatch(column, "date"))
    }
}

impl FieldValue for NaiveDateTime {
    fn sql_type() -> SqlType {
        SqlType::BigInt
    }

    fn to_value(&self) -> Value {
        Value::Date(self.and_utc())
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        DateTime::<Utc>::from_value(column, value).map(|v| v.naive_utc())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn sql_type() -> SqlType {
        T::sql_type()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map(FieldValue::to_value).unwrap_or(Value::Null)
    }

    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(column, other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_table() {
        assert_eq!(String::sql_type(), SqlType::Text);
        assert_eq!(i32::sql_type(), SqlType::Integer);
        assert_eq!(i64::sql_type(), SqlType::BigInt);
        assert_eq!(f32::sql_type(), SqlType::Float);
        assert_eq!(i16::sql_type(), SqlType::Int);
        assert_eq!(f64::sql_type(), SqlType::Double);
        assert_eq!(Vec::<u8>::sql_type(), SqlType::Blob);
        assert_eq!(bool::sql_type(), SqlType::Text);
        assert_eq!(SqlType::default(), SqlType::Text);
        assert_eq!(Option::<i64>::sql_type(), SqlType::BigInt);
    }

    #[test]
    fn test_integer_coercion_from_sqlite_long() {
        assert_eq!(i32::from_value("age", &Value::Long(42)).unwrap(), 42);
        assert_eq!(i32::from_value("age", &Value::Text(" 7 ".into())).unwrap(), 7);
        assert!(i16::from_value("age", &Value::Long(100_000)).is_err());
        assert!(i32::from_value("age", &Value::Blob(vec![1])).is_err());
    }

    #[test]
    fn test_boolean_reads_text_and_numbers() {
        assert!(bool::from_value("flag", &Value::Text("true".into())).unwrap());
        assert!(bool::from_value("flag", &Value::Text("1".into())).unwrap());
        assert!(!bool::from_value("flag", &Value::Text("yes".into())).unwrap());
        assert!(bool::from_value("flag", &Value::Long(1)).unwrap());
        assert!(!bool::from_value("flag", &Value::Long(0)).unwrap());
    }

    #[test]
    fn test_dates_round_trip_through_epoch_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let stored = Value::Long(at.timestamp_millis());
        assert_eq!(DateTime::<Utc>::from_value("at", &stored).unwrap(), at);
        assert_eq!(at.to_value().as_i64(), Some(1_700_000_000_123));
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<String>::from_value("name", &Value::Null).unwrap(), None);
        assert_eq!(Some(3i32).to_value(), Value::Integer(3));
        assert!(None::<i32>.to_value().is_null());
        assert!(String::from_value("name", &Value::Null).is_err());
    }
}
