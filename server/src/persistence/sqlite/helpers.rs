//! Shared encode/decode helpers for SQLite ↔ domain value conversions.
//!
//! Records hand their column values to the generic repository as
//! [`SqlValue`]s; filters arrive as JSON and are converted the same way.
//! Enum columns travel as their lowercase text form.

use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use crate::persistence::{PersistenceError, Record};

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// An owned value ready to bind to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

pub fn bind_value(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Integer(v) => query.bind(v),
        SqlValue::Real(v) => query.bind(v),
    }
}

/// Convert a JSON filter value. `None` means "match NULL".
pub fn json_to_sql(key: &str, value: &serde_json::Value) -> Result<SqlValue, PersistenceError> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::from(*b)),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .ok_or_else(|| PersistenceError::InvalidPayload(format!("bad number for {key}"))),
        Value::Array(_) | Value::Object(_) => Err(PersistenceError::InvalidPayload(format!(
            "filter value for {key} must be a scalar"
        ))),
    }
}

const META_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Map a filter key to one of `T`'s known column names.
///
/// The returned name is always a `'static` column from the record
/// definition, never caller text, so it is safe to splice into SQL.
pub fn resolve_column<T: Record>(key: &str) -> Result<&'static str, PersistenceError> {
    let wanted = camel_to_snake(key);
    META_COLUMNS
        .iter()
        .chain(T::COLUMNS.iter())
        .copied()
        .find(|column| *column == wanted)
        .ok_or_else(|| {
            PersistenceError::InvalidPayload(format!("unknown column {key:?} for {}", T::TABLE))
        })
}

/// `houseId` → `house_id`. Already-snake input passes through.
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn insert_sql<T: Record>() -> String {
    let columns: Vec<&str> = std::iter::once("id")
        .chain(T::COLUMNS.iter().copied())
        .chain(["created_at", "updated_at", "deleted_at"])
        .collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        columns.join(", "),
        placeholders
    )
}

pub fn update_sql<T: Record>() -> String {
    let assignments: Vec<String> = T::COLUMNS
        .iter()
        .chain(["updated_at", "deleted_at"].iter())
        .map(|column| format!("{column} = ?"))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE id = ?",
        T::TABLE,
        assignments.join(", ")
    )
}
