//! Record and repository abstractions shared by every table.
//!
//! A [`Record`] describes one table: its name, its data columns and how a
//! row is built from a create payload or changed by an update payload. A
//! single generic [`Repository`] implementation then provides CRUD for all
//! of them, so entity modules contain only data definitions.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send` and can be driven from `tokio::spawn`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use std::collections::BTreeMap;
use std::future::Future;

use super::sqlite::helpers::SqlValue;
use super::{PersistenceError, Stamps};

pub trait Record:
    for<'r> sqlx::FromRow<'r, SqliteRow> + Serialize + Clone + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;
    /// Data columns in bind order, excluding `id` and the timestamp columns.
    const COLUMNS: &'static [&'static str];

    /// Create payload: the record minus generated fields.
    type Draft: DeserializeOwned + Send;
    /// Update payload: every field optional.
    type Patch: DeserializeOwned + Send;

    fn from_draft(id: String, draft: Self::Draft, stamps: Stamps) -> Self;
    fn apply_patch(&mut self, patch: Self::Patch);
    /// Values for [`Record::COLUMNS`], in the same order.
    fn values(&self) -> Vec<SqlValue>;

    fn id(&self) -> &str;
    fn stamps(&self) -> &Stamps;
    fn stamps_mut(&mut self) -> &mut Stamps;
}

/// Uniform CRUD over one record type.
pub trait Repository<T: Record>: Send + Sync {
    fn create(
        &self,
        draft: T::Draft,
    ) -> impl Future<Output = Result<T, PersistenceError>> + Send;
    fn read(&self, id: &str) -> impl Future<Output = Result<T, PersistenceError>> + Send;
    fn update(
        &self,
        id: &str,
        patch: T::Patch,
    ) -> impl Future<Output = Result<T, PersistenceError>> + Send;
    /// Hard delete. Deleting an id that does not exist succeeds.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn list(
        &self,
        filter: &ListFilter,
    ) -> impl Future<Output = Result<Vec<T>, PersistenceError>> + Send;
}

/// Column equality filter for [`Repository::list`].
///
/// Keys may be JSON field names (`houseId`) or column names (`house_id`).
/// A `null` value matches rows where the column is NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListFilter(BTreeMap<String, serde_json::Value>);

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
