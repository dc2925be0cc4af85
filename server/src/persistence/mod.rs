mod contexts;
pub mod entities;
pub mod sqlite;
pub mod traits;

pub use contexts::{MainContext, PerformanceContext, SessionContext, TeamContext};
pub use entities::Stamps;
pub use traits::{ListFilter, Record, Repository};

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to open store at {}: {reason}", path.display())]
    StoreOpen { path: PathBuf, reason: String },
    #[error("Store is closed")]
    StoreClosed,
    #[error("Repository error on {table}: {source}")]
    Repository {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("{table} not found: {id}")]
    NotFound { table: &'static str, id: String },
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistenceError {
    /// Adapter for `map_err` that tags an sqlx failure with its table.
    pub(crate) fn repository(table: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| PersistenceError::Repository { table, source }
    }

    pub(crate) fn not_found(table: &'static str, id: &str) -> Self {
        PersistenceError::NotFound {
            table,
            id: id.to_string(),
        }
    }
}

/// Generate a new record id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current unix time in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
