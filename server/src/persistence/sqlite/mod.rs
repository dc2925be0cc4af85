//! SQLite-backed store and repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: one writer and multiple concurrent readers.
//! - **Foreign keys enabled**: enforced at the connection level.
//! - **Versioned migrations** per [`SchemaFamily`], either embedded with
//!   `sqlx::migrate!` from `migrations/<family>/` or read from a directory at
//!   open time. Applied versions are tracked in `_sqlx_migrations`.
//!
//! ## Repository types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`SqliteRepository<T>`] | CRUD for any [`Record`](crate::persistence::Record) |
//! | [`SqliteResultsWriter`] | Atomic result-batch upsert plus event completion |
//!
//! Enum columns are stored as `TEXT` and round-tripped through the shared
//! helpers in [`helpers`].

mod database;
mod repository;
mod results_repo;
pub(crate) mod helpers;

pub use database::{session_store_path, Database, Migrations, SchemaFamily, StoreOptions};
pub use repository::SqliteRepository;
pub use results_repo::{EventCompletion, SqliteResultsWriter};
