//! SQLite database connection pool and migration runner.

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::persistence::PersistenceError;
use scoring::DisciplineKind;

static MAIN_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/main");
static PERFORMANCE_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/performance");
static TEAM_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/team");

/// Which table set a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaFamily {
    Main,
    Performance,
    Team,
}

impl SchemaFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFamily::Main => "main",
            SchemaFamily::Performance => "performance",
            SchemaFamily::Team => "team",
        }
    }

    fn embedded(&self) -> &'static Migrator {
        match self {
            SchemaFamily::Main => &MAIN_MIGRATIONS,
            SchemaFamily::Performance => &PERFORMANCE_MIGRATIONS,
            SchemaFamily::Team => &TEAM_MIGRATIONS,
        }
    }
}

impl From<DisciplineKind> for SchemaFamily {
    fn from(kind: DisciplineKind) -> Self {
        match kind {
            DisciplineKind::Performance => SchemaFamily::Performance,
            DisciplineKind::Team => SchemaFamily::Team,
        }
    }
}

impl fmt::Display for SchemaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where migration scripts come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Migrations {
    /// Compiled in from `server/migrations/<family>/`.
    #[default]
    Embedded,
    /// Read at open time from `<dir>/<family>/`.
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub path: PathBuf,
    pub family: SchemaFamily,
    pub migrations: Migrations,
    pub migrate: bool,
}

impl StoreOptions {
    pub fn new(path: impl Into<PathBuf>, family: SchemaFamily) -> Self {
        Self {
            path: path.into(),
            family,
            migrations: Migrations::Embedded,
            migrate: true,
        }
    }

    pub fn with_migrations(mut self, migrations: Migrations) -> Self {
        self.migrations = migrations;
        self
    }
}

/// Holds a connection pool to one SQLite store file.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    family: SchemaFamily,
    migrations: Migrations,
    migrations_applied: usize,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("family", &self.family)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Database {
    /// Open (or create) the store at `options.path` and, if requested, bring
    /// its schema up to date.
    pub async fn open(options: StoreOptions) -> Result<Self, PersistenceError> {
        let path = options.path.as_path();
        let open_error = |reason: String| PersistenceError::StoreOpen {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| open_error(e.to_string()))?;
        }

        let connect = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| open_error(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        let mut db = Self {
            pool,
            family: options.family,
            migrations: options.migrations,
            migrations_applied: 0,
        };

        if options.migrate {
            match db.migrate().await {
                Ok(applied) => db.migrations_applied = applied,
                Err(e) => {
                    db.pool.close().await;
                    return Err(open_error(e.to_string()));
                }
            }
        }

        info!(
            path = %path.display(),
            family = %db.family,
            applied = db.migrations_applied,
            "Store opened"
        );
        Ok(db)
    }

    /// Create an in-memory store for testing. Embedded migrations are applied.
    #[cfg(test)]
    pub async fn new_in_memory(family: SchemaFamily) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(PersistenceError::repository("sqlite_master"))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(PersistenceError::repository("sqlite_master"))?;

        let mut db = Self {
            pool,
            family,
            migrations: Migrations::Embedded,
            migrations_applied: 0,
        };
        db.migrations_applied = db.migrate().await?;
        Ok(db)
    }

    /// Apply pending migrations in version order. Returns how many ran.
    ///
    /// Each script runs in its own transaction and is recorded in
    /// `_sqlx_migrations`, so a failure leaves the store at the last
    /// complete version.
    pub async fn migrate(&self) -> Result<usize, PersistenceError> {
        if self.is_closed() {
            return Err(PersistenceError::StoreClosed);
        }

        let before = self.migration_count().await?;
        let outcome = match &self.migrations {
            Migrations::Embedded => self.family.embedded().run(&self.pool).await,
            Migrations::Directory(dir) => {
                match Migrator::new(dir.join(self.family.as_str())).await {
                    Ok(migrator) => migrator.run(&self.pool).await,
                    Err(e) => Err(e),
                }
            }
        };
        outcome.map_err(|e| PersistenceError::Repository {
            table: "_sqlx_migrations",
            source: e.into(),
        })?;
        let after = self.migration_count().await?;

        let applied = after.saturating_sub(before);
        debug!(family = %self.family, applied, "Migrations run");
        Ok(applied)
    }

    async fn migration_count(&self) -> Result<usize, PersistenceError> {
        let tracked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(PersistenceError::repository("sqlite_master"))?;
        if tracked == 0 {
            return Ok(0);
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(PersistenceError::repository("_sqlx_migrations"))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Flush the WAL into the main file and close every connection.
    pub async fn close(&self) -> Result<(), PersistenceError> {
        if self.is_closed() {
            return Err(PersistenceError::StoreClosed);
        }
        if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
        {
            warn!(family = %self.family, error = %e, "WAL checkpoint failed before close");
        }
        self.pool.close().await;
        debug!(family = %self.family, "Store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub fn family(&self) -> SchemaFamily {
        self.family
    }

    /// Migrations applied by the open that produced this handle.
    pub fn migrations_applied(&self) -> usize {
        self.migrations_applied
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Store file for one session: `<data>/sessions/<id>.db`.
pub fn session_store_path(data_dir: &Path, session_id: &str) -> PathBuf {
    data_dir.join("sessions").join(format!("{session_id}.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(db: &Database) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::new_in_memory(SchemaFamily::Main).await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn test_each_family_creates_its_tables() {
        let main = Database::new_in_memory(SchemaFamily::Main).await.unwrap();
        assert_eq!(table_names(&main).await, ["discipline", "event", "session"]);

        let performance = Database::new_in_memory(SchemaFamily::Performance)
            .await
            .unwrap();
        assert_eq!(
            table_names(&performance).await,
            ["event", "event_result", "house", "participant"]
        );

        let team = Database::new_in_memory(SchemaFamily::Team).await.unwrap();
        assert_eq!(
            table_names(&team).await,
            ["fixture", "fixture_team", "player", "team"]
        );
    }

    #[tokio::test]
    async fn test_reopen_applies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("s1.db");

        let first = Database::open(StoreOptions::new(&path, SchemaFamily::Performance))
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(first.migrations_applied(), 2);
        let schema_before = table_names(&first).await;
        first.close().await.unwrap();

        let second = Database::open(StoreOptions::new(&path, SchemaFamily::Performance))
            .await
            .unwrap();
        assert_eq!(second.migrations_applied(), 0);
        assert_eq!(table_names(&second).await, schema_before);
        second.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_migration_is_retried_on_next_open() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("migrations");
        let family_dir = scripts.join("team");
        std::fs::create_dir_all(&family_dir).unwrap();
        std::fs::write(
            family_dir.join("0001_base.sql"),
            "CREATE TABLE team (id TEXT PRIMARY KEY NOT NULL);",
        )
        .unwrap();
        std::fs::write(
            family_dir.join("0002_broken.sql"),
            "CREATE TABLE half_done (id TEXT); THIS IS NOT SQL;",
        )
        .unwrap();

        let path = dir.path().join("s.db");
        let options = StoreOptions::new(&path, SchemaFamily::Team)
            .with_migrations(Migrations::Directory(scripts.clone()));

        let err = Database::open(options.clone()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::StoreOpen { .. }));

        std::fs::write(
            family_dir.join("0002_broken.sql"),
            "CREATE TABLE half_done (id TEXT);",
        )
        .unwrap();

        let mut inspect = options.clone();
        inspect.migrate = false;
        let db = Database::open(inspect).await.unwrap();
        assert_eq!(table_names(&db).await, ["team"]);
        assert_eq!(db.migrate().await.unwrap(), 1);
        assert_eq!(table_names(&db).await, ["half_done", "team"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unwritable_path_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = Database::open(StoreOptions::new(blocker.join("s.db"), SchemaFamily::Main))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::StoreOpen { .. }));
    }

    #[tokio::test]
    async fn test_closed_store_rejects_lifecycle_calls() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(StoreOptions::new(dir.path().join("m.db"), SchemaFamily::Main))
            .await
            .unwrap();
        db.close().await.unwrap();

        assert!(db.is_closed());
        assert!(matches!(db.close().await, Err(PersistenceError::StoreClosed)));
        assert!(matches!(db.migrate().await, Err(PersistenceError::StoreClosed)));
    }

    #[test]
    fn session_store_path_is_deterministic() {
        let path = session_store_path(Path::new("/data"), "abc-123");
        assert_eq!(path, PathBuf::from("/data/sessions/abc-123.db"));
    }
}
