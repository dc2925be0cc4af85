//! Session context registry: one live store per open session.
//!
//! Every session id gets a slot guarded by its own `tokio::sync::Mutex`, so
//! open and close transitions for one session are serialized while different
//! sessions open concurrently. A slot holds `Some(context)` while the session
//! is open and `None` otherwise. Slots are never removed from the map, which
//! keeps a single mutex per id for the life of the registry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn, Instrument};

use crate::persistence::sqlite::{
    session_store_path, Database, Migrations, SchemaFamily, StoreOptions,
};
use crate::persistence::{MainContext, PersistenceError, Repository, SessionContext};

type Slot = Arc<Mutex<Option<Arc<SessionContext>>>>;

pub struct SessionRegistry {
    data_dir: PathBuf,
    migrations: Migrations,
    main: Arc<MainContext>,
    slots: RwLock<HashMap<String, Slot>>,
    opened: AtomicU64,
}

impl SessionRegistry {
    pub fn new(data_dir: impl Into<PathBuf>, migrations: Migrations, main: Arc<MainContext>) -> Self {
        Self {
            data_dir: data_dir.into(),
            migrations,
            main,
            slots: RwLock::new(HashMap::new()),
            opened: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    /// Return the open context for `session_id`, opening its store first if
    /// needed.
    ///
    /// Nothing is registered unless the store opened and migrated. Dropping
    /// the returned future part-way leaves the slot empty.
    pub async fn ensure(&self, session_id: &str) -> Result<Arc<SessionContext>, PersistenceError> {
        validate_session_id(session_id)?;
        let slot = self.slot(session_id).await;
        self.open_slot(&slot, session_id)
            .instrument(tracing::info_span!("session", id = %session_id))
            .await
    }

    /// Close and forget the store for `session_id`. Absent sessions are a
    /// no-op.
    pub async fn release(&self, session_id: &str) -> Result<(), PersistenceError> {
        let Some(slot) = self.slots.read().await.get(session_id).cloned() else {
            return Ok(());
        };
        close_slot(&slot)
            .instrument(tracing::info_span!("session", id = %session_id))
            .await
    }

    /// Release every open session. Failures are logged and skipped.
    pub async fn release_all(&self) {
        let ids: Vec<String> = self.slots.read().await.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.release(&id).await {
                warn!(session_id = %id, error = %e, "Failed to release session store");
            }
        }
    }

    #[cfg(test)]
    pub async fn is_open(&self, session_id: &str) -> bool {
        let Some(slot) = self.slots.read().await.get(session_id).cloned() else {
            return false;
        };
        let open = slot.lock().await.is_some();
        open
    }

    /// How many times a session store has actually been opened.
    pub fn opened_count(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    async fn slot(&self, session_id: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(session_id) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(session_id.to_string()).or_default())
    }

    async fn open_slot(
        &self,
        slot: &Slot,
        session_id: &str,
    ) -> Result<Arc<SessionContext>, PersistenceError> {
        let mut guard = slot.lock().await;
        if let Some(ctx) = guard.as_ref() {
            return Ok(Arc::clone(ctx));
        }

        let family = self.resolve_family(session_id).await?;
        let path = session_store_path(&self.data_dir, session_id);
        let options = StoreOptions::new(path, family).with_migrations(self.migrations.clone());
        let db = Database::open(options).await?;
        self.opened.fetch_add(1, Ordering::Relaxed);

        let ctx = Arc::new(SessionContext::from_database(db)?);
        *guard = Some(Arc::clone(&ctx));
        info!(
            %family,
            migrations = ctx.database().migrations_applied(),
            "Session store opened"
        );
        Ok(ctx)
    }

    async fn resolve_family(&self, session_id: &str) -> Result<SchemaFamily, PersistenceError> {
        let session = self.main.sessions.read(session_id).await?;
        let discipline = self.main.disciplines.read(&session.discipline_id).await?;
        debug!(discipline = %discipline.name, kind = %discipline.kind, "Resolved schema family");
        Ok(SchemaFamily::from(discipline.kind))
    }
}

async fn close_slot(slot: &Slot) -> Result<(), PersistenceError> {
    let mut guard = slot.lock().await;
    let Some(ctx) = guard.take() else {
        return Ok(());
    };
    match ctx.close().await {
        Ok(()) | Err(PersistenceError::StoreClosed) => {
            info!("Session store released");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Session ids name files on disk, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_session_id(session_id: &str) -> Result<(), PersistenceError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidSessionId(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::entities::catalog::{DisciplineDraft, SessionDraft};
    use scoring::DisciplineKind;
    use std::time::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        registry: Arc<SessionRegistry>,
        main: Arc<MainContext>,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(StoreOptions::new(dir.path().join("main.db"), SchemaFamily::Main))
            .await
            .unwrap();
        let main = Arc::new(MainContext::new(db));
        let registry = Arc::new(SessionRegistry::new(
            dir.path(),
            Migrations::Embedded,
            Arc::clone(&main),
        ));
        Fixture {
            _dir: dir,
            registry,
            main,
        }
    }

    async fn add_session(main: &MainContext, kind: DisciplineKind, name: &str) -> String {
        let discipline = main
            .disciplines
            .create(DisciplineDraft {
                name: name.to_string(),
                description: None,
                kind,
            })
            .await
            .unwrap();
        main.sessions
            .create(SessionDraft {
                title: format!("{name} day"),
                date: "2024-05-01".to_string(),
                time: None,
                location: "Field".to_string(),
                discipline_id: discipline.id,
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn session_ids_must_be_file_safe() {
        assert!(validate_session_id("abc-123_X").is_ok());
        for bad in ["", "../etc", "a/b", "a b", "a.db"] {
            assert!(matches!(
                validate_session_id(bad),
                Err(PersistenceError::InvalidSessionId(_))
            ));
        }
    }

    #[tokio::test]
    async fn ensure_opens_the_family_of_the_discipline() {
        let f = fixture().await;
        let athletics = add_session(&f.main, DisciplineKind::Performance, "Athletics").await;
        let football = add_session(&f.main, DisciplineKind::Team, "Football").await;

        let ctx = f.registry.ensure(&athletics).await.unwrap();
        assert_eq!(ctx.family(), SchemaFamily::Performance);
        let ctx = f.registry.ensure(&football).await.unwrap();
        assert_eq!(ctx.family(), SchemaFamily::Team);

        assert!(f
            .registry
            .data_dir()
            .join("sessions")
            .join(format!("{athletics}.db"))
            .exists());
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let f = fixture().await;
        let id = add_session(&f.main, DisciplineKind::Performance, "Athletics").await;

        let first = f.registry.ensure(&id).await.unwrap();
        let second = f.registry.ensure(&id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(f.registry.opened_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_ensure_opens_once() {
        let f = fixture().await;
        let id = add_session(&f.main, DisciplineKind::Performance, "Swimming").await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&f.registry);
                let id = id.clone();
                tokio::spawn(async move { registry.ensure(&id).await.unwrap() })
            })
            .collect();

        let mut contexts = Vec::new();
        for handle in handles {
            contexts.push(handle.await.unwrap());
        }
        assert_eq!(f.registry.opened_count(), 1);
        assert!(contexts.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn unknown_session_registers_nothing() {
        let f = fixture().await;
        let err = f.registry.ensure("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::NotFound {
                table: "session",
                ..
            }
        ));
        assert!(!f.registry.is_open("ghost").await);
        assert_eq!(f.registry.opened_count(), 0);

        let err = f.registry.ensure("../main").await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidSessionId(_)));
    }

    #[tokio::test]
    async fn release_closes_and_allows_reopen() {
        let f = fixture().await;
        let id = add_session(&f.main, DisciplineKind::Performance, "Athletics").await;

        let ctx = f.registry.ensure(&id).await.unwrap();
        assert!(f.registry.is_open(&id).await);

        f.registry.release(&id).await.unwrap();
        assert!(!f.registry.is_open(&id).await);
        assert!(ctx.database().is_closed());

        f.registry.release(&id).await.unwrap();
        f.registry.release("never-opened").await.unwrap();

        let reopened = f.registry.ensure(&id).await.unwrap();
        assert!(!reopened.database().is_closed());
        assert_eq!(f.registry.opened_count(), 2);
    }

    #[tokio::test]
    async fn failed_migration_registers_nothing_and_is_retried() {
        let f = fixture().await;
        let id = add_session(&f.main, DisciplineKind::Performance, "Athletics").await;

        let scripts = f._dir.path().join("scripts");
        let family_dir = scripts.join("performance");
        std::fs::create_dir_all(&family_dir).unwrap();
        std::fs::write(
            family_dir.join("0001_base.sql"),
            "CREATE TABLE house (id TEXT PRIMARY KEY NOT NULL);",
        )
        .unwrap();
        std::fs::write(family_dir.join("0002_next.sql"), "CREATE TABLE nope (;").unwrap();
        let registry = SessionRegistry::new(
            f._dir.path(),
            Migrations::Directory(scripts),
            Arc::clone(&f.main),
        );

        let err = registry.ensure(&id).await.unwrap_err();
        assert!(matches!(err, PersistenceError::StoreOpen { .. }));
        assert!(!registry.is_open(&id).await);
        assert_eq!(registry.opened_count(), 0);

        std::fs::write(
            family_dir.join("0002_next.sql"),
            "CREATE TABLE participant (id TEXT PRIMARY KEY NOT NULL);",
        )
        .unwrap();
        let ctx = registry.ensure(&id).await.unwrap();
        assert_eq!(ctx.family(), SchemaFamily::Performance);
        assert_eq!(ctx.database().migrations_applied(), 1);
        assert_eq!(registry.opened_count(), 1);
        assert!(format!("{ctx:?}").contains("Performance"));
    }

    #[tokio::test]
    async fn unwritable_store_path_registers_nothing() {
        let f = fixture().await;
        let id = add_session(&f.main, DisciplineKind::Team, "Hockey").await;
        let sessions = f._dir.path().join("sessions");
        std::fs::write(&sessions, b"not a directory").unwrap();

        let err = f.registry.ensure(&id).await.unwrap_err();
        assert!(matches!(err, PersistenceError::StoreOpen { .. }));
        assert!(!f.registry.is_open(&id).await);

        std::fs::remove_file(&sessions).unwrap();
        f.registry.ensure(&id).await.unwrap();
        assert!(f.registry.is_open(&id).await);
        assert_eq!(f.registry.opened_count(), 1);
    }

    #[tokio::test]
    async fn abandoned_ensure_leaves_the_slot_empty() {
        let f = fixture().await;
        let id = add_session(&f.main, DisciplineKind::Performance, "Athletics").await;

        // Another transition holds the slot, so the caller gives up waiting.
        let slot = f.registry.slot(&id).await;
        let held = slot.lock().await;
        let attempt =
            tokio::time::timeout(Duration::from_millis(20), f.registry.ensure(&id)).await;
        assert!(attempt.is_err());
        drop(held);
        assert!(!f.registry.is_open(&id).await);
        assert_eq!(f.registry.opened_count(), 0);

        // Dropped part-way through the open itself.
        let attempt = tokio::time::timeout(Duration::ZERO, f.registry.ensure(&id)).await;
        if attempt.is_err() {
            assert!(!f.registry.is_open(&id).await);
            assert_eq!(f.registry.opened_count(), 0);
        }

        let ctx = f.registry.ensure(&id).await.unwrap();
        assert!(!ctx.database().is_closed());
        assert_eq!(f.registry.opened_count(), 1);
    }

    #[tokio::test]
    async fn release_all_closes_everything() {
        let f = fixture().await;
        let a = add_session(&f.main, DisciplineKind::Performance, "Athletics").await;
        let b = add_session(&f.main, DisciplineKind::Team, "Netball").await;
        f.registry.ensure(&a).await.unwrap();
        f.registry.ensure(&b).await.unwrap();

        f.registry.release_all().await;
        assert!(!f.registry.is_open(&a).await);
        assert!(!f.registry.is_open(&b).await);
    }
}
