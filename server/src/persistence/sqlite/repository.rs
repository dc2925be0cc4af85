//! One SQLite repository implementation shared by every [`Record`] type.

use sqlx::sqlite::SqliteRow;
use sqlx::{SqliteConnection, SqlitePool};
use std::marker::PhantomData;
use tracing::debug;

use super::helpers::{bind_value, insert_sql, json_to_sql, resolve_column, update_sql, SqlValue};
use crate::persistence::traits::{ListFilter, Record, Repository};
use crate::persistence::{generate_id, now_millis, PersistenceError, Stamps};

/// SQLite implementation of [`Repository`] for any record type.
pub struct SqliteRepository<T> {
    pool: SqlitePool,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> SqliteRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }
}

impl<T: Record> Repository<T> for SqliteRepository<T> {
    async fn create(&self, draft: T::Draft) -> Result<T, PersistenceError> {
        let record = T::from_draft(generate_id(), draft, Stamps::new(now_millis()));
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(PersistenceError::repository(T::TABLE))?;
        insert(&mut conn, &record).await?;
        debug!(table = T::TABLE, id = record.id(), "Record created");
        Ok(record)
    }

    async fn read(&self, id: &str) -> Result<T, PersistenceError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(PersistenceError::repository(T::TABLE))?;
        fetch_optional::<T>(&mut conn, id)
            .await?
            .ok_or_else(|| PersistenceError::not_found(T::TABLE, id))
    }

    async fn update(&self, id: &str, patch: T::Patch) -> Result<T, PersistenceError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(PersistenceError::repository(T::TABLE))?;

        let mut record = fetch_optional::<T>(&mut tx, id)
            .await?
            .ok_or_else(|| PersistenceError::not_found(T::TABLE, id))?;
        record.apply_patch(patch);
        let stamps = record.stamps_mut();
        stamps.updated_at = now_millis().max(stamps.created_at);

        let sql = update_sql::<T>();
        let mut query = sqlx::query(&sql);
        for value in record.values() {
            query = bind_value(query, value);
        }
        let result = query
            .bind(record.stamps().updated_at)
            .bind(record.stamps().deleted_at)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::repository(T::TABLE))?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found(T::TABLE, id));
        }

        tx.commit()
            .await
            .map_err(PersistenceError::repository(T::TABLE))?;
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::repository(T::TABLE))?;
        debug!(
            table = T::TABLE,
            id,
            removed = result.rows_affected(),
            "Record deleted"
        );
        Ok(())
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<T>, PersistenceError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        for (key, value) in filter.iter() {
            let column = resolve_column::<T>(key)?;
            match json_to_sql(key, value)? {
                SqlValue::Null => clauses.push(format!("{column} IS NULL")),
                value => {
                    clauses.push(format!("{column} = ?"));
                    values.push(value);
                }
            }
        }

        let mut sql = format!("SELECT * FROM {}", T::TABLE);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(PersistenceError::repository(T::TABLE))?;
        decode_rows(&rows)
    }
}

pub(crate) async fn fetch_optional<T: Record>(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<T>, PersistenceError> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", T::TABLE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(PersistenceError::repository(T::TABLE))?;
    row.as_ref()
        .map(T::from_row)
        .transpose()
        .map_err(PersistenceError::repository(T::TABLE))
}

pub(crate) async fn insert<T: Record>(
    conn: &mut SqliteConnection,
    record: &T,
) -> Result<(), PersistenceError> {
    let sql = insert_sql::<T>();
    let mut query = sqlx::query(&sql).bind(record.id().to_string());
    for value in record.values() {
        query = bind_value(query, value);
    }
    let stamps = record.stamps();
    query
        .bind(stamps.created_at)
        .bind(stamps.updated_at)
        .bind(stamps.deleted_at)
        .execute(&mut *conn)
        .await
        .map_err(PersistenceError::repository(T::TABLE))?;
    Ok(())
}

pub(crate) fn decode_rows<T: Record>(rows: &[SqliteRow]) -> Result<Vec<T>, PersistenceError> {
    rows.iter()
        .map(T::from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(PersistenceError::repository(T::TABLE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::entities::performance::{HouseDraft, HousePatch, ParticipantDraft};
    use crate::persistence::entities::{House, Participant};
    use crate::persistence::sqlite::{Database, SchemaFamily};
    use scoring::Gender;

    async fn houses() -> (Database, SqliteRepository<House>) {
        let db = Database::new_in_memory(SchemaFamily::Performance)
            .await
            .unwrap();
        let repo = SqliteRepository::new(db.pool().clone());
        (db, repo)
    }

    fn red() -> HouseDraft {
        HouseDraft {
            name: "Red".to_string(),
            abbreviation: Some("R".to_string()),
            color: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_read_round_trips() {
        let (_db, repo) = houses().await;
        let created = repo.create(red()).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.stamps.created_at, created.stamps.updated_at);

        let read = repo.read(&created.id).await.unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_update_merges_and_bumps_timestamp() {
        let (_db, repo) = houses().await;
        let created = repo.create(red()).await.unwrap();

        let patch = HousePatch {
            color: Some(Some("#f00".to_string())),
            ..Default::default()
        };
        let updated = repo.update(&created.id, patch).await.unwrap();

        assert_eq!(updated.name, "Red");
        assert_eq!(updated.abbreviation.as_deref(), Some("R"));
        assert_eq!(updated.color.as_deref(), Some("#f00"));
        assert_eq!(updated.stamps.created_at, created.stamps.created_at);
        assert!(updated.stamps.updated_at >= updated.stamps.created_at);
        assert_eq!(repo.read(&created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let (_db, repo) = houses().await;

        let err = repo.read("nope").await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::NotFound { table: "house", .. }
        ));

        let err = repo.update("nope", HousePatch::default()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));

        repo.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let (_db, repo) = houses().await;
        let created = repo.create(red()).await.unwrap();
        repo.delete(&created.id).await.unwrap();
        assert!(repo.read(&created.id).await.is_err());
        assert!(repo.list(&ListFilter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_by_field_name_and_null() {
        let (db, repo) = houses().await;
        let red = repo.create(red()).await.unwrap();
        let blue = repo
            .create(HouseDraft {
                name: "Blue".to_string(),
                abbreviation: None,
                color: None,
            })
            .await
            .unwrap();

        let participants: SqliteRepository<Participant> = SqliteRepository::new(db.pool().clone());
        for (first, house) in [("Ann", &red.id), ("Bo", &red.id), ("Cy", &blue.id)] {
            participants
                .create(ParticipantDraft {
                    first_name: first.to_string(),
                    last_name: "Lee".to_string(),
                    dob: "2012-01-01".to_string(),
                    gender: Gender::Female,
                    house_id: house.clone(),
                })
                .await
                .unwrap();
        }

        let in_red = participants
            .list(&ListFilter::new().eq("houseId", red.id.as_str()))
            .await
            .unwrap();
        assert_eq!(in_red.len(), 2);

        let by_column = participants
            .list(&ListFilter::new().eq("house_id", blue.id.as_str()).eq("gender", "female"))
            .await
            .unwrap();
        assert_eq!(by_column.len(), 1);
        assert_eq!(by_column[0].first_name, "Cy");

        let unabbreviated = repo
            .list(&ListFilter::new().eq("abbreviation", serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(unabbreviated.len(), 1);
        assert_eq!(unabbreviated[0].id, blue.id);

        let err = repo
            .list(&ListFilter::new().eq("shoeSize", 9))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let db = Database::new_in_memory(SchemaFamily::Performance)
            .await
            .unwrap();
        let participants: SqliteRepository<Participant> = SqliteRepository::new(db.pool().clone());
        let err = participants
            .create(ParticipantDraft {
                first_name: "Ann".to_string(),
                last_name: "Lee".to_string(),
                dob: "2012-01-01".to_string(),
                gender: Gender::Female,
                house_id: "missing".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Repository {
                table: "participant",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_closed_pool_surfaces_repository_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(crate::persistence::sqlite::StoreOptions::new(
            dir.path().join("s.db"),
            SchemaFamily::Performance,
        ))
        .await
        .unwrap();
        let repo: SqliteRepository<House> = SqliteRepository::new(db.pool().clone());
        db.close().await.unwrap();

        let err = repo.list(&ListFilter::new()).await.unwrap_err();
        match err {
            PersistenceError::Repository { table, source } => {
                assert_eq!(table, "house");
                assert!(matches!(source, sqlx::Error::PoolClosed));
            }
            other => panic!("expected repository error, got {other:?}"),
        }
    }
}
