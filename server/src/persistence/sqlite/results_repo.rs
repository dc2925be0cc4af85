//! Transactional write path for a submitted result form.
//!
//! All result rows of the batch and the event's completion fields are
//! written in one transaction: either the whole submission lands or none of
//! it does.

use scoring::{EventStatus, Placing, RecordCheck};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info};

use super::helpers::{bind_value, update_sql};
use super::repository::fetch_optional;
use crate::persistence::entities::{Event, EventResult};
use crate::persistence::{generate_id, now_millis, PersistenceError, Record};

const UPSERT_RESULT: &str = r#"
    INSERT INTO event_result
        (id, event_id, participant_id, participant_type, position, points, measurement,
         created_at, updated_at, deleted_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
    ON CONFLICT (event_id, participant_id) DO UPDATE SET
        participant_type = excluded.participant_type,
        position         = excluded.position,
        points           = excluded.points,
        measurement      = excluded.measurement,
        updated_at       = MAX(excluded.updated_at, event_result.created_at)
    RETURNING *
"#;

// A claimed row temporarily holds its own id as participant, so rows can
// trade participants without tripping the (event, participant) index.
const PARK_RESULT: &str =
    "UPDATE event_result SET participant_id = id WHERE id = ? AND event_id = ?";

const DROP_STALE_RESULT: &str =
    "DELETE FROM event_result WHERE event_id = ? AND participant_id = ? AND id <> ?";

const REWRITE_RESULT: &str = r#"
    UPDATE event_result SET
        participant_id   = ?,
        participant_type = ?,
        position         = ?,
        points           = ?,
        measurement      = ?,
        updated_at       = MAX(?, created_at)
    WHERE id = ?
    RETURNING *
"#;

/// What a submission does to its event once the results are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCompletion {
    /// New best score; `None` keeps the stored one.
    pub best_score: Option<String>,
    pub record: RecordCheck,
}

/// Writes result batches for one performance store.
#[derive(Clone)]
pub struct SqliteResultsWriter {
    pool: SqlitePool,
}

impl SqliteResultsWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert `placings` for `event_id` and complete the event.
    ///
    /// `decide` sees the event as stored inside the transaction and returns
    /// the completion to apply.
    ///
    /// A placing whose `id` names a result row of this event rewrites that
    /// row, participant included; another row still held by the new
    /// participant is dropped. Every other placing is upserted on
    /// (event, participant). Either way re-submitting a batch updates in
    /// place and keeps ids and `created_at`.
    pub async fn record_results<F>(
        &self,
        event_id: &str,
        placings: &[Placing],
        decide: F,
    ) -> Result<(Vec<EventResult>, Event, EventCompletion), PersistenceError>
    where
        F: FnOnce(&Event) -> EventCompletion + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(PersistenceError::repository(EventResult::TABLE))?;

        let mut event = fetch_optional::<Event>(&mut tx, event_id)
            .await?
            .ok_or_else(|| PersistenceError::not_found(Event::TABLE, event_id))?;

        let now = now_millis();
        let claimed = claim_rows(&mut tx, event_id, placings).await?;
        let mut stored = Vec::with_capacity(placings.len());
        for placing in placings {
            let row = match placing.id.as_deref().filter(|id| claimed.contains(id)) {
                Some(id) => rewrite_row(&mut tx, event_id, id, placing, now).await?,
                None => upsert_row(&mut tx, event_id, placing, now).await?,
            };
            stored.push(
                EventResult::from_row(&row)
                    .map_err(PersistenceError::repository(EventResult::TABLE))?,
            );
        }
        debug!(
            event_id,
            rows = stored.len(),
            by_id = claimed.len(),
            "Result rows written"
        );

        let completion = decide(&event);
        if let Some(best) = &completion.best_score {
            event.best_score = Some(best.clone());
        }
        event.status = EventStatus::Complete;
        if let RecordCheck::Broken {
            new_record,
            record_holder,
        } = &completion.record
        {
            event.record = Some(new_record.clone());
            event.record_holder = Some(record_holder.clone());
            event.is_record_broken = true;
        }
        event.stamps.updated_at = now.max(event.stamps.created_at);

        let sql = update_sql::<Event>();
        let mut query = sqlx::query(&sql);
        for value in event.values() {
            query = bind_value(query, value);
        }
        query
            .bind(event.stamps.updated_at)
            .bind(event.stamps.deleted_at)
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::repository(Event::TABLE))?;

        tx.commit()
            .await
            .map_err(PersistenceError::repository(EventResult::TABLE))?;

        if completion.record.is_broken() {
            info!(
                event_id,
                record = event.record.as_deref().unwrap_or_default(),
                holder = event.record_holder.as_deref().unwrap_or_default(),
                "Event record broken"
            );
        }
        Ok((stored, event, completion))
    }
}

/// Park every row of this event that a placing names by id. Returns the ids
/// that matched.
async fn claim_rows<'p>(
    conn: &mut SqliteConnection,
    event_id: &str,
    placings: &'p [Placing],
) -> Result<HashSet<&'p str>, PersistenceError> {
    let mut claimed = HashSet::new();
    for id in placings.iter().filter_map(|p| p.id.as_deref()) {
        let parked = sqlx::query(PARK_RESULT)
            .bind(id)
            .bind(event_id)
            .execute(&mut *conn)
            .await
            .map_err(PersistenceError::repository(EventResult::TABLE))?;
        if parked.rows_affected() > 0 {
            claimed.insert(id);
        }
    }
    Ok(claimed)
}

async fn rewrite_row(
    conn: &mut SqliteConnection,
    event_id: &str,
    id: &str,
    placing: &Placing,
    now: i64,
) -> Result<SqliteRow, PersistenceError> {
    let dropped = sqlx::query(DROP_STALE_RESULT)
        .bind(event_id)
        .bind(&placing.participant_id)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(PersistenceError::repository(EventResult::TABLE))?;
    if dropped.rows_affected() > 0 {
        debug!(
            event_id,
            participant_id = %placing.participant_id,
            "Dropped stale result row"
        );
    }

    sqlx::query(REWRITE_RESULT)
        .bind(&placing.participant_id)
        .bind(placing.participant_type.as_str())
        .bind(i64::from(placing.position))
        .bind(placing.points)
        .bind(&placing.measurement)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(PersistenceError::repository(EventResult::TABLE))
}

async fn upsert_row(
    conn: &mut SqliteConnection,
    event_id: &str,
    placing: &Placing,
    now: i64,
) -> Result<SqliteRow, PersistenceError> {
    sqlx::query(UPSERT_RESULT)
        .bind(generate_id())
        .bind(event_id)
        .bind(&placing.participant_id)
        .bind(placing.participant_type.as_str())
        .bind(i64::from(placing.position))
        .bind(placing.points)
        .bind(&placing.measurement)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(PersistenceError::repository(EventResult::TABLE))
}
