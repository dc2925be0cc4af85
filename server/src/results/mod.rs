//! Result submission: score a result form and store it atomically.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::persistence::entities::{Event, EventResult};
use crate::persistence::sqlite::EventCompletion;
use crate::persistence::{ListFilter, PerformanceContext, PersistenceError, Repository};
use scoring::{
    assign_points_preserving_order, check_if_record_has_been_broken, parse_measurement,
    Competitor, ExcludedEntry, PointsSettings, RecordCheck, Roster, ScoringEntry, StoredRecord,
};

/// A completed result form for one event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    pub event_id: String,
    pub entries: Vec<ScoringEntry>,
    /// Best measurement of the event. Defaults to the winner's measurement.
    #[serde(default)]
    pub best_score: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub results: Vec<EventResult>,
    pub record: RecordCheck,
    pub excluded: Vec<ExcludedEntry>,
    pub event: Event,
}

/// Score `submission` and persist the placings and the event's completion
/// fields in one transaction.
///
/// Rows are keyed on (event, participant), so submitting the same form twice
/// leaves the store as the first submission did.
pub async fn submit_results(
    ctx: &PerformanceContext,
    points: &PointsSettings,
    submission: ResultSubmission,
) -> Result<SubmissionOutcome, PersistenceError> {
    let event = ctx.events.read(&submission.event_id).await?;
    let roster = load_roster(ctx).await?;

    let placement = assign_points_preserving_order(
        &submission.entries,
        event.kind,
        points.table_for(event.kind),
    );
    for skipped in &placement.excluded {
        warn!(
            event_id = %event.id,
            participant_id = %skipped.participant_id,
            submitted = %skipped.submitted,
            reason = ?skipped.reason,
            "Result entry left out of ranking"
        );
    }

    let best_score = submission
        .best_score
        .filter(|score| !score.trim().is_empty())
        .or_else(|| placement.winner().and_then(|w| w.measurement.clone()));

    let placings = &placement.placings;
    let (results, event, completion) = ctx
        .results
        .record_results(&event.id, placings, |stored| {
            let on_file = StoredRecord {
                record: stored.record.as_deref(),
                holder: stored.record_holder.as_deref(),
            };
            if let Some(raw) = on_file.record.filter(|_| on_file.is_set()) {
                if parse_measurement(raw).is_none() {
                    warn!(
                        event_id = %stored.id,
                        record = raw,
                        "Stored record is not a number; keeping it"
                    );
                }
            }
            let record = match &best_score {
                Some(best) => check_if_record_has_been_broken(
                    best,
                    placings,
                    stored.kind,
                    stored.measurement_nature,
                    on_file,
                    &roster,
                ),
                None => RecordCheck::NotBroken,
            };
            EventCompletion {
                best_score: best_score.clone(),
                record,
            }
        })
        .await?;

    info!(
        event_id = %event.id,
        stored = results.len(),
        excluded = placement.excluded.len(),
        record_broken = completion.record.is_broken(),
        "Results submitted"
    );

    Ok(SubmissionOutcome {
        results,
        record: completion.record,
        excluded: placement.excluded,
        event,
    })
}

async fn load_roster(ctx: &PerformanceContext) -> Result<Roster, PersistenceError> {
    let all = ListFilter::new();
    let mut roster = Roster::new();
    for house in ctx.houses.list(&all).await? {
        roster.add_house(house.id, house.name);
    }
    for participant in ctx.participants.list(&all).await? {
        roster.add_participant(
            participant.id,
            Competitor {
                first_name: participant.first_name,
                last_name: participant.last_name,
                house_id: participant.house_id,
            },
        );
    }
    Ok(roster)
}
