//! Per-session rows for performance sports.

use scoring::{EventKind, EventStatus, Gender, MeasurementNature, ParticipantType};
use serde::{Deserialize, Serialize};

use super::{merge, nullable, Stamps};
use crate::persistence::sqlite::helpers::SqlValue;
use crate::persistence::Record;

/// A contested event within a session, with its record bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: EventKind,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub age_group: String,
    #[sqlx(try_from = "String")]
    pub measurement_nature: MeasurementNature,
    pub measurement_metric: String,
    pub record: Option<String>,
    pub record_holder: Option<String>,
    pub is_record_broken: bool,
    pub best_score: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub gender: Gender,
    pub age_group: String,
    pub measurement_nature: MeasurementNature,
    pub measurement_metric: String,
    #[serde(default)]
    pub record: Option<String>,
    #[serde(default)]
    pub record_holder: Option<String>,
    #[serde(default)]
    pub best_score: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub kind: Option<EventKind>,
    pub gender: Option<Gender>,
    pub age_group: Option<String>,
    pub measurement_nature: Option<MeasurementNature>,
    pub measurement_metric: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub record: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub record_holder: Option<Option<String>>,
    pub is_record_broken: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub best_score: Option<Option<String>>,
    pub status: Option<EventStatus>,
}

impl Record for Event {
    const TABLE: &'static str = "event";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "description",
        "type",
        "gender",
        "age_group",
        "measurement_nature",
        "measurement_metric",
        "record",
        "record_holder",
        "is_record_broken",
        "best_score",
        "status",
    ];
    type Draft = EventDraft;
    type Patch = EventPatch;

    fn from_draft(id: String, draft: EventDraft, stamps: Stamps) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            kind: draft.kind,
            gender: draft.gender,
            age_group: draft.age_group,
            measurement_nature: draft.measurement_nature,
            measurement_metric: draft.measurement_metric,
            record: draft.record,
            record_holder: draft.record_holder,
            is_record_broken: false,
            best_score: draft.best_score,
            status: draft.status,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: EventPatch) {
        merge(&mut self.title, patch.title);
        merge(&mut self.description, patch.description);
        merge(&mut self.kind, patch.kind);
        merge(&mut self.gender, patch.gender);
        merge(&mut self.age_group, patch.age_group);
        merge(&mut self.measurement_nature, patch.measurement_nature);
        merge(&mut self.measurement_metric, patch.measurement_metric);
        merge(&mut self.record, patch.record);
        merge(&mut self.record_holder, patch.record_holder);
        merge(&mut self.is_record_broken, patch.is_record_broken);
        merge(&mut self.best_score, patch.best_score);
        merge(&mut self.status, patch.status);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.title.clone().into(),
            self.description.clone().into(),
            self.kind.as_str().into(),
            self.gender.as_str().into(),
            self.age_group.clone().into(),
            self.measurement_nature.as_str().into(),
            self.measurement_metric.clone().into(),
            self.record.clone().into(),
            self.record_holder.clone().into(),
            self.is_record_broken.into(),
            self.best_score.clone().into(),
            self.status.as_str().into(),
        ]
    }

    record_accessors!();
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct House {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub color: Option<String>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseDraft {
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousePatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub abbreviation: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub color: Option<Option<String>>,
}

impl Record for House {
    const TABLE: &'static str = "house";
    const COLUMNS: &'static [&'static str] = &["name", "abbreviation", "color"];
    type Draft = HouseDraft;
    type Patch = HousePatch;

    fn from_draft(id: String, draft: HouseDraft, stamps: Stamps) -> Self {
        Self {
            id,
            name: draft.name,
            abbreviation: draft.abbreviation,
            color: draft.color,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: HousePatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.abbreviation, patch.abbreviation);
        merge(&mut self.color, patch.color);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.clone().into(),
            self.abbreviation.clone().into(),
            self.color.clone().into(),
        ]
    }

    record_accessors!();
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub house_id: String,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDraft {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub gender: Gender,
    pub house_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<Gender>,
    pub house_id: Option<String>,
}

impl Record for Participant {
    const TABLE: &'static str = "participant";
    const COLUMNS: &'static [&'static str] =
        &["first_name", "last_name", "dob", "gender", "house_id"];
    type Draft = ParticipantDraft;
    type Patch = ParticipantPatch;

    fn from_draft(id: String, draft: ParticipantDraft, stamps: Stamps) -> Self {
        Self {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            dob: draft.dob,
            gender: draft.gender,
            house_id: draft.house_id,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: ParticipantPatch) {
        merge(&mut self.first_name, patch.first_name);
        merge(&mut self.last_name, patch.last_name);
        merge(&mut self.dob, patch.dob);
        merge(&mut self.gender, patch.gender);
        merge(&mut self.house_id, patch.house_id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.dob.clone().into(),
            self.gender.as_str().into(),
            self.house_id.clone().into(),
        ]
    }

    record_accessors!();
}

/// One competitor's placing in one event.
///
/// `participant_id` names a participant for individual events and a house
/// for team events; `participant_type` says which. Position 0 is a
/// disqualification and always carries zero points.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub id: String,
    pub event_id: String,
    pub participant_id: String,
    #[sqlx(try_from = "String")]
    pub participant_type: ParticipantType,
    pub position: i64,
    pub points: f64,
    pub measurement: Option<String>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

impl EventResult {
    fn clamp_disqualified(&mut self) {
        if self.position == 0 {
            self.points = 0.0;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResultDraft {
    pub event_id: String,
    pub participant_id: String,
    pub participant_type: ParticipantType,
    pub position: u32,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub measurement: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResultPatch {
    pub event_id: Option<String>,
    pub participant_id: Option<String>,
    pub participant_type: Option<ParticipantType>,
    pub position: Option<u32>,
    pub points: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub measurement: Option<Option<String>>,
}

impl Record for EventResult {
    const TABLE: &'static str = "event_result";
    const COLUMNS: &'static [&'static str] = &[
        "event_id",
        "participant_id",
        "participant_type",
        "position",
        "points",
        "measurement",
    ];
    type Draft = EventResultDraft;
    type Patch = EventResultPatch;

    fn from_draft(id: String, draft: EventResultDraft, stamps: Stamps) -> Self {
        let mut result = Self {
            id,
            event_id: draft.event_id,
            participant_id: draft.participant_id,
            participant_type: draft.participant_type,
            position: i64::from(draft.position),
            points: draft.points,
            measurement: draft.measurement,
            stamps,
        };
        result.clamp_disqualified();
        result
    }

    fn apply_patch(&mut self, patch: EventResultPatch) {
        merge(&mut self.event_id, patch.event_id);
        merge(&mut self.participant_id, patch.participant_id);
        merge(&mut self.participant_type, patch.participant_type);
        merge(&mut self.position, patch.position.map(i64::from));
        merge(&mut self.points, patch.points);
        merge(&mut self.measurement, patch.measurement);
        self.clamp_disqualified();
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.event_id.clone().into(),
            self.participant_id.clone().into(),
            self.participant_type.as_str().into(),
            self.position.into(),
            self.points.into(),
            self.measurement.clone().into(),
        ]
    }

    record_accessors!();
}
