//! Main-store rows: the catalogue every session is created from.

use scoring::{DisciplineKind, EventKind};
use serde::{Deserialize, Serialize};

use super::{merge, nullable, Stamps};
use crate::persistence::sqlite::helpers::SqlValue;
use crate::persistence::Record;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Discipline {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: DisciplineKind,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisciplineDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: DisciplineKind,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisciplinePatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub kind: Option<DisciplineKind>,
}

impl Record for Discipline {
    const TABLE: &'static str = "discipline";
    const COLUMNS: &'static [&'static str] = &["name", "description", "type"];
    type Draft = DisciplineDraft;
    type Patch = DisciplinePatch;

    fn from_draft(id: String, draft: DisciplineDraft, stamps: Stamps) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            kind: draft.kind,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: DisciplinePatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.description, patch.description);
        merge(&mut self.kind, patch.kind);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.clone().into(),
            self.description.clone().into(),
            self.kind.as_str().into(),
        ]
    }

    record_accessors!();
}

/// A scheduled meet. Its results live in a separate per-session store.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    pub location: String,
    pub discipline_id: String,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    pub location: String,
    pub discipline_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub time: Option<Option<String>>,
    pub location: Option<String>,
    pub discipline_id: Option<String>,
}

impl Record for Session {
    const TABLE: &'static str = "session";
    const COLUMNS: &'static [&'static str] =
        &["title", "date", "time", "location", "discipline_id"];
    type Draft = SessionDraft;
    type Patch = SessionPatch;

    fn from_draft(id: String, draft: SessionDraft, stamps: Stamps) -> Self {
        Self {
            id,
            title: draft.title,
            date: draft.date,
            time: draft.time,
            location: draft.location,
            discipline_id: draft.discipline_id,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: SessionPatch) {
        merge(&mut self.title, patch.title);
        merge(&mut self.date, patch.date);
        merge(&mut self.time, patch.time);
        merge(&mut self.location, patch.location);
        merge(&mut self.discipline_id, patch.discipline_id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.title.clone().into(),
            self.date.clone().into(),
            self.time.clone().into(),
            self.location.clone().into(),
            self.discipline_id.clone().into(),
        ]
    }

    record_accessors!();
}

/// Catalogue event used to pre-fill a session's events.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventTemplate {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub discipline_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: EventKind,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTemplateDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discipline_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTemplatePatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub discipline_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<EventKind>,
}

impl Record for EventTemplate {
    const TABLE: &'static str = "event";
    const COLUMNS: &'static [&'static str] = &["title", "description", "discipline_id", "type"];
    type Draft = EventTemplateDraft;
    type Patch = EventTemplatePatch;

    fn from_draft(id: String, draft: EventTemplateDraft, stamps: Stamps) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            discipline_id: draft.discipline_id,
            kind: draft.kind,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: EventTemplatePatch) {
        merge(&mut self.title, patch.title);
        merge(&mut self.description, patch.description);
        merge(&mut self.discipline_id, patch.discipline_id);
        merge(&mut self.kind, patch.kind);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.title.clone().into(),
            self.description.clone().into(),
            self.discipline_id.clone().into(),
            self.kind.as_str().into(),
        ]
    }

    record_accessors!();
}
