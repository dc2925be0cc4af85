//! Per-session rows for team sports.

use serde::{Deserialize, Serialize};

use super::{merge, nullable, Stamps};
use crate::persistence::sqlite::helpers::SqlValue;
use crate::persistence::Record;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
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
pub struct TeamDraft {
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub abbreviation: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub color: Option<Option<String>>,
}

impl Record for Team {
    const TABLE: &'static str = "team";
    const COLUMNS: &'static [&'static str] = &["name", "abbreviation", "color"];
    type Draft = TeamDraft;
    type Patch = TeamPatch;

    fn from_draft(id: String, draft: TeamDraft, stamps: Stamps) -> Self {
        Self {
            id,
            name: draft.name,
            abbreviation: draft.abbreviation,
            color: draft.color,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: TeamPatch) {
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
pub struct Player {
    pub id: String,
    pub name: String,
    pub team_id: String,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDraft {
    pub name: String,
    pub team_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub team_id: Option<String>,
}

impl Record for Player {
    const TABLE: &'static str = "player";
    const COLUMNS: &'static [&'static str] = &["name", "team_id"];
    type Draft = PlayerDraft;
    type Patch = PlayerPatch;

    fn from_draft(id: String, draft: PlayerDraft, stamps: Stamps) -> Self {
        Self {
            id,
            name: draft.name,
            team_id: draft.team_id,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: PlayerPatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.team_id, patch.team_id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.clone().into(), self.team_id.clone().into()]
    }

    record_accessors!();
}

/// A scheduled match. `gender` is validated on input and stored as text.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub gender: Option<String>,
    pub round: Option<String>,
    pub date: Option<String>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDraft {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub gender: Option<scoring::Gender>,
    #[serde(default)]
    pub round: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixturePatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<scoring::Gender>>,
    #[serde(default, deserialize_with = "nullable")]
    pub round: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub date: Option<Option<String>>,
}

impl Record for Fixture {
    const TABLE: &'static str = "fixture";
    const COLUMNS: &'static [&'static str] = &["name", "category", "gender", "round", "date"];
    type Draft = FixtureDraft;
    type Patch = FixturePatch;

    fn from_draft(id: String, draft: FixtureDraft, stamps: Stamps) -> Self {
        Self {
            id,
            name: draft.name,
            category: draft.category,
            gender: draft.gender.map(|g| g.as_str().to_string()),
            round: draft.round,
            date: draft.date,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: FixturePatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.category, patch.category);
        merge(
            &mut self.gender,
            patch
                .gender
                .map(|gender| gender.map(|g| g.as_str().to_string())),
        );
        merge(&mut self.round, patch.round);
        merge(&mut self.date, patch.date);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.clone().into(),
            self.category.clone().into(),
            self.gender.clone().into(),
            self.round.clone().into(),
            self.date.clone().into(),
        ]
    }

    record_accessors!();
}

/// A team's line in a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FixtureTeam {
    pub id: String,
    pub fixture_id: String,
    pub team_id: String,
    pub score: i64,
    pub position: Option<i64>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureTeamDraft {
    pub fixture_id: String,
    pub team_id: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureTeamPatch {
    pub fixture_id: Option<String>,
    pub team_id: Option<String>,
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub position: Option<Option<i64>>,
}

impl Record for FixtureTeam {
    const TABLE: &'static str = "fixture_team";
    const COLUMNS: &'static [&'static str] = &["fixture_id", "team_id", "score", "position"];
    type Draft = FixtureTeamDraft;
    type Patch = FixtureTeamPatch;

    fn from_draft(id: String, draft: FixtureTeamDraft, stamps: Stamps) -> Self {
        Self {
            id,
            fixture_id: draft.fixture_id,
            team_id: draft.team_id,
            score: draft.score,
            position: draft.position,
            stamps,
        }
    }

    fn apply_patch(&mut self, patch: FixtureTeamPatch) {
        merge(&mut self.fixture_id, patch.fixture_id);
        merge(&mut self.team_id, patch.team_id);
        merge(&mut self.score, patch.score);
        merge(&mut self.position, patch.position);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.fixture_id.clone().into(),
            self.team_id.clone().into(),
            self.score.into(),
            self.position.into(),
        ]
    }

    record_accessors!();
}
