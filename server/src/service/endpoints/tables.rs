//! Table routing for the main, performance and team stores.

use serde_json::Value;

use super::crud;
use crate::persistence::entities::{
    Discipline, Event, EventResult, EventTemplate, Fixture, FixtureTeam, House, Participant,
    Player, Session, Team,
};
use crate::persistence::{MainContext, PerformanceContext, TeamContext};
use crate::service::envelope::DispatchError;
use crate::service::parsers::{MainTable, Op, PerformanceTable, TeamTable};

pub async fn main_store(
    ctx: &MainContext,
    table: MainTable,
    op: Op,
    payload: Value,
) -> Result<Value, DispatchError> {
    match table {
        MainTable::Session => crud::handle::<Session, _>(&ctx.sessions, op, payload).await,
        MainTable::Event => crud::handle::<EventTemplate, _>(&ctx.events, op, payload).await,
        MainTable::Discipline => {
            crud::handle::<Discipline, _>(&ctx.disciplines, op, payload).await
        }
    }
}

pub async fn performance_store(
    ctx: &PerformanceContext,
    table: PerformanceTable,
    op: Op,
    payload: Value,
) -> Result<Value, DispatchError> {
    match table {
        PerformanceTable::Event => crud::handle::<Event, _>(&ctx.events, op, payload).await,
        PerformanceTable::House => crud::handle::<House, _>(&ctx.houses, op, payload).await,
        PerformanceTable::Participant => {
            crud::handle::<Participant, _>(&ctx.participants, op, payload).await
        }
        PerformanceTable::EventResult => {
            crud::handle::<EventResult, _>(&ctx.event_results, op, payload).await
        }
    }
}

pub async fn team_store(
    ctx: &TeamContext,
    table: TeamTable,
    op: Op,
    payload: Value,
) -> Result<Value, DispatchError> {
    match table {
        TeamTable::Team => crud::handle::<Team, _>(&ctx.teams, op, payload).await,
        TeamTable::Player => crud::handle::<Player, _>(&ctx.players, op, payload).await,
        TeamTable::Fixture => crud::handle::<Fixture, _>(&ctx.fixtures, op, payload).await,
        TeamTable::FixtureTeam => {
            crud::handle::<FixtureTeam, _>(&ctx.fixture_teams, op, payload).await
        }
    }
}
