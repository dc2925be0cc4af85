//! Repository bundles over an open store.

use std::fmt;

use super::entities::{
    Discipline, Event, EventResult, EventTemplate, Fixture, FixtureTeam, House, Participant,
    Player, Session, Team,
};
use super::sqlite::{Database, SchemaFamily, SqliteRepository, SqliteResultsWriter};
use super::PersistenceError;

/// The process-lifetime catalogue store.
pub struct MainContext {
    pub db: Database,
    pub sessions: SqliteRepository<Session>,
    pub events: SqliteRepository<EventTemplate>,
    pub disciplines: SqliteRepository<Discipline>,
}

impl MainContext {
    pub fn new(db: Database) -> Self {
        let pool = db.pool().clone();
        Self {
            sessions: SqliteRepository::new(pool.clone()),
            events: SqliteRepository::new(pool.clone()),
            disciplines: SqliteRepository::new(pool),
            db,
        }
    }
}

pub struct PerformanceContext {
    pub db: Database,
    pub events: SqliteRepository<Event>,
    pub houses: SqliteRepository<House>,
    pub participants: SqliteRepository<Participant>,
    pub event_results: SqliteRepository<EventResult>,
    pub results: SqliteResultsWriter,
}

impl PerformanceContext {
    pub fn new(db: Database) -> Self {
        let pool = db.pool().clone();
        Self {
            events: SqliteRepository::new(pool.clone()),
            houses: SqliteRepository::new(pool.clone()),
            participants: SqliteRepository::new(pool.clone()),
            event_results: SqliteRepository::new(pool.clone()),
            results: SqliteResultsWriter::new(pool),
            db,
        }
    }
}

pub struct TeamContext {
    pub db: Database,
    pub teams: SqliteRepository<Team>,
    pub players: SqliteRepository<Player>,
    pub fixtures: SqliteRepository<Fixture>,
    pub fixture_teams: SqliteRepository<FixtureTeam>,
}

impl TeamContext {
    pub fn new(db: Database) -> Self {
        let pool = db.pool().clone();
        Self {
            teams: SqliteRepository::new(pool.clone()),
            players: SqliteRepository::new(pool.clone()),
            fixtures: SqliteRepository::new(pool.clone()),
            fixture_teams: SqliteRepository::new(pool),
            db,
        }
    }
}

/// An open per-session store and its repositories.
pub enum SessionContext {
    Performance(PerformanceContext),
    Team(TeamContext),
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionContext")
            .field(self.database())
            .finish()
    }
}

impl SessionContext {
    /// Wrap an opened session store. The main family has no session context.
    pub fn from_database(db: Database) -> Result<Self, PersistenceError> {
        match db.family() {
            SchemaFamily::Performance => Ok(SessionContext::Performance(PerformanceContext::new(db))),
            SchemaFamily::Team => Ok(SessionContext::Team(TeamContext::new(db))),
            SchemaFamily::Main => Err(PersistenceError::InvalidPayload(
                "the main store cannot back a session".to_string(),
            )),
        }
    }

    pub fn family(&self) -> SchemaFamily {
        self.database().family()
    }

    pub fn database(&self) -> &Database {
        match self {
            SessionContext::Performance(ctx) => &ctx.db,
            SessionContext::Team(ctx) => &ctx.db,
        }
    }

    pub async fn close(&self) -> Result<(), PersistenceError> {
        self.database().close().await
    }
}
