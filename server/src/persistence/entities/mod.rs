//! Row types for every table, grouped by the store that holds them.
//!
//! - [`catalog`]: the main store (disciplines, sessions, event templates).
//! - [`performance`]: per-session store for performance sports.
//! - [`team`]: per-session store for team sports.

/// Implements the accessor half of [`crate::persistence::Record`].
macro_rules! record_accessors {
    () => {
        fn id(&self) -> &str {
            &self.id
        }

        fn stamps(&self) -> &$crate::persistence::Stamps {
            &self.stamps
        }

        fn stamps_mut(&mut self) -> &mut $crate::persistence::Stamps {
            &mut self.stamps
        }
    };
}

pub mod catalog;
pub mod performance;
pub mod team;

pub use catalog::{Discipline, EventTemplate, Session};
pub use performance::{Event, EventResult, House, Participant};
pub use team::{Fixture, FixtureTeam, Player, Team};

use serde::{Deserialize, Deserializer, Serialize};

/// Bookkeeping columns carried by every row (unix milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stamps {
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Stamps {
    pub fn new(now: i64) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Deserialize a patch field where `null` clears the column and absence
/// leaves it alone: absent → `None`, `null` → `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Overwrite `slot` when the patch carries a value.
pub(crate) fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
