//! Point tables: finishing position → points awarded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::EventKind;

/// Points per finishing position. Positions missing from the table score 0.
///
/// Serialized as a JSON object keyed by position (`{"1": 10, "2": 8}`), the
/// shape the settings files use.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointTable(BTreeMap<u32, f64>);

impl PointTable {
    pub fn new(points: BTreeMap<u32, f64>) -> Self {
        Self(points)
    }

    pub fn from_pairs(pairs: &[(u32, f64)]) -> Self {
        Self(pairs.iter().copied().collect())
    }

    /// Points for a single position. Position 0 (disqualified) always scores 0,
    /// whatever the table says.
    pub fn points_for(&self, position: u32) -> f64 {
        if position == 0 {
            return 0.0;
        }
        self.0.get(&position).copied().unwrap_or(0.0)
    }

    /// Mean of the points for `len` consecutive positions starting at `start`.
    /// This is what every member of a tie-group of size `len` receives.
    pub fn average_over(&self, start: u32, len: u32) -> f64 {
        if len == 0 {
            return 0.0;
        }
        let total: f64 = (0..len)
            .map(|offset| self.points_for(start.saturating_add(offset)))
            .sum();
        total / f64::from(len)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.0.iter().map(|(position, points)| (*position, *points))
    }
}

/// Separate point tables for individual and team competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsSettings {
    #[serde(default)]
    pub individual: PointTable,
    #[serde(default)]
    pub team: PointTable,
}

impl PointsSettings {
    pub fn table_for(&self, kind: EventKind) -> &PointTable {
        match kind {
            EventKind::Individual => &self.individual,
            EventKind::Team => &self.team,
        }
    }
}

impl Default for PointsSettings {
    fn default() -> Self {
        Self {
            individual: PointTable::from_pairs(&[
                (1, 10.0),
                (2, 8.0),
                (3, 6.0),
                (4, 4.0),
                (5, 2.0),
                (6, 1.0),
            ]),
            team: PointTable::from_pairs(&[(1, 12.0), (2, 8.0), (3, 6.0)]),
        }
    }
}
