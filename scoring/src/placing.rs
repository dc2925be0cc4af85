//! Tie-aware position and point assignment.
//!
//! Operators declare ties by typing the same finishing position for several
//! entries. Ties are never inferred from measurements: two identical times
//! with different submitted positions stay separate places.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

use crate::points::PointTable;
use crate::types::{EventKind, ParticipantType};

/// The finishing position as typed by the operator.
///
/// `Rank(0)` is a disqualification. Anything that is not a whole,
/// non-negative number is kept verbatim as `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedPosition {
    Rank(u32),
    Invalid(String),
}

impl SubmittedPosition {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<u32>() {
            Ok(rank) => SubmittedPosition::Rank(rank),
            Err(_) => SubmittedPosition::Invalid(raw.to_string()),
        }
    }
}

impl SubmittedPosition {
    /// The position as the operator typed it.
    pub fn raw(&self) -> String {
        match self {
            SubmittedPosition::Rank(rank) => rank.to_string(),
            SubmittedPosition::Invalid(raw) => raw.clone(),
        }
    }
}

impl Default for SubmittedPosition {
    fn default() -> Self {
        SubmittedPosition::Invalid(String::new())
    }
}

impl From<u32> for SubmittedPosition {
    fn from(rank: u32) -> Self {
        SubmittedPosition::Rank(rank)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPosition {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Missing(()),
}

impl<'de> Deserialize<'de> for SubmittedPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let position = match RawPosition::deserialize(deserializer)? {
            RawPosition::Unsigned(n) => match u32::try_from(n) {
                Ok(rank) => SubmittedPosition::Rank(rank),
                Err(_) => SubmittedPosition::Invalid(n.to_string()),
            },
            RawPosition::Signed(n) => SubmittedPosition::Invalid(n.to_string()),
            RawPosition::Float(f) => {
                if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) {
                    SubmittedPosition::Rank(f as u32)
                } else {
                    SubmittedPosition::Invalid(f.to_string())
                }
            }
            RawPosition::Text(s) => SubmittedPosition::parse(&s),
            RawPosition::Missing(()) => SubmittedPosition::default(),
        };
        Ok(position)
    }
}

impl Serialize for SubmittedPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SubmittedPosition::Rank(rank) => serializer.serialize_u32(*rank),
            SubmittedPosition::Invalid(raw) => serializer.serialize_str(raw),
        }
    }
}

/// One row of a submitted result form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringEntry {
    /// Id of an already-stored result row, passed through untouched.
    #[serde(default)]
    pub id: Option<String>,
    pub participant_id: String,
    #[serde(default, alias = "position")]
    pub submitted_position: SubmittedPosition,
    #[serde(default)]
    pub measurement: Option<String>,
}

impl ScoringEntry {
    pub fn new(participant_id: impl Into<String>, position: impl Into<SubmittedPosition>) -> Self {
        Self {
            id: None,
            participant_id: participant_id.into(),
            submitted_position: position.into(),
            measurement: None,
        }
    }

    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = Some(measurement.into());
        self
    }
}

/// A resolved entry: adjusted position and awarded points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placing {
    /// Index of the entry in the submitted batch.
    pub index: usize,
    pub id: Option<String>,
    pub participant_id: String,
    pub participant_type: ParticipantType,
    pub position: u32,
    pub points: f64,
    pub measurement: Option<String>,
}

impl Placing {
    pub fn is_disqualified(&self) -> bool {
        self.position == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExclusionReason {
    /// The submitted position is not a whole, non-negative number.
    UnreadablePosition,
    /// An earlier entry in the batch already names this participant.
    DuplicateParticipant,
}

/// An entry left out of ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedEntry {
    pub index: usize,
    pub participant_id: String,
    pub submitted: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Resolved entries in submission order.
    pub placings: Vec<Placing>,
    pub excluded: Vec<ExcludedEntry>,
}

impl Placement {
    /// First entry (in submission order) holding adjusted position 1.
    pub fn winner(&self) -> Option<&Placing> {
        self.placings.iter().find(|p| p.position == 1)
    }
}

/// Resolve a submitted batch into adjusted positions and points.
///
/// Ranked entries are ordered by submitted position; each run of equal
/// submitted positions forms a tie-group of size `k` that occupies the next
/// `k` places. Every member gets the group's first place as its position and
/// the average of the table points for all `k` places. Disqualified entries
/// (submitted 0) get position 0 and no points. Unreadable positions, and
/// every entry after the first for the same participant, are reported in
/// [`Placement::excluded`] and produce no placing.
pub fn assign_points_preserving_order(
    entries: &[ScoringEntry],
    kind: EventKind,
    table: &PointTable,
) -> Placement {
    let mut resolved: Vec<Option<(u32, f64)>> = vec![None; entries.len()];
    let mut ranked: Vec<(usize, u32)> = Vec::with_capacity(entries.len());
    let mut excluded = Vec::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        if !seen.insert(entry.participant_id.as_str()) {
            excluded.push(ExcludedEntry {
                index,
                participant_id: entry.participant_id.clone(),
                submitted: entry.submitted_position.raw(),
                reason: ExclusionReason::DuplicateParticipant,
            });
            continue;
        }
        match &entry.submitted_position {
            SubmittedPosition::Rank(0) => resolved[index] = Some((0, 0.0)),
            SubmittedPosition::Rank(rank) => ranked.push((index, *rank)),
            SubmittedPosition::Invalid(raw) => excluded.push(ExcludedEntry {
                index,
                participant_id: entry.participant_id.clone(),
                submitted: raw.clone(),
                reason: ExclusionReason::UnreadablePosition,
            }),
        }
    }

    // Stable: entries tied on submitted position keep their submission order.
    ranked.sort_by_key(|&(_, rank)| rank);

    let mut current_position: u32 = 1;
    for group in ranked.chunk_by(|a, b| a.1 == b.1) {
        let size = group.len() as u32;
        let points = table.average_over(current_position, size);
        for &(index, _) in group {
            resolved[index] = Some((current_position, points));
        }
        current_position = current_position.saturating_add(size);
    }

    let participant_type = kind.participant_type();
    let placings = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let (position, points) = resolved[index]?;
            Some(Placing {
                index,
                id: entry.id.clone(),
                participant_id: entry.participant_id.clone(),
                participant_type,
                position,
                points,
                measurement: entry.measurement.clone(),
            })
        })
        .collect();

    Placement { placings, excluded }
}
