//! Record-break detection for a scored event.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

use crate::measurement::parse_measurement;
use crate::placing::Placing;
use crate::types::{EventKind, MeasurementNature};

/// Name data needed to credit an individual record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competitor {
    pub first_name: String,
    pub last_name: String,
    pub house_id: String,
}

/// Participants and houses of a session, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: HashMap<String, Competitor>,
    houses: HashMap<String, String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_house(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.houses.insert(id.into(), name.into());
    }

    pub fn add_participant(&mut self, id: impl Into<String>, competitor: Competitor) {
        self.participants.insert(id.into(), competitor);
    }

    pub fn with_house(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.add_house(id, name);
        self
    }

    pub fn with_participant(mut self, id: impl Into<String>, competitor: Competitor) -> Self {
        self.add_participant(id, competitor);
        self
    }

    /// Name printed as record holder.
    ///
    /// Individual: `"J. Smith - Red"`. Team: the house name. Unknown ids fall
    /// back to whatever is known, and finally to the raw id.
    pub fn display_name(&self, kind: EventKind, participant_id: &str) -> String {
        match kind {
            EventKind::Team => self
                .houses
                .get(participant_id)
                .cloned()
                .unwrap_or_else(|| participant_id.to_string()),
            EventKind::Individual => {
                let Some(competitor) = self.participants.get(participant_id) else {
                    return participant_id.to_string();
                };
                let initial: String = competitor
                    .first_name
                    .trim()
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().collect())
                    .unwrap_or_default();
                let name = if initial.is_empty() {
                    competitor.last_name.clone()
                } else {
                    format!("{}. {}", initial, competitor.last_name)
                };
                match self.houses.get(&competitor.house_id) {
                    Some(house) => format!("{} - {}", name, house),
                    None => name,
                }
            }
        }
    }
}

/// The record currently on file for an event.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredRecord<'a> {
    pub record: Option<&'a str>,
    pub holder: Option<&'a str>,
}

impl StoredRecord<'_> {
    /// Both the record and its holder are filled in.
    pub fn is_set(&self) -> bool {
        let filled = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
        filled(self.record) && filled(self.holder)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordCheck {
    NotBroken,
    Broken {
        new_record: String,
        record_holder: String,
    },
}

impl RecordCheck {
    pub fn is_broken(&self) -> bool {
        matches!(self, RecordCheck::Broken { .. })
    }
}

// `{"isBroken": false}` or `{"isBroken": true, "newRecord": .., "recordHolder": ..}`
impl Serialize for RecordCheck {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordCheck::NotBroken => {
                let mut s = serializer.serialize_struct("RecordCheck", 1)?;
                s.serialize_field("isBroken", &false)?;
                s.end()
            }
            RecordCheck::Broken {
                new_record,
                record_holder,
            } => {
                let mut s = serializer.serialize_struct("RecordCheck", 3)?;
                s.serialize_field("isBroken", &true)?;
                s.serialize_field("newRecord", new_record)?;
                s.serialize_field("recordHolder", record_holder)?;
                s.end()
            }
        }
    }
}

/// Decide whether `best_score` sets a new record for the event.
///
/// Only an event with a position-1 placing can break a record. With no
/// record on file the best score becomes the record. Otherwise values are
/// compared numerically: lower wins for timed events, higher wins for
/// everything else. A value on either side that is not a number is not a
/// contender, so an unreadable stored record is kept as it is.
pub fn check_if_record_has_been_broken(
    best_score: &str,
    placings: &[Placing],
    kind: EventKind,
    nature: MeasurementNature,
    stored: StoredRecord<'_>,
    roster: &Roster,
) -> RecordCheck {
    let Some(winner) = placings.iter().find(|p| p.position == 1) else {
        return RecordCheck::NotBroken;
    };
    let Some(best) = parse_measurement(best_score) else {
        return RecordCheck::NotBroken;
    };

    let broken = match stored.record.filter(|_| stored.is_set()) {
        None => true,
        Some(record) => match parse_measurement(record) {
            None => false,
            Some(current) if nature.lower_is_better() => current > best,
            Some(current) => current < best,
        },
    };

    if !broken {
        return RecordCheck::NotBroken;
    }

    RecordCheck::Broken {
        new_record: best_score.trim().to_string(),
        record_holder: roster.display_name(kind, &winner.participant_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParticipantType;

    fn placing(participant_id: &str, position: u32) -> Placing {
        Placing {
            index: 0,
            id: None,
            participant_id: participant_id.to_string(),
            participant_type: ParticipantType::Participant,
            position,
            points: 0.0,
            measurement: None,
        }
    }

    fn roster() -> Roster {
        Roster::new()
            .with_house("h1", "Red")
            .with_house("h2", "Blue")
            .with_participant(
                "p1",
                Competitor {
                    first_name: "jane".to_string(),
                    last_name: "Doe".to_string(),
                    house_id: "h1".to_string(),
                },
            )
    }

    fn stored<'a>(record: &'a str, holder: &'a str) -> StoredRecord<'a> {
        StoredRecord {
            record: Some(record),
            holder: Some(holder),
        }
    }

    #[test]
    fn first_result_sets_the_record() {
        let check = check_if_record_has_been_broken(
            "12.3",
            &[placing("p1", 1)],
            EventKind::Individual,
            MeasurementNature::Length,
            StoredRecord::default(),
            &roster(),
        );
        assert_eq!(
            check,
            RecordCheck::Broken {
                new_record: "12.3".to_string(),
                record_holder: "J. Doe - Red".to_string(),
            }
        );
    }

    #[test]
    fn record_without_holder_counts_as_no_record() {
        let check = check_if_record_has_been_broken(
            "1.0",
            &[placing("p1", 1)],
            EventKind::Individual,
            MeasurementNature::Length,
            StoredRecord {
                record: Some("50.0"),
                holder: Some("  "),
            },
            &roster(),
        );
        assert!(check.is_broken());
    }

    #[test]
    fn timed_events_need_a_lower_value() {
        let winners = [placing("p1", 1)];
        let faster = check_if_record_has_been_broken(
            "10.5",
            &winners,
            EventKind::Individual,
            MeasurementNature::Time,
            stored("11.0", "A. Old - Blue"),
            &roster(),
        );
        assert!(faster.is_broken());

        let slower = check_if_record_has_been_broken(
            "10.5",
            &winners,
            EventKind::Individual,
            MeasurementNature::Time,
            stored("10.0", "A. Old - Blue"),
            &roster(),
        );
        assert_eq!(slower, RecordCheck::NotBroken);
    }

    #[test]
    fn distance_events_need_a_higher_value() {
        let winners = [placing("p1", 1)];
        let further = check_if_record_has_been_broken(
            "6.10",
            &winners,
            EventKind::Individual,
            MeasurementNature::Length,
            stored("5.95", "A. Old - Blue"),
            &roster(),
        );
        assert!(further.is_broken());

        let equal = check_if_record_has_been_broken(
            "5.95",
            &winners,
            EventKind::Individual,
            MeasurementNature::Length,
            stored("5.95", "A. Old - Blue"),
            &roster(),
        );
        assert!(!equal.is_broken());
    }

    #[test]
    fn comparison_is_numeric_not_lexical() {
        // As strings "9.8" > "10.2"; as numbers it is the other way round.
        let check = check_if_record_has_been_broken(
            "10.2",
            &[placing("p1", 1)],
            EventKind::Individual,
            MeasurementNature::Height,
            stored("9.8", "A. Old - Blue"),
            &roster(),
        );
        assert!(check.is_broken());
    }

    #[test]
    fn clock_times_compare_as_seconds() {
        let check = check_if_record_has_been_broken(
            "1:59.9",
            &[placing("p1", 1)],
            EventKind::Individual,
            MeasurementNature::Time,
            stored("2:01.0", "A. Old - Blue"),
            &roster(),
        );
        assert!(check.is_broken());
    }

    #[test]
    fn nobody_in_first_place_breaks_nothing() {
        let check = check_if_record_has_been_broken(
            "99",
            &[placing("p1", 0), placing("p2", 0)],
            EventKind::Individual,
            MeasurementNature::Score,
            StoredRecord::default(),
            &roster(),
        );
        assert_eq!(check, RecordCheck::NotBroken);
    }

    #[test]
    fn unreadable_best_score_is_not_a_contender() {
        let check = check_if_record_has_been_broken(
            "DNF",
            &[placing("p1", 1)],
            EventKind::Individual,
            MeasurementNature::Time,
            StoredRecord::default(),
            &roster(),
        );
        assert_eq!(check, RecordCheck::NotBroken);
    }

    #[test]
    fn unreadable_stored_record_is_kept() {
        let check = check_if_record_has_been_broken(
            "4.2",
            &[placing("p1", 1)],
            EventKind::Individual,
            MeasurementNature::Length,
            stored("n/a", "Somebody"),
            &roster(),
        );
        assert_eq!(check, RecordCheck::NotBroken);
    }

    #[test]
    fn team_records_are_credited_to_the_house() {
        let check = check_if_record_has_been_broken(
            "48.1",
            &[placing("h2", 1), placing("h1", 2)],
            EventKind::Team,
            MeasurementNature::Time,
            StoredRecord::default(),
            &roster(),
        );
        assert_eq!(
            check,
            RecordCheck::Broken {
                new_record: "48.1".to_string(),
                record_holder: "Blue".to_string(),
            }
        );
    }

    #[test]
    fn display_name_fallbacks() {
        let roster = roster().with_participant(
            "p2",
            Competitor {
                first_name: String::new(),
                last_name: "Solo".to_string(),
                house_id: "missing".to_string(),
            },
        );
        assert_eq!(roster.display_name(EventKind::Individual, "p2"), "Solo");
        assert_eq!(roster.display_name(EventKind::Individual, "ghost"), "ghost");
        assert_eq!(roster.display_name(EventKind::Team, "ghost"), "ghost");
    }

    #[test]
    fn serializes_like_the_ui_expects() {
        let json = serde_json::to_value(RecordCheck::NotBroken).unwrap();
        assert_eq!(json, serde_json::json!({"isBroken": false}));

        let json = serde_json::to_value(RecordCheck::Broken {
            new_record: "12.3".to_string(),
            record_holder: "Red".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"isBroken": true, "newRecord": "12.3", "recordHolder": "Red"})
        );
    }
}
