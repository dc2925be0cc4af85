//! Domain vocabulary shared by scoring and persistence.
//!
//! Every enum here is stored as a lowercase TEXT column and travels over the
//! command bridge as the same lowercase string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown {kind} value: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseError::UnknownVariant {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Selects the schema family of a session store.
    DisciplineKind("discipline type") {
        Performance => "performance",
        Team => "team",
    }
}

text_enum! {
    EventKind("event type") {
        Individual => "individual",
        Team => "team",
    }
}

text_enum! {
    Gender("gender") {
        Male => "male",
        Female => "female",
        Mixed => "mixed",
    }
}

text_enum! {
    MeasurementNature("measurement nature") {
        Time => "time",
        Length => "length",
        Score => "score",
        Height => "height",
    }
}

text_enum! {
    EventStatus("event status") {
        Pending => "pending",
        Complete => "complete",
    }
}

text_enum! {
    /// Who a result row belongs to: a single athlete or a whole house.
    ParticipantType("participant type") {
        Participant => "participant",
        House => "house",
    }
}

impl EventKind {
    /// Team events are scored per house, individual events per athlete.
    pub fn participant_type(&self) -> ParticipantType {
        match self {
            EventKind::Team => ParticipantType::House,
            EventKind::Individual => ParticipantType::Participant,
        }
    }
}

impl MeasurementNature {
    pub fn lower_is_better(&self) -> bool {
        matches!(self, MeasurementNature::Time)
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_roundtrip_for_every_variant() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), *kind);
        }
        for nature in MeasurementNature::ALL {
            assert_eq!(nature.to_string().parse::<MeasurementNature>().unwrap(), *nature);
        }
        for status in EventStatus::ALL {
            assert_eq!(EventStatus::try_from(status.as_str().to_string()).unwrap(), *status);
        }
    }

    #[test]
    fn unknown_text_is_rejected() {
        let err = "relay".parse::<EventKind>().unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownVariant {
                kind: "event type",
                value: "relay".to_string()
            }
        );
        assert!("Male".parse::<Gender>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_text() {
        let json = serde_json::to_string(&ParticipantType::House).unwrap();
        assert_eq!(json, "\"house\"");
        let nature: MeasurementNature = serde_json::from_str("\"height\"").unwrap();
        assert_eq!(nature, MeasurementNature::Height);
    }

    #[test]
    fn team_events_score_houses() {
        assert_eq!(EventKind::Team.participant_type(), ParticipantType::House);
        assert_eq!(
            EventKind::Individual.participant_type(),
            ParticipantType::Participant
        );
    }

    #[test]
    fn only_time_prefers_lower_values() {
        assert!(MeasurementNature::Time.lower_is_better());
        assert!(!MeasurementNature::Length.lower_is_better());
        assert!(!MeasurementNature::Score.lower_is_better());
        assert!(!MeasurementNature::Height.lower_is_better());
    }
}
