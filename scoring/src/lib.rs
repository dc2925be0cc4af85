//! Results scoring for school sports meets.
//!
//! Everything in this crate is pure and synchronous: it turns a batch of
//! operator-entered finishing positions into adjusted positions and points,
//! and decides whether the winning measurement breaks the event record.
//! Persistence lives in the server crate.

pub mod measurement;
pub mod placing;
pub mod points;
pub mod record;
pub mod types;

pub use measurement::parse_measurement;
pub use placing::{
    assign_points_preserving_order, ExcludedEntry, ExclusionReason, Placement, Placing,
    ScoringEntry, SubmittedPosition,
};
pub use points::{PointTable, PointsSettings};
pub use record::{check_if_record_has_been_broken, Competitor, RecordCheck, Roster, StoredRecord};
pub use types::{
    DisciplineKind, EventKind, EventStatus, Gender, MeasurementNature, ParseError,
    ParticipantType,
};
