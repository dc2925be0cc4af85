//! Parsing of channel names and request payloads.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::envelope::DispatchError;
use crate::persistence::ListFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Op {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Op::Create),
            "read" => Some(Op::Read),
            "update" => Some(Op::Update),
            "delete" => Some(Op::Delete),
            "list" => Some(Op::List),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainTable {
    Session,
    Event,
    Discipline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceTable {
    Event,
    House,
    Participant,
    EventResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamTable {
    Team,
    Player,
    Fixture,
    FixtureTeam,
}

/// Every channel the bridge answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Main(MainTable, Op),
    Performance(PerformanceTable, Op),
    Team(TeamTable, Op),
    SubmitResults,
    SessionOpen,
    SessionClose,
    SettingsGet,
    SettingsUpdate,
}

impl Route {
    pub fn parse(channel: &str) -> Result<Self, DispatchError> {
        let unknown = || DispatchError::InvalidRequest(format!("unknown channel {channel:?}"));
        let parts: Vec<&str> = channel.split(':').collect();

        let route = match parts.as_slice() {
            ["session", "open"] => Route::SessionOpen,
            ["session", "close"] => Route::SessionClose,
            ["settings", "get"] => Route::SettingsGet,
            ["settings", "update"] => Route::SettingsUpdate,
            ["ps", "event", "submitResults"] => Route::SubmitResults,
            ["main", table, op] => {
                let table = match *table {
                    "session" => MainTable::Session,
                    "event" => MainTable::Event,
                    "discipline" => MainTable::Discipline,
                    _ => return Err(unknown()),
                };
                Route::Main(table, Op::parse(op).ok_or_else(unknown)?)
            }
            ["ps", table, op] => {
                let table = match *table {
                    "event" => PerformanceTable::Event,
                    "house" => PerformanceTable::House,
                    "participant" => PerformanceTable::Participant,
                    "event_result" => PerformanceTable::EventResult,
                    _ => return Err(unknown()),
                };
                Route::Performance(table, Op::parse(op).ok_or_else(unknown)?)
            }
            ["ts", table, op] => {
                let table = match *table {
                    "team" => TeamTable::Team,
                    "player" => TeamTable::Player,
                    "fixture" => TeamTable::Fixture,
                    "fixture_team" => TeamTable::FixtureTeam,
                    _ => return Err(unknown()),
                };
                Route::Team(table, Op::parse(op).ok_or_else(unknown)?)
            }
            _ => return Err(unknown()),
        };
        Ok(route)
    }
}

/// Deserialize a payload into `T`, reporting failures as invalid payloads.
pub fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, DispatchError> {
    serde_json::from_value(payload).map_err(|e| DispatchError::InvalidPayload(e.to_string()))
}

/// `"id"` or `{"id": "id"}`.
pub fn parse_id(payload: &Value) -> Result<String, DispatchError> {
    match payload {
        Value::String(id) if !id.is_empty() => Ok(id.clone()),
        Value::Object(map) => match map.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            _ => Err(DispatchError::InvalidPayload("missing \"id\"".to_string())),
        },
        _ => Err(DispatchError::InvalidPayload(
            "expected an id or {\"id\": ..}".to_string(),
        )),
    }
}

/// `{"id": .., "data": {..}}`.
pub fn parse_update(payload: Value) -> Result<(String, Value), DispatchError> {
    let id = parse_id(&payload)?;
    let Value::Object(mut map) = payload else {
        return Err(DispatchError::InvalidPayload(
            "update expects {\"id\": .., \"data\": ..}".to_string(),
        ));
    };
    match map.remove("data") {
        Some(data @ Value::Object(_)) => Ok((id, data)),
        _ => Err(DispatchError::InvalidPayload(
            "update expects an object under \"data\"".to_string(),
        )),
    }
}

/// A filter object, or nothing for "every row".
pub fn parse_filter(payload: Value) -> Result<ListFilter, DispatchError> {
    match payload {
        Value::Null => Ok(ListFilter::new()),
        Value::Object(_) => parse_payload(payload),
        _ => Err(DispatchError::InvalidPayload(
            "list expects a filter object or null".to_string(),
        )),
    }
}
