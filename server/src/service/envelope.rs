//! Uniform response envelope and dispatch-level errors.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Opening the session store timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidRequest,
    InvalidPayload,
    InvalidSessionId,
    NotFound,
    StoreOpen,
    StoreClosed,
    Repository,
    Timeout,
    Io,
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            DispatchError::InvalidPayload(_) => ErrorKind::InvalidPayload,
            DispatchError::Timeout(_) => ErrorKind::Timeout,
            DispatchError::Persistence(e) => match e {
                PersistenceError::StoreOpen { .. } => ErrorKind::StoreOpen,
                PersistenceError::StoreClosed => ErrorKind::StoreClosed,
                PersistenceError::Repository { .. } => ErrorKind::Repository,
                PersistenceError::NotFound { .. } => ErrorKind::NotFound,
                PersistenceError::InvalidPayload(_) | PersistenceError::Json(_) => {
                    ErrorKind::InvalidPayload
                }
                PersistenceError::InvalidSessionId(_) => ErrorKind::InvalidSessionId,
                PersistenceError::Io(_) => ErrorKind::Io,
            },
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            DispatchError::Timeout(limit) => Some(json!({ "timeoutMs": limit.as_millis() as u64 })),
            DispatchError::Persistence(PersistenceError::NotFound { table, id }) => {
                Some(json!({ "table": table, "id": id }))
            }
            DispatchError::Persistence(PersistenceError::Repository { table, source }) => {
                Some(json!({ "table": table, "cause": source.to_string() }))
            }
            DispatchError::Persistence(PersistenceError::StoreOpen { path, reason }) => {
                Some(json!({ "path": path.display().to_string(), "cause": reason }))
            }
            _ => None,
        }
    }
}

/// `{success: true, data}` or `{success: false, error, kind, details?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            details: None,
        }
    }

    pub fn failure(error: &DispatchError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
            details: error.details(),
        }
    }
}

impl From<DispatchError> for Envelope {
    fn from(error: DispatchError) -> Self {
        Envelope::failure(&error)
    }
}
