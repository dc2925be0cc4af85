//! Command dispatch: channel routing and the response envelope.
//!
//! This module maps a request onto the store it targets:
//! - parsers: channel strings and payload shapes
//! - envelope: the uniform `{success, data | error}` response
//! - endpoints: handlers grouped by domain
//!
//! Nothing below [`Dispatcher::dispatch`] escapes as an error; every failure
//! becomes an envelope.

mod endpoints;
mod envelope;
mod parsers;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub use envelope::{DispatchError, Envelope, ErrorKind};
pub use parsers::Route;

use crate::persistence::{MainContext, SessionContext};
use crate::registry::SessionRegistry;
use crate::settings::{SettingsScope, SettingsStore};
use endpoints::{results, tables, SessionEndpoints, SettingsEndpoints};
use parsers::parse_id;

/// One line of input from the desktop shell.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub request_id: Option<Value>,
    pub channel: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

/// One line of output: the envelope plus the echoed request id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(flatten)]
    pub envelope: Envelope,
}

pub struct Dispatcher {
    main: Arc<MainContext>,
    sessions: SessionEndpoints,
    settings: SettingsEndpoints,
}

impl Dispatcher {
    pub fn new(
        main: Arc<MainContext>,
        registry: Arc<SessionRegistry>,
        settings: SettingsStore,
        open_timeout: Duration,
    ) -> Self {
        Self {
            main,
            sessions: SessionEndpoints::new(registry, open_timeout),
            settings: SettingsEndpoints::new(settings),
        }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let request_id = request.request_id.clone();
        let channel = request.channel.clone();

        let envelope = match self.route(request).await {
            Ok(data) => Envelope::ok(data),
            Err(e) => {
                match e.kind() {
                    ErrorKind::InvalidRequest
                    | ErrorKind::InvalidPayload
                    | ErrorKind::InvalidSessionId
                    | ErrorKind::NotFound => {
                        tracing::warn!(%channel, error = %e, "Request rejected")
                    }
                    _ => tracing::error!(%channel, error = %e, "Request failed"),
                }
                Envelope::from(e)
            }
        };
        Response {
            request_id,
            envelope,
        }
    }

    /// Decode one input line and dispatch it. Lines that are not a valid
    /// request still get an envelope, echoing `requestId` when it can be read.
    pub async fn dispatch_line(&self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request line");
                let request_id = serde_json::from_str::<Value>(line)
                    .ok()
                    .and_then(|v| v.get("requestId").cloned());
                Response {
                    request_id,
                    envelope: Envelope::from(DispatchError::InvalidRequest(format!(
                        "malformed request: {e}"
                    ))),
                }
            }
        }
    }

    async fn route(&self, request: Request) -> Result<Value, DispatchError> {
        let route = Route::parse(&request.channel)?;
        tracing::debug!(?route, session_id = ?request.session_id, "Dispatching");

        match route {
            Route::Main(table, op) => tables::main_store(&self.main, table, op, request.payload).await,
            Route::Performance(table, op) => {
                let ctx = self.session_context(&request).await?;
                let SessionContext::Performance(ps) = ctx.as_ref() else {
                    return Err(family_mismatch(&request.channel, &ctx));
                };
                tables::performance_store(ps, table, op, request.payload).await
            }
            Route::Team(table, op) => {
                let ctx = self.session_context(&request).await?;
                let SessionContext::Team(ts) = ctx.as_ref() else {
                    return Err(family_mismatch(&request.channel, &ctx));
                };
                tables::team_store(ts, table, op, request.payload).await
            }
            Route::SubmitResults => {
                let ctx = self.session_context(&request).await?;
                let SessionContext::Performance(ps) = ctx.as_ref() else {
                    return Err(family_mismatch(&request.channel, &ctx));
                };
                let scope = SettingsScope::from_session_id(request.session_id.as_deref());
                let settings = self.settings.resolve(&scope).await?;
                results::submit(ps, &settings, request.payload).await
            }
            Route::SessionOpen => {
                let session_id = lifecycle_session_id(&request)?;
                self.sessions.open(&session_id).await
            }
            Route::SessionClose => {
                let session_id = lifecycle_session_id(&request)?;
                self.sessions.close(&session_id).await
            }
            Route::SettingsGet => {
                let scope = SettingsScope::from_session_id(request.session_id.as_deref());
                self.settings.get(&scope).await
            }
            Route::SettingsUpdate => {
                let scope = SettingsScope::from_session_id(request.session_id.as_deref());
                self.settings.update(&scope, request.payload).await
            }
        }
    }

    async fn session_context(&self, request: &Request) -> Result<Arc<SessionContext>, DispatchError> {
        let Some(session_id) = request.session_id.as_deref() else {
            return Err(DispatchError::InvalidRequest(format!(
                "{} requires a sessionId",
                request.channel
            )));
        };
        self.sessions.ensure(session_id).await
    }
}

/// `session:open` / `session:close` take the id from `sessionId` or the payload.
fn lifecycle_session_id(request: &Request) -> Result<String, DispatchError> {
    match &request.session_id {
        Some(id) => Ok(id.clone()),
        None => parse_id(&request.payload),
    }
}

fn family_mismatch(channel: &str, ctx: &SessionContext) -> DispatchError {
    DispatchError::InvalidRequest(format!(
        "{channel} does not apply to a {} session",
        ctx.family()
    ))
}
