//! Session store lifecycle endpoints

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::persistence::SessionContext;
use crate::registry::SessionRegistry;
use crate::service::envelope::DispatchError;

pub struct SessionEndpoints {
    registry: Arc<SessionRegistry>,
    open_timeout: Duration,
}

impl SessionEndpoints {
    pub fn new(registry: Arc<SessionRegistry>, open_timeout: Duration) -> Self {
        Self {
            registry,
            open_timeout,
        }
    }

    /// Open the session's store if needed, bounded by the open timeout.
    pub async fn ensure(&self, session_id: &str) -> Result<Arc<SessionContext>, DispatchError> {
        match tokio::time::timeout(self.open_timeout, self.registry.ensure(session_id)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(session_id, timeout = ?self.open_timeout, "Session open timed out");
                Err(DispatchError::Timeout(self.open_timeout))
            }
        }
    }

    pub async fn open(&self, session_id: &str) -> Result<Value, DispatchError> {
        tracing::info!(session_id, "Request session:open");
        let ctx = self.ensure(session_id).await?;
        Ok(json!({
            "sessionId": session_id,
            "family": ctx.family().as_str(),
        }))
    }

    pub async fn close(&self, session_id: &str) -> Result<Value, DispatchError> {
        tracing::info!(session_id, "Request session:close");
        self.registry.release(session_id).await?;
        Ok(Value::Null)
    }
}
