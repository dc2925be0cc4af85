//! Settings endpoints

use serde_json::Value;

use super::crud::to_data;
use crate::service::envelope::DispatchError;
use crate::settings::{Settings, SettingsScope, SettingsStore};

pub struct SettingsEndpoints {
    store: SettingsStore,
}

impl SettingsEndpoints {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }

    /// Resolved settings for a scope, for callers inside the service.
    pub async fn resolve(&self, scope: &SettingsScope) -> Result<Settings, DispatchError> {
        Ok(self.store.get(scope).await?)
    }

    pub async fn get(&self, scope: &SettingsScope) -> Result<Value, DispatchError> {
        tracing::debug!(?scope, "Request settings:get");
        to_data(&self.resolve(scope).await?)
    }

    pub async fn update(
        &self,
        scope: &SettingsScope,
        payload: Value,
    ) -> Result<Value, DispatchError> {
        tracing::info!(?scope, "Request settings:update");
        to_data(&self.store.update(scope, payload).await?)
    }
}
