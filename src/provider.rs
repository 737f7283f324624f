//! The Zabbix provider.
//!
//! [`ZabbixProvider`] routes host requests to the resource handlers in
//! [`crate::resources`], talking to Zabbix through the supplied
//! [`ZabbixApi`] client.

use serde_json::{json, Value};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::api::ZabbixApi;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resource_data::ResourceData;
use crate::resources::{self, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A provider serving `zabbix_user`, `zabbix_user_group` and `zabbix_proxy`.
pub struct ZabbixProvider<C: ZabbixApi> {
    client: C,
    resources: Vec<Box<dyn Resource>>,
    config: RwLock<Option<ProviderConfig>>,
    serial: Mutex<()>,
}

impl<C: ZabbixApi> ZabbixProvider<C> {
    /// Create an unconfigured provider around `client`.
    pub fn new(client: C) -> Self {
        Self {
            client,
            resources: resources::all(),
            config: RwLock::new(None),
            serial: Mutex::new(()),
        }
    }

    /// The API client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn handler(&self, type_name: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == type_name)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Wait for permission to call the API.
    ///
    /// Fails until [`ProviderService::configure`] has succeeded. When the
    /// configuration asks for serialized access the returned guard must be
    /// held for the whole operation.
    async fn begin(&self) -> Result<Option<MutexGuard<'_, ()>>, ProviderError> {
        let serialize = match self.config.read().await.as_ref() {
            Some(config) => config.serialize,
            None => {
                return Err(ProviderError::Configuration(
                    "provider not configured".to_string(),
                ))
            },
        };
        if serialize {
            Ok(Some(self.serial.lock().await))
        } else {
            Ok(None)
        }
    }
}

#[async_trait::async_trait]
impl<C: ZabbixApi> ProviderService for ZabbixProvider<C> {
    fn schema(&self) -> ProviderSchema {
        self.resources.iter().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, r| {
                schema
                    .with_resource(r.type_name(), r.schema())
                    .with_data_source(r.type_name(), r.data_source_schema())
            },
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(ProviderConfig::from_value(&config).err().unwrap_or_default())
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("Configure called");
        let parsed = match ProviderConfig::from_value(&config) {
            Ok(parsed) => parsed,
            Err(diagnostics) => {
                warn!(
                    diagnostics = diagnostics.len(),
                    "Configure completed with errors"
                );
                return Ok(diagnostics);
            },
        };

        if let Err(e) = self.client.login(&parsed).await {
            error!(error = %e, url = %parsed.url, "Login failed");
            return Ok(vec![
                Diagnostic::error("Unable to log in to the Zabbix API").with_detail(e.to_string())
            ]);
        }

        info!(url = %parsed.url, username = %parsed.username, serialize = parsed.serialize, "Configure completed successfully");
        *self.config.write().await = Some(parsed);
        Ok(vec![])
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Stop called");
        Ok(())
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.handler(resource_type)?.schema();
        let plan = plan_resource(&schema, prior_state.as_ref(), proposed_state)?;
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan completed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        let mut data = ResourceData::new(&handler.schema(), planned_state)?;

        let _guard = self.begin().await?;
        handler
            .create(&self.client, &mut data)
            .await
            .inspect_err(|e| error!(error = %e, "Create failed"))?;

        info!(id = %data.id(), "Create completed successfully");
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        let mut data = ResourceData::new(&handler.schema(), current_state)?;
        let id = data.id().to_string();

        let _guard = self.begin().await?;
        handler
            .read(&self.client, &mut data)
            .await
            .inspect_err(|e| error!(error = %e, id = %id, "Read failed"))?;

        if data.id().is_empty() {
            warn!(id = %id, "Remote object not found, removing from state");
        }
        Ok(data.into_state())
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        let schema = handler.schema();
        let mut data = ResourceData::new(&schema, planned_state)?;
        if data.id().is_empty() {
            let prior = ResourceData::new(&schema, prior_state)?;
            data.set_id(prior.id());
        }
        if data.id().is_empty() {
            return Err(ProviderError::InvalidRequest(format!(
                "cannot update {} without an id",
                resource_type
            )));
        }

        let _guard = self.begin().await?;
        handler
            .update(&self.client, &mut data)
            .await
            .inspect_err(|e| error!(error = %e, id = %data.id(), "Update failed"))?;

        info!(id = %data.id(), "Update completed successfully");
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let handler = self.handler(resource_type)?;
        let mut data = ResourceData::new(&handler.schema(), current_state)?;
        if data.id().is_empty() {
            debug!("Nothing to delete");
            return Ok(());
        }

        let _guard = self.begin().await?;
        handler
            .delete(&self.client, &mut data)
            .await
            .inspect_err(|e| error!(error = %e, id = %data.id(), "Delete failed"))?;

        info!(id = %data.id(), "Delete completed successfully");
        Ok(())
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.handler(resource_type)?;
        if id.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "import requires a non-empty id".to_string(),
            ));
        }
        // the host reads the full state afterwards
        Ok(vec![ImportedResource::new(resource_type, json!({ "id": id }))])
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.handler(data_source_type)?;
        let mut data = ResourceData::new(&handler.data_source_schema(), config)?;

        let _guard = self.begin().await?;
        handler
            .read_data_source(&self.client, &mut data)
            .await
            .inspect_err(|e| error!(error = %e, "ReadDataSource failed"))?;

        debug!(id = %data.id(), "ReadDataSource completed");
        Ok(data.into_state())
    }
}
