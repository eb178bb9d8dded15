//! Provider facade
//!
//! The entry point a host drives: one connected ARM client plus the handler
//! registry, with schema validation in front of every lifecycle call.

use crate::arm::ArmClient;
use crate::arm::auth::{AadCredentials, ServicePrincipal};
use crate::config::ProviderConfig;
use crate::resource::Registry;
use crate::state::ResourceState;
use anyhow::{Context, Result};

pub struct Provider {
    client: ArmClient,
    registry: Registry,
}

impl Provider {
    /// Connect using the given configuration: service principal credentials
    /// against the configured (or default) management endpoint.
    pub fn connect(config: &ProviderConfig) -> Result<Self> {
        let subscription_id = config.require_subscription_id()?;
        let (tenant, client_id, secret) = config.require_service_principal()?;

        let credentials = AadCredentials::client_secret(ServicePrincipal {
            tenant_id: tenant.to_string(),
            client_id: client_id.to_string(),
            client_secret: secret.to_string(),
        });
        let client = match config.endpoint.as_deref() {
            Some(endpoint) => ArmClient::with_endpoint(credentials, subscription_id, endpoint)?,
            None => ArmClient::new(credentials, subscription_id)?,
        };

        Ok(Self::with_client(client))
    }

    /// Build a provider around an existing client. Tests point the client at
    /// a mock server.
    pub fn with_client(client: ArmClient) -> Self {
        Self {
            client,
            registry: Registry::builtin(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Create or update a resource. Validates against the type's schema, then
    /// hands off to the handler; on success the state carries the remote
    /// identifier and any computed fields.
    pub async fn create(&self, type_name: &str, state: &mut ResourceState) -> Result<()> {
        let handler = self
            .registry
            .resource(type_name)
            .with_context(|| format!("unknown resource type {:?}", type_name))?;

        handler
            .schema()
            .validate(state)
            .with_context(|| format!("invalid {} configuration", type_name))?;

        handler.create_or_update(&self.client, state).await
    }

    /// Refresh a resource's state from the remote object. A vanished object
    /// clears the identifier instead of failing.
    pub async fn read(&self, type_name: &str, state: &mut ResourceState) -> Result<()> {
        let handler = self
            .registry
            .resource(type_name)
            .with_context(|| format!("unknown resource type {:?}", type_name))?;

        handler.read(&self.client, state).await
    }

    /// Update is the same PUT as create; kept as its own method so call sites
    /// read naturally.
    pub async fn update(&self, type_name: &str, state: &mut ResourceState) -> Result<()> {
        self.create(type_name, state).await
    }

    /// Delete a resource. Deleting an already-gone object succeeds.
    pub async fn delete(&self, type_name: &str, state: &mut ResourceState) -> Result<()> {
        let handler = self
            .registry
            .resource(type_name)
            .with_context(|| format!("unknown resource type {:?}", type_name))?;

        handler.delete(&self.client, state).await
    }

    /// Resolve a data source by its identity fields. A missing remote object
    /// is an error here.
    pub async fn read_data_source(&self, type_name: &str, state: &mut ResourceState) -> Result<()> {
        let handler = self
            .registry
            .data_source(type_name)
            .with_context(|| format!("unknown data source type {:?}", type_name))?;

        handler
            .schema()
            .validate(state)
            .with_context(|| format!("invalid {} configuration", type_name))?;

        handler.read(&self.client, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> Provider {
        let client = ArmClient::new(AadCredentials::static_token("t"), "sub-1").unwrap();
        Provider::with_client(client)
    }

    #[tokio::test]
    async fn test_unknown_type_is_an_error() {
        let mut state = ResourceState::new();
        let err = provider()
            .create("azurerm_virtual_machine", &mut state)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown resource type"));
    }

    #[tokio::test]
    async fn test_invalid_configuration_fails_before_any_remote_call() {
        // resource_group_name missing, so validation must reject the state
        // without touching the network.
        let mut state = ResourceState::from_fields([("name", json!("wf1"))]);
        let err = provider()
            .create("azurerm_logic_app_workflow", &mut state)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("`resource_group_name` is required"));
    }
}
