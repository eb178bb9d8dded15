//! API Management API resource
//!
//! An API contract nested under an API Management service. The client adapter
//! binds the parent service name so the generic dispatcher still operates on
//! (resource group, api id). Definitions can be authored field by field or
//! imported wholesale from a Swagger/WSDL document.

use crate::arm::{is_not_found, ArmClient, ResourceId};
use crate::dispatch::{self, RemoteResource, ResourceClient};
use crate::resource::fields::{block_string, single_block};
use crate::resource::{FieldKind, FieldSchema, ResourceHandler, Schema};
use crate::state::ResourceState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const API_VERSION: &str = "2017-03-01";

const CONTENT_FORMATS: &[&str] = &[
    "swagger-json",
    "swagger-link-json",
    "wadl-link-json",
    "wadl-xml",
    "wsdl",
    "wsdl-link",
];

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiContract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub properties: ApiProperties,
}

impl RemoteResource for ApiContract {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiProperties {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    #[serde(default, rename = "apiType", skip_serializing_if = "Option::is_none")]
    pub api_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, rename = "apiVersionSetId", skip_serializing_if = "Option::is_none")]
    pub api_version_set_id: Option<String>,

    // Populated by the service, never sent.
    #[serde(default, skip_serializing)]
    pub is_current: Option<bool>,
    #[serde(default, skip_serializing)]
    pub is_online: Option<bool>,
}

// =============================================================================
// Client adapter
// =============================================================================

pub(crate) struct ApiManagementApiClient<'a> {
    arm: &'a ArmClient,
    service_name: String,
}

impl<'a> ApiManagementApiClient<'a> {
    pub(crate) fn new(arm: &'a ArmClient, service_name: &str) -> Self {
        Self {
            arm,
            service_name: service_name.to_string(),
        }
    }

    fn url(&self, group: &str, api_id: &str) -> String {
        self.arm.provider_url(
            group,
            &format!(
                "Microsoft.ApiManagement/service/{}/apis/{}",
                urlencoding::encode(&self.service_name),
                urlencoding::encode(api_id)
            ),
            API_VERSION,
        )
    }
}

#[async_trait]
impl ResourceClient for ApiManagementApiClient<'_> {
    type Params = ApiContract;
    type Resource = ApiContract;

    async fn mutate(&self, group: &str, name: &str, params: &Self::Params) -> Result<()> {
        let body = serde_json::to_value(params)?;
        self.arm.put_and_wait(&self.url(group, name), &body).await
    }

    async fn fetch(&self, group: &str, name: &str) -> Result<Self::Resource> {
        let body = self.arm.get(&self.url(group, name)).await?;
        serde_json::from_value(body).context("Failed to decode the API contract")
    }
}

// =============================================================================
// Handler
// =============================================================================

pub struct ApiManagementApi;

#[async_trait]
impl ResourceHandler for ApiManagementApi {
    fn type_name(&self) -> &'static str {
        "azurerm_api_management_api"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field("name", FieldSchema::required(FieldKind::String))
            .field(
                "service_name",
                FieldSchema::required(FieldKind::String).force_new(),
            )
            .field(
                "resource_group_name",
                FieldSchema::required(FieldKind::String).force_new(),
            )
            .field("path", FieldSchema::required(FieldKind::String))
            .field("service_url", FieldSchema::optional(FieldKind::String))
            .field("display_name", FieldSchema::optional(FieldKind::String))
            .field("description", FieldSchema::optional(FieldKind::String))
            .field("protocols", FieldSchema::optional(FieldKind::List))
            .field("soap_api_type", FieldSchema::optional(FieldKind::String))
            .field("import", FieldSchema::optional(FieldKind::List))
            .field("version", FieldSchema::optional(FieldKind::String))
            .field(
                "api_version_set_id",
                FieldSchema::optional(FieldKind::String),
            )
            .field("is_current", FieldSchema::computed(FieldKind::Bool))
            .field("is_online", FieldSchema::computed(FieldKind::Bool))
    }

    async fn create_or_update(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        tracing::info!("preparing arguments for API Management API creation");

        let service_name = state.require_string("service_name")?;
        let is_import = single_block(state, "import").is_some();

        let params = if is_import {
            expand_import_properties(state)?
        } else {
            expand_api_properties(state)?
        };

        let client = ApiManagementApiClient::new(arm, &service_name);
        dispatch::write_then_confirm(state, &client, &params).await?;

        // An imported definition overwrites the backend URL; restore the
        // configured one with a follow-up update.
        if is_import {
            if let Some(service_url) = state.get_string("service_url").filter(|s| !s.is_empty()) {
                let name = state.require_string("name")?;
                let group = state.require_string("resource_group_name")?;
                let patch = json!({ "properties": { "serviceUrl": service_url } });
                arm.patch(&client.url(&group, &name), &patch)
                    .await
                    .context("Failed to restore service_url after import")?;
            }
        }

        self.read(arm, state).await
    }

    async fn read(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("API Management API has no ID to read"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let service_name = id.require("service")?;
        let api_id = id.require("apis")?;

        let client = ApiManagementApiClient::new(arm, &service_name);
        let api = match client.fetch(&group, &api_id).await {
            Ok(api) => api,
            Err(err) if is_not_found(&err) => {
                tracing::warn!(%api_id, %group, "API Management API no longer exists");
                state.clear_id();
                return Ok(());
            }
            Err(err) => {
                return Err(err.context(format!(
                    "Error reading API Management API {:?} (service {:?}, resource group {:?})",
                    api_id, service_name, group
                )))
            }
        };

        state.set("name", api_id);
        state.set("service_name", service_name);
        state.set("resource_group_name", group);
        flatten_api(state, &api);

        Ok(())
    }

    async fn delete(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("API Management API has no ID to delete"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let service_name = id.require("service")?;
        let api_id = id.require("apis")?;

        tracing::debug!(%api_id, %group, "deleting API Management API");

        let client = ApiManagementApiClient::new(arm, &service_name);
        match arm.delete_if_match(&client.url(&group, &api_id), "*").await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// Expand / flatten
// =============================================================================

fn expand_api_properties(state: &ResourceState) -> Result<ApiContract> {
    let mut protocols = Vec::new();
    for value in state.get_list("protocols") {
        match value.as_str().map(str::to_lowercase).as_deref() {
            Some("http") => protocols.push("http".to_string()),
            Some("https") => protocols.push("https".to_string()),
            _ => {
                return Err(anyhow::anyhow!(
                    "Error expanding protocols. Valid protocols are `http` and `https`."
                ))
            }
        }
    }
    if protocols.is_empty() {
        protocols.push("https".to_string());
    }

    let api_type = match state
        .get_string("soap_api_type")
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("soap") => Some("soap".to_string()),
        Some("http") => Some("http".to_string()),
        _ => None,
    };

    Ok(ApiContract {
        id: None,
        properties: ApiProperties {
            path: state.require_string("path")?,
            display_name: state.get_string("display_name").map(str::to_string),
            description: state.get_string("description").map(str::to_string),
            service_url: state.get_string("service_url").map(str::to_string),
            protocols: Some(protocols),
            api_type,
            api_version: state
                .get_string("version")
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            api_version_set_id: state
                .get_string("api_version_set_id")
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ..ApiProperties::default()
        },
    })
}

fn expand_import_properties(state: &ResourceState) -> Result<ApiContract> {
    let block = single_block(state, "import")
        .ok_or_else(|| anyhow::anyhow!("missing required field `import`"))?;

    let content_format = block_string(block, "content_format").unwrap_or_default();
    if !CONTENT_FORMATS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(content_format))
    {
        return Err(anyhow::anyhow!(
            "import content format {:?} is not one of {:?}",
            content_format,
            CONTENT_FORMATS
        ));
    }

    let content_value = block_string(block, "content_value")
        .ok_or_else(|| anyhow::anyhow!("missing required field `import.content_value`"))?;

    Ok(ApiContract {
        id: None,
        properties: ApiProperties {
            path: state.require_string("path")?,
            content_format: Some(content_format.to_string()),
            content_value: Some(content_value.to_string()),
            ..ApiProperties::default()
        },
    })
}

fn flatten_api(state: &mut ResourceState, api: &ApiContract) {
    let props = &api.properties;

    state.set("path", props.path.clone());
    state.set_optional("display_name", props.display_name.clone());
    state.set_optional("description", props.description.clone());
    state.set_optional("service_url", props.service_url.clone());
    state.set_optional("soap_api_type", props.api_type.clone());
    state.set_optional("version", props.api_version.clone());
    state.set_optional("api_version_set_id", props.api_version_set_id.clone());

    if let Some(protocols) = &props.protocols {
        let lowered: Vec<String> = protocols.iter().map(|p| p.to_lowercase()).collect();
        state.set("protocols", json!(lowered));
    }

    if let Some(current) = props.is_current {
        state.set("is_current", current);
    }
    if let Some(online) = props.is_online {
        state.set("is_online", online);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> ResourceState {
        ResourceState::from_fields([
            ("name", json!("api1")),
            ("service_name", json!("svc1")),
            ("resource_group_name", json!("rg1")),
            ("path", json!("payments")),
        ])
    }

    #[test]
    fn test_expand_defaults_to_https() {
        let contract = expand_api_properties(&base_state()).unwrap();
        assert_eq!(
            contract.properties.protocols,
            Some(vec!["https".to_string()])
        );
    }

    #[test]
    fn test_expand_rejects_unknown_protocols() {
        let mut state = base_state();
        state.set("protocols", json!(["gopher"]));
        let err = expand_api_properties(&state).unwrap_err();
        assert!(err.to_string().contains("Valid protocols"));
    }

    #[test]
    fn test_expand_accepts_mixed_case_protocols() {
        let mut state = base_state();
        state.set("protocols", json!(["HTTP", "Https"]));
        let contract = expand_api_properties(&state).unwrap();
        assert_eq!(
            contract.properties.protocols,
            Some(vec!["http".to_string(), "https".to_string()])
        );
    }

    #[test]
    fn test_expand_import_requires_known_format() {
        let mut state = base_state();
        state.set(
            "import",
            json!([{ "content_format": "carrier-pigeon", "content_value": "{}" }]),
        );
        let err = expand_import_properties(&state).unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_expand_import_carries_content() {
        let mut state = base_state();
        state.set(
            "import",
            json!([{ "content_format": "swagger-json", "content_value": "{\"openapi\":true}" }]),
        );
        let contract = expand_import_properties(&state).unwrap();
        assert_eq!(
            contract.properties.content_format.as_deref(),
            Some("swagger-json")
        );
        assert!(contract.properties.protocols.is_none());
    }

    #[test]
    fn test_flatten_lowercases_protocols() {
        let mut state = base_state();
        let api = ApiContract {
            id: Some("/id".to_string()),
            properties: ApiProperties {
                path: "payments".to_string(),
                protocols: Some(vec!["Https".to_string()]),
                is_current: Some(true),
                ..ApiProperties::default()
            },
        };

        flatten_api(&mut state, &api);
        assert_eq!(state.get("protocols"), Some(&json!(["https"])));
        assert!(state.get_bool("is_current"));
    }
}
