//! API Management service resource
//!
//! Maps the `azurerm_api_management` schema onto the
//! `Microsoft.ApiManagement/service` ARM surface: sku, publisher contact,
//! custom hostnames, uploaded certificates, and additional regional
//! deployments. Service creation is a long-running operation, so the mutation
//! goes through the LRO-aware PUT before the confirming fetch.

use crate::arm::{is_not_found, ArmClient, ResourceId};
use crate::dispatch::{self, RemoteResource, ResourceClient};
use crate::resource::fields::{
    block_bool, block_string, blocks, expand_location, expand_tags, flatten_location,
    flatten_tags, single_block,
};
use crate::resource::{DataSourceHandler, FieldKind, FieldSchema, ResourceHandler, Schema};
use crate::state::ResourceState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const API_VERSION: &str = "2017-03-01";
const DEFAULT_SKU_NAME: &str = "Developer";
const DEFAULT_SKU_CAPACITY: i64 = 1;

const SKU_NAMES: &[&str] = &["Developer", "Basic", "Standard", "Premium"];
const STORE_NAMES: &[&str] = &["CertificateAuthority", "Root"];
const HOSTNAME_TYPES: &[&str] = &["Management", "Portal", "Proxy", "Scm"];

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    pub sku: SkuProperties,
    pub properties: ServiceProperties,
}

impl RemoteResource for ServiceResource {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SkuProperties {
    pub name: String,
    pub capacity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceProperties {
    pub publisher_name: String,
    pub publisher_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_sender_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname_configurations: Option<Vec<HostnameConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificates: Option<Vec<CertificateConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_locations: Option<Vec<AdditionalLocation>>,

    // Populated by the service, never sent.
    #[serde(default, skip_serializing)]
    pub created_at_utc: Option<String>,
    #[serde(default, skip_serializing)]
    pub gateway_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub gateway_regional_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub portal_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub management_api_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub scm_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub static_ips: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HostnameConfiguration {
    #[serde(rename = "type")]
    pub host_type: String,
    pub host_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_password: Option<String>,
    #[serde(default)]
    pub default_ssl_binding: bool,
    #[serde(default)]
    pub negotiate_client_certificate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CertificateConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_password: Option<String>,
    pub store_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdditionalLocation {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<SkuProperties>,
    #[serde(default, skip_serializing)]
    pub static_ips: Option<Vec<String>>,
    #[serde(default, skip_serializing)]
    pub gateway_regional_url: Option<String>,
}

// =============================================================================
// Client adapter
// =============================================================================

pub(crate) struct ApiManagementServiceClient<'a> {
    arm: &'a ArmClient,
}

impl<'a> ApiManagementServiceClient<'a> {
    pub(crate) fn new(arm: &'a ArmClient) -> Self {
        Self { arm }
    }

    fn url(&self, group: &str, name: &str) -> String {
        self.arm.provider_url(
            group,
            &format!(
                "Microsoft.ApiManagement/service/{}",
                urlencoding::encode(name)
            ),
            API_VERSION,
        )
    }
}

#[async_trait]
impl ResourceClient for ApiManagementServiceClient<'_> {
    type Params = ServiceResource;
    type Resource = ServiceResource;

    async fn mutate(&self, group: &str, name: &str, params: &Self::Params) -> Result<()> {
        let body = serde_json::to_value(params)?;
        self.arm.put_and_wait(&self.url(group, name), &body).await
    }

    async fn fetch(&self, group: &str, name: &str) -> Result<Self::Resource> {
        let body = self.arm.get(&self.url(group, name)).await?;
        serde_json::from_value(body).context("Failed to decode the API Management service")
    }
}

// =============================================================================
// Handler
// =============================================================================

pub struct ApiManagementService;

#[async_trait]
impl ResourceHandler for ApiManagementService {
    fn type_name(&self) -> &'static str {
        "azurerm_api_management"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field(
                "name",
                FieldSchema::required(FieldKind::String)
                    .force_new()
                    .with_validator(validate_service_name),
            )
            .field(
                "resource_group_name",
                FieldSchema::required(FieldKind::String).force_new(),
            )
            .field("location", FieldSchema::required(FieldKind::String))
            .field(
                "publisher_name",
                FieldSchema::required(FieldKind::String).with_validator(validate_publisher_field),
            )
            .field(
                "publisher_email",
                FieldSchema::required(FieldKind::String).with_validator(validate_publisher_field),
            )
            .field("sku", FieldSchema::required(FieldKind::List))
            .field(
                "notification_sender_email",
                FieldSchema::optional(FieldKind::String),
            )
            .field("additional_location", FieldSchema::optional(FieldKind::List))
            .field(
                "certificate",
                FieldSchema::optional(FieldKind::List).sensitive(),
            )
            .field("custom_properties", FieldSchema::optional(FieldKind::Map))
            .field(
                "hostname_configuration",
                FieldSchema::optional(FieldKind::List).sensitive(),
            )
            .field("tags", FieldSchema::optional(FieldKind::Map))
            .field("created", FieldSchema::computed(FieldKind::String))
            .field("gateway_url", FieldSchema::computed(FieldKind::String))
            .field(
                "gateway_regional_url",
                FieldSchema::computed(FieldKind::String),
            )
            .field("portal_url", FieldSchema::computed(FieldKind::String))
            .field(
                "management_api_url",
                FieldSchema::computed(FieldKind::String),
            )
            .field("scm_url", FieldSchema::computed(FieldKind::String))
            .field("static_ips", FieldSchema::computed(FieldKind::List))
    }

    async fn create_or_update(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        tracing::info!("preparing arguments for API Management service creation");

        let params = expand_service(state)?;
        let client = ApiManagementServiceClient::new(arm);

        dispatch::write_then_confirm(state, &client, &params).await?;

        self.read(arm, state).await
    }

    async fn read(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("API Management service has no ID to read"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let name = id.require("service")?;

        let client = ApiManagementServiceClient::new(arm);
        let service = match client.fetch(&group, &name).await {
            Ok(service) => service,
            Err(err) if is_not_found(&err) => {
                tracing::warn!(%name, %group, "API Management service no longer exists");
                state.clear_id();
                return Ok(());
            }
            Err(err) => {
                return Err(err.context(format!(
                    "Error reading API Management service {:?} (resource group {:?})",
                    name, group
                )))
            }
        };

        state.set("name", name);
        state.set("resource_group_name", group);
        flatten_service(state, &service);

        Ok(())
    }

    async fn delete(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("API Management service has no ID to delete"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let name = id.require("service")?;

        tracing::debug!(%name, %group, "deleting API Management service");

        let client = ApiManagementServiceClient::new(arm);
        let url = client.url(&group, &name);
        match arm.delete(&url).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// Data source
// =============================================================================

pub struct ApiManagementDataSource;

#[async_trait]
impl DataSourceHandler for ApiManagementDataSource {
    fn type_name(&self) -> &'static str {
        "azurerm_api_management_service"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field("name", FieldSchema::required(FieldKind::String))
            .field(
                "resource_group_name",
                FieldSchema::required(FieldKind::String),
            )
            .field("location", FieldSchema::computed(FieldKind::String))
            .field("tags", FieldSchema::computed(FieldKind::Map))
    }

    async fn read(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let name = state.require_string("name")?;
        let group = state.require_string("resource_group_name")?;

        let client = ApiManagementServiceClient::new(arm);
        let service = match client.fetch(&group, &name).await {
            Err(err) if is_not_found(&err) => {
                return Err(anyhow::anyhow!(
                    "API Management service {:?} (resource group {:?}) was not found",
                    name,
                    group
                ))
            }
            other => other.context(format!(
                "Error reading API Management service {:?} (resource group {:?})",
                name, group
            ))?,
        };

        let id = service
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("cannot read ID of {:?} (resource group {:?})", name, group)
            })?;
        state.set_id(id);

        flatten_location(state, Some(&service.location));
        flatten_tags(state, &service.tags);

        Ok(())
    }
}

// =============================================================================
// Expand / flatten
// =============================================================================

fn expand_service(state: &ResourceState) -> Result<ServiceResource> {
    let location = expand_location(state)
        .ok_or_else(|| anyhow::anyhow!("missing required field `location`"))?;
    let sku = expand_sku(state)?;

    let additional_locations = expand_additional_locations(state, &sku)?;
    let certificates = expand_certificates(state)?;
    let hostname_configurations = expand_hostname_configurations(state)?;

    let notification_sender_email = state
        .get_string("notification_sender_email")
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    let custom_properties = match state.get("custom_properties") {
        Some(Value::Object(map)) => {
            let mut out = BTreeMap::new();
            for (key, value) in map {
                let value = value
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("custom property `{}` must be a string", key))?;
                out.insert(key.clone(), value.to_string());
            }
            Some(out)
        }
        _ => None,
    };

    Ok(ServiceResource {
        id: None,
        location,
        tags: expand_tags(state),
        sku: sku.clone(),
        properties: ServiceProperties {
            publisher_name: state.require_string("publisher_name")?,
            publisher_email: state.require_string("publisher_email")?,
            notification_sender_email,
            custom_properties,
            hostname_configurations,
            certificates,
            additional_locations,
            ..ServiceProperties::default()
        },
    })
}

fn expand_sku(state: &ResourceState) -> Result<SkuProperties> {
    let Some(block) = single_block(state, "sku") else {
        return Err(anyhow::anyhow!("missing required field `sku`"));
    };

    let name = block_string(block, "name").unwrap_or(DEFAULT_SKU_NAME);
    if !SKU_NAMES.iter().any(|s| s.eq_ignore_ascii_case(name)) {
        return Err(anyhow::anyhow!(
            "sku name {:?} is not one of {:?}",
            name,
            SKU_NAMES
        ));
    }

    let capacity = block
        .get("capacity")
        .and_then(|v| v.as_i64())
        .unwrap_or(DEFAULT_SKU_CAPACITY);

    Ok(SkuProperties {
        name: name.to_string(),
        capacity,
    })
}

fn expand_hostname_configurations(
    state: &ResourceState,
) -> Result<Option<Vec<HostnameConfiguration>>> {
    let configs = blocks(state, "hostname_configuration");
    if configs.is_empty() {
        return Ok(None);
    }

    let mut hostnames = Vec::with_capacity(configs.len());
    for config in configs {
        let host_type = block_string(config, "type").unwrap_or_default();
        if !HOSTNAME_TYPES.iter().any(|t| t.eq_ignore_ascii_case(host_type)) {
            return Err(anyhow::anyhow!(
                "hostname configuration type {:?} is not one of {:?}",
                host_type,
                HOSTNAME_TYPES
            ));
        }

        hostnames.push(HostnameConfiguration {
            host_type: host_type.to_string(),
            host_name: block_string(config, "host_name").unwrap_or_default().to_string(),
            encoded_certificate: block_string(config, "certificate").map(str::to_string),
            certificate_password: block_string(config, "certificate_password").map(str::to_string),
            default_ssl_binding: block_bool(config, "default_ssl_binding"),
            negotiate_client_certificate: block_bool(config, "negotiate_client_certificate"),
        });
    }

    Ok(Some(hostnames))
}

fn expand_certificates(state: &ResourceState) -> Result<Option<Vec<CertificateConfiguration>>> {
    let configs = blocks(state, "certificate");
    if configs.is_empty() {
        return Ok(None);
    }

    let mut certificates = Vec::with_capacity(configs.len());
    for config in configs {
        let store_name = block_string(config, "store_name").unwrap_or_default();
        if !STORE_NAMES.iter().any(|s| s.eq_ignore_ascii_case(store_name)) {
            return Err(anyhow::anyhow!(
                "certificate store name {:?} is not one of {:?}",
                store_name,
                STORE_NAMES
            ));
        }

        certificates.push(CertificateConfiguration {
            encoded_certificate: block_string(config, "encoded_certificate").map(str::to_string),
            certificate_password: block_string(config, "certificate_password").map(str::to_string),
            store_name: store_name.to_string(),
        });
    }

    Ok(Some(certificates))
}

fn expand_additional_locations(
    state: &ResourceState,
    sku: &SkuProperties,
) -> Result<Option<Vec<AdditionalLocation>>> {
    let configs = blocks(state, "additional_location");
    if configs.is_empty() {
        return Ok(None);
    }

    let locations = configs
        .into_iter()
        .map(|config| AdditionalLocation {
            location: crate::resource::fields::normalize_location(
                block_string(config, "location").unwrap_or_default(),
            ),
            sku: Some(sku.clone()),
            static_ips: None,
            gateway_regional_url: None,
        })
        .collect();

    Ok(Some(locations))
}

fn flatten_service(state: &mut ResourceState, service: &ServiceResource) {
    flatten_location(state, Some(&service.location));

    let props = &service.properties;
    state.set("publisher_name", props.publisher_name.clone());
    state.set("publisher_email", props.publisher_email.clone());
    state.set_optional(
        "notification_sender_email",
        props.notification_sender_email.clone(),
    );

    if let Some(created) = props.created_at_utc.as_deref() {
        // Normalize whatever timestamp shape the service returned to RFC3339.
        let created = DateTime::parse_from_rfc3339(created)
            .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
            .unwrap_or_else(|_| created.to_string());
        state.set("created", created);
    }

    state.set_optional("gateway_url", props.gateway_url.clone());
    state.set_optional("gateway_regional_url", props.gateway_regional_url.clone());
    state.set_optional("portal_url", props.portal_url.clone());
    state.set_optional("management_api_url", props.management_api_url.clone());
    state.set_optional("scm_url", props.scm_url.clone());

    if let Some(ips) = &props.static_ips {
        state.set("static_ips", json!(ips));
    }

    if let Some(custom) = &props.custom_properties {
        state.set("custom_properties", json!(custom));
    }

    let hostname_configs = flatten_hostname_configurations(state, props.hostname_configurations.as_deref());
    state.set("hostname_configuration", Value::Array(hostname_configs));

    let certificates = flatten_certificates(state, props.certificates.as_deref());
    state.set("certificate", Value::Array(certificates));

    let additional = flatten_additional_locations(props.additional_locations.as_deref());
    state.set("additional_location", Value::Array(additional));

    state.set(
        "sku",
        json!([{ "name": service.sku.name, "capacity": service.sku.capacity }]),
    );

    flatten_tags(state, &service.tags);
}

fn flatten_hostname_configurations(
    state: &ResourceState,
    configs: Option<&[HostnameConfiguration]>,
) -> Vec<Value> {
    // Certificate material is never echoed back, so carry it over from the
    // configured blocks by position.
    let prior = state.get_list("hostname_configuration");

    configs
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, config)| {
            let mut block = Map::new();
            block.insert("type".to_string(), json!(config.host_type));
            block.insert("host_name".to_string(), json!(config.host_name));
            block.insert(
                "default_ssl_binding".to_string(),
                json!(config.default_ssl_binding),
            );
            block.insert(
                "negotiate_client_certificate".to_string(),
                json!(config.negotiate_client_certificate),
            );

            if let Some(prior_block) = prior.get(i).and_then(|v| v.as_object()) {
                for sensitive in ["certificate", "certificate_password"] {
                    if let Some(value) = prior_block.get(sensitive) {
                        block.insert(sensitive.to_string(), value.clone());
                    }
                }
            }

            Value::Object(block)
        })
        .collect()
}

fn flatten_certificates(
    state: &ResourceState,
    configs: Option<&[CertificateConfiguration]>,
) -> Vec<Value> {
    let prior = state.get_list("certificate");

    configs
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, config)| {
            let mut block = Map::new();
            block.insert("store_name".to_string(), json!(config.store_name));

            if let Some(prior_block) = prior.get(i).and_then(|v| v.as_object()) {
                for sensitive in ["encoded_certificate", "certificate_password"] {
                    if let Some(value) = prior_block.get(sensitive) {
                        block.insert(sensitive.to_string(), value.clone());
                    }
                }
            }

            Value::Object(block)
        })
        .collect()
}

fn flatten_additional_locations(configs: Option<&[AdditionalLocation]>) -> Vec<Value> {
    configs
        .unwrap_or_default()
        .iter()
        .map(|config| {
            let mut block = Map::new();
            block.insert("location".to_string(), json!(config.location));
            if let Some(ips) = &config.static_ips {
                block.insert("static_ips".to_string(), json!(ips));
            }
            if let Some(url) = &config.gateway_regional_url {
                block.insert("gateway_regional_url".to_string(), json!(url));
            }
            Value::Object(block)
        })
        .collect()
}

// =============================================================================
// Validators
// =============================================================================

fn validate_service_name(field: &str, value: &Value) -> Result<(), String> {
    let name = value.as_str().unwrap_or_default();
    let valid = !name.is_empty()
        && name.len() <= 50
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(format!(
            "`{}` may only contain alphanumeric characters and dashes up to 50 characters in length",
            field
        ))
    }
}

fn validate_publisher_field(field: &str, value: &Value) -> Result<(), String> {
    let text = value.as_str().unwrap_or_default();
    if text.is_empty() || text.len() > 100 {
        Err(format!("`{}` may only be up to 100 characters in length", field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> ResourceState {
        ResourceState::from_fields([
            ("name", json!("svc1")),
            ("resource_group_name", json!("rg1")),
            ("location", json!("West Europe")),
            ("publisher_name", json!("Example Corp")),
            ("publisher_email", json!("ops@example.com")),
            ("sku", json!([{ "name": "Developer", "capacity": 1 }])),
        ])
    }

    #[test]
    fn test_expand_minimal_service() {
        let service = expand_service(&base_state()).unwrap();
        assert_eq!(service.location, "westeurope");
        assert_eq!(service.sku.name, "Developer");
        assert_eq!(service.sku.capacity, 1);
        assert_eq!(service.properties.publisher_name, "Example Corp");
        assert!(service.properties.hostname_configurations.is_none());
        assert!(service.properties.certificates.is_none());
    }

    #[test]
    fn test_expand_rejects_unknown_sku() {
        let mut state = base_state();
        state.set("sku", json!([{ "name": "Galactic" }]));
        let err = expand_service(&state).unwrap_err();
        assert!(err.to_string().contains("Galactic"));
    }

    #[test]
    fn test_expand_additional_locations_share_the_sku() {
        let mut state = base_state();
        state.set("additional_location", json!([{ "location": "North Europe" }]));

        let service = expand_service(&state).unwrap();
        let locations = service.properties.additional_locations.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].location, "northeurope");
        assert_eq!(locations[0].sku.as_ref().unwrap().name, "Developer");
    }

    #[test]
    fn test_serialized_body_omits_computed_fields() {
        let service = expand_service(&base_state()).unwrap();
        let body = serde_json::to_value(&service).unwrap();

        assert!(body.get("id").is_none());
        assert!(body["properties"].get("gatewayUrl").is_none());
        assert!(body["properties"].get("createdAtUtc").is_none());
        assert_eq!(body["properties"]["publisherName"], "Example Corp");
    }

    #[test]
    fn test_flatten_preserves_sensitive_certificate_fields() {
        let mut state = base_state();
        state.set(
            "certificate",
            json!([{
                "encoded_certificate": "AAAA",
                "certificate_password": "secret",
                "store_name": "Root"
            }]),
        );

        let service = ServiceResource {
            id: Some("/id".to_string()),
            location: "westeurope".to_string(),
            tags: BTreeMap::new(),
            sku: SkuProperties {
                name: "Developer".to_string(),
                capacity: 1,
            },
            properties: ServiceProperties {
                publisher_name: "Example Corp".to_string(),
                publisher_email: "ops@example.com".to_string(),
                certificates: Some(vec![CertificateConfiguration {
                    encoded_certificate: None,
                    certificate_password: None,
                    store_name: "Root".to_string(),
                }]),
                ..ServiceProperties::default()
            },
        };

        flatten_service(&mut state, &service);

        let cert = &state.get_list("certificate")[0];
        assert_eq!(cert["store_name"], "Root");
        assert_eq!(cert["encoded_certificate"], "AAAA");
        assert_eq!(cert["certificate_password"], "secret");
    }

    #[test]
    fn test_flatten_normalizes_created_timestamp() {
        let mut state = base_state();
        let service = ServiceResource {
            id: Some("/id".to_string()),
            location: "westeurope".to_string(),
            tags: BTreeMap::new(),
            sku: SkuProperties {
                name: "Developer".to_string(),
                capacity: 1,
            },
            properties: ServiceProperties {
                publisher_name: "p".to_string(),
                publisher_email: "e".to_string(),
                created_at_utc: Some("2023-01-15T10:30:00+00:00".to_string()),
                ..ServiceProperties::default()
            },
        };

        flatten_service(&mut state, &service);
        assert_eq!(state.get_string("created"), Some("2023-01-15T10:30:00+00:00"));
    }

    #[test]
    fn test_service_name_validator() {
        assert!(validate_service_name("name", &json!("svc-1")).is_ok());
        assert!(validate_service_name("name", &json!("has spaces")).is_err());
        assert!(validate_service_name("name", &json!("")).is_err());
        assert!(validate_service_name("name", &json!("x".repeat(51))).is_err());
    }

    #[test]
    fn test_publisher_validator_caps_length() {
        assert!(validate_publisher_field("publisher_name", &json!("ok")).is_ok());
        assert!(validate_publisher_field("publisher_name", &json!("x".repeat(101))).is_err());
    }
}
