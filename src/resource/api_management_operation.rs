//! API Management API operation resource
//!
//! An operation contract nested two levels deep (service, then API). The
//! adapter binds both parent names; the dispatcher still sees only the
//! resource group and the operation id. The parameter/representation blocks
//! are shared between the request and every response, so their mapping is
//! factored once.

use crate::arm::{is_not_found, ArmClient, ResourceId};
use crate::dispatch::{self, RemoteResource, ResourceClient};
use crate::resource::fields::{block_bool, block_string, blocks, single_block};
use crate::resource::{FieldKind, FieldSchema, ResourceHandler, Schema};
use crate::state::ResourceState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const API_VERSION: &str = "2017-03-01";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationContract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub properties: OperationProperties,
}

impl RemoteResource for OperationContract {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationProperties {
    pub display_name: String,
    pub method: String,
    pub url_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_parameters: Vec<ParameterContract>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestContract>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<ResponseContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParameterContract {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestContract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<ParameterContract>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ParameterContract>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub representations: Vec<RepresentationContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponseContract {
    pub status_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub representations: Vec<RepresentationContract>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ParameterContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepresentationContract {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form_parameters: Vec<ParameterContract>,
}

// =============================================================================
// Client adapter
// =============================================================================

pub(crate) struct ApiManagementOperationClient<'a> {
    arm: &'a ArmClient,
    service_name: String,
    api_id: String,
}

impl<'a> ApiManagementOperationClient<'a> {
    pub(crate) fn new(arm: &'a ArmClient, service_name: &str, api_id: &str) -> Self {
        Self {
            arm,
            service_name: service_name.to_string(),
            api_id: api_id.to_string(),
        }
    }

    fn url(&self, group: &str, operation_id: &str) -> String {
        self.arm.provider_url(
            group,
            &format!(
                "Microsoft.ApiManagement/service/{}/apis/{}/operations/{}",
                urlencoding::encode(&self.service_name),
                urlencoding::encode(&self.api_id),
                urlencoding::encode(operation_id)
            ),
            API_VERSION,
        )
    }
}

#[async_trait]
impl ResourceClient for ApiManagementOperationClient<'_> {
    type Params = OperationContract;
    type Resource = OperationContract;

    async fn mutate(&self, group: &str, name: &str, params: &Self::Params) -> Result<()> {
        let body = serde_json::to_value(params)?;
        self.arm.put_and_wait(&self.url(group, name), &body).await
    }

    async fn fetch(&self, group: &str, name: &str) -> Result<Self::Resource> {
        let body = self.arm.get(&self.url(group, name)).await?;
        serde_json::from_value(body).context("Failed to decode the operation contract")
    }
}

// =============================================================================
// Handler
// =============================================================================

pub struct ApiManagementOperation;

#[async_trait]
impl ResourceHandler for ApiManagementOperation {
    fn type_name(&self) -> &'static str {
        "azurerm_api_management_operation"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field("name", FieldSchema::required(FieldKind::String))
            .field(
                "service_name",
                FieldSchema::required(FieldKind::String).force_new(),
            )
            .field(
                "api_name",
                FieldSchema::required(FieldKind::String).force_new(),
            )
            .field(
                "resource_group_name",
                FieldSchema::required(FieldKind::String).force_new(),
            )
            .field("display_name", FieldSchema::required(FieldKind::String))
            .field("method", FieldSchema::required(FieldKind::String))
            .field("url_template", FieldSchema::required(FieldKind::String))
            .field("description", FieldSchema::optional(FieldKind::String))
            .field("template_params", FieldSchema::optional(FieldKind::List))
            .field("request", FieldSchema::optional(FieldKind::List))
            .field("responses", FieldSchema::optional(FieldKind::List))
    }

    async fn create_or_update(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        tracing::info!("preparing arguments for API Management operation creation");

        let service_name = state.require_string("service_name")?;
        let api_id = state.require_string("api_name")?;
        let params = expand_operation(state)?;

        let client = ApiManagementOperationClient::new(arm, &service_name, &api_id);
        dispatch::write_then_confirm(state, &client, &params).await?;

        self.read(arm, state).await
    }

    async fn read(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("API Management operation has no ID to read"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let service_name = id.require("service")?;
        let api_id = id.require("apis")?;
        let operation_id = id.require("operations")?;

        let client = ApiManagementOperationClient::new(arm, &service_name, &api_id);
        let operation = match client.fetch(&group, &operation_id).await {
            Ok(operation) => operation,
            Err(err) if is_not_found(&err) => {
                tracing::warn!(%operation_id, %group, "API Management operation no longer exists");
                state.clear_id();
                return Ok(());
            }
            Err(err) => {
                return Err(err.context(format!(
                    "Error reading API Management operation {:?} (API {:?}, resource group {:?})",
                    operation_id, api_id, group
                )))
            }
        };

        state.set("name", operation_id);
        state.set("service_name", service_name);
        state.set("api_name", api_id);
        state.set("resource_group_name", group);
        flatten_operation(state, &operation);

        Ok(())
    }

    async fn delete(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("API Management operation has no ID to delete"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let service_name = id.require("service")?;
        let api_id = id.require("apis")?;
        let operation_id = id.require("operations")?;

        tracing::debug!(%operation_id, %group, "deleting API Management operation");

        let client = ApiManagementOperationClient::new(arm, &service_name, &api_id);
        match arm
            .delete_if_match(&client.url(&group, &operation_id), "*")
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// Expand / flatten
// =============================================================================

fn expand_operation(state: &ResourceState) -> Result<OperationContract> {
    let request = match single_block(state, "request") {
        Some(block) => Some(RequestContract {
            description: block_string(block, "description").map(str::to_string),
            query_parameters: expand_parameters(block.get("query_params"))?,
            headers: expand_parameters(block.get("headers"))?,
            representations: expand_representations(block.get("representations"))?,
        }),
        None => None,
    };

    let mut responses = Vec::new();
    for block in blocks(state, "responses") {
        let status_code = block
            .get("status_code")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| anyhow::anyhow!("response `status_code` must be an integer"))?;

        responses.push(ResponseContract {
            status_code,
            description: block_string(block, "description").map(str::to_string),
            representations: expand_representations(block.get("representations"))?,
            headers: expand_parameters(block.get("headers"))?,
        });
    }

    Ok(OperationContract {
        id: None,
        properties: OperationProperties {
            display_name: state.require_string("display_name")?,
            method: state.require_string("method")?.to_uppercase(),
            url_template: state.require_string("url_template")?,
            description: state.get_string("description").map(str::to_string),
            template_parameters: expand_parameters(state.get("template_params"))?,
            request,
            responses,
        },
    })
}

fn expand_parameters(value: Option<&Value>) -> Result<Vec<ParameterContract>> {
    let Some(list) = value.and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let mut parameters = Vec::with_capacity(list.len());
    for entry in list {
        let block = entry
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("parameter entries must be blocks"))?;

        parameters.push(ParameterContract {
            name: block_string(block, "name")
                .ok_or_else(|| anyhow::anyhow!("parameter `name` is required"))?
                .to_string(),
            param_type: block_string(block, "type")
                .ok_or_else(|| anyhow::anyhow!("parameter `type` is required"))?
                .to_string(),
            description: block_string(block, "description").map(str::to_string),
            default_value: block_string(block, "default_value").map(str::to_string),
            required: block_bool(block, "required"),
            values: block
                .get("values")
                .and_then(|v| v.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|v| v.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        });
    }

    Ok(parameters)
}

fn expand_representations(value: Option<&Value>) -> Result<Vec<RepresentationContract>> {
    let Some(list) = value.and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let mut representations = Vec::with_capacity(list.len());
    for entry in list {
        let block = entry
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("representation entries must be blocks"))?;

        representations.push(RepresentationContract {
            content_type: block_string(block, "content_type")
                .ok_or_else(|| anyhow::anyhow!("representation `content_type` is required"))?
                .to_string(),
            sample: block_string(block, "sample").map(str::to_string),
            schema_id: block_string(block, "schema_id").map(str::to_string),
            type_name: block_string(block, "type_name").map(str::to_string),
            form_parameters: expand_parameters(block.get("form_params"))?,
        });
    }

    Ok(representations)
}

fn flatten_operation(state: &mut ResourceState, operation: &OperationContract) {
    let props = &operation.properties;

    state.set("display_name", props.display_name.clone());
    state.set("method", props.method.clone());
    state.set("url_template", props.url_template.clone());
    state.set_optional("description", props.description.clone());
    state.set(
        "template_params",
        Value::Array(props.template_parameters.iter().map(flatten_parameter).collect()),
    );

    if let Some(request) = &props.request {
        let mut block = Map::new();
        if let Some(description) = &request.description {
            block.insert("description".to_string(), json!(description));
        }
        block.insert(
            "query_params".to_string(),
            Value::Array(request.query_parameters.iter().map(flatten_parameter).collect()),
        );
        block.insert(
            "headers".to_string(),
            Value::Array(request.headers.iter().map(flatten_parameter).collect()),
        );
        block.insert(
            "representations".to_string(),
            Value::Array(request.representations.iter().map(flatten_representation).collect()),
        );
        state.set("request", Value::Array(vec![Value::Object(block)]));
    }

    let responses: Vec<Value> = props
        .responses
        .iter()
        .map(|response| {
            let mut block = Map::new();
            block.insert("status_code".to_string(), json!(response.status_code));
            if let Some(description) = &response.description {
                block.insert("description".to_string(), json!(description));
            }
            block.insert(
                "representations".to_string(),
                Value::Array(response.representations.iter().map(flatten_representation).collect()),
            );
            block.insert(
                "headers".to_string(),
                Value::Array(response.headers.iter().map(flatten_parameter).collect()),
            );
            Value::Object(block)
        })
        .collect();
    state.set("responses", Value::Array(responses));
}

fn flatten_parameter(parameter: &ParameterContract) -> Value {
    let mut block = Map::new();
    block.insert("name".to_string(), json!(parameter.name));
    block.insert("type".to_string(), json!(parameter.param_type));
    if let Some(description) = &parameter.description {
        block.insert("description".to_string(), json!(description));
    }
    if let Some(default_value) = &parameter.default_value {
        block.insert("default_value".to_string(), json!(default_value));
    }
    block.insert("required".to_string(), json!(parameter.required));
    if !parameter.values.is_empty() {
        block.insert("values".to_string(), json!(parameter.values));
    }
    Value::Object(block)
}

fn flatten_representation(representation: &RepresentationContract) -> Value {
    let mut block = Map::new();
    block.insert("content_type".to_string(), json!(representation.content_type));
    if let Some(sample) = &representation.sample {
        block.insert("sample".to_string(), json!(sample));
    }
    if let Some(schema_id) = &representation.schema_id {
        block.insert("schema_id".to_string(), json!(schema_id));
    }
    if let Some(type_name) = &representation.type_name {
        block.insert("type_name".to_string(), json!(type_name));
    }
    if !representation.form_parameters.is_empty() {
        block.insert(
            "form_params".to_string(),
            Value::Array(representation.form_parameters.iter().map(flatten_parameter).collect()),
        );
    }
    Value::Object(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> ResourceState {
        ResourceState::from_fields([
            ("name", json!("list-payments")),
            ("service_name", json!("svc1")),
            ("api_name", json!("api1")),
            ("resource_group_name", json!("rg1")),
            ("display_name", json!("List payments")),
            ("method", json!("get")),
            ("url_template", json!("/payments")),
        ])
    }

    #[test]
    fn test_expand_uppercases_the_method() {
        let operation = expand_operation(&base_state()).unwrap();
        assert_eq!(operation.properties.method, "GET");
        assert_eq!(operation.properties.url_template, "/payments");
        assert!(operation.properties.request.is_none());
    }

    #[test]
    fn test_expand_template_parameters() {
        let mut state = base_state();
        state.set(
            "template_params",
            json!([{ "name": "id", "type": "string", "required": true }]),
        );

        let operation = expand_operation(&state).unwrap();
        let params = &operation.properties.template_parameters;
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "id");
        assert!(params[0].required);
    }

    #[test]
    fn test_expand_rejects_parameter_without_type() {
        let mut state = base_state();
        state.set("template_params", json!([{ "name": "id" }]));
        let err = expand_operation(&state).unwrap_err();
        assert!(err.to_string().contains("`type` is required"));
    }

    #[test]
    fn test_expand_response_status_code_must_be_numeric() {
        let mut state = base_state();
        state.set("responses", json!([{ "status_code": "200" }]));
        let err = expand_operation(&state).unwrap_err();
        assert!(err.to_string().contains("status_code"));
    }

    #[test]
    fn test_roundtrip_request_block() {
        let mut state = base_state();
        state.set(
            "request",
            json!([{
                "description": "payment filter",
                "query_params": [{ "name": "status", "type": "string" }],
                "representations": [{ "content_type": "application/json", "sample": "{}" }]
            }]),
        );

        let operation = expand_operation(&state).unwrap();
        let mut read_back = base_state();
        flatten_operation(&mut read_back, &operation);

        let request = &read_back.get_list("request")[0];
        assert_eq!(request["description"], "payment filter");
        assert_eq!(request["query_params"][0]["name"], "status");
        assert_eq!(
            request["representations"][0]["content_type"],
            "application/json"
        );
    }
}
