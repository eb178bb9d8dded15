//! Logic App workflow resource
//!
//! The workflow definition is an open JSON document; only the `$schema` and
//! `contentVersion` keys are modelled as fields, the rest is sent as empty
//! objects so the service accepts a bare workflow shell.

use crate::arm::{is_not_found, ArmClient, ResourceId};
use crate::dispatch::{self, RemoteResource, ResourceClient};
use crate::resource::fields::{
    block_string, expand_location, expand_tags, flatten_location, flatten_tags, single_block,
    set_sub_field_optional,
};
use crate::resource::{FieldKind, FieldSchema, ResourceHandler, Schema};
use crate::state::ResourceState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const API_VERSION: &str = "2016-06-01";

const DEFAULT_DEFINITION_SCHEMA: &str =
    "https://schema.management.azure.com/providers/Microsoft.Logic/schemas/2016-06-01/workflowdefinition.json";
const DEFAULT_CONTENT_VERSION: &str = "1.0.0.0";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    pub properties: WorkflowProperties,
}

impl RemoteResource for Workflow {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkflowProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_endpoint: Option<String>,
}

// =============================================================================
// Client adapter
// =============================================================================

pub(crate) struct LogicAppClient<'a> {
    arm: &'a ArmClient,
}

impl<'a> LogicAppClient<'a> {
    pub(crate) fn new(arm: &'a ArmClient) -> Self {
        Self { arm }
    }

    fn url(&self, group: &str, workflow_name: &str) -> String {
        self.arm.provider_url(
            group,
            &format!(
                "Microsoft.Logic/workflows/{}",
                urlencoding::encode(workflow_name)
            ),
            API_VERSION,
        )
    }
}

#[async_trait]
impl ResourceClient for LogicAppClient<'_> {
    type Params = Workflow;
    type Resource = Workflow;

    async fn mutate(&self, group: &str, name: &str, params: &Self::Params) -> Result<()> {
        let body = serde_json::to_value(params)?;
        self.arm.put_and_wait(&self.url(group, name), &body).await
    }

    async fn fetch(&self, group: &str, name: &str) -> Result<Self::Resource> {
        let body = self.arm.get(&self.url(group, name)).await?;
        serde_json::from_value(body).context("Failed to decode the workflow")
    }
}

// =============================================================================
// Handler
// =============================================================================

pub struct LogicApp;

#[async_trait]
impl ResourceHandler for LogicApp {
    fn type_name(&self) -> &'static str {
        "azurerm_logic_app_workflow"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field("name", FieldSchema::required(FieldKind::String).force_new())
            .field(
                "resource_group_name",
                FieldSchema::required(FieldKind::String).force_new(),
            )
            .field("location", FieldSchema::required(FieldKind::String))
            .field("definition", FieldSchema::required(FieldKind::List))
            .field("tags", FieldSchema::optional(FieldKind::Map))
            .field("access_endpoint", FieldSchema::computed(FieldKind::String))
    }

    async fn create_or_update(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        tracing::info!("preparing arguments for Logic App workflow creation");

        let params = expand_workflow(state);
        let client = LogicAppClient::new(arm);
        dispatch::write_then_confirm(state, &client, &params).await?;

        self.read(arm, state).await
    }

    async fn read(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("Logic App workflow has no ID to read"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let workflow_name = id.require("workflows")?;

        let client = LogicAppClient::new(arm);
        let workflow = match client.fetch(&group, &workflow_name).await {
            Ok(workflow) => workflow,
            Err(err) if is_not_found(&err) => {
                tracing::warn!(%workflow_name, %group, "Logic App workflow no longer exists");
                state.clear_id();
                return Ok(());
            }
            Err(err) => {
                return Err(err.context(format!(
                    "Error reading Logic App workflow {:?} (resource group {:?})",
                    workflow_name, group
                )))
            }
        };

        state.set("name", workflow_name);
        state.set("resource_group_name", group);
        flatten_workflow(state, &workflow);

        Ok(())
    }

    async fn delete(&self, arm: &ArmClient, state: &mut ResourceState) -> Result<()> {
        let id = state
            .id()
            .ok_or_else(|| anyhow::anyhow!("Logic App workflow has no ID to delete"))?;
        let id = ResourceId::parse(id)?;
        let group = id.resource_group.clone();
        let workflow_name = id.require("workflows")?;

        tracing::debug!(%workflow_name, %group, "deleting Logic App workflow");

        let client = LogicAppClient::new(arm);
        match arm.delete(&client.url(&group, &workflow_name)).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// Expand / flatten
// =============================================================================

fn expand_workflow(state: &ResourceState) -> Workflow {
    let block = single_block(state, "definition");
    let schema = block
        .and_then(|b| block_string(b, "schema"))
        .unwrap_or(DEFAULT_DEFINITION_SCHEMA);
    let content_version = block
        .and_then(|b| block_string(b, "content_version"))
        .unwrap_or(DEFAULT_CONTENT_VERSION);

    Workflow {
        id: None,
        location: expand_location(state),
        tags: expand_tags(state),
        properties: WorkflowProperties {
            definition: Some(json!({
                "$schema": schema,
                "contentVersion": content_version,
                "parameters": {},
                "triggers": {},
                "actions": {},
                "outputs": {},
            })),
            access_endpoint: None,
        },
    }
}

fn flatten_workflow(state: &mut ResourceState, workflow: &Workflow) {
    flatten_location(state, workflow.location.as_deref());
    flatten_tags(state, &workflow.tags);

    if let Some(definition) = workflow.properties.definition.as_ref().and_then(|d| d.as_object()) {
        let mut block = Map::new();
        set_sub_field_optional(
            &mut block,
            "schema",
            definition.get("$schema").and_then(|v| v.as_str()),
        );
        set_sub_field_optional(
            &mut block,
            "content_version",
            definition.get("contentVersion").and_then(|v| v.as_str()),
        );
        state.set("definition", Value::Array(vec![Value::Object(block)]));
    }

    state.set_optional(
        "access_endpoint",
        workflow.properties.access_endpoint.clone(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> ResourceState {
        ResourceState::from_fields([
            ("name", json!("wf1")),
            ("resource_group_name", json!("rg1")),
            ("location", json!("West Europe")),
        ])
    }

    #[test]
    fn test_expand_defaults_the_definition() {
        let workflow = expand_workflow(&base_state());
        let definition = workflow.properties.definition.unwrap();

        assert_eq!(definition["$schema"], DEFAULT_DEFINITION_SCHEMA);
        assert_eq!(definition["contentVersion"], "1.0.0.0");
        assert_eq!(definition["triggers"], json!({}));
        assert_eq!(workflow.location.as_deref(), Some("westeurope"));
    }

    #[test]
    fn test_expand_honors_configured_definition_block() {
        let mut state = base_state();
        state.set(
            "definition",
            json!([{ "schema": "custom-schema", "content_version": "2.0.0.0" }]),
        );

        let definition = expand_workflow(&state).properties.definition.unwrap();
        assert_eq!(definition["$schema"], "custom-schema");
        assert_eq!(definition["contentVersion"], "2.0.0.0");
    }

    #[test]
    fn test_flatten_maps_definition_and_endpoint() {
        let workflow = Workflow {
            id: Some("/subscriptions/s/resourceGroups/rg1/providers/Microsoft.Logic/workflows/wf1".into()),
            location: Some("westeurope".into()),
            tags: BTreeMap::new(),
            properties: WorkflowProperties {
                definition: Some(json!({
                    "$schema": DEFAULT_DEFINITION_SCHEMA,
                    "contentVersion": "1.0.0.0",
                })),
                access_endpoint: Some("https://example.test/wf1".into()),
            },
        };

        let mut state = base_state();
        flatten_workflow(&mut state, &workflow);

        let block = &state.get_list("definition")[0];
        assert_eq!(block["schema"], DEFAULT_DEFINITION_SCHEMA);
        assert_eq!(block["content_version"], "1.0.0.0");
        assert_eq!(
            state.get_string("access_endpoint"),
            Some("https://example.test/wf1")
        );
    }
}
