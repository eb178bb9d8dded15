//! Resource abstraction layer
//!
//! One handler per resource type, all speaking the same lifecycle contract.
//! Handlers own the mechanical expand/flatten mapping between the flat
//! configuration schema and the nested ARM wire shapes; the write-then-confirm
//! sequencing itself lives in [`crate::dispatch`] and is shared.
//!
//! # Layout
//!
//! - [`schema`] - flat field schemas and validation
//! - [`fields`] - shared expand/flatten vocabulary (location, tags, blocks)
//! - [`registry`] - the table wiring type names to handlers
//! - one module per resource type (`api_management`, `logic_app`, ...)

use crate::arm::ArmClient;
use crate::state::ResourceState;
use async_trait::async_trait;

pub mod api_management;
pub mod api_management_api;
pub mod api_management_operation;
pub mod fields;
pub mod logic_app;
pub mod registry;
pub mod schema;

pub use registry::Registry;
pub use schema::{FieldKind, FieldSchema, Schema};

/// Lifecycle operations for one managed resource type. Update is the same
/// call as create: the management API's PUT is an upsert.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The configuration type name, e.g. `azurerm_logic_app_workflow`.
    fn type_name(&self) -> &'static str;

    /// The flat field schema configurations are validated against.
    fn schema(&self) -> Schema;

    /// Create or update the remote object and record its identifier plus any
    /// computed fields into the state.
    async fn create_or_update(&self, arm: &ArmClient, state: &mut ResourceState)
        -> anyhow::Result<()>;

    /// Refresh the state from the remote object. A remote 404 clears the
    /// identifier instead of failing, so the next run re-creates the object.
    async fn read(&self, arm: &ArmClient, state: &mut ResourceState) -> anyhow::Result<()>;

    /// Delete the remote object. Deleting an already-gone object succeeds.
    async fn delete(&self, arm: &ArmClient, state: &mut ResourceState) -> anyhow::Result<()>;
}

/// A read-only lookup of an existing remote object by its identity fields.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Resolve the object named by the state's identity fields. Unlike
    /// [`ResourceHandler::read`], a missing object is an error here.
    async fn read(&self, arm: &ArmClient, state: &mut ResourceState) -> anyhow::Result<()>;
}
