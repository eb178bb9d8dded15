//! Resource registry
//!
//! The table wiring configuration type names to their handlers. Built
//! explicitly (no global state) so tests can register stand-ins.

use super::api_management::{ApiManagementDataSource, ApiManagementService};
use super::api_management_api::ApiManagementApi;
use super::api_management_operation::ApiManagementOperation;
use super::logic_app::LogicApp;
use super::{DataSourceHandler, ResourceHandler};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Handler lookup by configuration type name.
pub struct Registry {
    resources: BTreeMap<&'static str, Arc<dyn ResourceHandler>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSourceHandler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    /// The registry with every built-in resource type registered.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ApiManagementService));
        registry.register(Arc::new(ApiManagementApi));
        registry.register(Arc::new(ApiManagementOperation));
        registry.register(Arc::new(LogicApp));
        registry.register_data_source(Arc::new(ApiManagementDataSource));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) {
        self.resources.insert(handler.type_name(), handler);
    }

    pub fn register_data_source(&mut self, handler: Arc<dyn DataSourceHandler>) {
        self.data_sources.insert(handler.type_name(), handler);
    }

    pub fn resource(&self, type_name: &str) -> Option<&Arc<dyn ResourceHandler>> {
        self.resources.get(type_name)
    }

    pub fn data_source(&self, type_name: &str) -> Option<&Arc<dyn DataSourceHandler>> {
        self.data_sources.get(type_name)
    }

    /// All registered resource type names, sorted.
    pub fn resource_names(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    /// All registered data source type names, sorted.
    pub fn data_source_names(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
