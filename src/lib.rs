//! azrm - Azure Resource Manager provider plugin
//!
//! Manages a handful of Azure resource types (API Management and Logic App
//! workflows) through the ARM REST API. The lifecycle of every type runs
//! through the same write-then-confirm dispatch: mutate, read back, record
//! the remote identifier.

pub mod arm;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod provider;
pub mod resource;
pub mod state;

pub use arm::ArmClient;
pub use config::ProviderConfig;
pub use dispatch::{write_then_confirm, DispatchError, RemoteResource, ResourceClient};
pub use provider::Provider;
pub use resource::Registry;
pub use state::ResourceState;

/// Version injected at compile time via AZRM_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AZRM_VERSION") {
    Some(v) => v,
    None => "dev",
};
