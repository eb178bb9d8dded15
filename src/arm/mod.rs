//! Azure Resource Manager API layer
//!
//! Authentication, HTTP plumbing, and resource-identifier handling shared by
//! every resource handler. Handlers never talk to `reqwest` directly; they go
//! through [`client::ArmClient`] so auth, request ids, and error typing stay
//! uniform.

pub mod auth;
pub mod client;
pub mod http;
pub mod resource_id;

pub use client::ArmClient;
pub use http::{format_arm_error, is_not_found};
pub use resource_id::ResourceId;
