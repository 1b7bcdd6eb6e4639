//! Service layer module
//!
//! Contains the region failover client and its outer retry policy

pub mod client;
pub mod retry;

pub use client::{
    permissive_safety_settings, resolve_project_id, ClientBuilder, RegionEndpoint,
    RegionFailoverClient, PROJECT_ENV_VAR,
};
pub use retry::RetryPolicy;
