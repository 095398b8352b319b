//! Configuration module
//!
//! Registered GitLab instances (`ConfigState`, `ConfigService`) and the HTTP
//! client settings shared by all of them (`ClientSettings` and its builder).

// Sub-modules
pub mod builder;
pub mod errors;
pub mod getters;
pub mod service;
pub mod types;

// Re-exports for public API
pub use builder::ClientSettingsBuilder;
pub use errors::ConfigError;
pub use service::ConfigService;
pub use types::{
    ClientSettings, ConfigState, InstanceConfig, InstanceConfigPatch, NewInstanceConfig,
    StoredFilter,
};
