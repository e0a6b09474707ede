//! Shared types and utilities for the ART acceptance test framework

pub mod auth;
pub mod config;
pub mod error;
pub mod redact;
pub mod sampler;
pub mod types;

pub use auth::AuthToken;
pub use config::{
    ArtConfig, ExecutionConfig, HostConfig, LoggingConfig, StorageConfig, TimeoutConfig,
    TopologyConfig,
};
pub use error::{ArtError, EntityKind, Result};
pub use redact::redact;
pub use sampler::TimeoutingSampler;
pub use types::*;
