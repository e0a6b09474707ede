//! Engine API access for ART - REST client, low-level entity wrappers and
//! high-level scenario helpers

pub mod client;
pub mod entity;
pub mod high_level;
pub mod low_level;
pub mod parallel;
pub mod version;

pub use client::RestClient;
pub use entity::{Entity, ResultExt};
pub use version::VersionManager;

use art_shared::{ArtConfig, ArtError, EngineConnection, Result, TimeoutConfig, TimeoutingSampler};
use std::sync::Arc;
use std::time::Duration;

/// Handle every helper receives: REST client plus wait and fan-out settings
#[derive(Clone)]
pub struct Engine {
    client: RestClient,
    timeouts: TimeoutConfig,
    sampling_interval: Duration,
    max_workers: usize,
    version_manager: Arc<VersionManager>,
}

impl Engine {
    pub fn new(client: RestClient, timeouts: TimeoutConfig, max_workers: usize) -> Self {
        let sampling_interval = timeouts.sampling_interval();
        Self {
            version_manager: Arc::new(VersionManager::new(client.clone())),
            client,
            timeouts,
            sampling_interval,
            max_workers,
        }
    }

    /// Connect to the default connection of a configuration
    pub fn connect(config: &ArtConfig) -> Result<Self> {
        let connection = config.get_default_connection().ok_or_else(|| {
            ArtError::Config("No default connection configured".to_string())
        })?;
        Self::connect_to(connection, config)
    }

    pub fn connect_to(connection: &EngineConnection, config: &ArtConfig) -> Result<Self> {
        tracing::info!("Connecting to engine {} at {}", connection.name, connection.url);
        let client = RestClient::new(connection)?;
        Ok(Self::new(
            client,
            config.timeouts.clone(),
            config.execution.max_workers,
        ))
    }

    /// Override the configured sampling interval
    pub fn with_sampling_interval(mut self, interval: Duration) -> Self {
        self.sampling_interval = interval;
        self
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn versions(&self) -> &VersionManager {
        &self.version_manager
    }

    /// Sampler with the configured interval that rides out transient engine errors
    pub fn sampler(&self, timeout: Duration, what: impl Into<String>) -> TimeoutingSampler {
        TimeoutingSampler::new(timeout, self.sampling_interval, what).tolerate_transient()
    }
}
