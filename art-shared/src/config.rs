//! Configuration management for ART runs

use crate::types::{AuthMode, EngineConnection, StorageType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for an ART run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtConfig {
    /// Engine connections
    pub connections: HashMap<String, EngineConnection>,

    /// Default connection name
    pub default_connection: Option<String>,

    /// Wait timeouts for asynchronous engine operations
    pub timeouts: TimeoutConfig,

    /// Execution settings
    pub execution: ExecutionConfig,

    /// Environment the suites build and tear down
    pub topology: TopologyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Timeouts in seconds, per kind of operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Interval between samples while waiting
    pub sampling_interval: u64,

    /// VM reaching up / down
    pub vm_state: u64,

    /// Host install and activation
    pub host_state: u64,

    /// Storage domain attach, activate and deactivate
    pub storage_domain: u64,

    /// Disk and template creation
    pub disk: u64,

    /// Snapshot creation, preview and restore
    pub snapshot: u64,

    /// Live migration
    pub migration: u64,

    /// VM pool creation and removal
    pub vm_pool: u64,

    /// Network reconfiguration on hosts
    pub network: u64,
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Upper bound of concurrent REST calls when fanning out
    pub max_workers: usize,

    /// Directory for JSON result reports
    pub results_dir: Option<String>,

    /// Keep the environment after the run
    pub skip_teardown: bool,
}

/// Datacenter layout the suites run against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub datacenter: String,
    pub cluster: String,
    pub compatibility_version: String,
    pub cpu_type: String,
    pub hosts: Vec<HostConfig>,
    pub storage: Vec<StorageConfig>,
    /// Template new VMs are created from
    pub template: String,
    /// Management network every host is attached to
    pub management_network: String,
    /// Build the datacenter before the suites; when false it must already exist
    pub build_setup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub address: String,
    pub root_password: Option<String>,
    /// Host NIC used for network attachment tests
    pub test_nic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// NFS server or iSCSI portal
    pub address: String,
    /// NFS export path
    pub path: Option<String>,
    /// iSCSI target name
    pub target: Option<String>,
    /// iSCSI LUN id
    pub lun: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            connections: HashMap::new(),
            default_connection: None,
            timeouts: TimeoutConfig::default(),
            execution: ExecutionConfig::default(),
            topology: TopologyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            sampling_interval: 5,
            vm_state: 600,
            host_state: 1200,
            storage_domain: 300,
            disk: 600,
            snapshot: 600,
            migration: 300,
            vm_pool: 900,
            network: 120,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            results_dir: None,
            skip_teardown: false,
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            datacenter: "art_dc".to_string(),
            cluster: "art_cluster".to_string(),
            compatibility_version: "4.7".to_string(),
            cpu_type: "Intel Nehalem Family".to_string(),
            hosts: Vec::new(),
            storage: Vec::new(),
            template: "Blank".to_string(),
            management_network: "ovirtmgmt".to_string(),
            build_setup: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl TimeoutConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval)
    }

    pub fn vm_state(&self) -> Duration {
        Duration::from_secs(self.vm_state)
    }

    pub fn host_state(&self) -> Duration {
        Duration::from_secs(self.host_state)
    }

    pub fn storage_domain(&self) -> Duration {
        Duration::from_secs(self.storage_domain)
    }

    pub fn disk(&self) -> Duration {
        Duration::from_secs(self.disk)
    }

    pub fn snapshot(&self) -> Duration {
        Duration::from_secs(self.snapshot)
    }

    pub fn migration(&self) -> Duration {
        Duration::from_secs(self.migration)
    }

    pub fn vm_pool(&self) -> Duration {
        Duration::from_secs(self.vm_pool)
    }

    pub fn network(&self) -> Duration {
        Duration::from_secs(self.network)
    }
}

impl ArtConfig {
    /// Load configuration from file or create default
    pub fn load_or_default(config_path: Option<&str>) -> crate::Result<Self> {
        match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                let config: ArtConfig = serde_json::from_str(&content)?;
                config.validate()?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to file
    pub fn save(&self, config_path: &str) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Reject values that would make every wait fail immediately
    pub fn validate(&self) -> crate::Result<()> {
        if self.execution.max_workers == 0 {
            return Err(crate::ArtError::Config(
                "execution.max_workers must be at least 1".to_string(),
            ));
        }
        if self.timeouts.sampling_interval == 0 {
            return Err(crate::ArtError::Config(
                "timeouts.sampling_interval must be at least 1 second".to_string(),
            ));
        }
        if let Some(name) = &self.default_connection {
            if !self.connections.contains_key(name) {
                return Err(crate::ArtError::Config(format!(
                    "default connection '{name}' is not configured"
                )));
            }
        }
        Ok(())
    }

    /// Get the default connection
    pub fn get_default_connection(&self) -> Option<&EngineConnection> {
        self.default_connection
            .as_ref()
            .and_then(|name| self.connections.get(name))
    }

    /// Add or update a connection
    pub fn add_connection(&mut self, name: String, connection: EngineConnection) {
        self.connections.insert(name.clone(), connection);

        // Set as default if it's the first connection
        if self.default_connection.is_none() {
            self.default_connection = Some(name);
        }
    }

    /// Configuration written by `art --init`
    pub fn sample() -> Self {
        let mut config = Self::default();
        config.add_connection(
            "local_engine".to_string(),
            EngineConnection {
                name: "Local engine".to_string(),
                url: "https://engine.example.com/ovirt-engine/api".to_string(),
                username: "admin@internal".to_string(),
                password: None,
                auth: AuthMode::Basic,
                verify_tls: true,
            },
        );
        config.topology.hosts = vec![
            HostConfig {
                name: "host_0".to_string(),
                address: "host0.example.com".to_string(),
                root_password: None,
                test_nic: Some("eth1".to_string()),
            },
            HostConfig {
                name: "host_1".to_string(),
                address: "host1.example.com".to_string(),
                root_password: None,
                test_nic: Some("eth1".to_string()),
            },
        ];
        config.topology.storage = vec![StorageConfig {
            name: "nfs_0".to_string(),
            storage_type: StorageType::Nfs,
            address: "nfs.example.com".to_string(),
            path: Some("/exports/art/nfs_0".to_string()),
            target: None,
            lun: None,
        }];
        config
    }

    pub fn results_dir(&self) -> Option<PathBuf> {
        self.execution.results_dir.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sample_config_roundtrips_through_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let config = ArtConfig::sample();
        config.save(path).unwrap();

        let loaded = ArtConfig::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.default_connection.as_deref(), Some("local_engine"));
        assert_eq!(loaded.topology.hosts.len(), 2);
        assert_eq!(loaded.topology.storage[0].storage_type, StorageType::Nfs);
        assert_eq!(
            loaded.get_default_connection().unwrap().username,
            "admin@internal"
        );
    }

    #[test]
    fn test_first_connection_becomes_default() {
        let mut config = ArtConfig::default();
        let connection = EngineConnection {
            name: "a".to_string(),
            url: "https://a/ovirt-engine/api".to_string(),
            username: "admin@internal".to_string(),
            password: None,
            auth: AuthMode::Sso,
            verify_tls: false,
        };
        config.add_connection("a".to_string(), connection.clone());
        config.add_connection("b".to_string(), connection);
        assert_eq!(config.default_connection.as_deref(), Some("a"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = ArtConfig::sample();
        config.execution.max_workers = 0;
        assert!(matches!(
            config.validate(),
            Err(crate::ArtError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_default_connection() {
        let mut config = ArtConfig::sample();
        config.default_connection = Some("missing".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ArtConfig::load_or_default(Some("/nonexistent/art.json"));
        assert!(matches!(result, Err(crate::ArtError::Io(_))));
    }

    #[test]
    fn test_timeouts_as_durations() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.sampling_interval(), Duration::from_secs(5));
        assert!(timeouts.vm_state() < timeouts.host_state());
    }
}
