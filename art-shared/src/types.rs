//! Wire types mirroring the engine's REST entities
//!
//! These structs hold no state of their own: they are the JSON shapes the
//! engine returns, plus the subset of fields ART sends when creating or
//! updating entities. Every field is optional because the engine omits
//! whatever is unset, and ART only sends what a call needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The engine renders numbers as JSON strings; accept both forms
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number<T> {
        Plain(T),
        Text(String),
    }

    impl<T: FromStr> Number<T>
    where
        T::Err: Display,
    {
        fn value<E: Error>(self) -> Result<T, E> {
            match self {
                Number::Plain(value) => Ok(value),
                Number::Text(text) => text.trim().parse().map_err(E::custom),
            }
        }
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        Number::deserialize(deserializer)?.value()
    }

    pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        Option::<Number<T>>::deserialize(deserializer)?
            .map(Number::value)
            .transpose()
    }
}

/// Engine connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConnection {
    pub name: String,
    /// API root, e.g. `https://engine.example.com/ovirt-engine/api`
    pub url: String,
    pub username: String,
    /// Plain password; when absent it is resolved from the environment or keyring
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub auth: AuthMode,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

fn default_true() -> bool {
    true
}

/// How requests are authenticated against the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Basic,
    Sso,
}

/// Reference to another entity, by id or by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Ref {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// True when this reference points at the given id or name
    pub fn matches(&self, id_or_name: &str) -> bool {
        self.id.as_deref() == Some(id_or_name) || self.name.as_deref() == Some(id_or_name)
    }
}

/// Engine or cluster compatibility version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub major: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub minor: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub build: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
}

impl Version {
    /// Parse a dotted `major.minor` string as used in configuration files
    pub fn parse(value: &str) -> crate::Result<Self> {
        let mut parts = value.trim().split('.').map(|p| p.parse::<u32>());
        let mut next = || -> crate::Result<Option<u32>> {
            parts
                .next()
                .transpose()
                .map_err(|e| crate::ArtError::Config(format!("Invalid version '{value}': {e}")))
        };

        let major = next()?
            .ok_or_else(|| crate::ArtError::Config(format!("Invalid version '{value}'")))?;
        Ok(Self {
            major: Some(major),
            minor: next()?,
            build: next()?,
            revision: next()?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [self.major, self.minor, self.build, self.revision]
            .iter()
            .map_while(|p| p.map(|v| v.to_string()))
            .collect();
        f.write_str(&parts.join("."))
    }
}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant,)+
            #[serde(other)]
            Unknown,
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
                f.write_str(value.as_str().unwrap_or("unknown"))
            }
        }
    };
}

status_enum!(
    /// VM run state
    VmStatus {
        Up,
        Down,
        PoweringUp,
        PoweringDown,
        WaitForLaunch,
        RebootInProgress,
        Migrating,
        Paused,
        Suspended,
        SavingState,
        RestoringState,
        ImageLocked,
        NotResponding,
    }
);

status_enum!(HostStatus {
    Up,
    Maintenance,
    PreparingForMaintenance,
    Installing,
    InstallFailed,
    NonOperational,
    NonResponsive,
    Connecting,
    Initializing,
    Reboot,
    Down,
});

status_enum!(StorageDomainStatus {
    Active,
    Inactive,
    Maintenance,
    Unattached,
    Locked,
    Activating,
    PreparingForMaintenance,
    Detaching,
});

status_enum!(DataCenterStatus {
    Up,
    Uninitialized,
    Maintenance,
    NotOperational,
    Problematic,
    Contend,
});

status_enum!(DiskStatus { Ok, Locked, Illegal });

status_enum!(TemplateStatus { Ok, Locked, Illegal });

status_enum!(SnapshotStatus { Ok, Locked, InPreview });

status_enum!(SnapshotType {
    Regular,
    Active,
    Stateless,
    Preview,
});

status_enum!(ActionStatus {
    Complete,
    Pending,
    InProgress,
    Failed,
});

status_enum!(NicStatus { Up, Down });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Nfs,
    Iscsi,
    Fcp,
    Glusterfs,
    Localfs,
    Posixfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDomainType {
    Data,
    Iso,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskFormat {
    Cow,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskInterface {
    Virtio,
    VirtioScsi,
    Ide,
    Sata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NicInterface {
    Virtio,
    E1000,
    Rtl8139,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmPoolType {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkUsage {
    Vm,
    Display,
    Migration,
    Management,
    DefaultRoute,
    Gluster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpmStatus {
    Spm,
    Contending,
    #[serde(rename = "none")]
    Idle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCenter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DataCenterStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterCpu {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub cpu_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_center: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<ClusterCpu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpmStatus>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Host {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<HostStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spm: Option<Spm>,
}

impl Host {
    pub fn is_spm(&self) -> bool {
        matches!(
            self.spm.as_ref().and_then(|s| s.status),
            Some(SpmStatus::Spm)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    #[serde(deserialize_with = "lenient::number")]
    pub id: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostNic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NicStatus>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<Vlan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_nic: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkAttachments {
    #[serde(default)]
    pub network_attachment: Vec<NetworkAttachment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicalUnit {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicalUnits {
    #[serde(default)]
    pub logical_unit: Vec<LogicalUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostStorage {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_units: Option<LogicalUnits>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<StorageDomainType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StorageDomainStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<HostStorage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Ref>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub available: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTopology {
    #[serde(deserialize_with = "lenient::number")]
    pub sockets: u32,
    #[serde(deserialize_with = "lenient::number")]
    pub cores: u32,
    #[serde(deserialize_with = "lenient::number")]
    pub threads: u32,
}

impl CpuTopology {
    pub fn vcpus(&self) -> u32 {
        self.sockets * self.cores * self.threads
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cpu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<CpuTopology>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryPolicy {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub guaranteed: Option<u64>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hosts {
    #[serde(default)]
    pub host: Vec<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Hosts>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VmStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Ref>,
    /// Bytes
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_policy: Option<MemoryPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Cpu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateless: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_pool: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_policy: Option<PlacementPolicy>,
}

impl Vm {
    pub fn cpu_topology(&self) -> Option<&CpuTopology> {
        self.cpu.as_ref().and_then(|c| c.topology.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageDomains {
    #[serde(default)]
    pub storage_domain: Vec<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Disk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bytes
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub provisioned_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DiskFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DiskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_domains: Option<StorageDomains>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<Disk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<DiskInterface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mac {
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Nic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<NicInterface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic_profile: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<Mac>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VnicProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_mirroring: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usages {
    #[serde(default)]
    pub usage: Vec<NetworkUsage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_center: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<Vlan>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usages: Option<Usages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl Network {
    pub fn is_vm_network(&self) -> bool {
        self.usages
            .as_ref()
            .map(|u| u.usage.contains(&NetworkUsage::Vm))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TemplateStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Ref>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_status: Option<SnapshotStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_type: Option<SnapshotType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_memorystate: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmPool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Ref>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub prestarted_vms: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub max_user_vms: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<VmPoolType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateful: Option<bool>,
}

/// Fault returned by the engine when an operation fails
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fault {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Body of an action request and of its response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "async", default, skip_serializing_if = "Option::is_none")]
    pub run_async: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ActionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_memory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_domain: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_network_attachments: Option<NetworkAttachments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_network_attachments: Option<NetworkAttachments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_connectivity: Option<bool>,
}

impl Action {
    /// Synchronous action with no parameters
    pub fn sync() -> Self {
        Self {
            run_async: Some(false),
            ..Default::default()
        }
    }

    pub fn on_host(mut self, host: Ref) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_snapshot(mut self, snapshot: Ref) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = Some(true);
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, Some(ActionStatus::Failed))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub version: Option<Version>,
}

/// Response of `GET` on the API root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiRoot {
    #[serde(default)]
    pub product_info: Option<ProductInfo>,
}
