//! Error types for the ART framework

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArtError>;

/// Kind of remote entity an operation was acting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    DataCenter,
    Cluster,
    Host,
    StorageDomain,
    Vm,
    Disk,
    Nic,
    Snapshot,
    Network,
    VnicProfile,
    Template,
    VmPool,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::DataCenter => "datacenter",
            EntityKind::Cluster => "cluster",
            EntityKind::Host => "host",
            EntityKind::StorageDomain => "storage domain",
            EntityKind::Vm => "VM",
            EntityKind::Disk => "disk",
            EntityKind::Nic => "NIC",
            EntityKind::Snapshot => "snapshot",
            EntityKind::Network => "network",
            EntityKind::VnicProfile => "vNIC profile",
            EntityKind::Template => "template",
            EntityKind::VmPool => "VM pool",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ArtError {
    #[error("VM error: {0}")]
    Vm(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage domain error: {0}")]
    StorageDomain(String),

    #[error("VM pool error: {0}")]
    VmPool(String),

    #[error("Datacenter error: {0}")]
    DataCenter(String),

    #[error("Cluster error: {0}")]
    Cluster(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Disk error: {0}")]
    Disk(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("API error {status}: {reason}{}", .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Api {
        status: u16,
        reason: String,
        detail: Option<String>,
    },

    #[error("{kind} not found: {name}")]
    EntityNotFound { kind: EntityKind, name: String },

    #[error("Timed out after {timeout:?} waiting for {what}{}", .last_sample.as_deref().map(|s| format!(", last sample: {s}")).unwrap_or_default())]
    Timeout {
        what: String,
        timeout: Duration,
        last_sample: Option<String>,
    },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ArtError {
    /// Build the error variant that belongs to `kind`
    pub fn entity(kind: EntityKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            EntityKind::DataCenter => ArtError::DataCenter(message),
            EntityKind::Cluster => ArtError::Cluster(message),
            EntityKind::Host => ArtError::Host(message),
            EntityKind::StorageDomain => ArtError::StorageDomain(message),
            EntityKind::Vm | EntityKind::Nic => ArtError::Vm(message),
            EntityKind::Disk => ArtError::Disk(message),
            EntityKind::Snapshot => ArtError::Snapshot(message),
            EntityKind::Network | EntityKind::VnicProfile => ArtError::Network(message),
            EntityKind::Template => ArtError::Template(message),
            EntityKind::VmPool => ArtError::VmPool(message),
        }
    }

    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        ArtError::EntityNotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ArtError::EntityNotFound { .. } => true,
            ArtError::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ArtError::Timeout { .. })
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, ArtError::Assertion(_))
    }

    /// Errors worth retrying while polling: engine busy or entity locked
    pub fn is_transient(&self) -> bool {
        match self {
            ArtError::Api { status, .. } => *status == 409 || *status >= 500,
            ArtError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Fail with an assertion error when `condition` is false
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::ArtError::Assertion(format!($($arg)+)));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_maps_to_variant() {
        assert!(matches!(
            ArtError::entity(EntityKind::Vm, "boom"),
            ArtError::Vm(_)
        ));
        assert!(matches!(
            ArtError::entity(EntityKind::VnicProfile, "boom"),
            ArtError::Network(_)
        ));
        assert!(matches!(
            ArtError::entity(EntityKind::VmPool, "boom"),
            ArtError::VmPool(_)
        ));
        assert_eq!(
            ArtError::entity(EntityKind::StorageDomain, "nfs_0 is locked").to_string(),
            "Storage domain error: nfs_0 is locked"
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = ArtError::Api {
            status: 409,
            reason: "Operation Failed".to_string(),
            detail: Some("[Cannot run VM. VM is locked.]".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "API error 409: Operation Failed ([Cannot run VM. VM is locked.])"
        );
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_timeout_display_includes_last_sample() {
        let err = ArtError::Timeout {
            what: "VM vm_0 to be up".to_string(),
            timeout: Duration::from_secs(5),
            last_sample: Some("PoweringUp".to_string()),
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Timed out after 5s waiting for VM vm_0 to be up, last sample: PoweringUp"
        );
    }

    fn check_positive(value: i32) -> Result<()> {
        ensure!(value > 0, "expected positive value, got {}", value);
        Ok(())
    }

    #[test]
    fn test_ensure_macro() {
        assert!(check_positive(1).is_ok());
        let err = check_positive(-1).unwrap_err();
        assert!(err.is_assertion());
        assert_eq!(
            err.to_string(),
            "Assertion failed: expected positive value, got -1"
        );
    }
}
