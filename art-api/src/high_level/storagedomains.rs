//! Storage domain scenarios

use crate::low_level::storagedomains;
use crate::Engine;
use art_shared::{
    ArtError, HostStorage, LogicalUnit, LogicalUnits, Ref, Result, StorageConfig, StorageDomain,
    StorageDomainType, StorageType,
};
use tracing::info;

async fn add_data_domain(
    engine: &Engine,
    name: &str,
    host: &str,
    storage: HostStorage,
    datacenter: Option<&str>,
) -> Result<StorageDomain> {
    let domain = StorageDomain {
        name: Some(name.to_string()),
        domain_type: Some(StorageDomainType::Data),
        host: Some(Ref::name(host)),
        storage: Some(storage),
        ..Default::default()
    };
    let created = storagedomains::add_storage_domain(engine, &domain).await?;

    if let Some(datacenter) = datacenter {
        storagedomains::attach_storage_domain(engine, datacenter, name, true).await?;
    }
    Ok(created)
}

/// Add an NFS data domain, attaching it to `datacenter` when given
pub async fn add_nfs_domain(
    engine: &Engine,
    name: &str,
    host: &str,
    address: &str,
    path: &str,
    datacenter: Option<&str>,
) -> Result<StorageDomain> {
    info!("Adding NFS domain {} ({}:{})", name, address, path);
    let storage = HostStorage {
        storage_type: StorageType::Nfs,
        address: Some(address.to_string()),
        path: Some(path.to_string()),
        logical_units: None,
    };
    add_data_domain(engine, name, host, storage, datacenter).await
}

/// Add an iSCSI data domain on one LUN of `target`
pub async fn add_iscsi_domain(
    engine: &Engine,
    name: &str,
    host: &str,
    address: &str,
    target: &str,
    lun: &str,
    datacenter: Option<&str>,
) -> Result<StorageDomain> {
    info!("Adding iSCSI domain {} ({} {} lun {})", name, address, target, lun);
    let storage = HostStorage {
        storage_type: StorageType::Iscsi,
        address: None,
        path: None,
        logical_units: Some(LogicalUnits {
            logical_unit: vec![LogicalUnit {
                id: lun.to_string(),
                address: Some(address.to_string()),
                port: Some(3260),
                target: Some(target.to_string()),
            }],
        }),
    };
    add_data_domain(engine, name, host, storage, datacenter).await
}

/// Add a configured storage entry through `host`
pub async fn add_configured_domain(
    engine: &Engine,
    storage: &StorageConfig,
    host: &str,
    datacenter: Option<&str>,
) -> Result<StorageDomain> {
    let missing = |field: &str| {
        ArtError::Config(format!("Storage {} needs a {field}", storage.name))
    };

    match storage.storage_type {
        StorageType::Nfs => {
            let path = storage.path.as_deref().ok_or_else(|| missing("path"))?;
            add_nfs_domain(engine, &storage.name, host, &storage.address, path, datacenter).await
        }
        StorageType::Iscsi => {
            let target = storage.target.as_deref().ok_or_else(|| missing("target"))?;
            let lun = storage.lun.as_deref().ok_or_else(|| missing("lun"))?;
            add_iscsi_domain(
                engine,
                &storage.name,
                host,
                &storage.address,
                target,
                lun,
                datacenter,
            )
            .await
        }
        other => Err(ArtError::Config(format!(
            "Storage {} has unsupported type {other:?}",
            storage.name
        ))),
    }
}

/// Maintenance, detach, then remove with format through `host`
pub async fn detach_and_remove_domain(
    engine: &Engine,
    datacenter: &str,
    name: &str,
    host: &str,
) -> Result<()> {
    info!("Detaching and removing storage domain {}", name);
    storagedomains::deactivate_storage_domain(engine, datacenter, name, true).await?;
    storagedomains::detach_storage_domain(engine, datacenter, name, true).await?;
    storagedomains::remove_storage_domain(engine, name, host, true).await
}
