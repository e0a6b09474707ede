//! Storage domain operations
//!
//! A domain's status is only meaningful inside a datacenter, so the state
//! functions go through `datacenters/{id}/storagedomains`.

use crate::entity::{self, Entity, ResultExt};
use crate::low_level::datacenters;
use crate::Engine;
use art_shared::{
    Action, ArtError, DataCenter, EntityKind, Result, StorageDomain, StorageDomainStatus,
};
use tracing::info;

pub async fn get_storage_domain(engine: &Engine, name: &str) -> Result<StorageDomain> {
    entity::find_by_name(engine.client(), name).await
}

async fn datacenter_domains_path(engine: &Engine, datacenter: &str) -> Result<String> {
    let dc = datacenters::get_datacenter(engine, datacenter).await?;
    Ok(entity::sub_collection::<StorageDomain>(
        &entity::element_path(DataCenter::COLLECTION, dc.require_id()?),
    ))
}

/// Domains attached to a datacenter, with their in-datacenter status
pub async fn get_datacenter_storage_domains(
    engine: &Engine,
    datacenter: &str,
) -> Result<Vec<StorageDomain>> {
    let path = datacenter_domains_path(engine, datacenter).await?;
    entity::list_in(engine.client(), &path, None).await
}

pub async fn get_storage_domain_status(
    engine: &Engine,
    datacenter: &str,
    name: &str,
) -> Result<StorageDomainStatus> {
    let path = datacenter_domains_path(engine, datacenter).await?;
    let domain: StorageDomain = entity::find_in(engine.client(), &path, name).await?;
    Ok(domain.status.unwrap_or(StorageDomainStatus::Unknown))
}

/// Create a storage domain through `domain.host`
pub async fn add_storage_domain(engine: &Engine, domain: &StorageDomain) -> Result<StorageDomain> {
    let name = domain.name.as_deref().unwrap_or_default();
    info!("Adding storage domain {}", name);
    entity::create(engine.client(), StorageDomain::COLLECTION, domain)
        .await
        .or_entity_err(EntityKind::StorageDomain, || {
            format!("Failed to add storage domain {name}")
        })
}

/// Attach a domain to a datacenter; the engine activates it on attach
pub async fn attach_storage_domain(
    engine: &Engine,
    datacenter: &str,
    name: &str,
    wait: bool,
) -> Result<()> {
    info!("Attaching storage domain {} to datacenter {}", name, datacenter);
    let domain = get_storage_domain(engine, name).await?;
    let path = datacenter_domains_path(engine, datacenter).await?;
    let body = StorageDomain {
        id: domain.id.clone(),
        ..Default::default()
    };

    entity::create(engine.client(), &path, &body)
        .await
        .or_entity_err(EntityKind::StorageDomain, || {
            format!("Failed to attach storage domain {name} to datacenter {datacenter}")
        })?;

    if wait {
        wait_for_storage_domain_status(engine, datacenter, name, StorageDomainStatus::Active)
            .await?;
    }
    Ok(())
}

async fn domain_action(
    engine: &Engine,
    datacenter: &str,
    name: &str,
    action_name: &str,
) -> Result<()> {
    let path = datacenter_domains_path(engine, datacenter).await?;
    let domain: StorageDomain = entity::find_in(engine.client(), &path, name).await?;

    entity::perform_action_at(
        engine.client(),
        EntityKind::StorageDomain,
        &entity::element_path(&path, domain.require_id()?),
        action_name,
        &Action::sync(),
    )
    .await
    .or_entity_err(EntityKind::StorageDomain, || {
        format!("Failed to {action_name} storage domain {name} in datacenter {datacenter}")
    })?;
    Ok(())
}

pub async fn activate_storage_domain(
    engine: &Engine,
    datacenter: &str,
    name: &str,
    wait: bool,
) -> Result<()> {
    info!("Activating storage domain {}", name);
    domain_action(engine, datacenter, name, "activate").await?;
    if wait {
        wait_for_storage_domain_status(engine, datacenter, name, StorageDomainStatus::Active)
            .await?;
    }
    Ok(())
}

/// Move a domain to maintenance
pub async fn deactivate_storage_domain(
    engine: &Engine,
    datacenter: &str,
    name: &str,
    wait: bool,
) -> Result<()> {
    info!("Deactivating storage domain {}", name);
    domain_action(engine, datacenter, name, "deactivate").await?;
    if wait {
        wait_for_storage_domain_status(
            engine,
            datacenter,
            name,
            StorageDomainStatus::Maintenance,
        )
        .await?;
    }
    Ok(())
}

pub async fn detach_storage_domain(
    engine: &Engine,
    datacenter: &str,
    name: &str,
    wait: bool,
) -> Result<()> {
    info!("Detaching storage domain {} from datacenter {}", name, datacenter);
    let path = datacenter_domains_path(engine, datacenter).await?;
    let domain: StorageDomain = entity::find_in(engine.client(), &path, name).await?;

    entity::remove(
        engine.client(),
        &entity::element_path(&path, domain.require_id()?),
        &[],
    )
    .await
    .or_entity_err(EntityKind::StorageDomain, || {
        format!("Failed to detach storage domain {name} from datacenter {datacenter}")
    })?;

    if wait {
        let sampler = engine.sampler(
            engine.timeouts().storage_domain(),
            format!("storage domain {name} to leave datacenter {datacenter}"),
        );
        entity::wait_for_removal::<StorageDomain>(engine.client(), &path, name, &sampler).await?;
    }
    Ok(())
}

/// Remove a detached domain through `host`, wiping its content when `format` is set
pub async fn remove_storage_domain(
    engine: &Engine,
    name: &str,
    host: &str,
    format: bool,
) -> Result<()> {
    info!("Removing storage domain {} (format: {})", name, format);
    let domain = get_storage_domain(engine, name).await?;
    let path = entity::element_path(StorageDomain::COLLECTION, domain.require_id()?);
    let mut query = vec![("host", host)];
    if format {
        query.push(("format", "true"));
    }

    entity::remove(engine.client(), &path, &query)
        .await
        .or_entity_err(EntityKind::StorageDomain, || {
            format!("Failed to remove storage domain {name}")
        })
}

pub async fn wait_for_storage_domain_status(
    engine: &Engine,
    datacenter: &str,
    name: &str,
    status: StorageDomainStatus,
) -> Result<()> {
    info!("Waiting for storage domain {} to be {}", name, status);
    engine
        .sampler(
            engine.timeouts().storage_domain(),
            format!("storage domain {name} to be {status}"),
        )
        .wait_for_value(
            || async move { get_storage_domain_status(engine, datacenter, name).await },
            status,
        )
        .await?;
    Ok(())
}

/// The datacenter's master data domain
pub async fn get_master_storage_domain(
    engine: &Engine,
    datacenter: &str,
) -> Result<StorageDomain> {
    get_datacenter_storage_domains(engine, datacenter)
        .await?
        .into_iter()
        .find(|d| d.master == Some(true))
        .ok_or_else(|| {
            ArtError::StorageDomain(format!("No master storage domain in datacenter {datacenter}"))
        })
}
