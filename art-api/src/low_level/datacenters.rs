//! Datacenter operations

use crate::entity::{self, Entity, ResultExt};
use crate::Engine;
use art_shared::{DataCenter, DataCenterStatus, EntityKind, Result, Version};
use tracing::info;

pub async fn get_datacenter(engine: &Engine, name: &str) -> Result<DataCenter> {
    entity::find_by_name(engine.client(), name).await
}

pub async fn add_datacenter(
    engine: &Engine,
    name: &str,
    local: bool,
    version: &Version,
) -> Result<DataCenter> {
    info!("Adding datacenter {} (version {})", name, version);
    let datacenter = DataCenter {
        name: Some(name.to_string()),
        local: Some(local),
        version: Some(version.clone()),
        ..Default::default()
    };

    entity::create(engine.client(), DataCenter::COLLECTION, &datacenter)
        .await
        .or_entity_err(EntityKind::DataCenter, || {
            format!("Failed to add datacenter {name}")
        })
}

pub async fn update_datacenter(
    engine: &Engine,
    name: &str,
    changes: &DataCenter,
) -> Result<DataCenter> {
    info!("Updating datacenter {}", name);
    let datacenter = get_datacenter(engine, name).await?;
    let path = entity::element_path(DataCenter::COLLECTION, datacenter.require_id()?);

    entity::update(engine.client(), &path, changes)
        .await
        .or_entity_err(EntityKind::DataCenter, || {
            format!("Failed to update datacenter {name}")
        })
}

pub async fn remove_datacenter(engine: &Engine, name: &str, force: bool) -> Result<()> {
    info!("Removing datacenter {} (force: {})", name, force);
    let datacenter = get_datacenter(engine, name).await?;
    let path = entity::element_path(DataCenter::COLLECTION, datacenter.require_id()?);
    let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };

    entity::remove(engine.client(), &path, query)
        .await
        .or_entity_err(EntityKind::DataCenter, || {
            format!("Failed to remove datacenter {name}")
        })
}

pub async fn wait_for_datacenter_state(
    engine: &Engine,
    name: &str,
    status: DataCenterStatus,
) -> Result<()> {
    info!("Waiting for datacenter {} to be {}", name, status);
    engine
        .sampler(
            engine.timeouts().storage_domain(),
            format!("datacenter {name} to be {status}"),
        )
        .wait_for_value(
            || async move { Ok(get_datacenter(engine, name).await?.status) },
            Some(status),
        )
        .await?;
    Ok(())
}
