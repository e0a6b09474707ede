//! Cluster operations

use crate::entity::{self, Entity, ResultExt};
use crate::Engine;
use art_shared::{ArtError, Cluster, ClusterCpu, EntityKind, Ref, Result, Version};
use tracing::info;

pub async fn get_cluster(engine: &Engine, name: &str) -> Result<Cluster> {
    entity::find_by_name(engine.client(), name).await
}

pub async fn add_cluster(
    engine: &Engine,
    name: &str,
    datacenter: &str,
    cpu_type: &str,
    version: &Version,
) -> Result<Cluster> {
    info!(
        "Adding cluster {} to datacenter {} (cpu: {}, version {})",
        name, datacenter, cpu_type, version
    );
    let cluster = Cluster {
        name: Some(name.to_string()),
        data_center: Some(Ref::name(datacenter)),
        cpu: Some(ClusterCpu {
            cpu_type: Some(cpu_type.to_string()),
        }),
        version: Some(version.clone()),
        ..Default::default()
    };

    entity::create(engine.client(), Cluster::COLLECTION, &cluster)
        .await
        .or_entity_err(EntityKind::Cluster, || format!("Failed to add cluster {name}"))
}

pub async fn update_cluster(engine: &Engine, name: &str, changes: &Cluster) -> Result<Cluster> {
    info!("Updating cluster {}", name);
    let cluster = get_cluster(engine, name).await?;
    let path = entity::element_path(Cluster::COLLECTION, cluster.require_id()?);

    entity::update(engine.client(), &path, changes)
        .await
        .or_entity_err(EntityKind::Cluster, || format!("Failed to update cluster {name}"))
}

pub async fn remove_cluster(engine: &Engine, name: &str) -> Result<()> {
    info!("Removing cluster {}", name);
    let cluster = get_cluster(engine, name).await?;
    let path = entity::element_path(Cluster::COLLECTION, cluster.require_id()?);

    entity::remove(engine.client(), &path, &[])
        .await
        .or_entity_err(EntityKind::Cluster, || format!("Failed to remove cluster {name}"))
}

pub async fn get_cluster_compatibility_version(engine: &Engine, name: &str) -> Result<Version> {
    get_cluster(engine, name).await?.version.ok_or_else(|| {
        ArtError::Cluster(format!("Cluster {name} reports no compatibility version"))
    })
}
