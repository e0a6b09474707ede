//! Logical network and vNIC profile operations

use crate::entity::{self, Entity, ResultExt};
use crate::low_level::{clusters, datacenters};
use crate::Engine;
use art_shared::{ArtError, Cluster, EntityKind, Network, Ref, Result, VnicProfile};
use tracing::info;

/// Network names are unique per datacenter only
pub async fn get_network(engine: &Engine, name: &str, datacenter: &str) -> Result<Network> {
    entity::find_by_query(
        engine.client(),
        &format!("name={name} and datacenter={datacenter}"),
        name,
    )
    .await
}

pub async fn add_network(engine: &Engine, network: &Network) -> Result<Network> {
    let name = network.name.as_deref().unwrap_or_default();
    info!("Adding network {}", name);
    entity::create(engine.client(), Network::COLLECTION, network)
        .await
        .or_entity_err(EntityKind::Network, || format!("Failed to add network {name}"))
}

pub async fn update_network(
    engine: &Engine,
    name: &str,
    datacenter: &str,
    changes: &Network,
) -> Result<Network> {
    info!("Updating network {}", name);
    let network = get_network(engine, name, datacenter).await?;
    let path = entity::element_path(Network::COLLECTION, network.require_id()?);

    entity::update(engine.client(), &path, changes)
        .await
        .or_entity_err(EntityKind::Network, || format!("Failed to update network {name}"))
}

pub async fn remove_network(engine: &Engine, name: &str, datacenter: &str) -> Result<()> {
    info!("Removing network {} from datacenter {}", name, datacenter);
    let network = get_network(engine, name, datacenter).await?;
    let path = entity::element_path(Network::COLLECTION, network.require_id()?);

    entity::remove(engine.client(), &path, &[])
        .await
        .or_entity_err(EntityKind::Network, || format!("Failed to remove network {name}"))
}

async fn cluster_networks_path(engine: &Engine, cluster: &str) -> Result<String> {
    let cluster = clusters::get_cluster(engine, cluster).await?;
    Ok(entity::sub_collection::<Network>(&entity::element_path(
        Cluster::COLLECTION,
        cluster.require_id()?,
    )))
}

pub async fn get_cluster_networks(engine: &Engine, cluster: &str) -> Result<Vec<Network>> {
    let path = cluster_networks_path(engine, cluster).await?;
    entity::list_in(engine.client(), &path, None).await
}

/// Attach a datacenter network to a cluster, optionally marking it required
pub async fn add_network_to_cluster(
    engine: &Engine,
    name: &str,
    datacenter: &str,
    cluster: &str,
    required: bool,
) -> Result<()> {
    info!("Attaching network {} to cluster {}", name, cluster);
    let network = get_network(engine, name, datacenter).await?;
    let body = Network {
        id: network.id.clone(),
        required: Some(required),
        ..Default::default()
    };
    let path = cluster_networks_path(engine, cluster).await?;

    entity::create(engine.client(), &path, &body)
        .await
        .or_entity_err(EntityKind::Network, || {
            format!("Failed to attach network {name} to cluster {cluster}")
        })?;
    Ok(())
}

pub async fn remove_network_from_cluster(engine: &Engine, name: &str, cluster: &str) -> Result<()> {
    info!("Detaching network {} from cluster {}", name, cluster);
    let path = cluster_networks_path(engine, cluster).await?;
    let network: Network = entity::find_in(engine.client(), &path, name).await?;

    entity::remove(
        engine.client(),
        &entity::element_path(&path, network.require_id()?),
        &[],
    )
    .await
    .or_entity_err(EntityKind::Network, || {
        format!("Failed to detach network {name} from cluster {cluster}")
    })
}

/// vNIC profile of a network; profiles share names across networks
pub async fn find_vnic_profile(
    engine: &Engine,
    name: &str,
    network: &str,
    datacenter: &str,
) -> Result<VnicProfile> {
    let network = get_network(engine, network, datacenter).await?;
    let network_id = network.require_id()?;

    let profiles = entity::list_all::<VnicProfile>(engine.client()).await?;
    profiles
        .into_iter()
        .find(|p| {
            p.name.as_deref() == Some(name)
                && p.network.as_ref().is_some_and(|n| n.matches(network_id))
        })
        .ok_or_else(|| {
            ArtError::not_found(
                EntityKind::VnicProfile,
                format!("{name} (network {})", network.name.as_deref().unwrap_or(network_id)),
            )
        })
}

pub async fn add_vnic_profile(
    engine: &Engine,
    name: &str,
    network: &str,
    datacenter: &str,
    port_mirroring: bool,
) -> Result<VnicProfile> {
    info!("Adding vNIC profile {} to network {}", name, network);
    let network_entity = get_network(engine, network, datacenter).await?;
    let profile = VnicProfile {
        name: Some(name.to_string()),
        network: Some(Ref::id(network_entity.require_id()?)),
        port_mirroring: Some(port_mirroring),
        ..Default::default()
    };

    entity::create(engine.client(), VnicProfile::COLLECTION, &profile)
        .await
        .or_entity_err(EntityKind::VnicProfile, || {
            format!("Failed to add vNIC profile {name} to network {network}")
        })
}

pub async fn remove_vnic_profile(
    engine: &Engine,
    name: &str,
    network: &str,
    datacenter: &str,
) -> Result<()> {
    info!("Removing vNIC profile {} of network {}", name, network);
    let profile = find_vnic_profile(engine, name, network, datacenter).await?;
    let path = entity::element_path(VnicProfile::COLLECTION, profile.require_id()?);

    entity::remove(engine.client(), &path, &[])
        .await
        .or_entity_err(EntityKind::VnicProfile, || {
            format!("Failed to remove vNIC profile {name} of network {network}")
        })
}

/// Whether a network exists in a datacenter
pub async fn network_exists(engine: &Engine, name: &str, datacenter: &str) -> Result<bool> {
    datacenters::get_datacenter(engine, datacenter).await?;
    match get_network(engine, name, datacenter).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
