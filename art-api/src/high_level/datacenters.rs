//! Whole-environment setup and cleanup

use crate::entity;
use crate::high_level::{storagedomains as sd_scenarios, vms as vm_scenarios};
use crate::low_level::{clusters, datacenters, hosts, storagedomains};
use crate::parallel::map_parallel;
use crate::Engine;
use art_shared::{ArtError, DataCenterStatus, HostStatus, Result, TopologyConfig, Version, Vm};
use tracing::{info, warn};

/// Build the datacenter described by `topology`: datacenter, cluster, hosts
/// up, every storage domain attached and active, datacenter up
pub async fn build_setup(engine: &Engine, topology: &TopologyConfig) -> Result<()> {
    info!("Building setup in datacenter {}", topology.datacenter);
    let version = Version::parse(&topology.compatibility_version)?;
    let first_host = topology
        .hosts
        .first()
        .ok_or_else(|| ArtError::Config("Topology has no hosts".to_string()))?;

    datacenters::add_datacenter(engine, &topology.datacenter, false, &version).await?;
    clusters::add_cluster(
        engine,
        &topology.cluster,
        &topology.datacenter,
        &topology.cpu_type,
        &version,
    )
    .await?;

    let cluster = topology.cluster.clone();
    map_parallel(engine.max_workers(), topology.hosts.iter().cloned(), |host| {
        let engine = engine.clone();
        let cluster = cluster.clone();
        async move {
            hosts::add_host(
                &engine,
                &host.name,
                &host.address,
                host.root_password.as_deref(),
                &cluster,
                false,
            )
            .await
        }
    })
    .await?;

    let host_names: Vec<&str> = topology.hosts.iter().map(|h| h.name.as_str()).collect();
    hosts::wait_for_hosts_states(engine, &host_names, HostStatus::Up).await?;

    // The first attached data domain becomes master; the rest need it active first
    for storage in &topology.storage {
        sd_scenarios::add_configured_domain(
            engine,
            storage,
            &first_host.name,
            Some(&topology.datacenter),
        )
        .await?;
    }

    if !topology.storage.is_empty() {
        datacenters::wait_for_datacenter_state(engine, &topology.datacenter, DataCenterStatus::Up)
            .await?;
        hosts::wait_for_spm(engine, &topology.datacenter).await?;
    }
    info!("Setup of datacenter {} is ready", topology.datacenter);
    Ok(())
}

/// Tear down everything [`build_setup`] created, plus any VMs left in the cluster
pub async fn clean_datacenter(engine: &Engine, topology: &TopologyConfig) -> Result<()> {
    info!("Cleaning datacenter {}", topology.datacenter);
    let first_host = topology
        .hosts
        .first()
        .map(|h| h.name.clone())
        .ok_or_else(|| ArtError::Config("Topology has no hosts".to_string()))?;

    let leftover: Vec<String> =
        entity::search::<Vm>(engine.client(), &format!("cluster={}", topology.cluster))
            .await?
            .into_iter()
            .filter_map(|vm| vm.name)
            .collect();
    if !leftover.is_empty() {
        vm_scenarios::remove_vms(engine, &leftover).await?;
    }

    let domains = storagedomains::get_datacenter_storage_domains(engine, &topology.datacenter)
        .await?;
    for domain in domains.iter().filter(|d| d.master != Some(true)) {
        let Some(name) = domain.name.as_deref() else { continue };
        sd_scenarios::detach_and_remove_domain(engine, &topology.datacenter, name, &first_host)
            .await?;
    }

    let master = match storagedomains::get_master_storage_domain(engine, &topology.datacenter)
        .await
    {
        Ok(domain) => domain.name,
        Err(ArtError::StorageDomain(_)) => None,
        Err(e) => return Err(e),
    };
    if let Some(master) = &master {
        storagedomains::deactivate_storage_domain(engine, &topology.datacenter, master, true)
            .await?;
    }
    datacenters::remove_datacenter(engine, &topology.datacenter, false).await?;
    if let Some(master) = &master {
        storagedomains::remove_storage_domain(engine, master, &first_host, true).await?;
    }

    let host_names: Vec<String> = topology.hosts.iter().map(|h| h.name.clone()).collect();
    map_parallel(engine.max_workers(), host_names, |name| {
        let engine = engine.clone();
        async move {
            match hosts::get_host_status(&engine, &name).await {
                Ok(HostStatus::Maintenance) => {}
                Ok(_) => hosts::deactivate_host(&engine, &name, true).await?,
                Err(e) if e.is_not_found() => {
                    warn!("Host {} is already gone", name);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
            hosts::remove_host(&engine, &name, false).await
        }
    })
    .await?;

    clusters::remove_cluster(engine, &topology.cluster).await?;
    info!("Datacenter {} cleaned", topology.datacenter);
    Ok(())
}
