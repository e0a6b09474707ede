//! Host operations, including host network setup

use crate::entity::{self, Entity, ResultExt};
use crate::low_level::{networks, vms};
use crate::Engine;
use art_shared::{
    Action, ArtError, EntityKind, Host, HostNic, HostStatus, Network, NetworkAttachment,
    NetworkAttachments, Ref, Result,
};
use tracing::{info, warn};

pub async fn get_host(engine: &Engine, name: &str) -> Result<Host> {
    entity::find_by_name(engine.client(), name).await
}

pub async fn get_host_by_id(engine: &Engine, id: &str) -> Result<Host> {
    entity::get_by_id(engine.client(), id).await
}

pub async fn get_host_status(engine: &Engine, name: &str) -> Result<HostStatus> {
    Ok(get_host(engine, name)
        .await?
        .status
        .unwrap_or(HostStatus::Unknown))
}

pub async fn is_host_up(engine: &Engine, name: &str) -> Result<bool> {
    Ok(get_host_status(engine, name).await? == HostStatus::Up)
}

pub async fn add_host(
    engine: &Engine,
    name: &str,
    address: &str,
    root_password: Option<&str>,
    cluster: &str,
    wait: bool,
) -> Result<Host> {
    info!("Adding host {} ({}) to cluster {}", name, address, cluster);
    let host = Host {
        name: Some(name.to_string()),
        address: Some(address.to_string()),
        root_password: root_password.map(str::to_string),
        cluster: Some(Ref::name(cluster)),
        ..Default::default()
    };

    let created = entity::create(engine.client(), Host::COLLECTION, &host)
        .await
        .or_entity_err(EntityKind::Host, || format!("Failed to add host {name}"))?;

    if wait {
        wait_for_hosts_states(engine, &[name], HostStatus::Up).await?;
    }
    Ok(created)
}

pub async fn activate_host(engine: &Engine, name: &str, wait: bool) -> Result<()> {
    info!("Activating host {}", name);
    let host = get_host(engine, name).await?;
    entity::perform_action::<Host>(engine.client(), host.require_id()?, "activate", &Action::sync())
        .await
        .or_entity_err(EntityKind::Host, || format!("Failed to activate host {name}"))?;

    if wait {
        wait_for_hosts_states(engine, &[name], HostStatus::Up).await?;
    }
    Ok(())
}

/// Move a host to maintenance
pub async fn deactivate_host(engine: &Engine, name: &str, wait: bool) -> Result<()> {
    info!("Deactivating host {}", name);
    let host = get_host(engine, name).await?;
    entity::perform_action::<Host>(
        engine.client(),
        host.require_id()?,
        "deactivate",
        &Action::sync(),
    )
    .await
    .or_entity_err(EntityKind::Host, || format!("Failed to deactivate host {name}"))?;

    if wait {
        wait_for_hosts_states(engine, &[name], HostStatus::Maintenance).await?;
    }
    Ok(())
}

pub async fn remove_host(engine: &Engine, name: &str, force: bool) -> Result<()> {
    info!("Removing host {} (force: {})", name, force);
    let host = get_host(engine, name).await?;
    let path = entity::element_path(Host::COLLECTION, host.require_id()?);
    let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };

    entity::remove(engine.client(), &path, query)
        .await
        .or_entity_err(EntityKind::Host, || format!("Failed to remove host {name}"))
}

/// Wait until every named host reports `status`
pub async fn wait_for_hosts_states(
    engine: &Engine,
    names: &[&str],
    status: HostStatus,
) -> Result<()> {
    info!("Waiting for hosts {:?} to be {}", names, status);
    engine
        .sampler(
            engine.timeouts().host_state(),
            format!("hosts {names:?} to be {status}"),
        )
        .wait_for(
            || async move {
                let mut states = Vec::with_capacity(names.len());
                for name in names {
                    states.push((name.to_string(), get_host_status(engine, name).await?));
                }
                Ok(states)
            },
            |states: &Vec<(String, HostStatus)>| states.iter().all(|(_, s)| *s == status),
        )
        .await?;
    Ok(())
}

/// Host currently holding the SPM role in a datacenter
pub async fn get_spm_host(engine: &Engine, datacenter: &str) -> Result<Host> {
    let hosts = entity::search::<Host>(engine.client(), &format!("datacenter={datacenter}")).await?;
    hosts
        .into_iter()
        .find(Host::is_spm)
        .ok_or_else(|| ArtError::Host(format!("No SPM host in datacenter {datacenter}")))
}

pub async fn wait_for_spm(engine: &Engine, datacenter: &str) -> Result<Host> {
    info!("Waiting for SPM election in datacenter {}", datacenter);
    let spm = engine
        .sampler(
            engine.timeouts().host_state(),
            format!("SPM host in datacenter {datacenter}"),
        )
        .wait_for(
            || async move {
                match get_spm_host(engine, datacenter).await {
                    Ok(host) => Ok(Some(host)),
                    Err(ArtError::Host(_)) => Ok(None),
                    Err(e) => Err(e),
                }
            },
            |host: &Option<Host>| host.is_some(),
        )
        .await?;
    spm.ok_or_else(|| ArtError::Host(format!("No SPM host in datacenter {datacenter}")))
}

pub async fn get_host_nics(engine: &Engine, host: &str) -> Result<Vec<HostNic>> {
    let host = get_host(engine, host).await?;
    let path = entity::element_path(Host::COLLECTION, host.require_id()?);
    entity::list_in(engine.client(), &entity::sub_collection::<HostNic>(&path), None).await
}

pub async fn get_host_nic(engine: &Engine, host: &str, nic: &str) -> Result<HostNic> {
    get_host_nics(engine, host)
        .await?
        .into_iter()
        .find(|n| n.name.as_deref() == Some(nic))
        .ok_or_else(|| ArtError::not_found(EntityKind::Host, format!("{host}/{nic}")))
}

pub async fn get_network_attachments(
    engine: &Engine,
    host: &str,
) -> Result<Vec<NetworkAttachment>> {
    let host = get_host(engine, host).await?;
    let path = entity::element_path(Host::COLLECTION, host.require_id()?);
    entity::list_in(
        engine.client(),
        &entity::sub_collection::<NetworkAttachment>(&path),
        None,
    )
    .await
}

/// Whether the attachment carries `network`
///
/// Attachments usually reference networks by id only, so both id and name
/// are tried.
pub fn attaches(attachment: &NetworkAttachment, network: &Network) -> bool {
    attachment.network.as_ref().is_some_and(|r| {
        network.id.as_deref().is_some_and(|id| r.matches(id))
            || network.name.as_deref().is_some_and(|name| r.matches(name))
    })
}

pub fn is_attached(attachments: &[NetworkAttachment], network: &Network) -> bool {
    attachments.iter().any(|a| attaches(a, network))
}

async fn resolve_networks(
    engine: &Engine,
    datacenter: &str,
    names: &[&str],
) -> Result<Vec<Network>> {
    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        resolved.push(networks::get_network(engine, name, datacenter).await?);
    }
    Ok(resolved)
}

/// Attach `(network, host_nic)` pairs and detach networks from a host in one
/// request, then wait until the host's attachments show the change
pub async fn setup_networks(
    engine: &Engine,
    host: &str,
    datacenter: &str,
    attach: &[(&str, &str)],
    detach: &[&str],
) -> Result<()> {
    info!(
        "Setting up networks on host {}: attach {:?}, detach {:?}",
        host, attach, detach
    );
    let host_entity = get_host(engine, host).await?;
    let host_id = host_entity.require_id()?;

    let attach_names: Vec<&str> = attach.iter().map(|(network, _)| *network).collect();
    let attached = resolve_networks(engine, datacenter, &attach_names).await?;
    let detached = resolve_networks(engine, datacenter, detach).await?;

    let mut removed = Vec::with_capacity(detached.len());
    if !detached.is_empty() {
        let attachments = get_network_attachments(engine, host).await?;
        for network in &detached {
            let attachment = attachments
                .iter()
                .find(|a| attaches(a, network))
                .ok_or_else(|| {
                    ArtError::Network(format!(
                        "Network {} is not attached to host {host}",
                        network.name.as_deref().unwrap_or_default()
                    ))
                })?;
            removed.push(NetworkAttachment {
                id: attachment.id.clone(),
                ..Default::default()
            });
        }
    }

    let modified = attach
        .iter()
        .zip(&attached)
        .map(|((name, nic), network)| NetworkAttachment {
            id: None,
            network: Some(match network.id.as_deref() {
                Some(id) => Ref::id(id),
                None => Ref::name(*name),
            }),
            host_nic: Some(Ref::name(*nic)),
        })
        .collect();

    let action = Action {
        modified_network_attachments: Some(NetworkAttachments {
            network_attachment: modified,
        }),
        removed_network_attachments: Some(NetworkAttachments {
            network_attachment: removed,
        }),
        check_connectivity: Some(true),
        ..Action::sync()
    };

    entity::perform_action_at(
        engine.client(),
        EntityKind::Network,
        &entity::element_path(Host::COLLECTION, host_id),
        "setupnetworks",
        &action,
    )
    .await
    .or_entity_err(EntityKind::Network, || {
        format!("Failed to set up networks on host {host}")
    })?;

    engine
        .sampler(
            engine.timeouts().network(),
            format!("network attachments of host {host} to converge"),
        )
        .wait_for(
            || async move { get_network_attachments(engine, host).await },
            |attachments: &Vec<NetworkAttachment>| {
                attached.iter().all(|n| is_attached(attachments, n))
                    && !detached.iter().any(|n| is_attached(attachments, n))
            },
        )
        .await?;
    Ok(())
}

/// An up host in the VM's cluster other than the one running it
pub async fn select_host_for_migration(engine: &Engine, vm: &str) -> Result<String> {
    let vm_entity = vms::get_vm(engine, vm).await?;
    let current = vms::get_vm_host(engine, vm).await?;
    let cluster = vm_entity
        .cluster
        .as_ref()
        .ok_or_else(|| ArtError::Vm(format!("VM {vm} has no cluster")))?;
    let cluster_id = cluster
        .id
        .as_deref()
        .or(cluster.name.as_deref())
        .unwrap_or_default();

    let candidates = entity::list_all::<Host>(engine.client()).await?;
    let target = candidates.into_iter().find(|h| {
        h.status == Some(HostStatus::Up)
            && h.cluster.as_ref().is_some_and(|c| c.matches(cluster_id))
            && h.name.is_some()
            && h.name != current
    });

    match target.and_then(|h| h.name) {
        Some(name) => Ok(name),
        None => {
            warn!("No migration target for VM {} (running on {:?})", vm, current);
            Err(ArtError::Host(format!(
                "No up host other than {current:?} available to migrate VM {vm}"
            )))
        }
    }
}
