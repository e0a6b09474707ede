//! Network scenarios

use crate::low_level::{hosts, networks};
use crate::Engine;
use art_shared::{ensure, Network, NetworkUsage, Ref, Result, Usages, Vlan};
use std::collections::HashMap;
use tracing::info;

/// A logical network to create and where to attach it
#[derive(Debug, Clone, Default)]
pub struct NetworkSpec {
    pub name: String,
    pub vlan: Option<u16>,
    pub mtu: Option<u32>,
    pub vm_network: bool,
    pub required: bool,
    /// Host NIC to attach the network to on every listed host
    pub host_nic: Option<String>,
}

impl NetworkSpec {
    pub fn vm(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vm_network: true,
            ..Default::default()
        }
    }
}

/// Create networks in the datacenter, attach them to the cluster, and to
/// host NICs where the network names one
pub async fn create_and_attach_networks(
    engine: &Engine,
    datacenter: &str,
    cluster: &str,
    specs: &[NetworkSpec],
    host_names: &[String],
) -> Result<()> {
    for spec in specs {
        info!("Creating network {} in datacenter {}", spec.name, datacenter);
        let network = Network {
            name: Some(spec.name.clone()),
            data_center: Some(Ref::name(datacenter)),
            vlan: spec.vlan.map(|id| Vlan { id }),
            mtu: spec.mtu,
            usages: Some(Usages {
                usage: if spec.vm_network {
                    vec![NetworkUsage::Vm]
                } else {
                    Vec::new()
                },
            }),
            ..Default::default()
        };
        networks::add_network(engine, &network).await?;
        networks::add_network_to_cluster(engine, &spec.name, datacenter, cluster, spec.required)
            .await?;
    }

    let attach: Vec<(&str, &str)> = specs
        .iter()
        .filter_map(|s| s.host_nic.as_deref().map(|nic| (s.name.as_str(), nic)))
        .collect();
    if attach.is_empty() {
        return Ok(());
    }
    for host in host_names {
        hosts::setup_networks(engine, host, datacenter, &attach, &[]).await?;
    }
    Ok(())
}

/// Detach networks from hosts they are attached to, then remove them
pub async fn remove_networks(
    engine: &Engine,
    datacenter: &str,
    names: &[String],
    host_names: &[String],
) -> Result<()> {
    let mut existing = Vec::with_capacity(names.len());
    for name in names {
        existing.push(networks::get_network(engine, name, datacenter).await?);
    }

    for host in host_names {
        let attached = hosts::get_network_attachments(engine, host).await?;
        let detach: Vec<&str> = names
            .iter()
            .zip(&existing)
            .filter(|(_, network)| hosts::is_attached(&attached, network))
            .map(|(name, _)| name.as_str())
            .collect();
        if !detach.is_empty() {
            hosts::setup_networks(engine, host, datacenter, &[], &detach).await?;
        }
    }

    for name in names {
        networks::remove_network(engine, name, datacenter).await?;
    }
    Ok(())
}

/// Assert that `network` is attached to `nic` on `host`
pub async fn check_host_nic_network(
    engine: &Engine,
    host: &str,
    nic: &str,
    network: &str,
    datacenter: &str,
) -> Result<()> {
    let host_nic = hosts::get_host_nic(engine, host, nic).await?;
    let network_id = networks::get_network(engine, network, datacenter)
        .await?
        .id
        .unwrap_or_default();

    let by_network: HashMap<String, Ref> = hosts::get_network_attachments(engine, host)
        .await?
        .into_iter()
        .filter_map(|a| {
            let network = a.network?;
            let key = network.id.or(network.name)?;
            Some((key, a.host_nic.unwrap_or_default()))
        })
        .collect();

    let attached_nic = by_network
        .get(&network_id)
        .or_else(|| by_network.get(network));
    let on_nic = attached_nic.is_some_and(|n| {
        n.matches(nic) || host_nic.id.as_deref().is_some_and(|id| n.matches(id))
    });
    ensure!(
        on_nic,
        "Network {network} is not attached to {nic} on host {host} (attached to {attached_nic:?})"
    );
    Ok(())
}
