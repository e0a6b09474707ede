//! VM networks with VLAN tagging and jumbo frames, from datacenter down to host NIC

use super::{not_set_up, unknown_case, Suite, SuiteContext};
use art_api::high_level::networks::{self as net_scenarios, NetworkSpec};
use art_api::high_level::vms::{self as vm_scenarios, VmSpec};
use art_api::high_level::unique_name;
use art_api::low_level::{hosts, networks, vms};
use art_shared::{ensure, ArtError, Ref, Result, Vlan};
use async_trait::async_trait;
use tracing::{info, warn};

const VLAN_ID: u16 = 162;
const MTU: u32 = 9000;

#[derive(Default)]
pub struct NetworksSuite {
    network: Option<String>,
    profile: Option<String>,
    vm: Option<String>,
    attached_host: Option<String>,
}

impl NetworksSuite {
    fn network(&self) -> Result<&str> {
        self.network
            .as_deref()
            .ok_or_else(|| not_set_up(self.name(), "network name"))
    }

    async fn create_vm_network(&mut self, ctx: &SuiteContext) -> Result<()> {
        let name = self.network()?;
        let spec = NetworkSpec {
            vlan: Some(VLAN_ID),
            mtu: Some(MTU),
            ..NetworkSpec::vm(name)
        };
        net_scenarios::create_and_attach_networks(
            &ctx.engine,
            &ctx.topology.datacenter,
            &ctx.topology.cluster,
            std::slice::from_ref(&spec),
            &[],
        )
        .await?;

        let network = networks::get_network(&ctx.engine, name, &ctx.topology.datacenter).await?;
        ensure!(
            network.vlan == Some(Vlan { id: VLAN_ID }),
            "Network {name} has VLAN {:?}, expected {VLAN_ID}",
            network.vlan
        );
        ensure!(
            network.mtu == Some(MTU),
            "Network {name} has MTU {:?}, expected {MTU}",
            network.mtu
        );
        ensure!(network.is_vm_network(), "Network {name} is not a VM network");

        let in_cluster = networks::get_cluster_networks(&ctx.engine, &ctx.topology.cluster)
            .await?
            .iter()
            .any(|n| n.name.as_deref() == Some(name));
        ensure!(in_cluster, "Network {name} is not attached to cluster {}", ctx.topology.cluster);
        Ok(())
    }

    async fn vnic_profile_on_vm_nic(&mut self, ctx: &SuiteContext) -> Result<()> {
        let network = self.network()?.to_string();
        let profile_name = format!("{network}_profile");
        let profile = networks::add_vnic_profile(
            &ctx.engine,
            &profile_name,
            &network,
            &ctx.topology.datacenter,
            false,
        )
        .await?;
        self.profile = Some(profile_name.clone());

        let profile_id = profile
            .id
            .ok_or_else(|| ArtError::Network(format!("vNIC profile {profile_name} has no id")))?;
        let vm = unique_name("art_net_vm");
        let spec = VmSpec {
            vnic_profile: Some(Ref::id(&profile_id)),
            ..VmSpec::new(&vm, &ctx.topology.cluster)
        };
        vm_scenarios::create_vm(&ctx.engine, &spec).await?;
        self.vm = Some(vm.clone());

        let nics = vms::get_vm_nics(&ctx.engine, &vm).await?;
        let on_profile = nics
            .iter()
            .any(|nic| nic.vnic_profile.as_ref().is_some_and(|p| p.matches(&profile_id)));
        ensure!(on_profile, "VM {vm} has no NIC on vNIC profile {profile_name}");
        Ok(())
    }

    async fn host_nic_attachment(&mut self, ctx: &SuiteContext) -> Result<()> {
        let network = self.network()?.to_string();
        let host = ctx
            .topology
            .hosts
            .iter()
            .find(|h| h.test_nic.is_some())
            .ok_or_else(|| ArtError::Config("No host has a test_nic configured".to_string()))?;
        let nic = host.test_nic.as_deref().unwrap_or_default();
        Self::ensure_management_untouched(ctx, &host.name, nic).await?;

        hosts::setup_networks(
            &ctx.engine,
            &host.name,
            &ctx.topology.datacenter,
            &[(network.as_str(), nic)],
            &[],
        )
        .await?;
        self.attached_host = Some(host.name.clone());

        net_scenarios::check_host_nic_network(
            &ctx.engine,
            &host.name,
            nic,
            &network,
            &ctx.topology.datacenter,
        )
        .await
    }

    /// Refuse a test NIC that carries the management network
    async fn ensure_management_untouched(ctx: &SuiteContext, host: &str, nic: &str) -> Result<()> {
        let management_name = &ctx.topology.management_network;
        let management =
            networks::get_network(&ctx.engine, management_name, &ctx.topology.datacenter).await?;
        let host_nic = hosts::get_host_nic(&ctx.engine, host, nic).await?;

        let carries_management = hosts::get_network_attachments(&ctx.engine, host)
            .await?
            .iter()
            .filter(|a| hosts::attaches(a, &management))
            .any(|a| {
                a.host_nic.as_ref().is_some_and(|n| {
                    n.matches(nic) || host_nic.id.as_deref().is_some_and(|id| n.matches(id))
                })
            });
        if carries_management {
            return Err(ArtError::Config(format!(
                "test_nic {nic} of host {host} carries management network {management_name}"
            )));
        }
        Ok(())
    }

    async fn detach_and_remove(&mut self, ctx: &SuiteContext) -> Result<()> {
        let network = self.network()?.to_string();
        self.remove_vm_and_profile(ctx).await?;

        let hosts: Vec<String> = self.attached_host.take().into_iter().collect();
        net_scenarios::remove_networks(
            &ctx.engine,
            &ctx.topology.datacenter,
            std::slice::from_ref(&network),
            &hosts,
        )
        .await?;

        let exists =
            networks::network_exists(&ctx.engine, &network, &ctx.topology.datacenter).await?;
        ensure!(!exists, "Network {network} still exists after removal");
        self.network = None;
        Ok(())
    }

    async fn remove_vm_and_profile(&mut self, ctx: &SuiteContext) -> Result<()> {
        if let Some(vm) = self.vm.take() {
            vm_scenarios::remove_vms(&ctx.engine, std::slice::from_ref(&vm)).await?;
        }
        if let (Some(profile), Some(network)) = (self.profile.take(), self.network.as_deref()) {
            networks::remove_vnic_profile(&ctx.engine, &profile, network, &ctx.topology.datacenter)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Suite for NetworksSuite {
    fn name(&self) -> &'static str {
        "networks"
    }

    /// Host network attachments arrived with engine 4.0
    fn min_engine_version(&self) -> Option<&'static str> {
        Some("4.0")
    }

    fn cases(&self) -> Vec<&'static str> {
        vec![
            "create_vm_network",
            "vnic_profile_on_vm_nic",
            "host_nic_attachment",
            "detach_and_remove",
        ]
    }

    /// Host attachment needs a host with a spare NIC
    async fn case_supported(&self, ctx: &SuiteContext, case: &str) -> Result<bool> {
        let has_test_nic = ctx.topology.hosts.iter().any(|h| h.test_nic.is_some());
        Ok(case != "host_nic_attachment" || has_test_nic)
    }

    async fn setup(&mut self, _ctx: &SuiteContext) -> Result<()> {
        // Engine network names are limited to 15 characters
        self.network = Some(unique_name("art_net"));
        Ok(())
    }

    async fn run_case(&mut self, ctx: &SuiteContext, case: &str) -> Result<()> {
        match case {
            "create_vm_network" => self.create_vm_network(ctx).await,
            "vnic_profile_on_vm_nic" => self.vnic_profile_on_vm_nic(ctx).await,
            "host_nic_attachment" => self.host_nic_attachment(ctx).await,
            "detach_and_remove" => self.detach_and_remove(ctx).await,
            other => Err(unknown_case(self.name(), other)),
        }
    }

    async fn teardown(&mut self, ctx: &SuiteContext) -> Result<()> {
        if let Err(e) = self.remove_vm_and_profile(ctx).await {
            warn!("Cleanup of networks suite VM failed: {}", e);
        }
        let Some(network) = self.network.take() else {
            return Ok(());
        };
        if !networks::network_exists(&ctx.engine, &network, &ctx.topology.datacenter).await? {
            return Ok(());
        }
        info!("Removing leftover network {}", network);
        let hosts: Vec<String> = self.attached_host.take().into_iter().collect();
        net_scenarios::remove_networks(
            &ctx.engine,
            &ctx.topology.datacenter,
            std::slice::from_ref(&network),
            &hosts,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use art_api::{Engine, RestClient};
    use art_shared::{AuthMode, EngineConnection, HostConfig, TopologyConfig};

    fn context(hosts: Vec<HostConfig>) -> SuiteContext {
        let connection = EngineConnection {
            name: "lab".to_string(),
            url: "https://engine.example.com/ovirt-engine/api".to_string(),
            username: "admin@internal".to_string(),
            password: None,
            auth: AuthMode::Basic,
            verify_tls: true,
        };
        let client = RestClient::with_password(&connection, "secret".to_string()).unwrap();
        let topology = TopologyConfig {
            hosts,
            ..Default::default()
        };
        SuiteContext::new(Engine::new(client, Default::default(), 1), topology)
    }

    fn host(name: &str, test_nic: Option<&str>) -> HostConfig {
        HostConfig {
            name: name.to_string(),
            address: format!("{name}.example.com"),
            root_password: None,
            test_nic: test_nic.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_host_attachment_skipped_without_test_nic() {
        let suite = NetworksSuite::default();
        let ctx = context(vec![host("host_1", None), host("host_2", None)]);

        assert!(!suite.case_supported(&ctx, "host_nic_attachment").await.unwrap());
        assert!(suite.case_supported(&ctx, "create_vm_network").await.unwrap());
    }

    #[tokio::test]
    async fn test_host_attachment_supported_with_test_nic() {
        let suite = NetworksSuite::default();
        let ctx = context(vec![host("host_1", None), host("host_2", Some("eth1"))]);

        assert!(suite.case_supported(&ctx, "host_nic_attachment").await.unwrap());
    }
}
