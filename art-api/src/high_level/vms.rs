//! VM scenarios

use crate::low_level::{hosts, vms};
use crate::parallel::map_parallel;
use crate::Engine;
use art_shared::{
    ensure, CpuTopology, Cpu, Disk, DiskAttachment, DiskFormat, DiskInterface, MemoryPolicy,
    Nic, NicInterface, Ref, Result, StorageDomains, Vm, VmStatus,
};
use tracing::info;

pub const GB: u64 = 1024 * 1024 * 1024;

/// What [`create_vm`] builds
#[derive(Debug, Clone)]
pub struct VmSpec {
    pub name: String,
    pub cluster: String,
    pub template: String,
    /// Memory in bytes
    pub memory: u64,
    pub topology: CpuTopology,
    /// Disk size in bytes; no disk when `None`
    pub disk_size: Option<u64>,
    pub storage_domain: Option<String>,
    /// vNIC profile of the VM's NIC; no NIC when `None`
    pub vnic_profile: Option<Ref>,
}

impl VmSpec {
    pub fn new(name: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster: cluster.into(),
            template: "Blank".to_string(),
            memory: GB,
            topology: CpuTopology {
                sockets: 1,
                cores: 1,
                threads: 1,
            },
            disk_size: None,
            storage_domain: None,
            vnic_profile: None,
        }
    }
}

/// Create a VM with an optional disk and NIC; returns once the VM is down and its disks are ok
pub async fn create_vm(engine: &Engine, spec: &VmSpec) -> Result<Vm> {
    info!("Creating VM {} in cluster {}", spec.name, spec.cluster);
    let vm = Vm {
        name: Some(spec.name.clone()),
        cluster: Some(Ref::name(&spec.cluster)),
        template: Some(Ref::name(&spec.template)),
        memory: Some(spec.memory),
        memory_policy: Some(MemoryPolicy {
            guaranteed: Some(spec.memory),
            max: None,
        }),
        cpu: Some(Cpu {
            topology: Some(spec.topology.clone()),
        }),
        ..Default::default()
    };
    vms::add_vm(engine, &vm).await?;
    vms::wait_for_vm_status(engine, &spec.name, VmStatus::Down).await?;

    if let Some(size) = spec.disk_size {
        let attachment = DiskAttachment {
            disk: Some(Disk {
                name: Some(format!("{}_disk", spec.name)),
                provisioned_size: Some(size),
                format: Some(DiskFormat::Cow),
                sparse: Some(true),
                storage_domains: spec.storage_domain.as_ref().map(|sd| StorageDomains {
                    storage_domain: vec![Ref::name(sd)],
                }),
                ..Default::default()
            }),
            interface: Some(DiskInterface::Virtio),
            bootable: Some(true),
            active: Some(true),
            ..Default::default()
        };
        vms::add_disk(engine, &spec.name, &attachment, true).await?;
    }

    if let Some(profile) = &spec.vnic_profile {
        let nic = Nic {
            name: Some("nic1".to_string()),
            interface: Some(NicInterface::Virtio),
            vnic_profile: Some(profile.clone()),
            ..Default::default()
        };
        vms::add_nic(engine, &spec.name, &nic).await?;
    }

    vms::get_vm(engine, &spec.name).await
}

/// Start VMs concurrently and wait for each to reach `status`
pub async fn start_vms(engine: &Engine, names: &[String], status: VmStatus) -> Result<()> {
    info!("Starting VMs {:?}", names);
    map_parallel(engine.max_workers(), names.iter().cloned(), |name| {
        let engine = engine.clone();
        async move { vms::start_vm(&engine, &name, Some(status)).await }
    })
    .await?;
    Ok(())
}

/// Power off VMs concurrently and wait for them to be down
pub async fn stop_vms(engine: &Engine, names: &[String]) -> Result<()> {
    info!("Stopping VMs {:?}", names);
    map_parallel(engine.max_workers(), names.iter().cloned(), |name| {
        let engine = engine.clone();
        async move {
            if vms::get_vm_status(&engine, &name).await? == VmStatus::Down {
                return Ok(());
            }
            vms::stop_vm(&engine, &name, true).await
        }
    })
    .await?;
    Ok(())
}

/// Stop and remove VMs concurrently, waiting until they are gone
pub async fn remove_vms(engine: &Engine, names: &[String]) -> Result<()> {
    info!("Removing VMs {:?}", names);
    map_parallel(engine.max_workers(), names.iter().cloned(), |name| {
        let engine = engine.clone();
        async move {
            if vms::get_vm_status(&engine, &name).await? != VmStatus::Down {
                vms::stop_vm(&engine, &name, true).await?;
            }
            vms::remove_vm(&engine, &name, true).await
        }
    })
    .await?;
    Ok(())
}

/// Migrate a VM and check it landed on another host and is up; returns the new host
pub async fn migrate_vm_and_verify(engine: &Engine, vm: &str, host: Option<&str>) -> Result<String> {
    let before = vms::get_vm_host(engine, vm).await?;
    let target = match host {
        Some(host) => host.to_string(),
        None => hosts::select_host_for_migration(engine, vm).await?,
    };
    info!("Migrating VM {} from {:?} to {}", vm, before, target);

    vms::migrate_vm(engine, vm, Some(&target), true).await?;

    let after = vms::get_vm_host(engine, vm).await?;
    ensure!(
        after.as_deref() == Some(target.as_str()),
        "VM {vm} runs on {after:?} after migration, expected {target}"
    );
    ensure!(after != before, "VM {vm} is still on {before:?} after migration");

    let status = vms::get_vm_status(engine, vm).await?;
    ensure!(status == VmStatus::Up, "VM {vm} is {status} after migration");
    Ok(target)
}

/// Assert the VM's configured memory, in bytes
pub async fn check_vm_memory(engine: &Engine, vm: &str, expected: u64) -> Result<()> {
    let actual = vms::get_vm(engine, vm).await?.memory;
    ensure!(
        actual == Some(expected),
        "VM {vm} has memory {actual:?}, expected {expected}"
    );
    Ok(())
}

/// Assert the VM's CPU topology
pub async fn check_vm_cpus(engine: &Engine, vm: &str, expected: &CpuTopology) -> Result<()> {
    let actual = vms::get_vm(engine, vm).await?.cpu_topology().cloned();
    ensure!(
        actual.as_ref() == Some(expected),
        "VM {vm} has CPU topology {actual:?}, expected {expected:?}"
    );
    Ok(())
}
