//! VM operations: lifecycle, migration, disks and NICs

use crate::entity::{self, Entity, ResultExt};
use crate::low_level::hosts;
use crate::Engine;
use art_shared::{
    Action, ArtError, Cpu, CpuTopology, Disk, DiskAttachment, DiskStatus, EntityKind,
    MemoryPolicy, Nic, Ref, Result, Vm, VmStatus,
};
use tracing::info;

pub async fn get_vm(engine: &Engine, name: &str) -> Result<Vm> {
    entity::find_by_name(engine.client(), name).await
}

pub async fn get_vm_status(engine: &Engine, name: &str) -> Result<VmStatus> {
    Ok(get_vm(engine, name).await?.status.unwrap_or(VmStatus::Unknown))
}

/// Name of the host running the VM, `None` when it is not running anywhere
pub async fn get_vm_host(engine: &Engine, name: &str) -> Result<Option<String>> {
    let vm = get_vm(engine, name).await?;
    host_of(engine, &vm).await
}

async fn host_of(engine: &Engine, vm: &Vm) -> Result<Option<String>> {
    match &vm.host {
        Some(Ref { name: Some(host), .. }) => Ok(Some(host.clone())),
        Some(Ref { id: Some(id), .. }) => Ok(hosts::get_host_by_id(engine, id).await?.name),
        _ => Ok(None),
    }
}

/// Status and host of a VM from a single lookup
async fn get_vm_placement(engine: &Engine, name: &str) -> Result<(VmStatus, Option<String>)> {
    let vm = get_vm(engine, name).await?;
    let host = host_of(engine, &vm).await?;
    Ok((vm.status.unwrap_or(VmStatus::Unknown), host))
}

fn vm_path(vm: &Vm) -> Result<String> {
    Ok(entity::element_path(Vm::COLLECTION, vm.require_id()?))
}

pub async fn add_vm(engine: &Engine, vm: &Vm) -> Result<Vm> {
    let name = vm.name.as_deref().unwrap_or_default();
    info!("Adding VM {}", name);
    entity::create(engine.client(), Vm::COLLECTION, vm)
        .await
        .or_entity_err(EntityKind::Vm, || format!("Failed to add VM {name}"))
}

pub async fn update_vm(engine: &Engine, name: &str, changes: &Vm) -> Result<Vm> {
    info!("Updating VM {}", name);
    let vm = get_vm(engine, name).await?;
    entity::update(engine.client(), &vm_path(&vm)?, changes)
        .await
        .or_entity_err(EntityKind::Vm, || format!("Failed to update VM {name}"))
}

pub async fn remove_vm(engine: &Engine, name: &str, wait: bool) -> Result<()> {
    info!("Removing VM {}", name);
    let vm = get_vm(engine, name).await?;
    entity::remove(engine.client(), &vm_path(&vm)?, &[])
        .await
        .or_entity_err(EntityKind::Vm, || format!("Failed to remove VM {name}"))?;

    if wait {
        let sampler = engine.sampler(
            engine.timeouts().vm_state(),
            format!("VM {name} to be removed"),
        );
        entity::wait_for_removal::<Vm>(engine.client(), Vm::COLLECTION, name, &sampler).await?;
    }
    Ok(())
}

async fn vm_action(engine: &Engine, name: &str, action_name: &str, action: &Action) -> Result<()> {
    let vm = get_vm(engine, name).await?;
    entity::perform_action::<Vm>(engine.client(), vm.require_id()?, action_name, action)
        .await
        .or_entity_err(EntityKind::Vm, || {
            format!("Failed to {action_name} VM {name}")
        })?;
    Ok(())
}

/// Start a VM; with `wait_for` set, block until it reaches that status
pub async fn start_vm(engine: &Engine, name: &str, wait_for: Option<VmStatus>) -> Result<()> {
    info!("Starting VM {}", name);
    vm_action(engine, name, "start", &Action::sync()).await?;
    if let Some(status) = wait_for {
        wait_for_vm_status(engine, name, status).await?;
    }
    Ok(())
}

/// Power off a VM
pub async fn stop_vm(engine: &Engine, name: &str, wait: bool) -> Result<()> {
    info!("Stopping VM {}", name);
    vm_action(engine, name, "stop", &Action::sync()).await?;
    if wait {
        wait_for_vm_status(engine, name, VmStatus::Down).await?;
    }
    Ok(())
}

/// Graceful guest shutdown
pub async fn shutdown_vm(engine: &Engine, name: &str, wait: bool) -> Result<()> {
    info!("Shutting down VM {}", name);
    vm_action(engine, name, "shutdown", &Action::sync()).await?;
    if wait {
        wait_for_vm_status(engine, name, VmStatus::Down).await?;
    }
    Ok(())
}

pub async fn suspend_vm(engine: &Engine, name: &str, wait: bool) -> Result<()> {
    info!("Suspending VM {}", name);
    vm_action(engine, name, "suspend", &Action::sync()).await?;
    if wait {
        wait_for_vm_status(engine, name, VmStatus::Suspended).await?;
    }
    Ok(())
}

/// Migrate a VM, to `host` or wherever the engine picks
///
/// With `wait` set, returns once the VM is up on the target host, or on any
/// other host than the source when the engine picks.
pub async fn migrate_vm(engine: &Engine, name: &str, host: Option<&str>, wait: bool) -> Result<()> {
    info!("Migrating VM {} to {}", name, host.unwrap_or("<engine choice>"));
    let source = match host {
        Some(_) => None,
        None => get_vm_host(engine, name).await?,
    };
    let mut action = Action::sync();
    if let Some(host) = host {
        action = action.on_host(Ref::name(host));
    }
    vm_action(engine, name, "migrate", &action).await?;

    if wait {
        let source = source.as_deref();
        engine
            .sampler(
                engine.timeouts().migration(),
                format!("VM {name} to finish migrating"),
            )
            .wait_for(
                || async move { get_vm_placement(engine, name).await },
                |(status, running_on): &(VmStatus, Option<String>)| {
                    let landed = match host {
                        Some(target) => running_on.as_deref() == Some(target),
                        None => running_on.is_some() && running_on.as_deref() != source,
                    };
                    *status == VmStatus::Up && landed
                },
            )
            .await?;
    }
    Ok(())
}

pub async fn wait_for_vm_status(engine: &Engine, name: &str, status: VmStatus) -> Result<()> {
    info!("Waiting for VM {} to be {}", name, status);
    engine
        .sampler(
            engine.timeouts().vm_state(),
            format!("VM {name} to be {status}"),
        )
        .wait_for_value(|| async move { get_vm_status(engine, name).await }, status)
        .await?;
    Ok(())
}

/// Hot-plug memory into a running VM (bytes)
pub async fn hotplug_memory(engine: &Engine, name: &str, memory: u64) -> Result<Vm> {
    info!("Setting memory of VM {} to {} bytes", name, memory);
    let changes = Vm {
        memory: Some(memory),
        memory_policy: Some(MemoryPolicy {
            guaranteed: Some(memory),
            max: None,
        }),
        ..Default::default()
    };
    update_vm(engine, name, &changes).await
}

/// Hot-plug CPUs into a running VM by changing the socket count
pub async fn hotplug_cpu(engine: &Engine, name: &str, sockets: u32) -> Result<Vm> {
    info!("Setting CPU sockets of VM {} to {}", name, sockets);
    let vm = get_vm(engine, name).await?;
    let current = vm.cpu_topology().cloned().unwrap_or(CpuTopology {
        sockets: 1,
        cores: 1,
        threads: 1,
    });
    let changes = Vm {
        cpu: Some(Cpu {
            topology: Some(CpuTopology { sockets, ..current }),
        }),
        ..Default::default()
    };
    update_vm(engine, name, &changes).await
}

/// Attach a new disk to a VM
pub async fn add_disk(
    engine: &Engine,
    vm: &str,
    attachment: &DiskAttachment,
    wait: bool,
) -> Result<DiskAttachment> {
    let disk_name = attachment.name().unwrap_or_default();
    info!("Adding disk {} to VM {}", disk_name, vm);
    let vm_entity = get_vm(engine, vm).await?;
    let collection = entity::sub_collection::<DiskAttachment>(&vm_path(&vm_entity)?);

    let created = entity::create(engine.client(), &collection, attachment)
        .await
        .or_entity_err(EntityKind::Disk, || {
            format!("Failed to add disk {disk_name} to VM {vm}")
        })?;

    if wait {
        wait_for_disks_status(engine, vm, DiskStatus::Ok).await?;
    }
    Ok(created)
}

/// Disks attached to a VM, with their current status
pub async fn get_vm_disks(engine: &Engine, vm: &str) -> Result<Vec<Disk>> {
    let vm_entity = get_vm(engine, vm).await?;
    let collection = entity::sub_collection::<DiskAttachment>(&vm_path(&vm_entity)?);
    let attachments: Vec<DiskAttachment> =
        entity::list_in(engine.client(), &collection, None).await?;

    let mut disks = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let disk_id = attachment
            .disk
            .as_ref()
            .and_then(|d| d.id.as_deref())
            .or(attachment.id.as_deref())
            .ok_or_else(|| ArtError::Disk(format!("Disk attachment of VM {vm} has no id")))?;
        disks.push(entity::get_by_id::<Disk>(engine.client(), disk_id).await?);
    }
    Ok(disks)
}

pub async fn wait_for_disks_status(engine: &Engine, vm: &str, status: DiskStatus) -> Result<()> {
    info!("Waiting for disks of VM {} to be {}", vm, status);
    engine
        .sampler(
            engine.timeouts().disk(),
            format!("disks of VM {vm} to be {status}"),
        )
        .wait_for(
            || async move {
                let disks = get_vm_disks(engine, vm).await?;
                Ok(disks.into_iter().map(|d| d.status).collect::<Vec<_>>())
            },
            |statuses: &Vec<Option<DiskStatus>>| statuses.iter().all(|s| *s == Some(status)),
        )
        .await?;
    Ok(())
}

pub async fn get_vm_nics(engine: &Engine, vm: &str) -> Result<Vec<Nic>> {
    let vm_entity = get_vm(engine, vm).await?;
    entity::list_in(
        engine.client(),
        &entity::sub_collection::<Nic>(&vm_path(&vm_entity)?),
        None,
    )
    .await
}

pub async fn get_vm_nic(engine: &Engine, vm: &str, nic: &str) -> Result<Nic> {
    let vm_entity = get_vm(engine, vm).await?;
    entity::find_in(
        engine.client(),
        &entity::sub_collection::<Nic>(&vm_path(&vm_entity)?),
        nic,
    )
    .await
}

pub async fn add_nic(engine: &Engine, vm: &str, nic: &Nic) -> Result<Nic> {
    let nic_name = nic.name.as_deref().unwrap_or_default();
    info!("Adding NIC {} to VM {}", nic_name, vm);
    let vm_entity = get_vm(engine, vm).await?;

    entity::create(
        engine.client(),
        &entity::sub_collection::<Nic>(&vm_path(&vm_entity)?),
        nic,
    )
    .await
    .or_entity_err(EntityKind::Nic, || {
        format!("Failed to add NIC {nic_name} to VM {vm}")
    })
}

pub async fn update_nic(engine: &Engine, vm: &str, nic: &str, changes: &Nic) -> Result<Nic> {
    info!("Updating NIC {} of VM {}", nic, vm);
    let vm_entity = get_vm(engine, vm).await?;
    let collection = entity::sub_collection::<Nic>(&vm_path(&vm_entity)?);
    let current: Nic = entity::find_in(engine.client(), &collection, nic).await?;

    entity::update(
        engine.client(),
        &entity::element_path(&collection, current.require_id()?),
        changes,
    )
    .await
    .or_entity_err(EntityKind::Nic, || {
        format!("Failed to update NIC {nic} of VM {vm}")
    })
}

pub async fn remove_nic(engine: &Engine, vm: &str, nic: &str) -> Result<()> {
    info!("Removing NIC {} from VM {}", nic, vm);
    let vm_entity = get_vm(engine, vm).await?;
    let collection = entity::sub_collection::<Nic>(&vm_path(&vm_entity)?);
    let current: Nic = entity::find_in(engine.client(), &collection, nic).await?;

    entity::remove(
        engine.client(),
        &entity::element_path(&collection, current.require_id()?),
        &[],
    )
    .await
    .or_entity_err(EntityKind::Nic, || {
        format!("Failed to remove NIC {nic} from VM {vm}")
    })
}
