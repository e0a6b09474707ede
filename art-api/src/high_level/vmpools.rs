//! VM pool scenarios

use crate::entity;
use crate::high_level::vms as vm_scenarios;
use crate::low_level::{snapshots, vmpools, vms};
use crate::parallel::map_parallel;
use crate::Engine;
use art_shared::{ensure, Ref, Result, Snapshot, SnapshotType, Vm, VmPool, VmPoolType, VmStatus};
use tracing::info;

/// Create a pool and wait until all of its VMs exist and are down; returns their names
pub async fn create_vm_pool(
    engine: &Engine,
    name: &str,
    cluster: &str,
    template: &str,
    size: u32,
) -> Result<Vec<String>> {
    info!("Creating VM pool {} of size {}", name, size);
    let pool = VmPool {
        name: Some(name.to_string()),
        cluster: Some(Ref::name(cluster)),
        template: Some(Ref::name(template)),
        size: Some(size),
        pool_type: Some(VmPoolType::Automatic),
        ..Default::default()
    };
    vmpools::add_vm_pool(engine, &pool).await?;
    vmpools::wait_for_vm_pool_size(engine, name, size as usize).await?;

    let names = vmpools::get_vm_pool_vm_names(engine, name).await?;
    map_parallel(engine.max_workers(), names.clone(), |vm| {
        let engine = engine.clone();
        async move { vms::wait_for_vm_status(&engine, &vm, VmStatus::Down).await }
    })
    .await?;
    Ok(names)
}

/// Start every VM of a pool; returns their names
pub async fn start_vm_pool_vms(engine: &Engine, pool: &str) -> Result<Vec<String>> {
    let names = vmpools::get_vm_pool_vm_names(engine, pool).await?;
    vm_scenarios::start_vms(engine, &names, VmStatus::Up).await?;
    Ok(names)
}

pub async fn stop_vm_pool_vms(engine: &Engine, pool: &str) -> Result<()> {
    let names = vmpools::get_vm_pool_vm_names(engine, pool).await?;
    vm_scenarios::stop_vms(engine, &names).await
}

/// Stop the pool's VMs, remove the pool and wait until its VMs are gone
pub async fn detach_and_remove_vm_pool(engine: &Engine, pool: &str) -> Result<()> {
    info!("Removing VM pool {} and its VMs", pool);
    let names = vmpools::get_vm_pool_vm_names(engine, pool).await?;
    vm_scenarios::stop_vms(engine, &names).await?;
    vmpools::remove_vm_pool(engine, pool).await?;

    let names = &names;
    engine
        .sampler(
            engine.timeouts().vm_pool(),
            format!("VMs of pool {pool} to be removed"),
        )
        .wait_for(
            || async move {
                let remaining: Vec<String> = entity::list_all::<Vm>(engine.client())
                    .await?
                    .into_iter()
                    .filter_map(|vm| vm.name)
                    .filter(|vm| names.contains(vm))
                    .collect();
                Ok(remaining)
            },
            |remaining: &Vec<String>| remaining.is_empty(),
        )
        .await?;
    Ok(())
}

/// A running pool VM carries a stateless snapshot, which is dropped once it stops
pub async fn check_stateless_snapshot(engine: &Engine, vm: &str) -> Result<()> {
    let has_stateless = |list: &[Snapshot]| {
        list.iter()
            .any(|s| s.snapshot_type == Some(SnapshotType::Stateless))
    };

    let status = vms::get_vm_status(engine, vm).await?;
    ensure!(status == VmStatus::Up, "Pool VM {vm} is {status}, expected up");
    let running = snapshots::get_snapshots(engine, vm).await?;
    ensure!(
        has_stateless(running.as_slice()),
        "Running pool VM {vm} has no stateless snapshot"
    );

    vms::stop_vm(engine, vm, true).await?;
    let dropped = engine
        .sampler(
            engine.timeouts().snapshot(),
            format!("stateless snapshot of VM {vm} to be dropped"),
        )
        .wait_for_func_status(
            || async move { snapshots::get_snapshots(engine, vm).await },
            |list: &Vec<Snapshot>| !has_stateless(list.as_slice()),
        )
        .await?;
    ensure!(dropped, "Stateless snapshot of VM {vm} still exists after stop");
    Ok(())
}
