//! VM pool operations

use crate::entity::{self, Entity, ResultExt};
use crate::Engine;
use art_shared::{Action, EntityKind, Result, Vm, VmPool};
use tracing::info;

pub async fn get_vm_pool(engine: &Engine, name: &str) -> Result<VmPool> {
    entity::find_by_name(engine.client(), name).await
}

pub async fn add_vm_pool(engine: &Engine, pool: &VmPool) -> Result<VmPool> {
    let name = pool.name.as_deref().unwrap_or_default();
    info!("Adding VM pool {} (size {:?})", name, pool.size);
    entity::create(engine.client(), VmPool::COLLECTION, pool)
        .await
        .or_entity_err(EntityKind::VmPool, || format!("Failed to add VM pool {name}"))
}

pub async fn update_vm_pool(engine: &Engine, name: &str, changes: &VmPool) -> Result<VmPool> {
    info!("Updating VM pool {}", name);
    let pool = get_vm_pool(engine, name).await?;
    let path = entity::element_path(VmPool::COLLECTION, pool.require_id()?);

    entity::update(engine.client(), &path, changes)
        .await
        .or_entity_err(EntityKind::VmPool, || format!("Failed to update VM pool {name}"))
}

/// Remove a pool; the engine removes its VMs with it
pub async fn remove_vm_pool(engine: &Engine, name: &str) -> Result<()> {
    info!("Removing VM pool {}", name);
    let pool = get_vm_pool(engine, name).await?;
    let path = entity::element_path(VmPool::COLLECTION, pool.require_id()?);

    entity::remove(engine.client(), &path, &[])
        .await
        .or_entity_err(EntityKind::VmPool, || format!("Failed to remove VM pool {name}"))
}

/// VMs belonging to a pool
pub async fn get_vm_pool_vms(engine: &Engine, name: &str) -> Result<Vec<Vm>> {
    let pool = get_vm_pool(engine, name).await?;
    let pool_id = pool.require_id()?;
    let vms = entity::search::<Vm>(engine.client(), &format!("pool={name}")).await?;

    Ok(vms
        .into_iter()
        .filter(|vm| {
            vm.vm_pool
                .as_ref()
                .is_some_and(|p| p.matches(pool_id) || p.matches(name))
        })
        .collect())
}

pub async fn get_vm_pool_vm_names(engine: &Engine, name: &str) -> Result<Vec<String>> {
    Ok(get_vm_pool_vms(engine, name)
        .await?
        .into_iter()
        .filter_map(|vm| vm.name)
        .collect())
}

/// Take a VM from the pool for the current user
pub async fn allocate_vm_from_pool(engine: &Engine, name: &str) -> Result<()> {
    info!("Allocating a VM from pool {}", name);
    let pool = get_vm_pool(engine, name).await?;
    entity::perform_action::<VmPool>(engine.client(), pool.require_id()?, "allocatevm", &Action::sync())
        .await
        .or_entity_err(EntityKind::VmPool, || {
            format!("Failed to allocate a VM from pool {name}")
        })?;
    Ok(())
}

/// Wait until the pool holds exactly `size` VMs
pub async fn wait_for_vm_pool_size(engine: &Engine, name: &str, size: usize) -> Result<()> {
    info!("Waiting for VM pool {} to hold {} VMs", name, size);
    engine
        .sampler(
            engine.timeouts().vm_pool(),
            format!("VM pool {name} to hold {size} VMs"),
        )
        .wait_for_value(
            || async move { Ok(get_vm_pool_vms(engine, name).await?.len()) },
            size,
        )
        .await?;
    Ok(())
}
