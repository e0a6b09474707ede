//! VM snapshot operations
//!
//! Snapshots are named by their description. Preview, commit and undo are
//! actions on the VM, restore is an action on the snapshot itself.

use crate::entity::{self, Entity, ResultExt};
use crate::low_level::vms;
use crate::Engine;
use art_shared::{Action, EntityKind, Ref, Result, Snapshot, SnapshotStatus, Vm};
use tracing::info;

async fn snapshots_path(engine: &Engine, vm: &str) -> Result<(String, String)> {
    let vm_entity = vms::get_vm(engine, vm).await?;
    let vm_path = entity::element_path(Vm::COLLECTION, vm_entity.require_id()?);
    let collection = entity::sub_collection::<Snapshot>(&vm_path);
    Ok((vm_path, collection))
}

pub async fn get_snapshots(engine: &Engine, vm: &str) -> Result<Vec<Snapshot>> {
    let (_, collection) = snapshots_path(engine, vm).await?;
    entity::list_in(engine.client(), &collection, None).await
}

pub async fn get_snapshot(engine: &Engine, vm: &str, description: &str) -> Result<Snapshot> {
    let (_, collection) = snapshots_path(engine, vm).await?;
    entity::find_in(engine.client(), &collection, description).await
}

pub async fn add_snapshot(
    engine: &Engine,
    vm: &str,
    description: &str,
    persist_memory: bool,
    wait: bool,
) -> Result<Snapshot> {
    info!("Adding snapshot '{}' to VM {}", description, vm);
    let (_, collection) = snapshots_path(engine, vm).await?;
    let snapshot = Snapshot {
        description: Some(description.to_string()),
        persist_memorystate: Some(persist_memory),
        ..Default::default()
    };

    let created = entity::create(engine.client(), &collection, &snapshot)
        .await
        .or_entity_err(EntityKind::Snapshot, || {
            format!("Failed to add snapshot '{description}' to VM {vm}")
        })?;

    if wait {
        wait_for_snapshot_status(engine, vm, description, SnapshotStatus::Ok).await?;
    }
    Ok(created)
}

pub async fn wait_for_snapshot_status(
    engine: &Engine,
    vm: &str,
    description: &str,
    status: SnapshotStatus,
) -> Result<()> {
    info!(
        "Waiting for snapshot '{}' of VM {} to be {}",
        description, vm, status
    );
    engine
        .sampler(
            engine.timeouts().snapshot(),
            format!("snapshot '{description}' of VM {vm} to be {status}"),
        )
        .wait_for_value(
            || async move {
                Ok(get_snapshot(engine, vm, description)
                    .await?
                    .snapshot_status
                    .unwrap_or(SnapshotStatus::Unknown))
            },
            status,
        )
        .await?;
    Ok(())
}

async fn vm_snapshot_action(
    engine: &Engine,
    vm: &str,
    action_name: &str,
    action: &Action,
) -> Result<()> {
    let (vm_path, _) = snapshots_path(engine, vm).await?;
    entity::perform_action_at(
        engine.client(),
        EntityKind::Snapshot,
        &vm_path,
        action_name,
        action,
    )
    .await
    .or_entity_err(EntityKind::Snapshot, || {
        format!("Failed to {action_name} on VM {vm}")
    })?;
    Ok(())
}

/// Boot the VM into a snapshot without discarding the active layer
pub async fn preview_snapshot(
    engine: &Engine,
    vm: &str,
    description: &str,
    restore_memory: bool,
) -> Result<()> {
    info!("Previewing snapshot '{}' of VM {}", description, vm);
    let snapshot = get_snapshot(engine, vm, description).await?;
    let action = Action {
        restore_memory: Some(restore_memory),
        ..Action::sync().with_snapshot(Ref::id(snapshot.require_id()?))
    };
    vm_snapshot_action(engine, vm, "previewsnapshot", &action).await?;
    wait_for_snapshot_status(engine, vm, description, SnapshotStatus::InPreview).await
}

/// Keep the previewed snapshot as the VM's state
pub async fn commit_snapshot(engine: &Engine, vm: &str, description: &str) -> Result<()> {
    info!("Committing snapshot '{}' of VM {}", description, vm);
    vm_snapshot_action(engine, vm, "commitsnapshot", &Action::sync()).await?;
    wait_for_snapshot_status(engine, vm, description, SnapshotStatus::Ok).await
}

/// Drop the preview and go back to the state before it
pub async fn undo_snapshot_preview(engine: &Engine, vm: &str, description: &str) -> Result<()> {
    info!("Undoing preview of snapshot '{}' of VM {}", description, vm);
    vm_snapshot_action(engine, vm, "undosnapshot", &Action::sync()).await?;
    wait_for_snapshot_status(engine, vm, description, SnapshotStatus::Ok).await
}

/// Restore a VM to a snapshot; the VM must be down
pub async fn restore_snapshot(
    engine: &Engine,
    vm: &str,
    description: &str,
    restore_memory: bool,
) -> Result<()> {
    info!("Restoring VM {} to snapshot '{}'", vm, description);
    let (_, collection) = snapshots_path(engine, vm).await?;
    let snapshot: Snapshot = entity::find_in(engine.client(), &collection, description).await?;
    let action = Action {
        restore_memory: Some(restore_memory),
        ..Action::sync()
    };

    entity::perform_action_at(
        engine.client(),
        EntityKind::Snapshot,
        &entity::element_path(&collection, snapshot.require_id()?),
        "restore",
        &action,
    )
    .await
    .or_entity_err(EntityKind::Snapshot, || {
        format!("Failed to restore VM {vm} to snapshot '{description}'")
    })?;

    wait_for_snapshot_status(engine, vm, description, SnapshotStatus::Ok).await
}

pub async fn remove_snapshot(engine: &Engine, vm: &str, description: &str, wait: bool) -> Result<()> {
    info!("Removing snapshot '{}' of VM {}", description, vm);
    let (_, collection) = snapshots_path(engine, vm).await?;
    let snapshot: Snapshot = entity::find_in(engine.client(), &collection, description).await?;

    entity::remove(
        engine.client(),
        &entity::element_path(&collection, snapshot.require_id()?),
        &[],
    )
    .await
    .or_entity_err(EntityKind::Snapshot, || {
        format!("Failed to remove snapshot '{description}' of VM {vm}")
    })?;

    if wait {
        let sampler = engine.sampler(
            engine.timeouts().snapshot(),
            format!("snapshot '{description}' of VM {vm} to be removed"),
        );
        entity::wait_for_removal::<Snapshot>(engine.client(), &collection, description, &sampler)
            .await?;
    }
    Ok(())
}
