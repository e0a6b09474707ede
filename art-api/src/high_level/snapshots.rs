//! Snapshot scenarios

use crate::low_level::{snapshots, vms};
use crate::Engine;
use art_shared::{ensure, Result, Snapshot, SnapshotStatus, VmStatus};
use tracing::info;

/// Take a snapshot and wait until it is ok
pub async fn create_snapshot(engine: &Engine, vm: &str, description: &str) -> Result<Snapshot> {
    snapshots::add_snapshot(engine, vm, description, false, true).await?;
    let snapshot = snapshots::get_snapshot(engine, vm, description).await?;
    ensure!(
        snapshot.snapshot_status == Some(SnapshotStatus::Ok),
        "Snapshot '{description}' of VM {vm} is {:?} after creation",
        snapshot.snapshot_status
    );
    Ok(snapshot)
}

async fn ensure_down(engine: &Engine, vm: &str) -> Result<()> {
    if vms::get_vm_status(engine, vm).await? != VmStatus::Down {
        vms::stop_vm(engine, vm, true).await?;
    }
    Ok(())
}

/// Preview a snapshot and commit it as the VM's new state
pub async fn preview_and_commit(engine: &Engine, vm: &str, description: &str) -> Result<()> {
    info!("Preview and commit of snapshot '{}' on VM {}", description, vm);
    ensure_down(engine, vm).await?;
    snapshots::preview_snapshot(engine, vm, description, false).await?;
    snapshots::commit_snapshot(engine, vm, description).await
}

/// Preview a snapshot, then undo the preview
pub async fn preview_and_undo(engine: &Engine, vm: &str, description: &str) -> Result<()> {
    info!("Preview and undo of snapshot '{}' on VM {}", description, vm);
    ensure_down(engine, vm).await?;
    snapshots::preview_snapshot(engine, vm, description, false).await?;
    snapshots::undo_snapshot_preview(engine, vm, description).await
}

/// Restore a VM to a snapshot; stops the VM first
pub async fn restore_to_snapshot(engine: &Engine, vm: &str, description: &str) -> Result<()> {
    info!("Restoring VM {} to snapshot '{}'", vm, description);
    ensure_down(engine, vm).await?;
    snapshots::restore_snapshot(engine, vm, description, false).await?;
    vms::wait_for_vm_status(engine, vm, VmStatus::Down).await
}
