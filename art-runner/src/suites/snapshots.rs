//! Snapshot create, preview, commit, undo and restore on a VM with a disk

use super::{not_set_up, unknown_case, Suite, SuiteContext};
use art_api::high_level::snapshots as snapshot_scenarios;
use art_api::high_level::unique_name;
use art_api::high_level::vms::{self as vm_scenarios, VmSpec, GB};
use art_api::low_level::{snapshots, vms};
use art_shared::{ensure, Result, SnapshotStatus, VmStatus};
use async_trait::async_trait;

const FIRST: &str = "art_first_snapshot";
const SECOND: &str = "art_second_snapshot";

#[derive(Default)]
pub struct SnapshotsSuite {
    vm: Option<String>,
}

impl SnapshotsSuite {
    fn vm(&self) -> Result<&str> {
        self.vm
            .as_deref()
            .ok_or_else(|| not_set_up(self.name(), "VM"))
    }

    async fn check_no_preview(ctx: &SuiteContext, vm: &str) -> Result<()> {
        let in_preview: Vec<String> = snapshots::get_snapshots(&ctx.engine, vm)
            .await?
            .into_iter()
            .filter(|s| s.snapshot_status == Some(SnapshotStatus::InPreview))
            .filter_map(|s| s.description)
            .collect();
        ensure!(
            in_preview.is_empty(),
            "VM {vm} still previews snapshots {in_preview:?}"
        );
        Ok(())
    }

    async fn create_snapshot(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        snapshot_scenarios::create_snapshot(&ctx.engine, vm, FIRST).await?;

        let descriptions: Vec<String> = snapshots::get_snapshots(&ctx.engine, vm)
            .await?
            .into_iter()
            .filter_map(|s| s.description)
            .collect();
        ensure!(
            descriptions.iter().any(|d| d == FIRST),
            "Snapshot '{FIRST}' missing from VM {vm}: {descriptions:?}"
        );
        Ok(())
    }

    async fn preview_and_undo(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        snapshot_scenarios::preview_and_undo(&ctx.engine, vm, FIRST).await?;
        Self::check_no_preview(ctx, vm).await
    }

    async fn preview_and_commit(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        snapshot_scenarios::preview_and_commit(&ctx.engine, vm, FIRST).await?;
        Self::check_no_preview(ctx, vm).await?;

        let status = snapshots::get_snapshot(&ctx.engine, vm, FIRST)
            .await?
            .snapshot_status;
        ensure!(
            status == Some(SnapshotStatus::Ok),
            "Snapshot '{FIRST}' is {status:?} after commit"
        );
        Ok(())
    }

    async fn restore_snapshot(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        snapshot_scenarios::create_snapshot(&ctx.engine, vm, SECOND).await?;
        snapshot_scenarios::restore_to_snapshot(&ctx.engine, vm, SECOND).await?;

        let status = vms::get_vm_status(&ctx.engine, vm).await?;
        ensure!(status == VmStatus::Down, "VM {vm} is {status} after restore");
        Self::check_no_preview(ctx, vm).await
    }
}

#[async_trait]
impl Suite for SnapshotsSuite {
    fn name(&self) -> &'static str {
        "snapshots"
    }

    fn cases(&self) -> Vec<&'static str> {
        vec![
            "create_snapshot",
            "preview_and_undo",
            "preview_and_commit",
            "restore_snapshot",
        ]
    }

    async fn setup(&mut self, ctx: &SuiteContext) -> Result<()> {
        let name = unique_name("art_snap_vm");
        let spec = VmSpec {
            template: ctx.topology.template.clone(),
            disk_size: Some(GB),
            storage_domain: ctx.storage_domain().map(str::to_string),
            ..VmSpec::new(&name, &ctx.topology.cluster)
        };
        vm_scenarios::create_vm(&ctx.engine, &spec).await?;
        self.vm = Some(name);
        Ok(())
    }

    async fn run_case(&mut self, ctx: &SuiteContext, case: &str) -> Result<()> {
        match case {
            "create_snapshot" => self.create_snapshot(ctx).await,
            "preview_and_undo" => self.preview_and_undo(ctx).await,
            "preview_and_commit" => self.preview_and_commit(ctx).await,
            "restore_snapshot" => self.restore_snapshot(ctx).await,
            other => Err(unknown_case(self.name(), other)),
        }
    }

    async fn teardown(&mut self, ctx: &SuiteContext) -> Result<()> {
        match self.vm.take() {
            Some(vm) => vm_scenarios::remove_vms(&ctx.engine, std::slice::from_ref(&vm)).await,
            None => Ok(()),
        }
    }
}
