//! Live migration between hosts of the cluster

use super::{not_set_up, unknown_case, Suite, SuiteContext};
use art_api::high_level::unique_name;
use art_api::high_level::vms::{self as vm_scenarios, VmSpec};
use art_api::low_level::{hosts, vms};
use art_shared::{ensure, ArtError, Result, VmStatus};
use async_trait::async_trait;
use tracing::info;

#[derive(Default)]
pub struct MigrationSuite {
    vm: Option<String>,
    source_host: Option<String>,
}

impl MigrationSuite {
    fn vm(&self) -> Result<&str> {
        self.vm
            .as_deref()
            .ok_or_else(|| not_set_up(self.name(), "VM"))
    }

    async fn migrate_to_selected_host(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        let target = hosts::select_host_for_migration(&ctx.engine, vm).await?;
        ensure!(
            self.source_host.as_deref() != Some(target.as_str()),
            "Selected migration target {target} is the VM's current host"
        );
        let landed = vm_scenarios::migrate_vm_and_verify(&ctx.engine, vm, Some(&target)).await?;
        info!("VM {} migrated to {}", vm, landed);
        Ok(())
    }

    async fn migrate_back(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        let source = self
            .source_host
            .as_deref()
            .ok_or_else(|| not_set_up(self.name(), "source host"))?;
        vm_scenarios::migrate_vm_and_verify(&ctx.engine, vm, Some(source)).await?;
        Ok(())
    }
}

#[async_trait]
impl Suite for MigrationSuite {
    fn name(&self) -> &'static str {
        "migration"
    }

    fn cases(&self) -> Vec<&'static str> {
        vec!["migrate_to_selected_host", "migrate_back"]
    }

    async fn setup(&mut self, ctx: &SuiteContext) -> Result<()> {
        if ctx.topology.hosts.len() < 2 {
            return Err(ArtError::Config(
                "Migration needs at least two hosts in the topology".to_string(),
            ));
        }
        let name = unique_name("art_mig_vm");
        let spec = VmSpec {
            template: ctx.topology.template.clone(),
            ..VmSpec::new(&name, &ctx.topology.cluster)
        };
        vm_scenarios::create_vm(&ctx.engine, &spec).await?;
        self.vm = Some(name.clone());

        vm_scenarios::start_vms(&ctx.engine, std::slice::from_ref(&name), VmStatus::Up).await?;
        self.source_host = vms::get_vm_host(&ctx.engine, &name).await?;
        if self.source_host.is_none() {
            return Err(ArtError::Vm(format!("VM {name} is up but reports no host")));
        }
        Ok(())
    }

    async fn run_case(&mut self, ctx: &SuiteContext, case: &str) -> Result<()> {
        match case {
            "migrate_to_selected_host" => self.migrate_to_selected_host(ctx).await,
            "migrate_back" => self.migrate_back(ctx).await,
            other => Err(unknown_case(self.name(), other)),
        }
    }

    async fn teardown(&mut self, ctx: &SuiteContext) -> Result<()> {
        self.source_host = None;
        match self.vm.take() {
            Some(vm) => vm_scenarios::remove_vms(&ctx.engine, std::slice::from_ref(&vm)).await,
            None => Ok(()),
        }
    }
}
