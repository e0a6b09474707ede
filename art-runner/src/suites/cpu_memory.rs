//! VM CPU topology and memory, as configured and after hot-plug

use super::{not_set_up, unknown_case, Suite, SuiteContext};
use art_api::high_level::unique_name;
use art_api::high_level::vms::{self as vm_scenarios, VmSpec, GB};
use art_api::low_level::{clusters, vms};
use art_api::version::version_at_least;
use art_shared::{ensure, CpuTopology, Result, VmStatus};
use async_trait::async_trait;

/// Cluster level from which memory and CPU hot-plug are available
const HOTPLUG_MIN_CLUSTER_VERSION: &str = "4.0";

fn initial_topology() -> CpuTopology {
    CpuTopology {
        sockets: 1,
        cores: 2,
        threads: 1,
    }
}

#[derive(Default)]
pub struct CpuMemorySuite {
    vm: Option<String>,
}

impl CpuMemorySuite {
    fn vm(&self) -> Result<&str> {
        self.vm
            .as_deref()
            .ok_or_else(|| not_set_up(self.name(), "VM"))
    }

    async fn check_up(ctx: &SuiteContext, vm: &str) -> Result<()> {
        let status = vms::get_vm_status(&ctx.engine, vm).await?;
        ensure!(status == VmStatus::Up, "VM {vm} is {status}, expected up");
        Ok(())
    }

    async fn hotplug_memory(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        vms::hotplug_memory(&ctx.engine, vm, 2 * GB).await?;
        vm_scenarios::check_vm_memory(&ctx.engine, vm, 2 * GB).await?;
        Self::check_up(ctx, vm).await
    }

    async fn hotplug_cpu(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self.vm()?;
        vms::hotplug_cpu(&ctx.engine, vm, 2).await?;
        let expected = CpuTopology {
            sockets: 2,
            ..initial_topology()
        };
        vm_scenarios::check_vm_cpus(&ctx.engine, vm, &expected).await?;
        Self::check_up(ctx, vm).await
    }
}

#[async_trait]
impl Suite for CpuMemorySuite {
    fn name(&self) -> &'static str {
        "cpu_memory"
    }

    fn cases(&self) -> Vec<&'static str> {
        vec![
            "configured_topology",
            "configured_memory",
            "hotplug_memory",
            "hotplug_cpu",
        ]
    }

    async fn case_supported(&self, ctx: &SuiteContext, case: &str) -> Result<bool> {
        if !case.starts_with("hotplug_") {
            return Ok(true);
        }
        let version =
            clusters::get_cluster_compatibility_version(&ctx.engine, &ctx.topology.cluster).await?;
        Ok(version_at_least(
            &version.to_string(),
            HOTPLUG_MIN_CLUSTER_VERSION,
        ))
    }

    async fn setup(&mut self, ctx: &SuiteContext) -> Result<()> {
        let name = unique_name("art_cpu_vm");
        let spec = VmSpec {
            template: ctx.topology.template.clone(),
            memory: GB,
            topology: initial_topology(),
            ..VmSpec::new(&name, &ctx.topology.cluster)
        };
        vm_scenarios::create_vm(&ctx.engine, &spec).await?;
        self.vm = Some(name.clone());
        vm_scenarios::start_vms(&ctx.engine, std::slice::from_ref(&name), VmStatus::Up).await
    }

    async fn run_case(&mut self, ctx: &SuiteContext, case: &str) -> Result<()> {
        match case {
            "configured_topology" => {
                vm_scenarios::check_vm_cpus(&ctx.engine, self.vm()?, &initial_topology()).await
            }
            "configured_memory" => vm_scenarios::check_vm_memory(&ctx.engine, self.vm()?, GB).await,
            "hotplug_memory" => self.hotplug_memory(ctx).await,
            "hotplug_cpu" => self.hotplug_cpu(ctx).await,
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
