//! VM pool lifecycle: creation, stateless runs, resizing, allocation and removal

use super::{not_set_up, unknown_case, Suite, SuiteContext};
use art_api::high_level::{unique_name, vmpools as pool_scenarios};
use art_api::low_level::{vmpools, vms};
use art_shared::{ensure, Result, Vm, VmPool, VmStatus};
use async_trait::async_trait;
use tracing::info;

const INITIAL_SIZE: u32 = 2;
const RESIZED_SIZE: u32 = 3;

#[derive(Default)]
pub struct VmPoolsSuite {
    pool: Option<String>,
    vms: Vec<String>,
}

impl VmPoolsSuite {
    fn pool(&self) -> Result<&str> {
        self.pool
            .as_deref()
            .ok_or_else(|| not_set_up(self.name(), "pool name"))
    }

    async fn create_pool(&mut self, ctx: &SuiteContext) -> Result<()> {
        let pool = self.pool()?.to_string();
        self.vms = pool_scenarios::create_vm_pool(
            &ctx.engine,
            &pool,
            &ctx.topology.cluster,
            &ctx.topology.template,
            INITIAL_SIZE,
        )
        .await?;
        ensure!(
            self.vms.len() == INITIAL_SIZE as usize,
            "Pool {pool} has {} VMs, expected {INITIAL_SIZE}",
            self.vms.len()
        );
        Ok(())
    }

    async fn start_pool_vms(&mut self, ctx: &SuiteContext) -> Result<()> {
        let started = pool_scenarios::start_vm_pool_vms(&ctx.engine, self.pool()?).await?;
        for vm in &started {
            let status = vms::get_vm_status(&ctx.engine, vm).await?;
            ensure!(status == VmStatus::Up, "Pool VM {vm} is {status} after start");
        }
        Ok(())
    }

    async fn stateless_snapshot(&mut self, ctx: &SuiteContext) -> Result<()> {
        let vm = self
            .vms
            .first()
            .ok_or_else(|| not_set_up(self.name(), "pool VMs"))?;
        pool_scenarios::check_stateless_snapshot(&ctx.engine, vm).await
    }

    async fn update_pool_size(&mut self, ctx: &SuiteContext) -> Result<()> {
        let pool = self.pool()?;
        let changes = VmPool {
            size: Some(RESIZED_SIZE),
            ..Default::default()
        };
        vmpools::update_vm_pool(&ctx.engine, pool, &changes).await?;
        vmpools::wait_for_vm_pool_size(&ctx.engine, pool, RESIZED_SIZE as usize).await?;

        let size = vmpools::get_vm_pool(&ctx.engine, pool).await?.size;
        ensure!(
            size == Some(RESIZED_SIZE),
            "Pool {pool} reports size {size:?} after update, expected {RESIZED_SIZE}"
        );
        self.vms = vmpools::get_vm_pool_vm_names(&ctx.engine, pool).await?;
        Ok(())
    }

    async fn allocate_vm(&mut self, ctx: &SuiteContext) -> Result<()> {
        let pool = self.pool()?;
        pool_scenarios::stop_vm_pool_vms(&ctx.engine, pool).await?;
        vmpools::allocate_vm_from_pool(&ctx.engine, pool).await?;

        let engine = &ctx.engine;
        let allocated = engine
            .sampler(
                engine.timeouts().vm_state(),
                format!("a VM of pool {pool} to be allocated"),
            )
            .wait_for_func_status(
                || async move { vmpools::get_vm_pool_vms(engine, pool).await },
                |pool_vms: &Vec<Vm>| pool_vms.iter().any(|vm| vm.status == Some(VmStatus::Up)),
            )
            .await?;
        ensure!(allocated, "No VM of pool {pool} came up after allocation");
        Ok(())
    }

    async fn detach_and_remove(&mut self, ctx: &SuiteContext) -> Result<()> {
        let pool = self.pool()?.to_string();
        pool_scenarios::detach_and_remove_vm_pool(&ctx.engine, &pool).await?;

        let lookup = vmpools::get_vm_pool(&ctx.engine, &pool).await;
        ensure!(
            lookup.as_ref().is_err_and(|e| e.is_not_found()),
            "Pool {pool} still exists after removal"
        );
        self.pool = None;
        self.vms.clear();
        Ok(())
    }
}

#[async_trait]
impl Suite for VmPoolsSuite {
    fn name(&self) -> &'static str {
        "vm_pools"
    }

    fn cases(&self) -> Vec<&'static str> {
        vec![
            "create_pool",
            "start_pool_vms",
            "stateless_snapshot",
            "update_pool_size",
            "allocate_vm",
            "detach_and_remove",
        ]
    }

    async fn setup(&mut self, _ctx: &SuiteContext) -> Result<()> {
        self.pool = Some(unique_name("art_pool"));
        self.vms.clear();
        Ok(())
    }

    async fn run_case(&mut self, ctx: &SuiteContext, case: &str) -> Result<()> {
        match case {
            "create_pool" => self.create_pool(ctx).await,
            "start_pool_vms" => self.start_pool_vms(ctx).await,
            "stateless_snapshot" => self.stateless_snapshot(ctx).await,
            "update_pool_size" => self.update_pool_size(ctx).await,
            "allocate_vm" => self.allocate_vm(ctx).await,
            "detach_and_remove" => self.detach_and_remove(ctx).await,
            other => Err(unknown_case(self.name(), other)),
        }
    }

    async fn teardown(&mut self, ctx: &SuiteContext) -> Result<()> {
        let Some(pool) = self.pool.take() else {
            return Ok(());
        };
        match vmpools::get_vm_pool(&ctx.engine, &pool).await {
            Ok(_) => {
                info!("Removing leftover pool {}", pool);
                pool_scenarios::detach_and_remove_vm_pool(&ctx.engine, &pool).await
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
