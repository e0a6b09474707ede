//! Acceptance test suites
//!
//! A suite is a test class: `setup` builds what its cases share, the cases
//! run in the order [`Suite::cases`] lists them, and `teardown` runs after
//! setup whether it succeeded or not. A case passes by returning `Ok(())`,
//! fails with an assertion error and errors with anything else.

use art_api::Engine;
use art_shared::{ArtError, Result, TopologyConfig};
use async_trait::async_trait;

pub mod cpu_memory;
pub mod migration;
pub mod networks;
pub mod snapshots;
pub mod vm_pools;

/// What every suite gets to work with
pub struct SuiteContext {
    pub engine: Engine,
    pub topology: TopologyConfig,
}

impl SuiteContext {
    pub fn new(engine: Engine, topology: TopologyConfig) -> Self {
        Self { engine, topology }
    }

    /// Names of the configured hosts
    pub fn host_names(&self) -> Vec<String> {
        self.topology.hosts.iter().map(|h| h.name.clone()).collect()
    }

    /// First configured storage domain, where suites put their disks
    pub fn storage_domain(&self) -> Option<&str> {
        self.topology.storage.first().map(|s| s.name.as_str())
    }
}

#[async_trait]
pub trait Suite: Send + Sync {
    fn name(&self) -> &'static str;

    /// Case names, in execution order
    fn cases(&self) -> Vec<&'static str>;

    /// Lowest engine version the suite supports
    fn min_engine_version(&self) -> Option<&'static str> {
        None
    }

    /// Whether the environment supports a case; unsupported cases are skipped
    async fn case_supported(&self, _ctx: &SuiteContext, _case: &str) -> Result<bool> {
        Ok(true)
    }

    async fn setup(&mut self, ctx: &SuiteContext) -> Result<()>;

    async fn run_case(&mut self, ctx: &SuiteContext, case: &str) -> Result<()>;

    async fn teardown(&mut self, ctx: &SuiteContext) -> Result<()>;
}

/// Every shipped suite, in execution order
pub fn registry() -> Vec<Box<dyn Suite>> {
    vec![
        Box::new(vm_pools::VmPoolsSuite::default()),
        Box::new(networks::NetworksSuite::default()),
        Box::new(snapshots::SnapshotsSuite::default()),
        Box::new(migration::MigrationSuite::default()),
        Box::new(cpu_memory::CpuMemorySuite::default()),
    ]
}

pub(crate) fn unknown_case(suite: &str, case: &str) -> ArtError {
    ArtError::Config(format!("Suite {suite} has no case {case}"))
}

/// Error for state a case needs but setup did not leave behind
pub(crate) fn not_set_up(suite: &str, what: &str) -> ArtError {
    ArtError::Config(format!("Suite {suite} has no {what}; did setup run?"))
}
