//! Template scenarios

use crate::low_level::{templates, vms};
use crate::Engine;
use art_shared::{Result, Template, VmStatus};
use tracing::info;

/// Seal a VM into a template; the VM is stopped first and the template waited on until ok
pub async fn create_template_from_vm(
    engine: &Engine,
    name: &str,
    vm: &str,
    cluster: &str,
) -> Result<Template> {
    info!("Creating template {} from VM {}", name, vm);
    if vms::get_vm_status(engine, vm).await? != VmStatus::Down {
        vms::stop_vm(engine, vm, true).await?;
    }
    templates::add_template(engine, name, vm, cluster, true).await?;
    templates::get_template(engine, name).await
}
