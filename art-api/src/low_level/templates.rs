//! Template operations

use crate::entity::{self, Entity, ResultExt};
use crate::Engine;
use art_shared::{EntityKind, Ref, Result, Template, TemplateStatus};
use tracing::info;

pub async fn get_template(engine: &Engine, name: &str) -> Result<Template> {
    entity::find_by_name(engine.client(), name).await
}

/// Seal a VM into a template
pub async fn add_template(
    engine: &Engine,
    name: &str,
    vm: &str,
    cluster: &str,
    wait: bool,
) -> Result<Template> {
    info!("Creating template {} from VM {}", name, vm);
    let template = Template {
        name: Some(name.to_string()),
        vm: Some(Ref::name(vm)),
        cluster: Some(Ref::name(cluster)),
        ..Default::default()
    };

    let created = entity::create(engine.client(), Template::COLLECTION, &template)
        .await
        .or_entity_err(EntityKind::Template, || {
            format!("Failed to create template {name} from VM {vm}")
        })?;

    if wait {
        wait_for_template_status(engine, name, TemplateStatus::Ok).await?;
    }
    Ok(created)
}

pub async fn remove_template(engine: &Engine, name: &str, wait: bool) -> Result<()> {
    info!("Removing template {}", name);
    let template = get_template(engine, name).await?;
    let path = entity::element_path(Template::COLLECTION, template.require_id()?);

    entity::remove(engine.client(), &path, &[])
        .await
        .or_entity_err(EntityKind::Template, || {
            format!("Failed to remove template {name}")
        })?;

    if wait {
        let sampler = engine.sampler(
            engine.timeouts().disk(),
            format!("template {name} to be removed"),
        );
        entity::wait_for_removal::<Template>(engine.client(), Template::COLLECTION, name, &sampler)
            .await?;
    }
    Ok(())
}

pub async fn wait_for_template_status(
    engine: &Engine,
    name: &str,
    status: TemplateStatus,
) -> Result<()> {
    info!("Waiting for template {} to be {}", name, status);
    engine
        .sampler(
            engine.timeouts().disk(),
            format!("template {name} to be {status}"),
        )
        .wait_for_value(
            || async move {
                Ok(get_template(engine, name)
                    .await?
                    .status
                    .unwrap_or(TemplateStatus::Unknown))
            },
            status,
        )
        .await?;
    Ok(())
}
